//! Run directories: prerequisite checks and the scratch area for saved responses.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::resource::ResourceType;

/// Directory layout of one run, rooted at the pipeline's home directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    home: PathBuf,
    parquet_dir: PathBuf,
    fhir_dir: PathBuf,
}

impl RunLayout {
    /// Checks that `home` and `home/parquet_subdir` exist.
    pub fn new(home: impl Into<PathBuf>, parquet_subdir: &str) -> Result<Self> {
        let home = home.into();
        if !home.is_dir() {
            return Err(Error::argument(format!(
                "home directory {} does not exist",
                home.display()
            )));
        }
        let subdir = parquet_subdir.trim_matches('/');
        if subdir.is_empty() {
            return Err(Error::argument("parquet subdirectory must not be empty"));
        }
        let parquet_dir = home.join(subdir);
        if !parquet_dir.is_dir() {
            return Err(Error::argument(format!(
                "parquet output directory {} does not exist",
                parquet_dir.display()
            )));
        }
        let fhir_dir = home.join("fhir");
        Ok(Self {
            home,
            parquet_dir,
            fhir_dir,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn parquet_dir(&self) -> &Path {
        &self.parquet_dir
    }

    pub fn fhir_dir(&self) -> &Path {
        &self.fhir_dir
    }

    /// Per-resource Parquet output directory, e.g. `<subdir>/Patient`.
    pub fn resource_dir(&self, resource_type: ResourceType) -> PathBuf {
        self.parquet_dir.join(resource_type.as_str())
    }

    /// Fails unless `name` is a regular file inside the home directory.
    pub fn require_artifact(&self, name: &str) -> Result<PathBuf> {
        let path = self.home.join(name);
        if !path.is_file() {
            return Err(Error::argument(format!(
                "required file {} is missing",
                path.display()
            )));
        }
        Ok(path)
    }

    pub fn openmrs_response(&self, resource_type: ResourceType) -> PathBuf {
        self.parquet_dir
            .join(format!("openmrs_{}.json", resource_type.as_str()))
    }

    pub fn sink_response(&self, resource_type: ResourceType) -> PathBuf {
        self.fhir_dir.join(format!("{}.json", resource_type.as_str()))
    }

    /// Resets the scratch area: recreates `fhir/` and drops saved responses
    /// from the Parquet directory. With `prune_empty`, zero-byte files in the
    /// per-resource output directories are deleted too.
    pub fn prepare(&self, prune_empty: bool) -> Result<()> {
        if self.fhir_dir.exists() {
            fs::remove_dir_all(&self.fhir_dir).map_err(|e| Error::io(&self.fhir_dir, e))?;
        }
        fs::create_dir_all(&self.fhir_dir).map_err(|e| Error::io(&self.fhir_dir, e))?;

        for entry in read_dir(&self.parquet_dir)? {
            if entry.extension().is_some_and(|ext| ext == "json") && entry.is_file() {
                fs::remove_file(&entry).map_err(|e| Error::io(&entry, e))?;
            }
        }

        if prune_empty {
            for rt in ResourceType::ALL {
                let dir = self.resource_dir(rt);
                if !dir.is_dir() {
                    continue;
                }
                for entry in read_dir(&dir)? {
                    let meta = fs::metadata(&entry).map_err(|e| Error::io(&entry, e))?;
                    if meta.is_file() && meta.len() == 0 {
                        tracing::info!(path = %entry.display(), "Removing empty output file");
                        fs::remove_file(&entry).map_err(|e| Error::io(&entry, e))?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| Error::io(dir, e))?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Saves a response body for later inspection.
pub fn save_response(path: &Path, body: &str) -> Result<()> {
    fs::write(path, body).map_err(|e| Error::io(path, e))
}
