use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use super::ResourceCounter;
use crate::error::{Error, Result};
use crate::parse;
use crate::process;
use crate::resource::{CountSource, ResourceType};
use crate::scratch::RunLayout;

/// External row-count utility invocation, e.g.
/// `java -jar parquet-tools-1.11.1.jar rowcount <dir>`.
///
/// `{artifact}` and `{dir}` in `args` are replaced with the tool artifact path
/// and the resource output directory.
#[derive(Debug, Clone)]
pub struct RowCountTool {
    pub program: String,
    pub args: Vec<String>,
    pub artifact: PathBuf,
    pub count_column: usize,
    pub timeout: Duration,
}

impl RowCountTool {
    async fn row_count(&self, dir: &std::path::Path) -> Result<u64> {
        let vars = HashMap::from([
            ("artifact", self.artifact.display().to_string()),
            ("dir", dir.display().to_string()),
        ]);
        let args = process::expand_args(&self.args, &vars);
        let output = process::run(&self.program, &args, self.timeout).await?;
        parse::parse_row_count(&output.stdout, self.count_column).map_err(|e| {
            Error::parse(format!("`{}` output for {}", self.program, dir.display()), e)
        })
    }
}

#[derive(Debug, Clone)]
pub enum RowCountBackend {
    Tool(RowCountTool),
    /// Reads row counts straight from Parquet footers.
    #[cfg(feature = "native-rowcount")]
    Native,
}

/// Counts rows in the per-resource Parquet output directories.
pub struct ParquetCounter {
    layout: RunLayout,
    backend: RowCountBackend,
}

impl ParquetCounter {
    pub fn new(layout: RunLayout, backend: RowCountBackend) -> Self {
        Self { layout, backend }
    }
}

#[async_trait]
impl ResourceCounter for ParquetCounter {
    fn source(&self) -> CountSource {
        CountSource::Parquet
    }

    async fn count(&self, resource_type: ResourceType) -> Result<u64> {
        let dir = self.layout.resource_dir(resource_type);
        match &self.backend {
            RowCountBackend::Tool(tool) => tool.row_count(&dir).await,
            #[cfg(feature = "native-rowcount")]
            RowCountBackend::Native => {
                tokio::task::spawn_blocking(move || super::native::count_parquet_rows(&dir))
                    .await
                    .map_err(|e| Error::tool("parquet footer reader", e.to_string()))?
            }
        }
    }
}
