use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fhirpipe_core::{CountSource, NetworkMode, RunMode};

#[derive(Parser, Debug)]
#[command(name = "validate")]
#[command(about = "Check that OpenMRS, Parquet and sink FHIR server resource counts agree")]
#[command(version)]
pub struct Cli {
    /// Pipeline home directory (holds the row-count tool and the output directory)
    pub home_dir: PathBuf,

    /// Parquet output directory under the home directory
    pub parquet_subdir: String,

    /// Address OpenMRS and the sink by container name on the docker network
    #[arg(long = "use_docker_network", visible_alias = "use-docker-network")]
    pub use_docker_network: bool,

    /// Validate a streaming pipeline using the seeded test patient's records
    #[arg(long)]
    pub streaming: bool,

    /// Which sinks to compare against OpenMRS
    #[arg(long, value_enum, default_value = "both")]
    pub sink: SinkSelection,

    /// Configuration file (overrides FHIRPIPE_CONFIG env var)
    #[arg(short, long, env = "FHIRPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (overrides logging.level from config)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    pub fn network_mode(&self) -> NetworkMode {
        if self.use_docker_network {
            NetworkMode::Containerized
        } else {
            NetworkMode::Host
        }
    }

    pub fn run_mode(&self) -> RunMode {
        if self.streaming {
            RunMode::Streaming
        } else {
            RunMode::Batch
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum SinkSelection {
    Parquet,
    Fhir,
    #[default]
    Both,
}

impl SinkSelection {
    pub fn sources(&self) -> &'static [CountSource] {
        match self {
            Self::Parquet => &[CountSource::Parquet],
            Self::Fhir => &[CountSource::FhirSink],
            Self::Both => &[CountSource::Parquet, CountSource::FhirSink],
        }
    }

    pub fn includes(&self, source: CountSource) -> bool {
        self.sources().contains(&source)
    }
}
