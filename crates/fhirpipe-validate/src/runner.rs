//! Run orchestration: arguments → endpoints → readiness → counts → verdict.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use fhirpipe_core::{
    CountSet, CountSource, EndpointConfig, Error, ErrorKind, FhirSinkCounter, NetworkMode,
    OpenmrsCounter, ParquetCounter, PollingWaiter, ResourceCounter, Result, RowCountBackend,
    RowCountTool, RunLayout, RunMode, SeedCommand, Verdict, collect_counts,
};

use crate::cli::{Cli, SinkSelection};
use crate::config::{AppConfig, ParquetBackend};

/// Exit status when every checked sink matched.
pub const EXIT_OK: i32 = 0;
/// Exit status for invalid arguments, missing prerequisites or a count mismatch.
pub const EXIT_FAILED: i32 = 1;
/// Exit status when a count could not be determined at all.
pub const EXIT_UNDETERMINED: i32 = 2;

pub fn exit_code_for(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::Argument => EXIT_FAILED,
        _ => EXIT_UNDETERMINED,
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub home_dir: PathBuf,
    pub parquet_subdir: String,
    pub network_mode: NetworkMode,
    pub run_mode: RunMode,
    pub sinks: SinkSelection,
}

impl From<&Cli> for RunOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            home_dir: cli.home_dir.clone(),
            parquet_subdir: cli.parquet_subdir.clone(),
            network_mode: cli.network_mode(),
            run_mode: cli.run_mode(),
            sinks: cli.sink,
        }
    }
}

/// Runs one validation pass and returns the verdict.
///
/// Prerequisites are checked before any network traffic. `cancel` aborts the
/// streaming wait or the batch settle delay.
pub async fn run<C>(opts: &RunOptions, cfg: &AppConfig, cancel: C) -> Result<Verdict>
where
    C: Future<Output = ()>,
{
    let layout = RunLayout::new(&opts.home_dir, &opts.parquet_subdir)?;
    let row_count = if opts.sinks.includes(CountSource::Parquet) {
        Some(row_count_backend(&layout, cfg)?)
    } else {
        None
    };
    let endpoint = EndpointConfig::derive(
        &cfg.endpoints.host,
        &cfg.endpoints.docker,
        opts.network_mode,
        opts.run_mode,
        &cfg.streaming.patient_given_name,
    )?;
    tracing::info!(
        mode = %endpoint.mode(),
        network = ?endpoint.network_mode(),
        openmrs = %endpoint.openmrs_base_url(),
        sink = %endpoint.sink_base_url(),
        "Starting validation"
    );

    layout.prepare(cfg.parquet.prune_empty_files)?;

    let timeouts = cfg.http_timeouts();
    let openmrs = OpenmrsCounter::new(
        &endpoint,
        &cfg.openmrs.api_path,
        cfg.openmrs.auth(),
        timeouts,
    )?
    .with_scratch(layout.clone());
    let parquet = row_count.map(|backend| ParquetCounter::new(layout.clone(), backend));
    let sink = if opts.sinks.includes(CountSource::FhirSink) {
        Some(
            FhirSinkCounter::new(&endpoint, &cfg.sink.api_path, cfg.sink.auth(), timeouts)?
                .with_scratch(layout.clone()),
        )
    } else {
        None
    };

    match endpoint.mode() {
        RunMode::Streaming => {
            let probe: &dyn ResourceCounter = match (&sink, &parquet) {
                (Some(sink), _) => sink,
                (None, Some(parquet)) => parquet,
                (None, None) => return Err(Error::argument("no sink selected for comparison")),
            };
            let mut waiter = PollingWaiter::new(probe, cfg.wait_policy());
            if let Some(seed) = SeedCommand::from_argv(
                &cfg.streaming.seed_command,
                Duration::from_secs(cfg.streaming.seed_timeout_secs),
            ) {
                let vars = HashMap::from([
                    (
                        "openmrs_url",
                        endpoint
                            .openmrs_base_url()
                            .as_str()
                            .trim_end_matches('/')
                            .to_string(),
                    ),
                    ("home", layout.home().display().to_string()),
                ]);
                waiter = waiter.with_seed(seed, vars);
            }
            let ready = waiter.wait(cancel).await?;
            tracing::info!(count = ready, source = %probe.source(), "Sink is receiving data");
        }
        RunMode::Batch => {
            let delay = cfg.batch.settle_delay_secs;
            if delay > 0 {
                tracing::info!(seconds = delay, "Waiting before counting");
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
                    _ = cancel => return Err(Error::Cancelled),
                }
            }
        }
    }

    let baseline = collect_counts(&openmrs).await?;
    let mut candidates: Vec<CountSet> = Vec::new();
    if let Some(parquet) = &parquet {
        candidates.push(collect_counts(parquet).await?);
    }
    if let Some(sink) = &sink {
        candidates.push(collect_counts(sink).await?);
    }

    Verdict::evaluate(&baseline, &candidates)
}

fn row_count_backend(layout: &RunLayout, cfg: &AppConfig) -> Result<RowCountBackend> {
    match cfg.parquet.backend {
        ParquetBackend::Tool => {
            let artifact = layout.require_artifact(&cfg.parquet.tool_artifact)?;
            Ok(RowCountBackend::Tool(RowCountTool {
                program: cfg.parquet.program.clone(),
                args: cfg.parquet.args.clone(),
                artifact,
                count_column: cfg.parquet.count_column,
                timeout: Duration::from_secs(cfg.parquet.timeout_secs),
            }))
        }
        #[cfg(feature = "native-rowcount")]
        ParquetBackend::Native => Ok(RowCountBackend::Native),
        #[cfg(not(feature = "native-rowcount"))]
        ParquetBackend::Native => Err(Error::argument(
            "parquet.backend = \"native\" requires the native-rowcount feature",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&Error::argument("missing jar")), EXIT_FAILED);
        assert_eq!(exit_code_for(&Error::Cancelled), EXIT_UNDETERMINED);
        assert_eq!(
            exit_code_for(&Error::tool("java", "not found")),
            EXIT_UNDETERMINED
        );
    }

    #[tokio::test]
    async fn test_missing_home_is_argument_error() {
        let opts = RunOptions {
            home_dir: PathBuf::from("/definitely/not/here"),
            parquet_subdir: "parquet".into(),
            network_mode: NetworkMode::Host,
            run_mode: RunMode::Batch,
            sinks: SinkSelection::Both,
        };
        let err = run(&opts, &AppConfig::default(), pending())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[cfg(not(feature = "native-rowcount"))]
    #[tokio::test]
    async fn test_native_backend_without_feature() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("parquet")).unwrap();
        let mut cfg = AppConfig::default();
        cfg.parquet.backend = ParquetBackend::Native;
        let opts = RunOptions {
            home_dir: dir.path().to_path_buf(),
            parquet_subdir: "parquet".into(),
            network_mode: NetworkMode::Host,
            run_mode: RunMode::Batch,
            sinks: SinkSelection::Parquet,
        };
        let err = run(&opts, &cfg, pending()).await.unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }
}
