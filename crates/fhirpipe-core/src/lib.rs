//! Building blocks for validating a FHIR data pipeline end to end.
//!
//! The pipeline copies Patients, Encounters and Observations out of OpenMRS
//! into Parquet files and/or a sink FHIR server. This crate counts those
//! resources on each side and compares the counts:
//!
//! - [`counter`] - per-system resource counters behind [`ResourceCounter`]
//! - [`compare`] - baseline vs. sink comparison and the overall [`Verdict`]
//! - [`waiter`] - readiness polling for streaming runs
//! - [`endpoint`] - the immutable per-run [`EndpointConfig`]

pub mod auth;
pub mod client;
pub mod compare;
pub mod counter;
pub mod endpoint;
pub mod error;
pub mod parse;
pub mod process;
pub mod resource;
pub mod scratch;
pub mod seed;
pub mod waiter;

pub use auth::AuthHeader;
pub use client::{FhirClient, HttpTimeouts};
pub use compare::{ComparisonResult, SinkComparison, Verdict};
pub use counter::{
    FhirSinkCounter, OpenmrsCounter, ParquetCounter, ResourceCounter, RowCountBackend,
    RowCountTool, collect_counts,
};
pub use endpoint::{EndpointConfig, EndpointPair, NetworkMode, QueryForm, RunMode};
pub use error::{Error, ErrorKind, ParseError, Result};
pub use resource::{CountSet, CountSource, ResourceCount, ResourceType};
pub use scratch::RunLayout;
pub use seed::SeedCommand;
pub use waiter::{PollingWaiter, WaitPolicy, WaitState};
