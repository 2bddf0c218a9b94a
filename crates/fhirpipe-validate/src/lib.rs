//! `validate`: end-to-end count check for the OpenMRS → Parquet / FHIR pipeline.

pub mod cli;
pub mod config;
pub mod observability;
pub mod output;
pub mod runner;
