//! Endpoint selection for a run.
//!
//! [`EndpointConfig`] is derived once from the command line and the loaded
//! configuration, then passed by reference into every counter. Nothing in the
//! crate reads endpoint URLs from ambient state.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::resource::ResourceType;

/// How the harness reaches OpenMRS and the sink server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkMode {
    /// Services published on the local host.
    #[default]
    Host,
    /// Services addressed by container name on a shared docker network.
    Containerized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Batch,
    Streaming,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

/// Base URLs for one addressing scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPair {
    pub openmrs: String,
    pub sink: String,
}

/// Search form shared by every HTTP counter in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryForm {
    /// Aggregate counts over everything the server holds.
    Summary,
    /// Counts restricted to records belonging to the seeded test patient.
    NameFiltered(String),
}

impl QueryForm {
    /// Query parameters for an OpenMRS search.
    pub fn openmrs_params(&self, resource_type: ResourceType) -> Vec<(String, String)> {
        match self {
            Self::Summary => Vec::new(),
            Self::NameFiltered(name) => {
                vec![(resource_type.given_name_param().to_string(), name.clone())]
            }
        }
    }

    /// Query parameters for a sink FHIR server search.
    pub fn sink_params(&self, resource_type: ResourceType) -> Vec<(String, String)> {
        match self {
            Self::Summary => vec![("_summary".to_string(), "count".to_string())],
            Self::NameFiltered(name) => {
                vec![(resource_type.given_name_param().to_string(), name.clone())]
            }
        }
    }
}

/// Immutable per-run endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    openmrs_base_url: Url,
    sink_base_url: Url,
    network_mode: NetworkMode,
    mode: RunMode,
    query: QueryForm,
}

impl EndpointConfig {
    /// Picks the addressing scheme for `network_mode` and fixes the query form
    /// for `mode`. Streaming runs require the test patient's given name.
    pub fn derive(
        host: &EndpointPair,
        containerized: &EndpointPair,
        network_mode: NetworkMode,
        mode: RunMode,
        patient_given_name: &str,
    ) -> Result<Self> {
        let pair = match network_mode {
            NetworkMode::Host => host,
            NetworkMode::Containerized => containerized,
        };
        let query = match mode {
            RunMode::Batch => QueryForm::Summary,
            RunMode::Streaming => {
                let name = patient_given_name.trim();
                if name.is_empty() {
                    return Err(Error::argument(
                        "streaming mode requires a test patient given name",
                    ));
                }
                QueryForm::NameFiltered(name.to_string())
            }
        };
        Ok(Self {
            openmrs_base_url: parse_base_url("OpenMRS", &pair.openmrs)?,
            sink_base_url: parse_base_url("sink", &pair.sink)?,
            network_mode,
            mode,
            query,
        })
    }

    pub fn openmrs_base_url(&self) -> &Url {
        &self.openmrs_base_url
    }

    pub fn sink_base_url(&self) -> &Url {
        &self.sink_base_url
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.network_mode
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn query(&self) -> &QueryForm {
        &self.query
    }
}

fn parse_base_url(label: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::argument(format!("invalid {label} base URL `{raw}`: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::argument(format!(
            "{label} base URL `{raw}` must use http or https"
        )));
    }
    Ok(url)
}
