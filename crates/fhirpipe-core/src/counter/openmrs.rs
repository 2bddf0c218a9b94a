use async_trait::async_trait;

use super::ResourceCounter;
use crate::auth::AuthHeader;
use crate::client::{FhirClient, HttpTimeouts};
use crate::endpoint::{EndpointConfig, QueryForm};
use crate::error::Result;
use crate::resource::{CountSource, ResourceType};
use crate::scratch::{self, RunLayout};

/// Counts resources in the OpenMRS FHIR2 module, the pipeline's source.
pub struct OpenmrsCounter {
    client: FhirClient,
    query: QueryForm,
    scratch: Option<RunLayout>,
}

impl OpenmrsCounter {
    pub fn new(
        endpoint: &EndpointConfig,
        api_path: &str,
        auth: Option<AuthHeader>,
        timeouts: HttpTimeouts,
    ) -> Result<Self> {
        Ok(Self {
            client: FhirClient::new(endpoint.openmrs_base_url(), api_path, auth, timeouts)?,
            query: endpoint.query().clone(),
            scratch: None,
        })
    }

    /// Saves each response body under the run's Parquet directory.
    pub fn with_scratch(mut self, layout: RunLayout) -> Self {
        self.scratch = Some(layout);
        self
    }
}

#[async_trait]
impl ResourceCounter for OpenmrsCounter {
    fn source(&self) -> CountSource {
        CountSource::Openmrs
    }

    async fn count(&self, resource_type: ResourceType) -> Result<u64> {
        let params = self.query.openmrs_params(resource_type);
        let result = self.client.search_total(resource_type, &params).await?;
        if let Some(layout) = &self.scratch {
            scratch::save_response(&layout.openmrs_response(resource_type), &result.body)?;
        }
        Ok(result.total)
    }
}
