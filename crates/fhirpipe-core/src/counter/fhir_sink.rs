use async_trait::async_trait;

use super::ResourceCounter;
use crate::auth::AuthHeader;
use crate::client::{FhirClient, HttpTimeouts};
use crate::endpoint::{EndpointConfig, QueryForm};
use crate::error::Result;
use crate::resource::{CountSource, ResourceType};
use crate::scratch::{self, RunLayout};

/// Counts resources the pipeline wrote into the sink FHIR server.
pub struct FhirSinkCounter {
    client: FhirClient,
    query: QueryForm,
    scratch: Option<RunLayout>,
}

impl FhirSinkCounter {
    pub fn new(
        endpoint: &EndpointConfig,
        api_path: &str,
        auth: Option<AuthHeader>,
        timeouts: HttpTimeouts,
    ) -> Result<Self> {
        Ok(Self {
            client: FhirClient::new(endpoint.sink_base_url(), api_path, auth, timeouts)?,
            query: endpoint.query().clone(),
            scratch: None,
        })
    }

    /// Saves each response body under the run's `fhir/` directory.
    pub fn with_scratch(mut self, layout: RunLayout) -> Self {
        self.scratch = Some(layout);
        self
    }
}

#[async_trait]
impl ResourceCounter for FhirSinkCounter {
    fn source(&self) -> CountSource {
        CountSource::FhirSink
    }

    async fn count(&self, resource_type: ResourceType) -> Result<u64> {
        let params = self.query.sink_params(resource_type);
        let result = self.client.search_total(resource_type, &params).await?;
        if let Some(layout) = &self.scratch {
            scratch::save_response(&layout.sink_response(resource_type), &result.body)?;
        }
        Ok(result.total)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::endpoint::{EndpointPair, NetworkMode, RunMode};

    fn counter(server: &MockServer, mode: RunMode) -> FhirSinkCounter {
        let pair = EndpointPair {
            openmrs: server.uri(),
            sink: server.uri(),
        };
        let endpoint =
            EndpointConfig::derive(&pair, &pair, NetworkMode::Host, mode, "Alberta625").unwrap();
        FhirSinkCounter::new(&endpoint, "fhir", None, HttpTimeouts::default()).unwrap()
    }

    #[tokio::test]
    async fn test_batch_uses_summary_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Observation"))
            .and(query_param("_summary", "count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "resourceType": "Bundle",
                "type": "searchset",
                "total": 103
            })))
            .expect(1)
            .mount(&server)
            .await;

        let counter = counter(&server, RunMode::Batch);
        assert_eq!(counter.count(ResourceType::Observation).await.unwrap(), 103);
    }

    #[tokio::test]
    async fn test_streaming_filters_patient_by_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fhir/Patient"))
            .and(query_param("given", "Alberta625"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let counter = counter(&server, RunMode::Streaming);
        assert_eq!(counter.count(ResourceType::Patient).await.unwrap(), 1);
    }
}
