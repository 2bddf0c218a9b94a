use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::auth::AuthHeader;
use crate::error::{Error, Result};
use crate::parse;
use crate::resource::ResourceType;

/// Connect and total request timeouts applied to every count query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(20),
        }
    }
}

/// A successful search: the parsed `total` and the raw body for the scratch area.
#[derive(Debug, Clone)]
pub struct SearchTotal {
    pub total: u64,
    pub body: String,
}

/// Minimal FHIR search client that only cares about `Bundle.total`.
pub struct FhirClient {
    http: reqwest::Client,
    api_base: String,
    auth: Option<AuthHeader>,
}

impl FhirClient {
    /// `api_path` is the FHIR root below the server URL, e.g.
    /// `openmrs/ws/fhir2/R4` or `fhir`.
    pub fn new(
        base_url: &Url,
        api_path: &str,
        auth: Option<AuthHeader>,
        timeouts: HttpTimeouts,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.request)
            .build()
            .map_err(|e| Error::Network {
                url: base_url.to_string(),
                source: e,
            })?;
        let api_path = api_path.trim_matches('/');
        let base = base_url.as_str().trim_end_matches('/');
        let api_base = if api_path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{api_path}")
        };
        Ok(Self {
            http,
            api_base,
            auth,
        })
    }

    pub fn resource_url(&self, resource_type: ResourceType) -> String {
        format!("{}/{}", self.api_base, resource_type)
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.http.get(url);
        let req = match &self.auth {
            Some(auth) => auth.apply(req),
            None => req,
        };
        req.header("Accept", "application/fhir+json")
    }

    pub async fn search_total(
        &self,
        resource_type: ResourceType,
        params: &[(String, String)],
    ) -> Result<SearchTotal> {
        let url = self.resource_url(resource_type);
        tracing::debug!(url = %url, ?params, "Querying search total");
        let resp = self
            .request(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Network {
                url: url.clone(),
                source: e,
            })?;
        let body = handle_response(&url, resp).await?;
        let total = parse::parse_total(&body)
            .map_err(|e| Error::parse(format!("{resource_type} total from {url}"), e))?;
        Ok(SearchTotal { total, body })
    }
}

async fn handle_response(url: &str, resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::Network {
        url: url.to_string(),
        source: e,
    })?;

    if !status.is_success() {
        let mut message = body.clone();
        if let Ok(json) = serde_json::from_str::<Value>(&body)
            && json.get("resourceType").and_then(|v| v.as_str()) == Some("OperationOutcome")
            && let Some(issues) = json.get("issue").and_then(|v| v.as_array())
        {
            let msgs: Vec<&str> = issues
                .iter()
                .filter_map(|i| i.get("diagnostics").and_then(|d| d.as_str()))
                .collect();
            if !msgs.is_empty() {
                message = msgs.join("; ");
            }
        }
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}
