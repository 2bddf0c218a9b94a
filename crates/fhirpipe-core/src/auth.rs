use serde::{Deserialize, Serialize};

/// Credentials a counter presents to a FHIR server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthHeader {
    #[serde(rename = "basic")]
    Basic { username: String, password: String },
    #[serde(rename = "bearer")]
    Bearer { token: String },
}

impl AuthHeader {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Builds credentials from optional config values.
    ///
    /// A bearer token wins over a username; a username without a password is
    /// sent with an empty password. No values means anonymous access.
    pub fn from_parts(
        username: Option<&str>,
        password: Option<&str>,
        token: Option<&str>,
    ) -> Option<Self> {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            return Some(Self::Bearer {
                token: token.to_string(),
            });
        }
        username.filter(|u| !u.is_empty()).map(|u| Self::Basic {
            username: u.to_string(),
            password: password.unwrap_or_default().to_string(),
        })
    }

    pub(crate) fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Basic { username, password } => req.basic_auth(username, Some(password)),
            Self::Bearer { token } => req.bearer_auth(token),
        }
    }
}
