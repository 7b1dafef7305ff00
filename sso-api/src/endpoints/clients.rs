use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Method, Request, RequestData};

/// Client type used for CLI installations.
pub const PUBLIC_CLIENT: &str = "public";

// Requests

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClient {
    client_name: String,
    client_type: String,
}

impl RegisterClient {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            client_type: PUBLIC_CLIENT.to_string(),
        }
    }
}

impl Request for RegisterClient {
    type Data = Self;
    type Response = RegisterClientResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/client/register".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterClientResponse {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub client_id_issued_at: i64,
    /// Unix seconds after which the client secret is no longer accepted.
    #[serde(default)]
    pub client_secret_expires_at: i64,
}
