use super::ClientCredentials;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Method, Request, RequestData};

// Requests

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDeviceAuthorization {
    #[serde(flatten)]
    client: ClientCredentials,
    start_url: String,
}

impl StartDeviceAuthorization {
    pub fn new(client: ClientCredentials, start_url: impl Into<String>) -> Self {
        Self {
            client,
            start_url: start_url.into(),
        }
    }
}

impl Request for StartDeviceAuthorization {
    type Data = Self;
    type Response = DeviceAuthorizationResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/device_authorization".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAuthorizationResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    /// Verification URI with the user code already filled in.
    pub verification_uri_complete: Option<String>,
    pub expires_in: i64,
    #[serde(default)]
    pub interval: Option<i64>,
}

impl DeviceAuthorizationResponse {
    /// URI to hand to the user, preferring the pre-filled variant.
    pub fn browser_uri(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}
