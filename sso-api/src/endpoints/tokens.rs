use super::ClientCredentials;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tower_api_client::{Method, Request, RequestData};

pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

// Requests

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToken {
    #[serde(flatten)]
    client: ClientCredentials,
    device_code: String,
    grant_type: String,
}

impl CreateToken {
    pub fn new(client: ClientCredentials, device_code: impl Into<String>) -> Self {
        Self {
            client,
            device_code: device_code.into(),
            grant_type: DEVICE_CODE_GRANT.to_string(),
        }
    }
}

impl Request for CreateToken {
    type Data = Self;
    type Response = CreateTokenResponse;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/token".into()
    }

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Json(self)
    }
}

// Responses

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}
