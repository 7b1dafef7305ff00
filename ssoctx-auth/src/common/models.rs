use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client registration issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    /// Unix seconds
    pub client_secret_expires_at: i64,
}

/// Pending device authorization the user has to approve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub verification_uri: String,
}

/// Outcome of a single token exchange attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenExchange {
    Granted { access_token: String },
    /// The user has not approved the request yet
    Pending,
}

/// Cached authorization session, scoped to one start URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub client_secret_expires_at: i64,
    pub device_code: String,
    #[serde(rename = "verificationURI")]
    pub verification_uri: String,
    #[serde(rename = "originURL")]
    pub origin_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        registration: ClientRegistration,
        device: DeviceAuthorization,
        origin_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: registration.client_id,
            client_secret: registration.client_secret,
            client_secret_expires_at: registration.client_secret_expires_at,
            device_code: device.device_code,
            verification_uri: device.verification_uri,
            origin_url: origin_url.into(),
            access_token: None,
            access_token_expires_at: None,
        }
    }

    /// Usable iff minted for `origin_url`, holding a token, and not yet expired.
    pub fn is_usable(&self, origin_url: &str, now: DateTime<Utc>) -> bool {
        self.origin_url == origin_url && self.has_access_token() && !self.is_expired(now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.access_token_expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether the client registration can drive a new device authorization
    /// for `origin_url` without registering again.
    pub fn can_reuse_client(&self, origin_url: &str, now: DateTime<Utc>) -> bool {
        self.origin_url == origin_url
            && !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && now.timestamp() < self.client_secret_expires_at
    }

    pub fn registration(&self) -> ClientRegistration {
        ClientRegistration {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            client_secret_expires_at: self.client_secret_expires_at,
        }
    }
}
