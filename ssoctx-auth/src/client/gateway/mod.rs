mod oidc;

pub use oidc::OidcGateway;

use async_trait::async_trait;
use thiserror::Error;

use crate::common::{ClientRegistration, DeviceAuthorization, TokenExchange};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The identity provider rejected the request
    #[error("{code}: {message}")]
    Provider { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Provider {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Provider { code, .. } => Some(code),
            GatewayError::Transport(_) => None,
        }
    }
}

/// Remote operations of the device authorization grant.
///
/// Futures are not required to be `Send`; an invocation runs on a single
/// thread from start to finish.
#[async_trait(?Send)]
pub trait AuthGateway {
    async fn register_client(&self, client_name: &str)
        -> Result<ClientRegistration, GatewayError>;

    async fn start_device_authorization(
        &self,
        client_id: &str,
        client_secret: &str,
        origin_url: &str,
    ) -> Result<DeviceAuthorization, GatewayError>;

    /// `Ok(TokenExchange::Pending)` while the user has not approved yet.
    async fn exchange_token(
        &self,
        client_id: &str,
        client_secret: &str,
        device_code: &str,
    ) -> Result<TokenExchange, GatewayError>;
}
