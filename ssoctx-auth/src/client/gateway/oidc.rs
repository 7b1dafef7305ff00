use async_trait::async_trait;
use sso_api::endpoints::ClientCredentials;
use sso_api::{Client, Request, SsoApiError};

use super::{AuthGateway, GatewayError};
use crate::common::{ClientRegistration, DeviceAuthorization, TokenExchange};

/// [`AuthGateway`] backed by the regional OIDC endpoint
pub struct OidcGateway {
    client: Client,
}

impl OidcGateway {
    pub fn new(region: &str) -> Self {
        Self {
            client: Client::new(region),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl From<SsoApiError> for GatewayError {
    fn from(err: SsoApiError) -> Self {
        match err {
            SsoApiError::Provider(status, detail) => GatewayError::Provider {
                code: detail.code().to_string(),
                message: detail
                    .error_description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            },
            e => GatewayError::Transport(e.to_string()),
        }
    }
}

#[async_trait(?Send)]
impl AuthGateway for OidcGateway {
    async fn register_client(
        &self,
        client_name: &str,
    ) -> Result<ClientRegistration, GatewayError> {
        let resp = self
            .client
            .send(Request::oidc().register_client(client_name))
            .await?;

        tracing::debug!(client_id = %resp.client_id, "Registered client");
        Ok(ClientRegistration {
            client_id: resp.client_id,
            client_secret: resp.client_secret,
            client_secret_expires_at: resp.client_secret_expires_at,
        })
    }

    async fn start_device_authorization(
        &self,
        client_id: &str,
        client_secret: &str,
        origin_url: &str,
    ) -> Result<DeviceAuthorization, GatewayError> {
        let credentials = ClientCredentials::new(client_id, client_secret);
        let resp = self
            .client
            .send(Request::oidc().start_device_authorization(credentials, origin_url))
            .await?;

        Ok(DeviceAuthorization {
            verification_uri: resp.browser_uri().to_string(),
            device_code: resp.device_code,
        })
    }

    async fn exchange_token(
        &self,
        client_id: &str,
        client_secret: &str,
        device_code: &str,
    ) -> Result<TokenExchange, GatewayError> {
        let credentials = ClientCredentials::new(client_id, client_secret);
        match self
            .client
            .send(Request::oidc().create_token(credentials, device_code))
            .await
        {
            Ok(resp) => Ok(TokenExchange::Granted {
                access_token: resp.access_token,
            }),
            Err(e) if e.is_authorization_pending() => Ok(TokenExchange::Pending),
            Err(e) => Err(e.into()),
        }
    }
}
