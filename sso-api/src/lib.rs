pub mod endpoints;
mod error;
pub mod portal;
pub mod repositories;

pub use crate::error::{ErrorDetail, SsoApiError};
pub use crate::portal::{AccountInfo, PortalClient, RoleCredentials, RoleInfo};
use repositories::*;
use tower_api_client::{Client as ApiClient, Request as ApiRequest};

/// Base URL of the regional OIDC endpoint.
pub fn oidc_url(region: &str) -> String {
    format!("https://oidc.{}.amazonaws.com", region)
}

/// Base URL of the regional SSO portal endpoint.
pub fn portal_url(region: &str) -> String {
    format!("https://portal.sso.{}.amazonaws.com", region)
}

/// Unauthenticated client for the OIDC device authorization endpoints.
pub struct Client {
    inner: ApiClient,
}

impl Client {
    pub fn new(region: &str) -> Self {
        Self::with_base_url(&oidc_url(region))
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            inner: ApiClient::new(base_url),
        }
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, SsoApiError>
    where
        R: ApiRequest,
    {
        self.inner.send(request).await.map_err(From::from)
    }
}

pub struct Request;

impl Request {
    pub fn oidc() -> OidcRepository {
        OidcRepository::new()
    }
}
