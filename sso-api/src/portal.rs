//! SSO portal endpoints, authenticated with the access token minted by the
//! OIDC device flow.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Response;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SsoApiError;
use crate::portal_url;

const BEARER_HEADER: &str = "x-amz-sso_bearer_token";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Milliseconds since the unix epoch.
    pub expiration: i64,
}

impl RoleCredentials {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expiration).single()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub role_name: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleCredentialsResponse {
    role_credentials: RoleCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountsPage {
    #[serde(default)]
    account_list: Vec<AccountInfo>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RolesPage {
    #[serde(default)]
    role_list: Vec<RoleInfo>,
    next_token: Option<String>,
}

pub struct PortalClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl PortalClient {
    pub fn new(region: &str, access_token: impl Into<String>) -> Result<Self, SsoApiError> {
        Self::with_base_url(portal_url(region), access_token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, SsoApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            access_token: SecretString::from(access_token.into()),
        })
    }

    pub async fn get_role_credentials(
        &self,
        account_id: &str,
        role_name: &str,
    ) -> Result<RoleCredentials, SsoApiError> {
        let url = format!("{}/federation/credentials", self.base_url);
        let resp = self
            .http_client
            .get(&url)
            .header(BEARER_HEADER, self.access_token.expose_secret())
            .query(&[("account_id", account_id), ("role_name", role_name)])
            .send()
            .await?;

        let resp: RoleCredentialsResponse = Self::decode(resp).await?;
        Ok(resp.role_credentials)
    }

    pub async fn list_accounts(&self) -> Result<Vec<AccountInfo>, SsoApiError> {
        let url = format!("{}/assignment/accounts", self.base_url);
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut req = self
                .http_client
                .get(&url)
                .header(BEARER_HEADER, self.access_token.expose_secret())
                .query(&[("max_result", PAGE_SIZE)]);
            if let Some(token) = &next_token {
                req = req.query(&[("next_token", token)]);
            }

            let page: AccountsPage = Self::decode(req.send().await?).await?;
            accounts.extend(page.account_list);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(accounts),
            }
        }
    }

    pub async fn list_account_roles(&self, account_id: &str) -> Result<Vec<RoleInfo>, SsoApiError> {
        let url = format!("{}/assignment/roles", self.base_url);
        let mut roles = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut req = self
                .http_client
                .get(&url)
                .header(BEARER_HEADER, self.access_token.expose_secret())
                .query(&[("account_id", account_id)])
                .query(&[("max_result", PAGE_SIZE)]);
            if let Some(token) = &next_token {
                req = req.query(&[("next_token", token)]);
            }

            let page: RolesPage = Self::decode(req.send().await?).await?;
            roles.extend(page.role_list);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(roles),
            }
        }
    }

    async fn decode<T>(resp: Response) -> Result<T, SsoApiError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SsoApiError::from_body(status.as_u16(), &body));
        }
        Ok(resp.json::<T>().await?)
    }
}
