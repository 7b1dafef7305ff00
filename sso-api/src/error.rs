use serde::{Deserialize, Serialize};
use tower_api_client::Error as ApiError;

/// Error codes the OIDC token endpoint uses while the user has not yet
/// approved the device request.
const AUTHORIZATION_PENDING_CODES: [&str; 2] =
    ["authorization_pending", "AuthorizationPendingException"];

#[derive(Debug)]
pub enum SsoApiError {
    /// The service answered with an error document.
    Provider(u16, ErrorDetail),
    Internal(ApiError),
    Http(reqwest::Error),
}

impl SsoApiError {
    /// Provider error code, if the service returned one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            SsoApiError::Provider(_, detail) => Some(detail.code()),
            _ => None,
        }
    }

    pub fn is_authorization_pending(&self) -> bool {
        self.error_code()
            .is_some_and(|code| AUTHORIZATION_PENDING_CODES.contains(&code))
    }

    pub(crate) fn from_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorDetail>(body).unwrap_or_else(|_| ErrorDetail {
            error: "UnknownError".to_string(),
            error_description: Some(body.to_string()).filter(|b| !b.is_empty()),
        });
        SsoApiError::Provider(status, detail)
    }
}

impl From<ApiError> for SsoApiError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::ClientError(status, body) | ApiError::ServerError(status, body) => {
                SsoApiError::from_body(status.as_u16(), &body)
            }
            e => SsoApiError::Internal(e),
        }
    }
}

impl From<reqwest::Error> for SsoApiError {
    fn from(value: reqwest::Error) -> Self {
        SsoApiError::Http(value)
    }
}

impl std::fmt::Display for SsoApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SsoApiError::Internal(e) => write!(f, "Internal error: {}", e),
            SsoApiError::Http(e) => write!(f, "HTTP error: {}", e),
            SsoApiError::Provider(status, detail) => match &detail.error_description {
                Some(description) => write!(f, "({}) {}: {}", status, detail.code(), description),
                None => write!(f, "({}) {}", status, detail.code()),
            },
        }
    }
}

impl std::error::Error for SsoApiError {}

/// Error document returned by the OIDC and portal endpoints.
///
/// OIDC uses the OAuth2 `error`/`error_description` pair, the portal uses
/// `__type`/`message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(alias = "__type")]
    pub error: String,
    #[serde(default, alias = "message")]
    pub error_description: Option<String>,
}

impl ErrorDetail {
    /// Error code with any `namespace#` prefix stripped.
    pub fn code(&self) -> &str {
        self.error
            .rsplit_once('#')
            .map(|(_, code)| code)
            .unwrap_or(&self.error)
    }
}
