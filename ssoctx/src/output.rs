//! Rendering of command results on stdout.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sso_api::{AccountInfo, RoleCredentials, RoleInfo};
use ssoctx_auth::Authorization;
use std::path::Path;

/// Document read by the SDKs' `credential_process` hook
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ProcessCredentials<'a> {
    version: u8,
    access_key_id: &'a str,
    secret_access_key: &'a str,
    session_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn credentials_env(credentials: &RoleCredentials) -> String {
    let mut out = format!(
        "export AWS_ACCESS_KEY_ID={}\nexport AWS_SECRET_ACCESS_KEY={}\nexport AWS_SESSION_TOKEN={}\n",
        credentials.access_key_id, credentials.secret_access_key, credentials.session_token
    );
    if let Some(expires_at) = credentials.expires_at() {
        out.push_str(&format!(
            "export AWS_CREDENTIAL_EXPIRATION={}\n",
            rfc3339(expires_at)
        ));
    }
    out
}

pub fn credentials_process(credentials: &RoleCredentials) -> serde_json::Result<String> {
    serde_json::to_string(&ProcessCredentials {
        version: 1,
        access_key_id: &credentials.access_key_id,
        secret_access_key: &credentials.secret_access_key,
        session_token: &credentials.session_token,
        expiration: credentials.expires_at().map(rfc3339),
    })
}

pub fn login_summary(authorization: &Authorization) -> String {
    let session = authorization.session();
    let source = if authorization.is_fresh() {
        "Using cached session"
    } else {
        "New session authorized"
    };

    match session.access_token_expires_at {
        Some(expires_at) => format!(
            "{} for {} (expires {})",
            source,
            session.origin_url,
            rfc3339(expires_at)
        ),
        None => format!("{} for {}", source, session.origin_url),
    }
}

pub fn profile_summary(profile: &str, path: &Path, credentials: &RoleCredentials) -> String {
    match credentials.expires_at() {
        Some(expires_at) => format!(
            "Wrote profile {} to {} (role credentials expire {})",
            profile,
            path.display(),
            rfc3339(expires_at)
        ),
        None => format!("Wrote profile {} to {}", profile, path.display()),
    }
}

/// One line per role: account id, account name, role name, tab separated
pub fn accounts(listing: &[(AccountInfo, Vec<RoleInfo>)]) -> String {
    let mut out = String::new();
    for (account, roles) in listing {
        let name = account.account_name.as_deref().unwrap_or("-");
        if roles.is_empty() {
            out.push_str(&format!("{}\t{}\t-\n", account.account_id, name));
        }
        for role in roles {
            out.push_str(&format!(
                "{}\t{}\t{}\n",
                account.account_id, name, role.role_name
            ));
        }
    }
    out
}
