use sso_api::{Client, Request, SsoApiError};

#[tokio::main]
pub async fn main() -> Result<(), SsoApiError> {
    let client = Client::new("us-east-1");

    let registration = client
        .send(Request::oidc().register_client("ssoctx-example"))
        .await?;
    println!("registered client {}", registration.client_id);
    Ok(())
}
