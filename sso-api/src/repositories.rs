use crate::endpoints::{
    ClientCredentials, clients::RegisterClient,
    device_authorizations::StartDeviceAuthorization, tokens::CreateToken,
};

#[derive(Default)]
pub struct OidcRepository;

impl OidcRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn register_client(&self, client_name: impl Into<String>) -> RegisterClient {
        RegisterClient::new(client_name)
    }

    pub fn start_device_authorization(
        &self,
        client: ClientCredentials,
        start_url: impl Into<String>,
    ) -> StartDeviceAuthorization {
        StartDeviceAuthorization::new(client, start_url)
    }

    pub fn create_token(
        &self,
        client: ClientCredentials,
        device_code: impl Into<String>,
    ) -> CreateToken {
        CreateToken::new(client, device_code)
    }
}
