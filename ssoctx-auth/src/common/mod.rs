pub mod models;

pub use models::{ClientRegistration, DeviceAuthorization, Session, TokenExchange};
