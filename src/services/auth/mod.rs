pub mod claims;
pub mod directory;
pub mod login;
pub mod password;
pub mod registration;
pub mod role_policy;
pub mod signing_key;
pub mod token_issuer;
pub mod token_validator;

pub use login::LoginService;
pub use registration::RegistrationService;
pub use signing_key::SigningKey;
pub use token_issuer::TokenIssuer;
pub use token_validator::{AuthOutcome, TokenValidator};
