pub mod authenticator;
pub mod credentials;
pub mod secret_masker;

pub use authenticator::{DISTRIBUTION_SCOPE, ServiceAccountAuthenticator};
pub use credentials::ServiceAccountKey;
pub use secret_masker::SecretMasker;
