//! Credential provider port for the chat client.

use secrecy::SecretString;

/// Supplies the bearer credential the client attaches to socket upgrades and
/// polling requests.
///
/// Anonymous visitors return `None`.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<SecretString>;
}
