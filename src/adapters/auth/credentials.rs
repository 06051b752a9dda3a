//! Static credential provider for the chat client.

use secrecy::{ExposeSecret, SecretString};

use crate::ports::CredentialProvider;

/// Hands out one fixed bearer credential, or none for anonymous visitors.
#[derive(Debug, Default)]
pub struct StaticCredentialProvider {
    token: Option<SecretString>,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::new(token.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn bearer_token(&self) -> Option<SecretString> {
        self.token
            .as_ref()
            .map(|t| SecretString::new(t.expose_secret().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_token() {
        assert!(StaticCredentialProvider::anonymous().bearer_token().is_none());
    }

    #[test]
    fn returns_configured_token() {
        let provider = StaticCredentialProvider::new("abc");
        let token = provider.bearer_token().unwrap();
        assert_eq!(token.expose_secret(), "abc");
    }
}
