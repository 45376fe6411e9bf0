//! Authentication collaborator boundary.
//!
//! Credential verification internals live behind [`Authenticator`]; the
//! gateway only needs a subject back. The built-in [`StaticTokenAuthenticator`]
//! checks bearer tokens against a table loaded from config.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::TokenConfig;

/// Identity attached to a request once its credential has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Why a credential was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no credential presented")]
    Missing,
    #[error("credential is invalid")]
    Invalid,
    #[error("credential is not permitted")]
    Forbidden,
    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),
}

/// Verifies a presented bearer credential.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: &str) -> Result<Principal, AuthError>;
}

#[derive(Debug, Clone)]
struct TokenEntry {
    subject: String,
    disabled: bool,
}

/// Accepts a fixed set of tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, TokenEntry>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: &[TokenConfig]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| {
                    (
                        t.token.clone(),
                        TokenEntry {
                            subject: t.subject.clone(),
                            disabled: t.disabled,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Principal, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::Missing);
        }
        match self.tokens.get(credential) {
            Some(entry) if entry.disabled => Err(AuthError::Forbidden),
            Some(entry) => Ok(Principal::new(entry.subject.clone())),
            None => Err(AuthError::Invalid),
        }
    }
}
