//! Error types for identity resolution.

/// Errors that can occur while resolving a connection's identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider rejected the token (invalid, expired, revoked).
    #[error("identity resolution failed: {0}")]
    ResolveFailed(String),
}
