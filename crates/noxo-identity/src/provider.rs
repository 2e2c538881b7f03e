//! The [`IdentityProvider`] trait and the anonymous development provider.

use rand::Rng;

use crate::IdentityError;

/// What the external login system knows about a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Opaque id from the provider. Passed through to room rosters
    /// unchanged; the server never interprets it.
    pub external_id: String,
    /// The provider's display name. Clients may still choose a different
    /// name when joining a room.
    pub display_name: String,
    /// Avatar URL, if the provider has one.
    pub avatar_url: Option<String>,
}

/// Resolves a handshake token into an [`Identity`].
///
/// Implementations wrap the deployment's real login system. The server
/// calls this exactly once per connection, during the handshake; a
/// resolution failure rejects the connection before it can touch any room.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Resolves `token` into the identity it was issued for.
    ///
    /// # Errors
    /// [`IdentityError::ResolveFailed`] if the token is invalid.
    fn resolve(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, IdentityError>> + Send;
}

// ---------------------------------------------------------------------------
// AnonymousIdentity
// ---------------------------------------------------------------------------

/// A provider for development and tests: trusts the token as a display
/// name and fabricates a random external id.
///
/// Never deploy this behind a real login flow — it authenticates nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        let name = token.trim();
        if name.is_empty() {
            return Err(IdentityError::ResolveFailed("empty token".into()));
        }
        Ok(Identity {
            external_id: format!("anon-{}", random_hex(8)),
            display_name: name.to_string(),
            avatar_url: None,
        })
    }
}

/// Generates `bytes` random bytes formatted as lowercase hex.
fn random_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}

// =========================================================================
// Tests
// =========================================================================
