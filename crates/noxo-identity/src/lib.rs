//! Identity resolution for the Noxo room server.
//!
//! Noxo does not validate credentials itself — login lives with an external
//! provider (OAuth, a session cookie service, whatever the deployment
//! uses). The server only needs three facts about a connection: an opaque
//! external id, a display name, and an avatar URL.
//!
//! [`IdentityProvider`] is the seam: one async method that turns the token
//! a client presents in its handshake into an [`Identity`]. Deployments
//! implement it against their real login system; tests and local
//! development use [`AnonymousIdentity`].

mod error;
mod provider;

pub use error::IdentityError;
pub use provider::{AnonymousIdentity, Identity, IdentityProvider};
