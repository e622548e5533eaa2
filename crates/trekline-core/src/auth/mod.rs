//! Authentication module for managing the bearer-token session.
//!
//! This module provides:
//! - `Claims`: unverified decoding of the token payload (expiry, identity)
//! - `CredentialStore`: durable storage for the single bearer token
//! - `SessionManager`: the one authority deciding whether a session is valid
//! - `NavigationReset`: the hook used to send the UI back to its entry screen
//!
//! Teardown is idempotent: however many call sites notice an expired or
//! rejected credential, the navigation reset fires once.

pub mod claims;
pub mod credentials;
pub mod error;
pub mod navigation;
pub mod session;

pub use claims::{unsigned_token, Claims};
pub use credentials::{CredentialStore, CREDENTIAL_KEY};
pub use error::{AuthError, ClaimsError};
pub use navigation::{NavigationReset, ResetSignal};
pub use session::{Session, SessionManager, SessionState, TeardownReason};
