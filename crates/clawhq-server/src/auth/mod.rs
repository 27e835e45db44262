//! Agent authentication for the `ClawHQ` hub.
//!
//! Provides the bearer token codec, argon2 secret hashing, the token store,
//! and the registration passphrase check.

pub mod passphrase;
pub mod secret;
pub mod store;
pub mod token;

pub use passphrase::passphrase_matches;
pub use store::{TokenStore, TokenStoreError};
pub use token::{IssuedToken, ParsedToken, TOKEN_PREFIX};
