//! Public share links.
//!
//! A share grants an anonymous recipient scoped, time-limited access to
//! one document. The bearer secret is shown once; only its SHA-256
//! digest is stored. Persistence and counters live in `tessera-db`.

pub mod error;
pub mod policy;
pub mod token;
pub mod types;

pub use error::ShareError;
pub use policy::{AccessCheck, SharePolicy};
pub use token::{SECRET_LEN, ShareSecret, hash_secret, looks_like_secret, share_url};
pub use types::{Permission, PermissionSet, ShareDecision, ShareTtl, TokenRef};
