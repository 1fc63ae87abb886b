//! Human-readable document codes.
//!
//! Sequential codes look like `ORC-2025-11-000123`: a prefix, the year
//! and month of the period, and a six digit sequence. Custom codes are a
//! prefix followed by a free-form suffix such as `ORC-7KQ2M9XA`.
//!
//! Allocation of sequence numbers happens in `tessera-db`; this module
//! only formats, parses, and validates, and holds the retry policy used
//! while allocating.

pub mod error;
pub mod format;
pub mod retry;
pub mod types;

#[cfg(test)]
mod format_props;

pub use error::CodeError;
pub use format::{CUSTOM_SUFFIX_LEN, MAX_SEQUENCE, format_sequential, random_suffix, validate_format};
pub use retry::RetryPolicy;
pub use types::{CodePeriod, CodePrefix, DocumentCode, ScopeKey};
