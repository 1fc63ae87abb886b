//! Formatting, parsing, and validation of document codes.

use rand::Rng;

use crate::code::error::CodeError;
use crate::code::types::{CodePeriod, CodePrefix, DocumentCode};

/// Largest sequence number a six digit code can carry.
pub const MAX_SEQUENCE: i64 = 999_999;

/// Length of generated custom suffixes.
pub const CUSTOM_SUFFIX_LEN: usize = 8;

/// Longest suffix accepted when parsing a custom code.
const MAX_CUSTOM_SUFFIX_LEN: usize = 32;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Formats a sequential code, e.g. `ORC-2025-11-000001`.
pub fn format_sequential(
    prefix: &CodePrefix,
    period: CodePeriod,
    sequence: i64,
) -> Result<String, CodeError> {
    if sequence > MAX_SEQUENCE {
        return Err(CodeError::SequenceOverflow {
            value: sequence,
            max: MAX_SEQUENCE,
        });
    }
    let sequence = u32::try_from(sequence)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| CodeError::Malformed(format!("{prefix}-{period}-{sequence}")))?;

    Ok(DocumentCode::Sequential {
        prefix: prefix.clone(),
        period,
        sequence,
    }
    .to_string())
}

/// Draws a random uppercase alphanumeric suffix.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

impl DocumentCode {
    /// Parses a sequential or custom code.
    ///
    /// A remainder shaped like `YYYY-MM-NNNNNN` is always read as
    /// sequential, so `ORC-2025-13-000001` is an invalid period rather
    /// than a custom code.
    pub fn parse(value: &str) -> Result<Self, CodeError> {
        let malformed = || CodeError::Malformed(value.to_string());

        let (prefix, rest) = value.split_once('-').ok_or_else(malformed)?;
        let prefix = CodePrefix::new(prefix)?;

        if let Some((year, month, sequence)) = sequential_parts(rest) {
            let period = CodePeriod::new(year, month)?;
            if sequence == 0 {
                return Err(malformed());
            }
            return Ok(Self::Sequential {
                prefix,
                period,
                sequence,
            });
        }

        let suffix_ok = !rest.is_empty()
            && rest.len() <= MAX_CUSTOM_SUFFIX_LEN
            && !rest.starts_with('-')
            && !rest.ends_with('-')
            && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !suffix_ok {
            return Err(malformed());
        }

        Ok(Self::Custom {
            prefix,
            suffix: rest.to_string(),
        })
    }
}

/// Returns true if `value` is a well-formed code of either shape.
#[must_use]
pub fn validate_format(value: &str) -> bool {
    DocumentCode::parse(value).is_ok()
}

fn sequential_parts(rest: &str) -> Option<(u32, u32, u32)> {
    let mut parts = rest.split('-');
    let year = parts.next()?;
    let month = parts.next()?;
    let sequence = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if !(digits(year, 4) && digits(month, 2) && digits(sequence, 6)) {
        return None;
    }

    Some((year.parse().ok()?, month.parse().ok()?, sequence.parse().ok()?))
}
