//! Document code value types.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::code::error::CodeError;
use crate::tenant::Tenant;

/// A validated code prefix such as `ORC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodePrefix(String);

impl CodePrefix {
    /// Shortest accepted prefix.
    pub const MIN_LEN: usize = 2;
    /// Longest accepted prefix.
    pub const MAX_LEN: usize = 10;

    /// Validates a prefix exactly as given.
    pub fn new(value: &str) -> Result<Self, CodeError> {
        let valid = (Self::MIN_LEN..=Self::MAX_LEN).contains(&value.len())
            && value.starts_with(|c: char| c.is_ascii_uppercase())
            && value
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(CodeError::InvalidPrefix(value.to_string()))
        }
    }

    /// Trims and uppercases user input before validating it.
    pub fn normalize(value: &str) -> Result<Self, CodeError> {
        Self::new(&value.trim().to_ascii_uppercase())
    }

    /// Returns the prefix text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CodePrefix {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CodePrefix> for String {
    fn from(value: CodePrefix) -> Self {
        value.0
    }
}

impl fmt::Display for CodePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Year and month a sequential code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CodePeriod {
    year: u32,
    month: u32,
}

impl CodePeriod {
    /// Creates a period, checking year 2000..=9999 and month 1..=12.
    pub fn new(year: u32, month: u32) -> Result<Self, CodeError> {
        if (2000..=9999).contains(&year) && (1..=12).contains(&month) {
            Ok(Self { year, month })
        } else {
            Err(CodeError::InvalidPeriod { year, month })
        }
    }

    /// Period containing the given instant.
    pub fn from_datetime(at: DateTime<Utc>) -> Result<Self, CodeError> {
        let year = u32::try_from(at.year()).map_err(|_| CodeError::InvalidPeriod {
            year: 0,
            month: at.month(),
        })?;
        Self::new(year, at.month())
    }

    /// The current UTC month.
    pub fn current() -> Result<Self, CodeError> {
        Self::from_datetime(Utc::now())
    }

    /// Year.
    #[must_use]
    pub const fn year(&self) -> u32 {
        self.year
    }

    /// Month (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Stored form, `YYYY-MM`.
    #[must_use]
    pub fn as_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for CodePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The `(tenant, prefix, period)` triple that serializes code allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    /// Owning tenant.
    pub tenant: Tenant,
    /// Code prefix.
    pub prefix: CodePrefix,
    /// Code period.
    pub period: CodePeriod,
}

impl ScopeKey {
    /// Creates a scope key.
    #[must_use]
    pub const fn new(tenant: Tenant, prefix: CodePrefix, period: CodePeriod) -> Self {
        Self {
            tenant,
            prefix,
            period,
        }
    }

    /// Stable name of the scope, `<tenant>:<PREFIX>:<YYYY>-<MM>`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}:{}:{}", self.tenant, self.prefix, self.period)
    }

    /// POSIX regex matching exactly the sequential codes of this scope.
    ///
    /// Custom codes sharing the prefix never match.
    #[must_use]
    pub fn sequence_regex(&self) -> String {
        format!("^{}-{}-[0-9]{{6}}$", self.prefix, self.period)
    }
}

/// A parsed document code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentCode {
    /// `<PREFIX>-<YYYY>-<MM>-<NNNNNN>`.
    Sequential {
        /// Prefix.
        prefix: CodePrefix,
        /// Period.
        period: CodePeriod,
        /// Sequence number, 1-based.
        sequence: u32,
    },
    /// `<PREFIX>-<suffix>`.
    Custom {
        /// Prefix.
        prefix: CodePrefix,
        /// Free-form suffix.
        suffix: String,
    },
}

impl DocumentCode {
    /// Returns the prefix of either variant.
    #[must_use]
    pub const fn prefix(&self) -> &CodePrefix {
        match self {
            Self::Sequential { prefix, .. } | Self::Custom { prefix, .. } => prefix,
        }
    }

    /// Returns true for sequential codes.
    #[must_use]
    pub const fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential { .. })
    }
}

impl fmt::Display for DocumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential {
                prefix,
                period,
                sequence,
            } => write!(f, "{prefix}-{period}-{sequence:06}"),
            Self::Custom { prefix, suffix } => write!(f, "{prefix}-{suffix}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case("ORC", true)]
    #[case("FAT2", true)]
    #[case("ABCDEFGHIJ", true)]
    #[case("A", false)]
    #[case("ABCDEFGHIJK", false)]
    #[case("2AB", false)]
    #[case("orc", false)]
    #[case("OR-C", false)]
    fn test_prefix_rules(#[case] value: &str, #[case] ok: bool) {
        assert_eq!(CodePrefix::new(value).is_ok(), ok);
    }

    #[test]
    fn test_prefix_normalize() {
        assert_eq!(CodePrefix::normalize(" orc ").unwrap().as_str(), "ORC");
    }

    #[rstest]
    #[case(2025, 11, true)]
    #[case(2000, 1, true)]
    #[case(1999, 5, false)]
    #[case(2025, 0, false)]
    #[case(2025, 13, false)]
    fn test_period_rules(#[case] year: u32, #[case] month: u32, #[case] ok: bool) {
        assert_eq!(CodePeriod::new(year, month).is_ok(), ok);
    }

    #[test]
    fn test_period_from_datetime() {
        let at = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
        let period = CodePeriod::from_datetime(at).unwrap();
        assert_eq!(period.as_key(), "2025-03");
    }

    #[test]
    fn test_scope_key_name() {
        let tenant = Tenant::new(Uuid::from_u128(7)).unwrap();
        let key = ScopeKey::new(
            tenant,
            CodePrefix::new("ORC").unwrap(),
            CodePeriod::new(2025, 11).unwrap(),
        );
        assert_eq!(
            key.name(),
            "00000000-0000-0000-0000-000000000007:ORC:2025-11"
        );
        assert_eq!(key.sequence_regex(), "^ORC-2025-11-[0-9]{6}$");
    }

    #[test]
    fn test_code_display() {
        let code = DocumentCode::Sequential {
            prefix: CodePrefix::new("ORC").unwrap(),
            period: CodePeriod::new(2025, 11).unwrap(),
            sequence: 123,
        };
        assert_eq!(code.to_string(), "ORC-2025-11-000123");
        assert!(code.is_sequential());
    }
}
