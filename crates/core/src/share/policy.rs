//! Share lifetime and access rules.

use chrono::{DateTime, Duration, Utc};

use tessera_shared::config::ShareConfig;

use crate::share::error::ShareError;
use crate::share::types::ShareTtl;

/// Outcome of checking a stored share against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCheck {
    /// Usable.
    Granted,
    /// Past its lifetime. `deactivate` is set when the row is still marked active.
    Expired {
        /// Whether the caller should flip `is_active` off.
        deactivate: bool,
    },
    /// Revoked by the owner.
    Revoked,
}

impl AccessCheck {
    /// Classifies a stored share.
    ///
    /// Inactive rows that were never revoked were either lazily expired or
    /// replaced by a renewal; both read as expired.
    #[must_use]
    pub fn evaluate(
        is_active: bool,
        revoked: bool,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if !is_active {
            return if revoked {
                Self::Revoked
            } else {
                Self::Expired { deactivate: false }
            };
        }
        match expires_at {
            Some(at) if at <= now => Self::Expired { deactivate: true },
            _ => Self::Granted,
        }
    }

    /// Converts a refusal into its error.
    pub const fn into_result(self) -> Result<(), ShareError> {
        match self {
            Self::Granted => Ok(()),
            Self::Expired { .. } => Err(ShareError::Expired),
            Self::Revoked => Err(ShareError::Revoked),
        }
    }
}

/// Lifetime rules for issuing and renewing shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharePolicy {
    /// Lifetime when none is requested.
    pub default_ttl_days: u32,
    /// Longest lifetime accepted.
    pub max_ttl_days: u32,
    /// Whether links without expiry may be issued.
    pub allow_no_expiry: bool,
}

impl Default for SharePolicy {
    fn default() -> Self {
        Self::from_config(&ShareConfig::default())
    }
}

impl SharePolicy {
    /// Builds the policy from configuration.
    #[must_use]
    pub const fn from_config(config: &ShareConfig) -> Self {
        Self {
            default_ttl_days: config.default_ttl_days,
            max_ttl_days: config.max_ttl_days,
            allow_no_expiry: config.allow_no_expiry,
        }
    }

    /// Computes the expiry for a requested lifetime.
    pub fn expires_at(
        &self,
        now: DateTime<Utc>,
        ttl: ShareTtl,
    ) -> Result<Option<DateTime<Utc>>, ShareError> {
        let days = match ttl {
            ShareTtl::NoExpiry if self.allow_no_expiry => return Ok(None),
            ShareTtl::NoExpiry => return Err(ShareError::NoExpiryNotAllowed),
            ShareTtl::Default => self.default_ttl_days.min(self.max_ttl_days),
            ShareTtl::Days(days) => days,
        };

        if days == 0 || days > self.max_ttl_days {
            return Err(ShareError::InvalidTtl {
                requested: days,
                max: self.max_ttl_days,
            });
        }

        Ok(Some(now + Duration::days(i64::from(days))))
    }

    /// Normalizes and sanity-checks a recipient e-mail.
    pub fn normalize_recipient(email: Option<&str>) -> Result<Option<String>, ShareError> {
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            return Ok(None);
        };

        let plausible = email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }) && !email.chars().any(char::is_whitespace);

        if plausible {
            Ok(Some(email.to_ascii_lowercase()))
        } else {
            Err(ShareError::InvalidRecipient(email.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> SharePolicy {
        SharePolicy {
            default_ttl_days: 30,
            max_ttl_days: 365,
            allow_no_expiry: false,
        }
    }

    #[test]
    fn test_default_ttl() {
        let now = Utc::now();
        let at = policy().expires_at(now, ShareTtl::Default).unwrap();
        assert_eq!(at, Some(now + Duration::days(30)));
    }

    #[rstest]
    #[case(1, true)]
    #[case(365, true)]
    #[case(0, false)]
    #[case(366, false)]
    fn test_ttl_bounds(#[case] days: u32, #[case] ok: bool) {
        assert_eq!(
            policy().expires_at(Utc::now(), ShareTtl::Days(days)).is_ok(),
            ok
        );
    }

    #[test]
    fn test_no_expiry_requires_opt_in() {
        let now = Utc::now();
        assert_eq!(
            policy().expires_at(now, ShareTtl::NoExpiry),
            Err(ShareError::NoExpiryNotAllowed)
        );
        let open = SharePolicy {
            allow_no_expiry: true,
            ..policy()
        };
        assert_eq!(open.expires_at(now, ShareTtl::NoExpiry), Ok(None));
    }

    #[test]
    fn test_evaluate_active_and_fresh() {
        let now = Utc::now();
        assert_eq!(
            AccessCheck::evaluate(true, false, Some(now + Duration::hours(1)), now),
            AccessCheck::Granted
        );
        assert_eq!(
            AccessCheck::evaluate(true, false, None, now),
            AccessCheck::Granted
        );
    }

    #[test]
    fn test_evaluate_expired_needs_deactivation() {
        let now = Utc::now();
        let check = AccessCheck::evaluate(true, false, Some(now - Duration::seconds(1)), now);
        assert_eq!(check, AccessCheck::Expired { deactivate: true });
        assert_eq!(check.into_result(), Err(ShareError::Expired));
    }

    #[test]
    fn test_evaluate_inactive() {
        let now = Utc::now();
        assert_eq!(
            AccessCheck::evaluate(false, true, None, now),
            AccessCheck::Revoked
        );
        assert_eq!(
            AccessCheck::evaluate(false, false, Some(now + Duration::days(1)), now),
            AccessCheck::Expired { deactivate: false }
        );
    }

    #[rstest]
    #[case(Some(" Ana@Example.com "), Ok(Some("ana@example.com".to_string())))]
    #[case(None, Ok(None))]
    #[case(Some("  "), Ok(None))]
    #[case(Some("not-an-email"), Err(ShareError::InvalidRecipient("not-an-email".into())))]
    #[case(Some("a@b"), Err(ShareError::InvalidRecipient("a@b".into())))]
    fn test_normalize_recipient(
        #[case] input: Option<&str>,
        #[case] expected: Result<Option<String>, ShareError>,
    ) {
        assert_eq!(SharePolicy::normalize_recipient(input), expected);
    }
}
