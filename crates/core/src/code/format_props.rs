//! Property-based tests for document code formatting.
//!
//! - Every in-range sequential code parses back to its parts
//! - Generated custom codes always validate

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::format::{CUSTOM_SUFFIX_LEN, MAX_SEQUENCE, format_sequential, random_suffix, validate_format};
use super::types::{CodePeriod, CodePrefix, DocumentCode};

fn prefix_strategy() -> impl Strategy<Value = CodePrefix> {
    "[A-Z][A-Z0-9]{1,9}".prop_map(|s| CodePrefix::new(&s).unwrap())
}

fn period_strategy() -> impl Strategy<Value = CodePeriod> {
    (2000u32..=9999, 1u32..=12).prop_map(|(y, m)| CodePeriod::new(y, m).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_sequential_codes_parse_back(
        prefix in prefix_strategy(),
        period in period_strategy(),
        sequence in 1i64..=MAX_SEQUENCE,
    ) {
        let code = format_sequential(&prefix, period, sequence).unwrap();
        prop_assert_eq!(code.len(), prefix.as_str().len() + 16);

        match DocumentCode::parse(&code).unwrap() {
            DocumentCode::Sequential { prefix: p, period: q, sequence: s } => {
                prop_assert_eq!(p, prefix);
                prop_assert_eq!(q, period);
                prop_assert_eq!(i64::from(s), sequence);
            }
            DocumentCode::Custom { .. } => prop_assert!(false, "parsed as custom"),
        }
    }

    #[test]
    fn prop_sequential_codes_sort_by_sequence(
        prefix in prefix_strategy(),
        period in period_strategy(),
        a in 1i64..=MAX_SEQUENCE,
        b in 1i64..=MAX_SEQUENCE,
    ) {
        let ca = format_sequential(&prefix, period, a).unwrap();
        let cb = format_sequential(&prefix, period, b).unwrap();
        prop_assert_eq!(a.cmp(&b), ca.cmp(&cb));
    }

    #[test]
    fn prop_custom_codes_validate(prefix in prefix_strategy(), seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let code = format!("{prefix}-{}", random_suffix(&mut rng, CUSTOM_SUFFIX_LEN));
        prop_assert!(validate_format(&code));
    }
}
