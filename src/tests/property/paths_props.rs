//! Property-based tests for path and name validation
//!
//! Tests invariants:
//! - A sibling sharing a prefix is never contained
//! - Every real descendant is contained
//! - Names with separators or traversal are rejected
//! - Valid names are normalized to lowercase

use std::path::PathBuf;

use proptest::prelude::*;

use crate::core::error::VocabError;
use crate::core::paths::{is_contained, validate_pair_name};

fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,12}"
}

fn arb_valid_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

/// Names carrying a separator or a traversal sequence somewhere.
fn arb_unsafe_name() -> impl Strategy<Value = String> {
    ("[a-z]{0,6}", prop_oneof![Just("/"), Just("\\"), Just("..")], "[a-z]{0,6}")
        .prop_map(|(head, bad, tail)| format!("{head}{bad}{tail}"))
}

proptest! {
    /// Property: `/base` never contains `/base<suffix>`
    #[test]
    fn prop_sibling_prefix_not_contained(base in arb_segment(), suffix in arb_segment()) {
        let base_path = PathBuf::from("/home").join(&base);
        let sibling = PathBuf::from("/home").join(format!("{base}{suffix}"));
        prop_assert!(!is_contained(&sibling, &base_path));
    }

    /// Property: every path below the base is contained
    #[test]
    fn prop_descendant_contained(
        base in arb_segment(),
        children in prop::collection::vec(arb_segment(), 1..4)
    ) {
        let base_path = PathBuf::from("/home").join(&base);
        let mut child = base_path.clone();
        for segment in &children {
            child.push(segment);
        }
        prop_assert!(is_contained(&child, &base_path));
    }

    /// Property: unsafe names are always rejected
    #[test]
    fn prop_unsafe_names_rejected(name in arb_unsafe_name()) {
        let result = validate_pair_name(&name);
        prop_assert!(
            matches!(result, Err(VocabError::InvalidName { .. })),
            "name {:?} should be rejected",
            name
        );
    }

    /// Property: valid names are accepted and lowercased
    #[test]
    fn prop_valid_names_lowercased(name in arb_valid_name()) {
        let normalized = validate_pair_name(&name).unwrap();
        prop_assert_eq!(normalized, name.to_ascii_lowercase());
    }
}
