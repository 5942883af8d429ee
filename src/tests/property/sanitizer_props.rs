//! Property-based tests for the Value Sanitizer
//!
//! Tests invariants:
//! - Sanitized values are never dangerous
//! - Sanitizing then restoring is lossless for text without control characters
//! - Alphanumeric input is returned unchanged

use proptest::prelude::*;

use crate::core::sanitizer::{is_dangerous, restore_field, sanitize_field};

// ============================================================================
// Strategies for generating test inputs
// ============================================================================

/// Text rich in triggers, quotes and line breaks (LF and CRLF), without
/// stripped controls.
fn arb_field_text() -> impl Strategy<Value = String> {
    "([=+\\-@\t'a-z \n]|\r\n){0,40}"
}

/// Arbitrary text including control characters.
fn arb_any_text() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_field_text(),
        "\\PC{0,40}",
        "[\\x00-\\x1f=+@a-z]{0,20}",
    ]
}

fn arb_alphanumeric() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]{1,60}"
}

proptest! {
    /// Property: no stored line starts with a formula trigger
    #[test]
    fn prop_sanitized_is_never_dangerous(value in arb_any_text()) {
        let stored = sanitize_field(&value);
        prop_assert!(
            !is_dangerous(&stored),
            "sanitized value {:?} is still dangerous",
            stored
        );
    }

    /// Property: restoring a sanitized value displays the original text
    #[test]
    fn prop_restore_inverts_sanitize(value in arb_field_text()) {
        let stored = sanitize_field(&value);
        prop_assert_eq!(restore_field(&stored), value.as_str());
    }

    /// Property: safe input is never modified
    #[test]
    fn prop_alphanumeric_unchanged(value in arb_alphanumeric()) {
        prop_assert_eq!(sanitize_field(&value), value.as_str());
        prop_assert_eq!(restore_field(&value), value.as_str());
    }
}
