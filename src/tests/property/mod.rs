//! Property-based tests for the vocabulary store
//!
//! Property tests verify invariants that should hold for all inputs, rather
//! than testing specific cases.
//!
//! ## Running Property Tests
//!
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `sanitizer_props`: CSV injection protection
//!   - Stored values never start a line with an unescaped formula trigger
//!   - Restoring a sanitized value gives back the original text
//!   - Plain alphanumeric values pass through untouched
//!
//! - `migrator_props`: legacy layout migration
//!   - Migrating twice equals migrating once
//!   - Migration keeps every record and its order
//!   - Canonical content renders back to itself
//!
//! - `paths_props`: path and name validation
//!   - Containment is hierarchical, never a string prefix
//!   - Names with separators or `..` are always rejected
//!   - Valid names come back lowercased
//!
//! ## Configuration
//!
//! By default, proptest runs 256 cases per property. This can be configured
//! via the `PROPTEST_CASES` environment variable.

mod migrator_props;
mod paths_props;
mod sanitizer_props;
