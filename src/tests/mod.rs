//! In-crate test suites that span several modules.

mod property;
