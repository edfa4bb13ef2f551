//! Property-based tests

#[cfg(feature = "ssr")]
mod version_proptest;
