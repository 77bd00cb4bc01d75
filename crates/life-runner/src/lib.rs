//! Runner support for the distributed Life engine.
//!
//! Provides the on-disk snapshot sink and the JSON run summary used by the
//! `life` binary.

pub mod output;
pub mod summary;
