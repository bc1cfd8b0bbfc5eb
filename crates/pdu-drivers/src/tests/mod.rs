//! Shared fixtures for driver tests.

pub(crate) mod support;
