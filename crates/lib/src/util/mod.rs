//! Shared utilities.
//!
//! Currently only test helpers live here.

#[cfg(test)]
pub mod testutil;
