//! Secret handling utilities.
//!
//! Re-exports secrecy types so callers building an upstream client don't
//! need a direct secrecy dependency.

pub use secrecy::{ExposeSecret, SecretString};
