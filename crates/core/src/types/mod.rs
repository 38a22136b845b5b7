//! Core types for Vendora.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod principal;
pub mod status;

pub use id::*;
pub use money::to_minor_units;
pub use principal::{Principal, Role};
pub use status::*;
