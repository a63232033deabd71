//! Shared types for the CrateDB test-cluster supervisor
//!
//! Contains the pieces both the supervisor and its collaborators agree on:
//! the cluster handle handed to database adapters, port ranges, and the
//! component-aware logging setup.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
