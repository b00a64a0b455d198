//! Data model shared by the satellite agent crates.
//!
//! Everything here is plain data: registry artifacts and state documents, the
//! credentials handed out by the control plane, event payload shapes, and the
//! on-disk configuration file.

mod domain;
pub use domain::*;

mod config;
pub use config::*;

mod error;
pub use error::ModelError;
