#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # carequest
//!
//! Command line front end for the assignment reconciler.
//!
//! The engine lives in the workspace crates, re-exported here for convenience.

pub use carequest_api;
pub use carequest_core;
pub use carequest_reconciler;

pub mod cli;
pub mod commands;
pub mod settings;
