#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # carequest-api
//!
//! The remote assignment store as seen by the reconciliation engine.
//!
//! The store only offers per-row create/update/delete plus a listing per
//! target; writes return no body. This crate provides:
//!
//! - [`AssignmentApi`]: the collaborator trait the engine is written against
//! - [`HttpAssignmentApi`]: the REST implementation over `reqwest`
//! - [`InMemoryAssignmentApi`]: an in-process store with failure injection
//!
//! ## Example
//!
//! ```ignore
//! use carequest_api::{ApiConfig, AssignmentApi, HttpAssignmentApi};
//! use carequest_core::{Target, UserId};
//!
//! let api = HttpAssignmentApi::with_config(
//!     ApiConfig::default().merge_vars(|key| std::env::var(key).ok()),
//! )?;
//! let rows = api.list(Target::User(UserId::new(4))).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod wire;

pub use client::{AssignmentApi, HttpAssignmentApi};
pub use config::ApiConfig;
pub use error::{Error, Result};
pub use memory::{ApiCall, ApiCallKind, FailureMode, InMemoryAssignmentApi};
pub use wire::{AssignmentPayload, AssignmentRecord, CategoryFanoutPayload};
