//! forge
//!
//! Release hosting on remote forges.
//!
//! # Architecture
//!
//! The [`ReleaseHost`] trait covers the two release operations the branch
//! workflow needs: listing and creating. Callers obtain a host through
//! [`create_release_host`] rather than importing a specific implementation.
//!
//! Forge failures never compromise local correctness: the workflow keeps its
//! cached release list when a call fails.
//!
//! # Modules
//!
//! - `traits`: `ReleaseHost` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Host selection and creation

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{
    create_release_host, detect_provider, token_from_env, valid_forge_names, ForgeProvider,
    TOKEN_ENV_VARS,
};
pub use traits::*;
