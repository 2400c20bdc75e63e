//! ui
//!
//! Terminal output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting, verbosity and the console notifier
//!
//! The library never prints. Everything user-facing flows through
//! notifications and is rendered here by the binary.

pub mod output;
