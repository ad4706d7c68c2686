//! Core types and services for the Classbook gradebook.
//!
//! This crate has no HTTP or database dependencies.
//! All other crates depend on it; storage backends plug in through
//! [`store::DocumentStore`].

pub mod aggregate;
pub mod backup;
pub mod demo;
pub mod document;
pub mod error;
pub mod gate;
pub mod gradebook;
pub mod report;
pub mod sanitize;
pub mod settings;
pub mod store;
pub mod student;

pub use error::{Error, Result};
