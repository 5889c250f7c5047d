//! Lector CLI Library
//!
//! Console front end for the Lector playback core: configuration, document
//! import, and a simulated speech engine that reads text to stdout.
//!
//! This library exposes the components for testing purposes.

pub mod config;
pub mod engine;
pub mod error;
pub mod library;

pub use config::CliConfig;
pub use engine::ConsoleEngine;
pub use error::{CliError, Result};
pub use library::{ImportedDocument, Library};
