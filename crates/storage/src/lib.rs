//! Storage abstraction and implementations for Vice.
//!
//! This crate provides a trait-based storage interface with a YAML file
//! implementation over the four tracker files.

#![warn(missing_docs)]

pub mod trait_;
pub mod yaml_storage;

pub use trait_::{Storage, StorageError, Result};
pub use yaml_storage::{StorageConfig, YamlStorage};
