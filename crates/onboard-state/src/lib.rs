//! Onboard-State: Repository Configuration Store
//!
//! This crate provides the persistence layer for per-repository
//! onboarding configuration. Each onboarded repository (keyed by its
//! `owner/repo` full name) has at most one configuration document.
//!
//! ## Key Components
//!
//! - `ConfigStore`: backend-agnostic keyed store trait
//! - `SurrealHandle`: manages the SurrealDB connection and schema
//! - `SurrealConfigStore`: `ConfigStore` over SurrealDB
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
mod handle;
mod schema;
pub mod storage_traits;
pub mod surreal_config_store;

pub use error::StorageError;
pub use handle::{CloudConfig, SurrealHandle};
pub use schema::ConfigDocument;
pub use storage_traits::{validate_repository_key, ConfigStore, StorageResult};
pub use surreal_config_store::SurrealConfigStore;
