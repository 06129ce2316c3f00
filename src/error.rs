//! Error types for access-groups
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API.
//! Membership resolution itself never fails: unknown objects resolve to
//! "not a member" and cache failures degrade to recomputation, so only
//! configuration, repository and group-store failures surface here.

use thiserror::Error;

/// Top-level error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Group store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Resolver '{resolver}' was constructed without a category")]
    MissingCategory { resolver: String },

    #[error("Object type '{name}' is already registered")]
    DuplicateObjectType { name: String },

    #[error("Unknown object kind: {0}")]
    UnknownKind(String),
}

/// Errors raised by the content repository collaborator
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Repository query failed: {0}")]
    Query(String),
}

/// Errors raised by the group persistence collaborator
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Group not found: {id}")]
    NotFound { id: u64 },

    #[error("Group already exists: {id}")]
    AlreadyExists { id: u64 },

    #[error("Invalid group: {0}")]
    Invalid(String),

    #[error("Group store backend error: {0}")]
    Backend(String),
}

/// Errors raised by the shared cache collaborator
///
/// These never leave the engine; they are logged and the value is recomputed.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Result type alias for group store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
