//! Access Groups
//!
//! Group-based access control for hierarchical content.
//!
//! ## Features
//!
//! - **Groups** with per-operation access modes and IP allowlists
//! - **Membership resolution** for content items, terms, roles and users,
//!   following parent hierarchies and item/term associations
//! - **Access decisions** with owner and manager bypasses, plus an audit
//!   trail via [`AccessEngine::explain_access`]
//! - **Exclusion sets** for filtering listings
//! - **Flexible configuration** via TOML files and environment variables
//!
//! ## Example Configuration
//!
//! ```toml
//! [policy]
//! owner_auto_access = true
//! manager_capability = "manage_user_groups"
//!
//! [resolvers.content_item]
//! category = "content_item"
//! label = "Content"
//! subtypes = ["post", "page", "product"]
//!
//! [cache]
//! share_decisions = false
//! ```

pub mod access_control;
pub mod config;
pub mod error;
pub mod group;
pub mod hierarchy;
pub mod logging;
pub mod membership;
pub mod store;

// Re-export main types
pub use access_control::{AccessEngine, AccessEngineBuilder, AccessOperation, ObjectKind};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use group::{Group, GroupId};
pub use logging::init_logging;
