//! Access control module
//!
//! Decides whether a principal may read or write a content object, term,
//! role or user, based on the groups that own the object.
//!
//! ## Decision Model
//!
//! An object is owned by a group when it is assigned to it directly, or
//! inherits the assignment through the hierarchy (ancestor items, ancestor
//! terms, attached terms). Each group carries an access mode per operation:
//!
//! - `all` - the group places no restriction on the operation
//! - `group` / `none` - only members, or requests from an allowed IP range,
//!   pass the group
//!
//! Owners, managers and objects no group owns always pass. Otherwise access
//! is granted when any restricting owning group lets the principal through,
//! or when no owning group restricts the operation at all.
//!
//! ## Example
//!
//! ```
//! use access_groups::access_control::{AccessEngine, ObjectKind};
//! use access_groups::config::AppConfig;
//! use access_groups::group::Group;
//! use access_groups::store::{MemoryGroupStore, MemoryRepository, StaticPrincipal};
//! use std::sync::Arc;
//!
//! let repo = MemoryRepository::new()
//!     .with_item("10", None, "page")
//!     .with_item("11", Some("10"), "page");
//! let group = Group::new(1, "staff")
//!     .with_object(ObjectKind::ContentItem, "page", "10")
//!     .with_object(ObjectKind::User, "user", "alice");
//!
//! let engine = AccessEngine::builder(&AppConfig::default())
//!     .repository(Arc::new(repo))
//!     .principal(Arc::new(StaticPrincipal::user("alice")))
//!     .group_store(Arc::new(MemoryGroupStore::with_groups([group])))
//!     .build()
//!     .unwrap();
//!
//! assert!(engine.check_access("page", "11").unwrap());
//! ```

pub mod engine;
pub mod explain;
pub mod types;

pub use engine::{AccessEngine, AccessEngineBuilder};
pub use explain::{AccessExplanation, DecisionReason, GroupOutcome, GroupVerdict};
pub use types::{AccessMode, AccessOperation, ObjectId, ObjectKind};
