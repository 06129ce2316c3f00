//! Configuration types for access-groups
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Decision policies
    pub policy: PolicyConfig,

    /// Resolver descriptors, one per object kind
    pub resolvers: ResolversConfig,

    /// Extra object types mapped onto the built-in resolvers
    pub object_types: Vec<ObjectTypeConfig>,

    /// Closure and decision caching
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Access decision policies
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Grant owners access to their own objects regardless of groups
    pub owner_auto_access: bool,

    /// Principals without the manager capability only see the groups they
    /// belong to when listing an object's groups
    pub restrict_groups_to_member: bool,

    /// Capability that bypasses every group restriction
    pub manager_capability: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            owner_auto_access: true,
            restrict_groups_to_member: false,
            manager_capability: "manage_user_groups".to_string(),
        }
    }
}

/// Descriptor of one resolver
///
/// A section that is present but omits `category` is a configuration error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// General category name, e.g. `content_item`
    pub category: String,

    /// Label used in display names
    pub label: String,

    /// Concrete object types handled by the resolver
    pub subtypes: Vec<String>,
}

impl ResolverConfig {
    pub fn new(category: &str, label: &str, subtypes: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            label: label.to_string(),
            subtypes: subtypes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Resolver descriptors for the four object kinds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolversConfig {
    pub content_item: ResolverConfig,
    pub term: ResolverConfig,
    pub role: ResolverConfig,
    pub user: ResolverConfig,
}

impl Default for ResolversConfig {
    fn default() -> Self {
        Self {
            content_item: ResolverConfig::new(
                "content_item",
                "Content",
                &["post", "page", "attachment"],
            ),
            term: ResolverConfig::new("term", "Terms", &["category", "post_tag"]),
            role: ResolverConfig::new("role", "Roles", &["role"]),
            user: ResolverConfig::new("user", "Users", &["user"]),
        }
    }
}

/// Registration of an extra object type
///
/// ```toml
/// [[object_types]]
/// name = "product"
/// kind = "content_item"
/// subtype = "product"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObjectTypeConfig {
    /// Name collaborators use when asking about this type
    pub name: String,

    /// Object kind whose resolver handles it
    pub kind: String,

    /// Subtype filter applied to full-member listings
    #[serde(default)]
    pub subtype: Option<String>,
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the shared cache collaborator when one is supplied
    pub enabled: bool,

    /// Key prefix in the shared cache
    pub prefix: String,

    /// Also store per-principal decisions in the shared cache
    pub share_decisions: bool,

    /// Page size for user enumeration
    pub user_page_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "access_groups".to_string(),
            share_decisions: false,
            user_page_size: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.policy.owner_auto_access);
        assert!(!config.policy.restrict_groups_to_member);
        assert_eq!(config.policy.manager_capability, "manage_user_groups");
        assert_eq!(config.resolvers.content_item.category, "content_item");
        assert_eq!(config.resolvers.term.subtypes, vec!["category", "post_tag"]);
        assert_eq!(config.cache.user_page_size, 500);
        assert!(config.object_types.is_empty());
    }

    #[test]
    fn test_deserialize_log_format() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_resolver_section_has_no_category() {
        let resolver: ResolverConfig = serde_json::from_str(r#"{"subtypes": ["x"]}"#).unwrap();
        assert!(resolver.category.is_empty());
        assert_eq!(resolver.subtypes, vec!["x"]);
    }
}
