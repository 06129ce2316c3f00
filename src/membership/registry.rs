//! Resolver registry
//!
//! Maps object-type names to the resolver that handles them. Every built-in
//! resolver registers its general category name (no subtype filter) and
//! each of its subtypes (filtered). Extra types are added through
//! [`ResolverRegistry::register`] and validated at registration time, so a
//! misconfigured type fails at startup rather than at first use.

use crate::access_control::ObjectKind;
use crate::config::{ObjectTypeConfig, ResolverConfig, ResolversConfig};
use crate::error::ConfigError;
use crate::membership::{
    ContentItemResolver, MembershipResolver, Resolver, ResolverDescriptor, RoleResolver,
    TermResolver, UserResolver,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Request to handle `name` with the resolver for `kind`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTypeRegistration {
    pub name: String,
    pub kind: ObjectKind,
    pub subtype: Option<String>,
}

impl ObjectTypeRegistration {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            subtype: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }
}

impl TryFrom<&ObjectTypeConfig> for ObjectTypeRegistration {
    type Error = ConfigError;

    fn try_from(config: &ObjectTypeConfig) -> Result<Self, Self::Error> {
        let kind = ObjectKind::try_parse(&config.kind)
            .ok_or_else(|| ConfigError::UnknownKind(config.kind.clone()))?;
        Ok(Self {
            name: config.name.clone(),
            kind,
            subtype: config.subtype.clone(),
        })
    }
}

/// What a registered object-type name resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredType {
    pub kind: ObjectKind,
    /// `None` for a general category name
    pub subtype: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolverRegistry {
    content_item: Resolver,
    term: Resolver,
    role: Resolver,
    user: Resolver,
    types: BTreeMap<String, RegisteredType>,
}

impl ResolverRegistry {
    /// Build the four resolvers and register their names
    pub fn new(
        content_item: ResolverDescriptor,
        term: ResolverDescriptor,
        role: ResolverDescriptor,
        user: ResolverDescriptor,
    ) -> Result<Self, ConfigError> {
        let terms = TermResolver::new(term)?;
        let mut registry = Self {
            content_item: Resolver::ContentItem(ContentItemResolver::new(
                content_item,
                terms.clone(),
            )?),
            term: Resolver::Term(terms),
            role: Resolver::Role(RoleResolver::new(role)?),
            user: Resolver::User(UserResolver::new(user)?),
            types: BTreeMap::new(),
        };

        for kind in ObjectKind::all() {
            let descriptor = registry.resolver(*kind).descriptor().clone();
            registry.insert_type(&descriptor.category, *kind, None)?;
            for subtype in &descriptor.subtypes {
                if *subtype != descriptor.category {
                    registry.insert_type(subtype, *kind, Some(subtype.clone()))?;
                }
            }
        }

        Ok(registry)
    }

    /// Build from configuration, including extra object types
    pub fn from_config(
        resolvers: &ResolversConfig,
        object_types: &[ObjectTypeConfig],
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new(
            descriptor(&resolvers.content_item),
            descriptor(&resolvers.term),
            descriptor(&resolvers.role),
            descriptor(&resolvers.user),
        )?;

        for object_type in object_types {
            registry.register(ObjectTypeRegistration::try_from(object_type)?)?;
        }

        Ok(registry)
    }

    /// Register an extra object type
    pub fn register(&mut self, registration: ObjectTypeRegistration) -> Result<(), ConfigError> {
        if let Some(subtype) = &registration.subtype
            && subtype.trim().is_empty()
        {
            return Err(ConfigError::Invalid {
                message: format!("object type '{}' has an empty subtype", registration.name),
            });
        }
        self.insert_type(&registration.name, registration.kind, registration.subtype)
    }

    fn insert_type(
        &mut self,
        name: &str,
        kind: ObjectKind,
        subtype: Option<String>,
    ) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("object type for {} has an empty name", kind),
            });
        }
        if self.types.contains_key(name) {
            return Err(ConfigError::DuplicateObjectType {
                name: name.to_string(),
            });
        }
        debug!(name, kind = %kind, subtype = ?subtype, "Registered object type");
        self.types
            .insert(name.to_string(), RegisteredType { kind, subtype });
        Ok(())
    }

    /// Resolve an object-type name; `None` means the type is unmanaged
    pub fn lookup(&self, name: &str) -> Option<&RegisteredType> {
        self.types.get(name)
    }

    pub fn resolver(&self, kind: ObjectKind) -> &Resolver {
        match kind {
            ObjectKind::ContentItem => &self.content_item,
            ObjectKind::Term => &self.term,
            ObjectKind::Role => &self.role,
            ObjectKind::User => &self.user,
        }
    }
}

fn descriptor(config: &ResolverConfig) -> ResolverDescriptor {
    ResolverDescriptor::new(
        config.category.clone(),
        config.label.clone(),
        config.subtypes.iter().cloned(),
    )
}
