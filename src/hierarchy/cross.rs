//! Item/term cross-reference map

use crate::access_control::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Many-to-many association between content items and terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossMap {
    pub items_to_terms: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
    pub terms_to_items: BTreeMap<ObjectId, BTreeSet<ObjectId>>,
}

impl CrossMap {
    /// Build from `(item, term)` link rows
    pub fn from_links<I>(links: I) -> Self
    where
        I: IntoIterator<Item = (ObjectId, ObjectId)>,
    {
        let mut map = Self::default();
        for (item, term) in links {
            map.link(item, term);
        }
        map
    }

    pub fn link(&mut self, item: ObjectId, term: ObjectId) {
        self.items_to_terms
            .entry(item.clone())
            .or_default()
            .insert(term.clone());
        self.terms_to_items.entry(term).or_default().insert(item);
    }

    /// Terms attached to a content item
    pub fn terms_of(&self, item: &str) -> impl Iterator<Item = &ObjectId> {
        self.items_to_terms.get(item).into_iter().flatten()
    }

    /// Content items tagged with a term
    pub fn items_of(&self, term: &str) -> impl Iterator<Item = &ObjectId> {
        self.terms_to_items.get(term).into_iter().flatten()
    }
}
