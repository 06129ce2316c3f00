//! Closure builder
//!
//! Turns flat `(id, parent, subtype)` rows into the ancestor/descendant
//! closure of the parent relation.

use crate::access_control::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

/// A single parent-pointer row as delivered by the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRow {
    pub id: ObjectId,
    /// `None` marks a root
    pub parent: Option<ObjectId>,
    pub subtype: String,
}

impl HierarchyRow {
    pub fn new(id: impl Into<ObjectId>, parent: Option<&str>, subtype: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: parent.map(str::to_string),
            subtype: subtype.into(),
        }
    }
}

/// Transitive closure of one hierarchical category
///
/// `children_of` and `ancestors_of` are mutual inverses. Roots have no
/// `ancestors_of` entry and leaves no `children_of` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyMap {
    /// id -> (descendant id -> descendant subtype)
    pub children_of: BTreeMap<ObjectId, BTreeMap<ObjectId, String>>,
    /// id -> (ancestor id -> ancestor subtype)
    pub ancestors_of: BTreeMap<ObjectId, BTreeMap<ObjectId, String>>,
    /// Subtype of every recorded row
    pub subtypes: BTreeMap<ObjectId, String>,
}

impl HierarchyMap {
    /// Ancestors of `id`, nearest first is not guaranteed
    pub fn ancestors(&self, id: &str) -> impl Iterator<Item = (&ObjectId, &String)> {
        self.ancestors_of.get(id).into_iter().flatten()
    }

    /// All transitive descendants of `id`
    pub fn descendants(&self, id: &str) -> impl Iterator<Item = (&ObjectId, &String)> {
        self.children_of.get(id).into_iter().flatten()
    }

    pub fn subtype_of(&self, id: &str) -> Option<&str> {
        self.subtypes.get(id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.subtypes.is_empty() && self.ancestors_of.is_empty()
    }
}

/// Builds a [`HierarchyMap`] from parent-pointer rows
pub struct HierarchyMapBuilder {
    parents: HashMap<ObjectId, ObjectId>,
    subtypes: BTreeMap<ObjectId, String>,
}

impl HierarchyMapBuilder {
    /// Index the rows by id; a later row for the same id replaces an earlier one
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = HierarchyRow>,
    {
        let mut parents = HashMap::new();
        let mut subtypes = BTreeMap::new();

        for row in rows {
            match row.parent {
                Some(parent) if parent != row.id => {
                    parents.insert(row.id.clone(), parent);
                }
                _ => {
                    parents.remove(&row.id);
                }
            }
            subtypes.insert(row.id, row.subtype);
        }

        Self { parents, subtypes }
    }

    /// Compute the closure
    pub fn build(self) -> HierarchyMap {
        let mut memo: HashMap<ObjectId, Vec<ObjectId>> = HashMap::with_capacity(self.parents.len());

        // Sorted start order keeps cyclic partial results reproducible.
        let mut starts: Vec<&ObjectId> = self.parents.keys().collect();
        starts.sort();

        for start in starts {
            if !memo.contains_key(start) {
                self.resolve_chain(start, &mut memo);
            }
        }

        let mut ancestors_of: BTreeMap<ObjectId, BTreeMap<ObjectId, String>> = BTreeMap::new();
        let mut children_of: BTreeMap<ObjectId, BTreeMap<ObjectId, String>> = BTreeMap::new();

        for (id, ancestors) in memo {
            if ancestors.is_empty() {
                continue;
            }
            let own_subtype = self.subtypes.get(&id).cloned().unwrap_or_default();
            let entry = ancestors_of.entry(id.clone()).or_default();
            for ancestor in ancestors {
                let ancestor_subtype = self
                    .subtypes
                    .get(&ancestor)
                    .cloned()
                    .unwrap_or_else(|| own_subtype.clone());
                children_of
                    .entry(ancestor.clone())
                    .or_default()
                    .insert(id.clone(), own_subtype.clone());
                entry.insert(ancestor, ancestor_subtype);
            }
        }

        debug!(
            nodes = self.subtypes.len(),
            with_ancestors = ancestors_of.len(),
            "Built hierarchy closure"
        );

        HierarchyMap {
            children_of,
            ancestors_of,
            subtypes: self.subtypes,
        }
    }

    /// Walk parent pointers from `start` and memoize every node on the walk
    fn resolve_chain(&self, start: &ObjectId, memo: &mut HashMap<ObjectId, Vec<ObjectId>>) {
        let mut path: Vec<&ObjectId> = vec![start];
        let mut on_path: HashSet<&ObjectId> = HashSet::from([start]);

        // Ancestors of the last node on `path`, once known.
        let mut tail: Vec<ObjectId> = loop {
            let current = path[path.len() - 1];
            let Some(parent) = self.parents.get(current) else {
                break Vec::new();
            };

            if let Some(known) = memo.get(parent) {
                let mut ancestors = Vec::with_capacity(known.len() + 1);
                ancestors.push(parent.clone());
                ancestors.extend(known.iter().cloned());
                break ancestors;
            }

            if on_path.contains(parent) {
                trace!(node = %current, parent = %parent, "Cycle in parent relation, branch stops");
                break vec![parent.clone()];
            }

            on_path.insert(parent);
            path.push(parent);
        };

        // Fill the memo from the far end of the walk back to `start`.
        for index in (0..path.len()).rev() {
            let node = path[index];
            if index + 1 < path.len() {
                let parent = path[index + 1];
                let mut ancestors = Vec::with_capacity(tail.len() + 1);
                ancestors.push(parent.clone());
                ancestors.extend(tail.iter().cloned());
                tail = ancestors;
            }
            let own: Vec<ObjectId> = tail.iter().filter(|a| *a != node).cloned().collect();
            memo.insert(node.clone(), own);
        }
    }
}
