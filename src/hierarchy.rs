//! Validated location forest.
//!
//! The parent pointers coming out of text analysis can reference
//! unknown names, point at themselves or form cycles. They are checked
//! once here, and everything downstream walks a plain acyclic arena.

use std::collections::HashMap;

use tracing::warn;

use crate::types::Location;

/// Arena of locations with at most one parent each and no cycles.
#[derive(Debug)]
pub struct LocationForest<'a> {
    nodes: Vec<&'a Location>,
    index: HashMap<&'a str, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl<'a> LocationForest<'a> {
    /// Index `locations` by name and attach parent links in input order.
    ///
    /// Duplicate names keep their first record. Links to unknown names
    /// and self links are ignored. A link that would close a cycle is
    /// dropped, leaving that location as a root.
    pub fn build(locations: &'a [Location]) -> Self {
        let mut nodes = Vec::with_capacity(locations.len());
        let mut index: HashMap<&'a str, usize> = HashMap::with_capacity(locations.len());
        for loc in locations {
            if index.contains_key(loc.name.as_str()) {
                warn!(name = %loc.name, "duplicate location name ignored");
                continue;
            }
            index.insert(loc.name.as_str(), nodes.len());
            nodes.push(loc);
        }

        let mut forest = LocationForest {
            parent: vec![None; nodes.len()],
            children: vec![Vec::new(); nodes.len()],
            nodes,
            index,
        };

        for child in 0..forest.nodes.len() {
            let node: &'a Location = forest.nodes[child];
            let Some(parent_name) = node.parent.as_deref() else {
                continue;
            };
            let Some(&parent) = forest.index.get(parent_name) else {
                continue;
            };
            if parent == child {
                warn!(name = %node.name, "location lists itself as parent");
                continue;
            }
            if forest.is_ancestor_or_self(child, parent) {
                warn!(
                    child = %node.name,
                    parent = %parent_name,
                    "parent link would close a cycle; dropped"
                );
                continue;
            }
            forest.parent[child] = Some(parent);
            forest.children[parent].push(child);
        }

        forest
    }

    fn is_ancestor_or_self(&self, candidate: usize, node: usize) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == candidate {
                return true;
            }
            cur = self.parent[id];
        }
        false
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn id(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn location(&self, id: usize) -> &'a Location {
        self.nodes[id]
    }

    pub fn name(&self, id: usize) -> &'a str {
        self.nodes[id].name.as_str()
    }

    pub fn parent(&self, id: usize) -> Option<usize> {
        self.parent[id]
    }

    pub fn children(&self, id: usize) -> &[usize] {
        &self.children[id]
    }

    pub fn ids(&self) -> std::ops::Range<usize> {
        0..self.nodes.len()
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: usize) -> Ancestors<'_, 'a> {
        Ancestors {
            forest: self,
            cur: self.parent[id],
        }
    }

    /// Number of ancestors.
    pub fn depth(&self, id: usize) -> usize {
        self.ancestors(id).count()
    }

    /// All descendants in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children[id].iter().rev().copied().collect();
        while let Some(cur) = stack.pop() {
            out.push(cur);
            stack.extend(self.children[cur].iter().rev());
        }
        out
    }
}

#[derive(Debug)]
pub struct Ancestors<'f, 'a> {
    forest: &'f LocationForest<'a>,
    cur: Option<usize>,
}

impl Iterator for Ancestors<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let id = self.cur?;
        self.cur = self.forest.parent[id];
        Some(id)
    }
}
