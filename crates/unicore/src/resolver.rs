// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Supertype Resolver
//!
//! Finds every indexed type descending from one of a set of candidate
//! supertypes. The ancestry walk is iterative (explicit stack and visited
//! set), so deep or cyclic hierarchies terminate without recursion.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::TypeCache;
use crate::index::{Snapshot, TypeIndex, TypeRecord};
use crate::loader::{TypeHandle, TypeLoader};
use crate::mapping::MappingTable;

/// Filtered subtype search over a [`TypeIndex`].
#[derive(Debug)]
pub struct SupertypeResolver {
    index: Arc<TypeIndex>,
    mappings: Arc<MappingTable>,
    cache: Arc<TypeCache>,
    loader: Arc<dyn TypeLoader>,
}

impl SupertypeResolver {
    pub fn new(
        index: Arc<TypeIndex>,
        mappings: Arc<MappingTable>,
        cache: Arc<TypeCache>,
        loader: Arc<dyn TypeLoader>,
    ) -> Self {
        Self {
            index,
            mappings,
            cache,
            loader,
        }
    }

    /// Indexed types under `prefixes` that are, or descend from, one of
    /// `candidates`.
    ///
    /// Every ancestor crossed on the way to a match is part of the result too.
    /// Each entry is counted once, against the first candidate it matches.
    pub fn find_subtypes_of(&self, candidates: &[TypeHandle], prefixes: &[&str]) -> Snapshot {
        let mut result = Snapshot::new();
        if !self.index.is_scanning_enabled() || candidates.is_empty() {
            return result;
        }

        let targets: Vec<String> = candidates
            .iter()
            .map(|c| self.mappings.to_canonical(c.name()))
            .collect();

        let filtered = self.index.get_filtered(prefixes);
        let all = self.index.get_map();
        let mut scratch = Snapshot::new();

        for entry in filtered.values() {
            for target in &targets {
                if ancestry_walk(entry, target, &all, &mut scratch) {
                    for (name, record) in scratch.drain() {
                        result.entry(name).or_insert(record);
                    }
                    break;
                }
                scratch.clear();
            }
        }

        tracing::debug!(
            "subtype search: {} candidate(s), {} entries scanned, {} match(es)",
            targets.len(),
            filtered.len(),
            result.len()
        );
        result
    }

    /// [`Self::find_subtypes_of`] with candidates given by name.
    ///
    /// Names are resolved through the type cache; unresolvable ones are
    /// skipped.
    pub fn find_subtypes_of_names(&self, names: &[&str], prefixes: &[&str]) -> Snapshot {
        let candidates: Vec<TypeHandle> = names
            .iter()
            .filter_map(|name| {
                let handle = self.cache.resolve(self.loader.as_ref(), false, false, &[name]);
                if handle.is_none() {
                    tracing::debug!(
                        "subtype search: candidate '{}' not resolvable, skipped",
                        name
                    );
                }
                handle
            })
            .collect();
        self.find_subtypes_of(&candidates, prefixes)
    }
}

/// Whether `record` is `candidate` (a canonical name) or one of its subtypes,
/// using `index` to follow superclass references.
pub fn is_subtype_of(record: &Arc<TypeRecord>, candidate: &str, index: &Snapshot) -> bool {
    let mut scratch = Snapshot::new();
    ancestry_walk(record, candidate, index, &mut scratch)
}

/// Walk from `entry` up its superclass chain looking for `target`.
///
/// Every visited node lands in `scratch`. Missing superclass references end
/// their branch.
fn ancestry_walk(
    entry: &Arc<TypeRecord>,
    target: &str,
    index: &Snapshot,
    scratch: &mut Snapshot,
) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: Vec<&Arc<TypeRecord>> = vec![entry];

    while let Some(node) = stack.pop() {
        if !visited.insert(node.canonical_name.as_str()) {
            continue;
        }
        scratch.insert(node.canonical_name.clone(), Arc::clone(node));

        if node.canonical_name == target {
            return true;
        }

        if let Some(parent) = node
            .superclass
            .as_deref()
            .and_then(|name| index.get(name))
        {
            if !visited.contains(parent.canonical_name.as_str()) {
                stack.push(parent);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(records: &[(&str, Option<&str>)]) -> Snapshot {
        records
            .iter()
            .map(|(name, parent)| (name.to_string(), Arc::new(TypeRecord::new(*name, *parent))))
            .collect()
    }

    #[test]
    fn test_walk_records_path() {
        let index = snapshot(&[("Base", None), ("Mid", Some("Base")), ("Leaf", Some("Mid"))]);
        let mut scratch = Snapshot::new();

        assert!(ancestry_walk(&index["Leaf"], "Base", &index, &mut scratch));
        let mut seen: Vec<&String> = scratch.keys().collect();
        seen.sort();
        assert_eq!(seen, vec!["Base", "Leaf", "Mid"]);
    }

    #[test]
    fn test_walk_terminates_on_cycle() {
        let index = snapshot(&[("A", Some("B")), ("B", Some("A"))]);
        let mut scratch = Snapshot::new();

        assert!(!ancestry_walk(&index["A"], "C", &index, &mut scratch));
        assert_eq!(scratch.len(), 2);
    }

    #[test]
    fn test_missing_parent_ends_branch() {
        let index = snapshot(&[("Leaf", Some("java.lang.Object"))]);
        assert!(!is_subtype_of(&index["Leaf"], "Base", &index));
        assert!(is_subtype_of(&index["Leaf"], "Leaf", &index));
    }
}
