// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type Cache
//!
//! Memoizes identifier -> [`TypeHandle`] resolution. A handle is cached under
//! the identifier the caller asked for, and under the mapped alias it was
//! actually loaded through when that differs.

use std::sync::Arc;

use dashmap::DashMap;

use crate::loader::{PrimitiveKind, TypeHandle, TypeLoader};
use crate::mapping::{MappingTable, MatchMode};

/// Concurrent identifier -> type handle cache.
#[derive(Debug)]
pub struct TypeCache {
    entries: DashMap<String, TypeHandle>,
    mappings: Arc<MappingTable>,
}

impl TypeCache {
    /// Cache expanding aliases through `mappings`.
    pub fn new(mappings: Arc<MappingTable>) -> Self {
        Self {
            entries: DashMap::new(),
            mappings,
        }
    }

    /// Resolve the first loadable identifier among `names` and their aliases.
    ///
    /// Candidates are the requested names in order, followed by every mapped
    /// alias whose canonical name equals one of them. Primitive names return
    /// a fixed handle and never touch the cache. With `force_refresh` the
    /// cache is bypassed and overwritten on success.
    pub fn resolve(
        &self,
        loader: &dyn TypeLoader,
        initialize: bool,
        force_refresh: bool,
        names: &[&str],
    ) -> Option<TypeHandle> {
        for (candidate, requested) in self.candidates(names) {
            if let Some(kind) = PrimitiveKind::from_name(&candidate) {
                return Some(TypeHandle::Primitive(kind));
            }

            if !force_refresh {
                if let Some(hit) = self.cached(&candidate, initialize) {
                    if candidate != requested {
                        self.entries.insert(requested.to_string(), hit.clone());
                    }
                    return Some(hit);
                }
            }

            match loader.load_by_name(&candidate, initialize) {
                Some(handle) => {
                    if candidate != requested {
                        self.entries.insert(requested.to_string(), handle.clone());
                    }
                    self.entries.insert(candidate, handle.clone());
                    return Some(handle);
                }
                None => {
                    tracing::trace!("type cache miss: {}", candidate);
                }
            }
        }
        None
    }

    /// Cached handle, unless initialization is wanted and has not happened.
    fn cached(&self, name: &str, initialize: bool) -> Option<TypeHandle> {
        let hit = self.entries.get(name)?.value().clone();
        match &hit {
            TypeHandle::Loaded(ty) if initialize && !ty.is_initialized() => None,
            _ => Some(hit),
        }
    }

    /// Identifiers to try, each paired with the requested name it came from.
    fn candidates<'a>(&self, names: &[&'a str]) -> Vec<(String, &'a str)> {
        let mut list: Vec<(String, &'a str)> =
            names.iter().map(|name| (name.to_string(), *name)).collect();
        for name in names {
            if PrimitiveKind::from_name(name).is_some() {
                continue;
            }
            let mut aliases: Vec<String> = self
                .mappings
                .unmapped_matching(name, MatchMode::Exact)
                .into_iter()
                .collect();
            aliases.sort();
            for alias in aliases {
                if !list.iter().any(|(tried, _)| *tried == alias) {
                    list.push((alias, *name));
                }
            }
        }
        list
    }

    /// Cached handle for an exact identifier.
    pub fn get(&self, name: &str) -> Option<TypeHandle> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
