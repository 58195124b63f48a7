// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type Index
//!
//! Lazily populated catalogue of every discoverable type, keyed by canonical
//! name.
//!
//! # Scan lifecycle
//!
//! ```text
//!   Idle --scan()--> Scanning --pass ends--> Scanned
//!    ^                                          |
//!    +-------------- clear(true) ---------------+
//! ```
//!
//! A scan starts only from `Idle` with scanning enabled. Callers arriving while
//! a pass runs, or after it finished, get the current snapshot instead of a
//! second pass. An enumeration error ends the pass early but still lands in
//! `Scanned`, keeping what was collected.
//!
//! Every `clear` opens a new generation. A pass only writes records for the
//! generation it started in, so a clear during a pass discards the rest of
//! that pass. `clear(true)` during a pass does not reopen `Idle` early: the
//! running pass ends in `Idle` instead of `Scanned`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::exclusion::ExclusionFilter;
use crate::loader::{DiscoveredType, TypeSource};
use crate::mapping::{MappingTable, MatchMode};
use crate::scheduler::Scheduler;

/// Independent copy of index contents.
pub type Snapshot = HashMap<String, Arc<TypeRecord>>;

/// One discoverable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    /// Index key.
    pub canonical_name: String,
    /// Name reported by the runtime (equals `canonical_name` when unmapped).
    pub mapped_name: String,
    /// Canonical name of the direct superclass, looked up in the index on demand.
    pub superclass: Option<String>,
    /// Whether the type is an interface.
    #[serde(default)]
    pub interface: bool,
}

impl TypeRecord {
    /// Record for a type whose names need no translation.
    pub fn new(name: impl Into<String>, superclass: Option<&str>) -> Self {
        let name = name.into();
        Self {
            mapped_name: name.clone(),
            canonical_name: name,
            superclass: superclass.map(str::to_string),
            interface: false,
        }
    }
}

/// Scan state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No scan has run since construction or the last `clear(true)`.
    Idle,
    /// A pass is enumerating types.
    Scanning,
    /// A pass finished (possibly early, on error).
    Scanned,
}

#[derive(Debug)]
struct ScanControl {
    state: ScanState,
    /// `clear(true)` arrived while a pass was running.
    rescan_pending: bool,
}

/// Process-wide type catalogue.
pub struct TypeIndex {
    control: Mutex<ScanControl>,
    /// Bumped by every `clear`, under the `control` lock.
    generation: AtomicU64,
    scanning_enabled: AtomicBool,
    records: RwLock<Snapshot>,
    mappings: Arc<MappingTable>,
    source: Arc<dyn TypeSource>,
    exclusions: ExclusionFilter,
}

#[derive(Debug, Default)]
struct ScanStats {
    seen: usize,
    inserted: usize,
    skipped: usize,
    stale: bool,
}

impl TypeIndex {
    /// Index over `source`, translating names through `mappings`.
    pub fn new(
        source: Arc<dyn TypeSource>,
        mappings: Arc<MappingTable>,
        exclusions: ExclusionFilter,
    ) -> Self {
        Self {
            control: Mutex::new(ScanControl {
                state: ScanState::Idle,
                rescan_pending: false,
            }),
            generation: AtomicU64::new(0),
            scanning_enabled: AtomicBool::new(true),
            records: RwLock::new(HashMap::new()),
            mappings,
            source,
            exclusions,
        }
    }

    /// Run the scan pass if none has run yet, then return a snapshot.
    pub fn scan(&self) -> Snapshot {
        let generation = {
            let mut control = self.control.lock();
            if !self.is_scanning_enabled() || control.state != ScanState::Idle {
                return self.get_map();
            }
            control.state = ScanState::Scanning;
            self.generation.load(Ordering::SeqCst)
        };

        let start = Instant::now();
        self.mappings.ensure_loaded();
        let stats = self.populate(generation);

        {
            let mut control = self.control.lock();
            control.state = if control.rescan_pending {
                ScanState::Idle
            } else {
                ScanState::Scanned
            };
            control.rescan_pending = false;
        }

        if stats.stale {
            tracing::debug!(
                "type scan cleared after {}ms, {} type(s) seen before the clear",
                start.elapsed().as_millis(),
                stats.seen
            );
        } else {
            tracing::debug!(
                "type scan finished in {}ms: {} seen, {} indexed, {} skipped",
                start.elapsed().as_millis(),
                stats.seen,
                stats.inserted,
                stats.skipped
            );
        }

        self.get_map()
    }

    fn populate(&self, generation: u64) -> ScanStats {
        let mut stats = ScanStats::default();

        let types = match self.source.enumerate() {
            Ok(types) => types,
            Err(e) => {
                tracing::error!("type scan: enumeration could not start: {}", e);
                return stats;
            }
        };

        for item in types {
            if self.generation.load(Ordering::SeqCst) != generation {
                stats.stale = true;
                break;
            }
            match item {
                Ok(ty) => {
                    stats.seen += 1;
                    if self.insert(ty, generation) {
                        stats.inserted += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "type scan: enumeration aborted after {} type(s): {}",
                        stats.seen,
                        e
                    );
                    break;
                }
            }
        }

        stats
    }

    fn insert(&self, ty: DiscoveredType, generation: u64) -> bool {
        if self.exclusions.rejects(&ty.name) {
            return false;
        }

        let canonical = self.mappings.to_canonical(&ty.name);
        if self.exclusions.has_marker(&canonical) {
            return false;
        }

        let mut records = self.records.write();
        // Checked under the write lock, so a concurrent clear either sees this
        // record and removes it or this check sees the new generation.
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        if records.contains_key(&canonical) {
            return false;
        }

        let record = TypeRecord {
            canonical_name: canonical.clone(),
            mapped_name: ty.name,
            superclass: ty.superclass.map(|s| self.mappings.to_canonical(&s)),
            interface: ty.interface,
        };
        records.insert(canonical, Arc::new(record));
        true
    }

    /// Run [`Self::scan`] on `scheduler` instead of the caller's thread.
    ///
    /// Does nothing while scanning is disabled.
    pub fn detect_classes(self: &Arc<Self>, scheduler: &Scheduler) -> Result<()> {
        if !self.is_scanning_enabled() {
            return Ok(());
        }
        let index = Arc::clone(self);
        scheduler.execute(move || {
            index.scan();
        })
    }

    /// Copy of the current records.
    pub fn get_map(&self) -> Snapshot {
        self.records.read().clone()
    }

    /// Record for a canonical name.
    pub fn get(&self, canonical: &str) -> Option<Arc<TypeRecord>> {
        self.records.read().get(canonical).cloned()
    }

    /// Empty the index. With `allow_rescan` the next [`Self::scan`] runs again;
    /// without it a finished index stays frozen empty.
    ///
    /// A pass running at the time stops writing. With `allow_rescan` it ends
    /// in `Idle`, so no second pass can start while it is still enumerating.
    pub fn clear(&self, allow_rescan: bool) {
        let mut control = self.control.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if allow_rescan {
            if control.state == ScanState::Scanning {
                control.rescan_pending = true;
            } else {
                control.state = ScanState::Idle;
            }
        }
        self.records.write().clear();
    }

    /// Records whose canonical or mapped name starts with one of `prefixes`,
    /// or whose name is a mapped alias of a type under one of them.
    ///
    /// Empty `prefixes` selects everything. Triggers [`Self::scan`].
    pub fn get_filtered(&self, prefixes: &[&str]) -> Snapshot {
        if !self.is_scanning_enabled() {
            return HashMap::new();
        }

        let all = self.scan();
        if prefixes.is_empty() {
            return all;
        }

        let aliases: Vec<(&str, HashSet<String>)> = prefixes
            .iter()
            .map(|p| (*p, self.mappings.unmapped_matching(p, MatchMode::Prefix)))
            .collect();

        all.into_iter()
            .filter(|(_, record)| {
                aliases.iter().any(|(prefix, unmapped)| {
                    record.canonical_name.starts_with(prefix)
                        || record.mapped_name.starts_with(prefix)
                        || unmapped.contains(&record.canonical_name)
                        || unmapped.contains(&record.mapped_name)
                })
            })
            .collect()
    }

    /// Enable or disable scanning.
    pub fn set_scanning_enabled(&self, enabled: bool) {
        self.scanning_enabled.store(enabled, Ordering::Release);
    }

    /// Whether scanning is enabled.
    pub fn is_scanning_enabled(&self) -> bool {
        self.scanning_enabled.load(Ordering::Acquire)
    }

    /// Whether no scan pass is currently running.
    pub fn can_scan(&self) -> bool {
        self.state() != ScanState::Scanning
    }

    /// Whether a scan pass has finished.
    pub fn has_scanned(&self) -> bool {
        self.state() == ScanState::Scanned
    }

    /// Current scan state.
    pub fn state(&self) -> ScanState {
        self.control.lock().state
    }

    /// Number of indexed types.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIndex")
            .field("state", &self.state())
            .field("scanning_enabled", &self.is_scanning_enabled())
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExclusionConfig;
    use crate::loader::TypeCatalog;

    fn index(catalog: TypeCatalog, mappings: &str) -> TypeIndex {
        TypeIndex::new(
            Arc::new(catalog),
            Arc::new(MappingTable::from_text(mappings)),
            ExclusionFilter::none(),
        )
    }

    #[test]
    fn test_scan_translates_names() {
        let catalog = TypeCatalog::new().with("abc", None).with("abd", Some("abc"));
        let idx = index(catalog, "CL: abc com.acme.Base\nCL: abd com.acme.Leaf\n");

        let snapshot = idx.scan();
        assert_eq!(snapshot.len(), 2);
        let leaf = snapshot.get("com.acme.Leaf").expect("leaf");
        assert_eq!(leaf.mapped_name, "abd");
        assert_eq!(leaf.superclass.as_deref(), Some("com.acme.Base"));
        assert_eq!(idx.state(), ScanState::Scanned);
        assert!(idx.has_scanned());
    }

    #[test]
    fn test_first_record_per_canonical_name_wins() {
        let catalog = TypeCatalog::new()
            .with("abc", None)
            .with("com.acme.Base", Some("java.lang.Object"));
        let idx = index(catalog, "CL: abc com.acme.Base\n");

        let snapshot = idx.scan();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["com.acme.Base"].mapped_name, "abc");
    }

    #[test]
    fn test_exclusions_applied() {
        let catalog = TypeCatalog::new()
            .with("jdk.internal.Misc", None)
            .with("com.acme.ClientMixin", None)
            .with("q", None)
            .with("com.acme.Client", None);
        let idx = TypeIndex::new(
            Arc::new(catalog),
            Arc::new(MappingTable::from_text("CL: q com.acme.mixin.Patched\n")),
            ExclusionFilter::from_config(&ExclusionConfig::default()),
        );

        let snapshot = idx.scan();
        let keys: Vec<&String> = snapshot.keys().collect();
        assert_eq!(keys, vec!["com.acme.Client"]);
    }

    #[test]
    fn test_clear_without_rescan_freezes_empty() {
        let idx = index(TypeCatalog::new().with("a.A", None), "");
        assert_eq!(idx.scan().len(), 1);

        idx.clear(false);
        assert!(idx.scan().is_empty());
        assert_eq!(idx.state(), ScanState::Scanned);

        idx.clear(true);
        assert_eq!(idx.state(), ScanState::Idle);
        assert_eq!(idx.scan().len(), 1);
    }

    #[test]
    fn test_insert_from_cleared_generation_dropped() {
        let idx = index(TypeCatalog::new(), "");
        let before = idx.generation.load(Ordering::SeqCst);
        assert!(idx.insert(DiscoveredType::new("a.Kept", None), before));

        idx.clear(true);
        assert!(!idx.insert(DiscoveredType::new("a.Late", None), before));
        assert!(idx.is_empty());

        let current = idx.generation.load(Ordering::SeqCst);
        assert!(idx.insert(DiscoveredType::new("a.Fresh", None), current));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_disabled_scanning() {
        let idx = index(TypeCatalog::new().with("a.A", None), "");
        idx.set_scanning_enabled(false);

        assert!(idx.scan().is_empty());
        assert!(idx.get_filtered(&[]).is_empty());
        assert_eq!(idx.state(), ScanState::Idle);

        idx.set_scanning_enabled(true);
        assert_eq!(idx.get_filtered(&[]).len(), 1);
    }

    #[test]
    fn test_get_filtered_by_prefix_and_alias() {
        let catalog = TypeCatalog::new()
            .with("abc", None)
            .with("com.acme.Window", None)
            .with("org.other.Thing", None);
        let idx = index(catalog, "CL: abc com.acme.Client\n");

        let filtered = idx.get_filtered(&["com.acme."]);
        let mut keys: Vec<&str> = filtered.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["com.acme.Client", "com.acme.Window"]);

        let by_mapped = idx.get_filtered(&["ab"]);
        assert_eq!(by_mapped.len(), 1);
        assert!(by_mapped.contains_key("com.acme.Client"));

        assert_eq!(idx.get_filtered(&[]).len(), 3);
        assert!(idx.get_filtered(&["net."]).is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let idx = index(TypeCatalog::new().with("a.A", None), "");
        let mut snapshot = idx.scan();
        snapshot.clear();
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_detect_classes_on_scheduler() {
        let idx = Arc::new(index(TypeCatalog::new().with("a.A", None), ""));
        let scheduler = Scheduler::spawn("unicore-test-detect").expect("spawn");

        idx.detect_classes(&scheduler).expect("submit scan");
        scheduler.shutdown();
        assert!(scheduler.await_termination(std::time::Duration::from_secs(5)));
        assert!(idx.has_scanned());
        assert!(idx.get("a.A").is_some());
    }
}
