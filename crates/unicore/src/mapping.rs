// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Name Mapping Table.
//!
//! Translates between the name a runtime reports for a type (the *mapped*,
//! often obfuscated, name) and its stable *canonical* name.
//!
//! # Resource format
//!
//! Line oriented, one directive per line. Only class directives are read:
//!
//! ```text
//! PK: ./ net/minecraft
//! CL: abc net.minecraft.client.Minecraft
//! FD: abc/a net/minecraft/client/Minecraft/instance
//! ```
//!
//! Every other line shape is ignored.
//!
//! # Failure model
//!
//! A missing or unreadable resource is logged and leaves the table empty, so
//! every lookup degrades to the identity mapping.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::resources::ResourceLocator;

/// Directive prefix for class mapping lines.
const CLASS_DIRECTIVE: &str = "CL:";

/// How [`MappingTable::unmapped_matching`] compares canonical names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Canonical name starts with the query.
    Prefix,
    /// Canonical name equals the query.
    Exact,
}

impl MatchMode {
    fn matches(self, canonical: &str, query: &str) -> bool {
        match self {
            MatchMode::Prefix => canonical.starts_with(query),
            MatchMode::Exact => canonical == query,
        }
    }
}

#[derive(Debug, Default)]
struct MappingData {
    /// mapped -> canonical
    forward: HashMap<String, String>,
    /// canonical -> mapped
    reverse: HashMap<String, String>,
}

impl MappingData {
    fn parse<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut data = MappingData::default();
        for line in reader.lines() {
            let line = line?;
            let mut parts = line.split_whitespace();
            if parts.next() != Some(CLASS_DIRECTIVE) {
                continue;
            }
            let (Some(mapped), Some(canonical)) = (parts.next(), parts.next()) else {
                continue;
            };
            data.insert(mapped, canonical);
        }
        Ok(data)
    }

    /// Keys stay unique per side; the first directive wins.
    fn insert(&mut self, mapped: &str, canonical: &str) {
        if self.forward.contains_key(mapped) || self.reverse.contains_key(canonical) {
            tracing::debug!("duplicate class mapping ignored: {} {}", mapped, canonical);
            return;
        }
        self.forward.insert(mapped.to_string(), canonical.to_string());
        self.reverse.insert(canonical.to_string(), mapped.to_string());
    }
}

/// Load-once bidirectional class name table.
#[derive(Debug)]
pub struct MappingTable {
    path: RwLock<Option<PathBuf>>,
    locator: ResourceLocator,
    /// `None` until the first load attempt.
    data: RwLock<Option<Arc<MappingData>>>,
}

impl MappingTable {
    /// Table reading `path` (resolved through `locator`) on first use.
    pub fn new(path: Option<PathBuf>, locator: ResourceLocator) -> Self {
        Self {
            path: RwLock::new(path),
            locator,
            data: RwLock::new(None),
        }
    }

    /// Table with no backing resource: always the identity mapping.
    pub fn empty() -> Self {
        Self::new(None, ResourceLocator::default())
    }

    /// Table loaded from in-memory mapping text.
    pub fn from_text(text: &str) -> Self {
        let table = Self::empty();
        table.load_from_str(text);
        table
    }

    /// Change the resource consulted by the next [`Self::ensure_loaded`].
    ///
    /// Has no effect on an already loaded table until [`Self::reset`].
    pub fn set_path(&self, path: Option<PathBuf>) {
        *self.path.write() = path;
    }

    /// Currently configured resource path.
    pub fn path(&self) -> Option<PathBuf> {
        self.path.read().clone()
    }

    /// Whether a load attempt has happened (even one that produced no data).
    pub fn is_loaded(&self) -> bool {
        self.data.read().is_some()
    }

    /// Forget loaded data; the next lookup reloads from the configured path.
    pub fn reset(&self) {
        *self.data.write() = None;
    }

    /// Load from the configured path unless already loaded.
    pub fn ensure_loaded(&self) {
        if self.is_loaded() {
            return;
        }

        let mut guard = self.data.write();
        if guard.is_some() {
            return;
        }

        let data = match self.path() {
            Some(path) => self.read_resource(&path),
            None => MappingData::default(),
        };
        *guard = Some(Arc::new(data));
    }

    /// Load (or replace) the table from a resource path.
    pub fn load(&self, path: &Path) {
        let data = self.read_resource(path);
        *self.data.write() = Some(Arc::new(data));
    }

    /// Load (or replace) the table from mapping text.
    pub fn load_from_str(&self, text: &str) {
        self.load_from_reader(text.as_bytes());
    }

    /// Load (or replace) the table from a reader.
    pub fn load_from_reader<R: BufRead>(&self, reader: R) {
        let data = match MappingData::parse(reader) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("mapping data unreadable, using identity mapping: {}", e);
                MappingData::default()
            }
        };
        *self.data.write() = Some(Arc::new(data));
    }

    fn read_resource(&self, path: &Path) -> MappingData {
        let start = Instant::now();
        tracing::debug!("loading class mappings from {}", path.display());

        let reader = match self.locator.open(path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::debug!(
                    "mapping resource {} unavailable, using identity mapping: {}",
                    path.display(),
                    e
                );
                return MappingData::default();
            }
        };

        match MappingData::parse(reader) {
            Ok(data) => {
                tracing::debug!(
                    "loaded {} class mappings from {} in {}ms",
                    data.forward.len(),
                    path.display(),
                    start.elapsed().as_millis()
                );
                data
            }
            Err(e) => {
                tracing::warn!(
                    "failed to read mapping resource {}, using identity mapping: {}",
                    path.display(),
                    e
                );
                MappingData::default()
            }
        }
    }

    fn snapshot(&self) -> Arc<MappingData> {
        self.ensure_loaded();
        self.data.read().clone().unwrap_or_default()
    }

    /// Canonical name for a mapped name, or the input when unmapped.
    pub fn to_canonical(&self, mapped: &str) -> String {
        match self.snapshot().forward.get(mapped) {
            Some(canonical) => canonical.clone(),
            None => mapped.to_string(),
        }
    }

    /// Mapped name for a canonical name, or the input when unmapped.
    ///
    /// With `want_simple`, only the segment after the last `.` is returned.
    pub fn to_mapped(&self, canonical: &str, want_simple: bool) -> String {
        let data = self.snapshot();
        let name = data
            .reverse
            .get(canonical)
            .map(String::as_str)
            .unwrap_or(canonical);
        if want_simple {
            simple_name(name).to_string()
        } else {
            name.to_string()
        }
    }

    /// Mapped names whose canonical name matches `query`.
    pub fn unmapped_matching(&self, query: &str, mode: MatchMode) -> HashSet<String> {
        self.snapshot()
            .forward
            .iter()
            .filter(|(_, canonical)| mode.matches(canonical, query))
            .map(|(mapped, _)| mapped.clone())
            .collect()
    }

    /// Copy of the mapped -> canonical table.
    pub fn entries(&self) -> HashMap<String, String> {
        self.snapshot().forward.clone()
    }

    /// Number of class mappings.
    pub fn len(&self) -> usize {
        self.snapshot().forward.len()
    }

    /// Whether the table holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// Trailing segment after the last `.`.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
