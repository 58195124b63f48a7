// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine context.
//!
//! [`TypeContext`] owns one instance of every component and wires them
//! together. Embedders usually build one per runtime and pass it around;
//! [`TypeContext::global`] provides a lazily created process-wide instance.
//!
//! ```text
//! TypeContext
//! +-- mappings:   Arc<MappingTable>
//! +-- cache:      Arc<TypeCache>        (expands aliases via mappings)
//! +-- index:      Arc<TypeIndex>        (translates via mappings)
//! +-- resolver:   SupertypeResolver     (reads index, mappings, cache)
//! +-- schedulers: SchedulerRegistry
//! ```

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::cache::TypeCache;
use crate::config::UnicoreConfig;
use crate::error::Result;
use crate::exclusion::ExclusionFilter;
use crate::index::{ScanState, Snapshot, TypeIndex};
use crate::loader::{TypeCatalog, TypeHandle, TypeLoader, TypeSource};
use crate::mapping::MappingTable;
use crate::resolver::SupertypeResolver;
use crate::resources::ResourceLocator;
use crate::scheduler::{SchedulerEntry, SchedulerRegistry};

static GLOBAL_CONTEXT: OnceLock<TypeContext> = OnceLock::new();

/// Every engine component, wired together.
#[derive(Debug)]
pub struct TypeContext {
    config: UnicoreConfig,
    locator: ResourceLocator,
    loader: Arc<dyn TypeLoader>,
    mappings: Arc<MappingTable>,
    cache: Arc<TypeCache>,
    index: Arc<TypeIndex>,
    resolver: SupertypeResolver,
    schedulers: SchedulerRegistry,
}

impl TypeContext {
    /// Context over a runtime reached through separate loader and source.
    pub fn new(
        config: UnicoreConfig,
        loader: Arc<dyn TypeLoader>,
        source: Arc<dyn TypeSource>,
    ) -> Self {
        let locator = ResourceLocator::new(config.resource_roots.clone());
        let mappings = Arc::new(MappingTable::new(
            config.mapping_path.clone(),
            locator.clone(),
        ));
        let cache = Arc::new(TypeCache::new(Arc::clone(&mappings)));
        let index = Arc::new(TypeIndex::new(
            source,
            Arc::clone(&mappings),
            ExclusionFilter::from_config(&config.exclusions),
        ));
        index.set_scanning_enabled(config.scanning_enabled);
        let resolver = SupertypeResolver::new(
            Arc::clone(&index),
            Arc::clone(&mappings),
            Arc::clone(&cache),
            Arc::clone(&loader),
        );

        Self {
            config,
            locator,
            loader,
            mappings,
            cache,
            index,
            resolver,
            schedulers: SchedulerRegistry::new(),
        }
    }

    /// Context over an in-memory [`TypeCatalog`].
    pub fn from_catalog(config: UnicoreConfig, catalog: Arc<TypeCatalog>) -> Self {
        Self::new(config, catalog.clone(), catalog)
    }

    /// Process-wide context.
    ///
    /// Created on first use with the default configuration and an empty
    /// catalog, unless [`Self::init_global`] ran first.
    pub fn global() -> &'static TypeContext {
        GLOBAL_CONTEXT.get_or_init(|| {
            TypeContext::from_catalog(UnicoreConfig::default(), Arc::new(TypeCatalog::new()))
        })
    }

    /// Install `context` as the process-wide context.
    ///
    /// Returns the context back if one is already installed.
    pub fn init_global(context: TypeContext) -> std::result::Result<(), TypeContext> {
        GLOBAL_CONTEXT.set(context)
    }

    // ------------------------------------------------------------------------
    // Type Index
    // ------------------------------------------------------------------------

    /// See [`TypeIndex::scan`].
    pub fn scan(&self) -> Snapshot {
        self.index.scan()
    }

    /// Run the scan on the configured background scheduler.
    ///
    /// Does nothing, and starts no scheduler, while scanning is disabled.
    pub fn detect_classes(&self) -> Result<()> {
        if !self.index.is_scanning_enabled() {
            return Ok(());
        }
        let entry = self.schedulers.get_or_create(&self.config.scheduler_name)?;
        self.index.detect_classes(entry.scheduler())
    }

    /// See [`TypeIndex::get_map`].
    pub fn get_map(&self) -> Snapshot {
        self.index.get_map()
    }

    /// See [`TypeIndex::get_filtered`].
    pub fn get_filtered(&self, prefixes: &[&str]) -> Snapshot {
        self.index.get_filtered(prefixes)
    }

    /// See [`TypeIndex::clear`].
    pub fn clear(&self, allow_rescan: bool) {
        self.index.clear(allow_rescan);
    }

    pub fn set_scanning_enabled(&self, enabled: bool) {
        self.index.set_scanning_enabled(enabled);
    }

    pub fn is_scanning_enabled(&self) -> bool {
        self.index.is_scanning_enabled()
    }

    pub fn scan_state(&self) -> ScanState {
        self.index.state()
    }

    // ------------------------------------------------------------------------
    // Type Cache
    // ------------------------------------------------------------------------

    /// Resolve through the type cache, with `loader` or the context's own.
    pub fn resolve(
        &self,
        loader: Option<&dyn TypeLoader>,
        initialize: bool,
        force_refresh: bool,
        names: &[&str],
    ) -> Option<TypeHandle> {
        let loader = loader.unwrap_or(self.loader.as_ref());
        self.cache.resolve(loader, initialize, force_refresh, names)
    }

    /// Resolve without initializing.
    pub fn find(&self, names: &[&str]) -> Option<TypeHandle> {
        self.resolve(None, false, false, names)
    }

    /// Resolve and initialize.
    pub fn load(&self, names: &[&str]) -> Option<TypeHandle> {
        self.resolve(None, true, false, names)
    }

    /// Drop every cached resolution.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // ------------------------------------------------------------------------
    // Supertype Resolver
    // ------------------------------------------------------------------------

    /// See [`SupertypeResolver::find_subtypes_of`].
    pub fn find_subtypes_of(&self, candidates: &[TypeHandle], prefixes: &[&str]) -> Snapshot {
        self.resolver.find_subtypes_of(candidates, prefixes)
    }

    /// See [`SupertypeResolver::find_subtypes_of_names`].
    pub fn find_subtypes_of_names(&self, names: &[&str], prefixes: &[&str]) -> Snapshot {
        self.resolver.find_subtypes_of_names(names, prefixes)
    }

    // ------------------------------------------------------------------------
    // Name Mapping Table
    // ------------------------------------------------------------------------

    pub fn to_canonical(&self, mapped: &str) -> String {
        self.mappings.to_canonical(mapped)
    }

    pub fn to_mapped(&self, canonical: &str, want_simple: bool) -> String {
        self.mappings.to_mapped(canonical, want_simple)
    }

    /// Mapped -> canonical entries.
    pub fn mapping_entries(&self) -> HashMap<String, String> {
        self.mappings.entries()
    }

    // ------------------------------------------------------------------------
    // Schedulers
    // ------------------------------------------------------------------------

    pub fn get_or_create_scheduler(&self, name: &str) -> Result<Arc<SchedulerEntry>> {
        self.schedulers.get_or_create(name)
    }

    pub fn shutdown_scheduler(&self, name: &str) -> bool {
        self.schedulers.shutdown(name)
    }

    pub fn shutdown_all_schedulers(&self) {
        self.schedulers.shutdown_all();
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &UnicoreConfig {
        &self.config
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn mappings(&self) -> &Arc<MappingTable> {
        &self.mappings
    }

    pub fn cache(&self) -> &Arc<TypeCache> {
        &self.cache
    }

    pub fn index(&self) -> &Arc<TypeIndex> {
        &self.index
    }

    pub fn schedulers(&self) -> &SchedulerRegistry {
        &self.schedulers
    }
}

impl Drop for TypeContext {
    fn drop(&mut self) {
        self.schedulers.shutdown_all();
    }
}
