// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UniCore Type Discovery
//!
//! Builds an index of every type a runtime can load, translates between
//! mapped (obfuscated) and canonical type names, and answers subtype queries
//! over that index.
//!
//! # Components
//!
//! - **Scheduler Registry** ([`scheduler`]): named single-threaded background
//!   executors, created on first use
//! - **Name Mapping Table** ([`mapping`]): `CL: <mapped> <canonical>` lines,
//!   loaded once
//! - **Type Cache** ([`cache`]): memoized name -> type handle resolution
//! - **Type Index** ([`index`]): lazily scanned catalogue keyed by canonical name
//! - **Supertype Resolver** ([`resolver`]): cycle-safe subtype search
//!
//! All of them live in a [`TypeContext`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use unicore::{TypeCatalog, TypeContext, UnicoreConfig};
//!
//! let catalog = TypeCatalog::new()
//!     .with("com.acme.Base", None)
//!     .with("com.acme.Leaf", Some("com.acme.Base"));
//! let ctx = TypeContext::from_catalog(UnicoreConfig::bare(), Arc::new(catalog));
//!
//! let found = ctx.find_subtypes_of_names(&["com.acme.Base"], &["com.acme."]);
//! assert!(found.contains_key("com.acme.Leaf"));
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! scanning_enabled = true
//! mapping_path = "mappings.srg"
//! resource_roots = ["assets"]
//!
//! [exclusions]
//! packages = ["jdk", "com.sun", "*.mixin.*"]
//! markers = ["mixin"]
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod exclusion;
pub mod index;
pub mod loader;
pub mod mapping;
pub mod resolver;
pub mod resources;
pub mod scheduler;

pub use cache::TypeCache;
pub use config::{ConfigError, ExclusionConfig, UnicoreConfig};
pub use context::TypeContext;
pub use error::{Error, Result};
pub use exclusion::ExclusionFilter;
pub use index::{ScanState, Snapshot, TypeIndex, TypeRecord};
pub use loader::{
    DiscoveredType, LoadedType, PrimitiveKind, TypeCatalog, TypeEnumeration, TypeHandle,
    TypeLoader, TypeManifest, TypeSource,
};
pub use mapping::{MappingTable, MatchMode};
pub use resolver::{is_subtype_of, SupertypeResolver};
pub use resources::ResourceLocator;
pub use scheduler::{Scheduler, SchedulerEntry, SchedulerRegistry, ThreadFactory};
