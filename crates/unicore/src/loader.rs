// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type access layer.
//!
//! This module abstracts how a target runtime exposes type metadata:
//! - [`TypeLoader`] loads one type by name (the reflection half)
//! - [`TypeSource`] enumerates every visible type (the scanning half)
//!
//! [`TypeCatalog`] is the in-process implementation of both, fed either
//! programmatically or from a JSON type manifest:
//!
//! ```json
//! { "types": [
//!     { "name": "com.acme.Base" },
//!     { "name": "com.acme.Leaf", "superclass": "com.acme.Base" }
//! ] }
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// PrimitiveKind
// ---------------------------------------------------------------------------

/// Built-in primitive and void types. These never touch a loader or cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Void,
}

impl PrimitiveKind {
    /// Every built-in kind, in declaration order.
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Char,
        PrimitiveKind::Void,
    ];

    /// Fixed lookup table from identifier to kind.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(PrimitiveKind::Boolean),
            "byte" => Some(PrimitiveKind::Byte),
            "short" => Some(PrimitiveKind::Short),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            "char" => Some(PrimitiveKind::Char),
            "void" => Some(PrimitiveKind::Void),
            _ => None,
        }
    }

    /// Identifier of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Void => "void",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// LoadedType / TypeHandle
// ---------------------------------------------------------------------------

/// Metadata for a non-primitive type produced by a loader.
pub struct LoadedType {
    name: String,
    superclass: Option<String>,
    interface: bool,
    initialized: AtomicBool,
}

impl LoadedType {
    /// Create type metadata (not yet initialized).
    pub fn new(name: impl Into<String>, superclass: Option<String>, interface: bool) -> Self {
        Self {
            name: name.into(),
            superclass,
            interface,
            initialized: AtomicBool::new(false),
        }
    }

    /// Runtime name of the type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runtime name of the direct superclass, if any.
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Whether the type is an interface.
    pub fn is_interface(&self) -> bool {
        self.interface
    }

    /// Whether the type has been initialized by a loader.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Mark the type initialized. Idempotent.
    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }
}

impl fmt::Debug for LoadedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedType")
            .field("name", &self.name)
            .field("superclass", &self.superclass)
            .field("interface", &self.interface)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Handle to a resolved type.
///
/// Cloning is cheap; two clones of a loaded handle share one [`LoadedType`].
#[derive(Debug, Clone)]
pub enum TypeHandle {
    /// Built-in primitive or void sentinel.
    Primitive(PrimitiveKind),
    /// Type produced by a [`TypeLoader`].
    Loaded(Arc<LoadedType>),
}

impl TypeHandle {
    /// Wrap freshly loaded type metadata.
    pub fn loaded(ty: LoadedType) -> Self {
        TypeHandle::Loaded(Arc::new(ty))
    }

    /// Runtime name of the type.
    pub fn name(&self) -> &str {
        match self {
            TypeHandle::Primitive(kind) => kind.name(),
            TypeHandle::Loaded(ty) => ty.name(),
        }
    }

    /// Runtime name of the direct superclass (primitives have none).
    pub fn superclass(&self) -> Option<&str> {
        match self {
            TypeHandle::Primitive(_) => None,
            TypeHandle::Loaded(ty) => ty.superclass(),
        }
    }

    /// Whether this is a primitive/void sentinel.
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeHandle::Primitive(_))
    }

    /// Identity comparison: same primitive kind, or the very same loaded instance.
    pub fn ptr_eq(&self, other: &TypeHandle) -> bool {
        match (self, other) {
            (TypeHandle::Primitive(a), TypeHandle::Primitive(b)) => a == b,
            (TypeHandle::Loaded(a), TypeHandle::Loaded(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Loads types by name from a target runtime.
pub trait TypeLoader: Send + Sync {
    /// Load a type, initializing it when `initialize` is set.
    ///
    /// Returns `None` when the runtime has no such type.
    fn load_by_name(&self, name: &str, initialize: bool) -> Option<TypeHandle>;

    /// Whether `handle` is `candidate` or one of its transitive subtypes.
    ///
    /// The default walks superclass names through [`Self::load_by_name`],
    /// stopping on cycles and on unloadable ancestors.
    fn is_subtype_of(&self, handle: &TypeHandle, candidate: &TypeHandle) -> bool {
        if handle.is_primitive() || candidate.is_primitive() {
            return handle.ptr_eq(candidate);
        }

        let target = candidate.name();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = Some(handle.clone());

        while let Some(ty) = current.take() {
            if ty.name() == target {
                return true;
            }
            if !visited.insert(ty.name().to_string()) {
                break;
            }
            current = ty
                .superclass()
                .and_then(|parent| self.load_by_name(parent, false));
        }
        false
    }
}

/// One type reported by a [`TypeSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredType {
    /// Runtime (possibly mapped) name.
    pub name: String,
    /// Runtime name of the direct superclass.
    #[serde(default)]
    pub superclass: Option<String>,
    /// Whether the type is an interface.
    #[serde(default)]
    pub interface: bool,
}

impl DiscoveredType {
    /// A class with an optional superclass.
    pub fn new(name: impl Into<String>, superclass: Option<&str>) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.map(str::to_string),
            interface: false,
        }
    }
}

/// Stream of enumerated types; an `Err` item aborts the pass.
pub type TypeEnumeration<'a> = Box<dyn Iterator<Item = Result<DiscoveredType>> + 'a>;

/// Enumerates every type visible to the current loading context.
pub trait TypeSource: Send + Sync {
    /// Start an enumeration pass.
    fn enumerate(&self) -> Result<TypeEnumeration<'_>>;
}

// ---------------------------------------------------------------------------
// TypeCatalog
// ---------------------------------------------------------------------------

/// JSON manifest layout accepted by [`TypeCatalog::from_manifest_str`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TypeManifest {
    /// Declared types, in enumeration order.
    #[serde(default)]
    pub types: Vec<DiscoveredType>,
}

/// In-memory runtime: a loader and a source over the same set of types.
#[derive(Default)]
pub struct TypeCatalog {
    inner: RwLock<CatalogInner>,
}

#[derive(Default)]
struct CatalogInner {
    order: Vec<Arc<LoadedType>>,
    by_name: HashMap<String, Arc<LoadedType>>,
}

impl TypeCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::insert`] of a class.
    pub fn with(self, name: &str, superclass: Option<&str>) -> Self {
        self.insert(DiscoveredType::new(name, superclass));
        self
    }

    /// Register a type. A name that is already present is left untouched.
    pub fn insert(&self, ty: DiscoveredType) -> bool {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(&ty.name) {
            return false;
        }
        let loaded = Arc::new(LoadedType::new(ty.name.clone(), ty.superclass, ty.interface));
        inner.by_name.insert(ty.name, Arc::clone(&loaded));
        inner.order.push(loaded);
        true
    }

    /// Build a catalog from manifest JSON text.
    pub fn from_manifest_str(json: &str) -> Result<Self> {
        let manifest: TypeManifest = serde_json::from_str(json)?;
        let catalog = Self::new();
        for ty in manifest.types {
            if ty.name.trim().is_empty() {
                continue;
            }
            catalog.insert(ty);
        }
        Ok(catalog)
    }

    /// Build a catalog from a manifest file.
    pub fn from_manifest_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_manifest_str(&json).map_err(|e| Error::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TypeLoader for TypeCatalog {
    fn load_by_name(&self, name: &str, initialize: bool) -> Option<TypeHandle> {
        let ty = self.inner.read().by_name.get(name).cloned()?;
        if initialize {
            ty.mark_initialized();
        }
        Some(TypeHandle::Loaded(ty))
    }
}

impl TypeSource for TypeCatalog {
    fn enumerate(&self) -> Result<TypeEnumeration<'_>> {
        // Snapshot so the pass never holds the catalog lock.
        let types: Vec<DiscoveredType> = self
            .inner
            .read()
            .order
            .iter()
            .map(|ty| DiscoveredType {
                name: ty.name().to_string(),
                superclass: ty.superclass().map(str::to_string),
                interface: ty.is_interface(),
            })
            .collect();
        Ok(Box::new(types.into_iter().map(Ok)))
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("types", &self.len())
            .finish()
    }
}

impl fmt::Debug for dyn TypeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLoader").finish_non_exhaustive()
    }
}

impl fmt::Debug for dyn TypeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSource").finish_non_exhaustive()
    }
}
