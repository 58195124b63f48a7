// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resource lookup and small file helpers.
//!
//! A [`ResourceLocator`] resolves a relative resource path against an ordered
//! list of search roots (primary first, fallbacks after). Absolute paths are
//! used as-is.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Ordered set of directories searched for resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocator {
    roots: Vec<PathBuf>,
}

impl ResourceLocator {
    /// Locator over the given roots. No roots means the working directory.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Search roots, in lookup order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve `path` to an existing file or directory.
    pub fn find(&self, path: &Path) -> Option<PathBuf> {
        // Leading separators are tolerated for classpath-style names ("/mappings.srg").
        let relative = path.strip_prefix("/").unwrap_or(path);

        if path.is_absolute() && path.exists() {
            return Some(path.to_path_buf());
        }

        if self.roots.is_empty() {
            return relative.exists().then(|| relative.to_path_buf());
        }

        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists())
    }

    /// Open a resource for buffered reading.
    pub fn open(&self, path: &Path) -> io::Result<BufReader<File>> {
        let resolved = self.find(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("resource not found: {}", path.display()),
            )
        })?;
        Ok(BufReader::new(File::open(resolved)?))
    }

    /// Entries directly inside a resource directory, as `dir/name` paths.
    ///
    /// Missing or unreadable directories yield an empty list.
    pub fn files_in_dir(&self, dir: &Path) -> Vec<PathBuf> {
        let Some(resolved) = self.find(dir) else {
            return Vec::new();
        };

        let entries = match fs::read_dir(&resolved) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("cannot list resource dir {}: {}", resolved.display(), e);
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| dir.join(entry.file_name()))
            .collect();
        paths.sort();
        paths
    }
}

/// Extension of a file name without the dot (`""` when absent).
pub fn file_extension(name: &str) -> &str {
    let base = base_name(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx + 1..],
        _ => "",
    }
}

/// File name with directories and the last extension stripped.
pub fn file_stem(name: &str) -> &str {
    let base = base_name(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
