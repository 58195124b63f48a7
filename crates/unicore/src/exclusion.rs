// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scan exclusion filter.
//!
//! Two kinds of rules:
//! - package globs (`*` and `?`), matched against the package of a type name;
//!   a pattern also covers every sub-package of what it matches
//! - markers, case-insensitive substrings of the whole type name

use crate::config::ExclusionConfig;

/// Compiled exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    packages: Vec<Vec<char>>,
    markers: Vec<String>,
}

impl ExclusionFilter {
    /// Filter that rejects nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Compile the rules of an [`ExclusionConfig`].
    pub fn from_config(config: &ExclusionConfig) -> Self {
        Self {
            packages: config
                .packages
                .iter()
                .map(|p| p.trim().chars().collect())
                .collect(),
            markers: config
                .markers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .collect(),
        }
    }

    /// Whether the package of `type_name` is excluded.
    pub fn is_package_excluded(&self, type_name: &str) -> bool {
        let package = package_of(type_name);
        if package.is_empty() {
            return false;
        }
        let text: Vec<char> = package.chars().collect();
        self.packages
            .iter()
            .any(|pattern| package_match(pattern, &text))
    }

    /// Whether `name` carries one of the markers.
    pub fn has_marker(&self, name: &str) -> bool {
        if self.markers.is_empty() {
            return false;
        }
        let lower = name.to_lowercase();
        self.markers.iter().any(|m| lower.contains(m.as_str()))
    }

    /// Either rule applies.
    pub fn rejects(&self, type_name: &str) -> bool {
        self.is_package_excluded(type_name) || self.has_marker(type_name)
    }

    /// Whether the filter has no rules.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.markers.is_empty()
    }
}

/// Package part of a dotted type name (`""` for the default package).
pub fn package_of(type_name: &str) -> &str {
    match type_name.rfind('.') {
        Some(idx) => &type_name[..idx],
        None => "",
    }
}

/// `pattern` matches `package` itself or one of its parents.
fn package_match(pattern: &[char], package: &[char]) -> bool {
    if glob_match(pattern, package, 0, 0) {
        return true;
    }
    package
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == '.')
        .any(|(i, _)| glob_match(pattern, &package[..i], 0, 0))
}

/// Simple glob matching (supports * and ?).
fn glob_match(pattern: &[char], text: &[char], pi: usize, ti: usize) -> bool {
    if pi == pattern.len() {
        return ti == text.len();
    }

    match pattern[pi] {
        '*' => {
            // Zero or more characters
            for i in ti..=text.len() {
                if glob_match(pattern, text, pi + 1, i) {
                    return true;
                }
            }
            false
        }
        '?' => ti < text.len() && glob_match(pattern, text, pi + 1, ti + 1),
        c => ti < text.len() && text[ti] == c && glob_match(pattern, text, pi + 1, ti + 1),
    }
}
