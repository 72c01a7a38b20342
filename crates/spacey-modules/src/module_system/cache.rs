// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache for require()

use crate::module_system::format::ModuleFormat;
use crate::value::Object;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle of a cached module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered and executing, or its body failed; exports may be partial
    Loading,
    /// Finished executing
    Loaded,
}

impl ModuleState {
    /// Returns true once the module has finished executing successfully.
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModuleState::Loaded)
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Loading => write!(f, "loading"),
            ModuleState::Loaded => write!(f, "loaded"),
        }
    }
}

/// Cached module entry
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Canonical path; the cache key
    pub path: PathBuf,
    /// The module's exports, shared with every requester
    pub exports: Object,
    /// Whether the module has finished loading
    pub state: ModuleState,
    /// Format the module was executed as
    pub format: ModuleFormat,
    /// Module that first required this one
    pub parent: Option<PathBuf>,
    /// Modules required by this one, in first-require order
    pub children: Vec<PathBuf>,
}

impl ModuleRecord {
    /// Create a record in the `Loading` state with empty exports
    pub fn loading(path: PathBuf, format: ModuleFormat, parent: Option<PathBuf>) -> Self {
        Self {
            path,
            exports: Object::new(),
            state: ModuleState::Loading,
            format,
            parent,
            children: Vec::new(),
        }
    }
}

/// Module cache keyed by canonical path, in load order
#[derive(Debug, Default)]
pub struct ModuleCache {
    records: IndexMap<PathBuf, ModuleRecord>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached module by path
    pub fn get(&self, path: &Path) -> Option<&ModuleRecord> {
        self.records.get(path)
    }

    /// Get a cached module by path for updating
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut ModuleRecord> {
        self.records.get_mut(path)
    }

    /// Check if a module is cached
    pub fn has(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Add a module to the cache
    pub fn insert(&mut self, record: ModuleRecord) {
        self.records.insert(record.path.clone(), record);
    }

    /// Remove a module from the cache
    pub fn remove(&mut self, path: &Path) -> Option<ModuleRecord> {
        self.records.shift_remove(path)
    }

    /// Clear the entire cache
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Record that `parent` required `child`
    pub fn add_child(&mut self, parent: &Path, child: &Path) {
        if let Some(record) = self.records.get_mut(parent) {
            if !record.children.iter().any(|c| c == child) {
                record.children.push(child.to_path_buf());
            }
        }
    }

    /// Get all cached module paths
    pub fn paths(&self) -> Vec<PathBuf> {
        self.records.keys().cloned().collect()
    }

    /// Iterate over cached modules in load order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.values()
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
