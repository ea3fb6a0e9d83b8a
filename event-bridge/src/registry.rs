// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group identity and discovery/start bookkeeping.
//!
//! A group is identified by its full path: the names of its ancestors, root first, followed by
//! its own name. Discovery and start are monotonic: each happens at most once per path, and
//! repeating either is a no-op.

use indexmap::IndexSet;
use itertools::Itertools;
use std::{collections::HashSet, fmt};

/// The identity of a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupPath {
    parent_names: Vec<String>,
    name: String,
}

impl GroupPath {
    /// Creates a top-level group, such as a file.
    pub fn top_level(name: impl Into<String>) -> Self {
        Self {
            parent_names: Vec::new(),
            name: name.into(),
        }
    }

    /// Creates a path from a chain of names, root first. Returns `None` if the chain is empty.
    pub fn from_chain<S: AsRef<str>>(chain: &[S]) -> Option<Self> {
        let (name, parents) = chain.split_last()?;
        Some(Self {
            parent_names: parents.iter().map(|s| s.as_ref().to_owned()).collect(),
            name: name.as_ref().to_owned(),
        })
    }

    /// Returns a path for a child of this group.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut parent_names = self.parent_names.clone();
        parent_names.push(self.name.clone());
        Self {
            parent_names,
            name: name.into(),
        }
    }

    /// The group's own name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The names of the group's ancestors, root first.
    pub fn parent_names(&self) -> &[String] {
        &self.parent_names
    }

    /// The name of the outermost group on this path (the file, for test hierarchies).
    pub fn root_name(&self) -> &str {
        self.parent_names.first().unwrap_or(&self.name)
    }

    /// Returns true if this group has no parent.
    pub fn is_top_level(&self) -> bool {
        self.parent_names.is_empty()
    }

    /// Returns the full chain of names, root first, including this group.
    pub fn chain(&self) -> impl Iterator<Item = &str> {
        self.parent_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.name.as_str()))
    }

    /// Returns every path from the root down to and including this one, outermost first.
    pub fn lineage(&self) -> Vec<GroupPath> {
        let chain: Vec<&str> = self.chain().collect();
        (1..=chain.len())
            .filter_map(|len| Self::from_chain(&chain[..len]))
            .collect()
    }

    /// Returns true if `other` is this group or one of its descendants.
    pub fn contains(&self, other: &GroupPath) -> bool {
        let own_len = self.parent_names.len() + 1;
        other.parent_names.len() + 1 >= own_len && other.chain().take(own_len).eq(self.chain())
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chain().format(" > "))
    }
}

/// A state change recorded by [`GroupRegistry::ensure_group_started`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupTransition {
    /// The group was discovered.
    Discovered(GroupPath),
    /// The group was started.
    Started(GroupPath),
}

/// Records which groups have been discovered and which have been started.
#[derive(Clone, Debug, Default)]
pub struct GroupRegistry {
    // Insertion order is discovery order.
    discovered: IndexSet<GroupPath>,
    started: HashSet<GroupPath>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovers the file group and every group on the suite chain below it.
    ///
    /// Returns the groups that were not previously discovered, outermost first.
    pub fn discover_groups(&mut self, file_path: &str, suite_chain: &[&str]) -> Vec<GroupPath> {
        let mut current = GroupPath::top_level(file_path);
        let mut newly_discovered = Vec::new();
        if self.discovered.insert(current.clone()) {
            newly_discovered.push(current.clone());
        }
        for suite in suite_chain {
            current = current.child(*suite);
            if self.discovered.insert(current.clone()) {
                newly_discovered.push(current.clone());
            }
        }
        newly_discovered
    }

    /// Starts `path` and all of its ancestors, outermost first.
    ///
    /// Ancestors are always started before descendants. A group on the lineage that was never
    /// discovered is discovered immediately before it is started.
    pub fn ensure_group_started(&mut self, path: &GroupPath) -> Vec<GroupTransition> {
        let mut transitions = Vec::new();
        for group in path.lineage() {
            if self.started.contains(&group) {
                continue;
            }
            if self.discovered.insert(group.clone()) {
                transitions.push(GroupTransition::Discovered(group.clone()));
            }
            self.started.insert(group.clone());
            transitions.push(GroupTransition::Started(group));
        }
        transitions
    }

    /// Returns true if the group has been discovered.
    pub fn is_discovered(&self, path: &GroupPath) -> bool {
        self.discovered.contains(path)
    }

    /// Returns true if the group has been started.
    pub fn is_started(&self, path: &GroupPath) -> bool {
        self.started.contains(path)
    }

    /// Returns every discovered group, in discovery order.
    pub fn discovered(&self) -> impl Iterator<Item = &GroupPath> {
        self.discovered.iter()
    }

    /// Returns every discovered top-level group, in discovery order.
    pub fn top_level_groups(&self) -> impl Iterator<Item = &GroupPath> {
        self.discovered.iter().filter(|path| path.is_top_level())
    }
}
