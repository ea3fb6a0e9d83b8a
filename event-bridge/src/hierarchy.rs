// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving qualified test identifiers into a group hierarchy.
//!
//! Frameworks identify tests with strings such as `tests/test_math.py::TestMath::test_add`: a
//! file path, zero or more enclosing scopes, and the leaf test name, separated by
//! [`DELIMITER`]. Resolution is a pure string operation and borrows from its input.

use std::fmt;

/// The separator between segments of a qualified identifier.
pub const DELIMITER: &str = "::";

/// A qualified identifier split into its file, enclosing scopes and leaf name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestHierarchy<'a> {
    /// The file the test lives in. This is always the outermost group.
    pub file_path: &'a str,

    /// The enclosing scopes between the file and the leaf, outermost first.
    pub suite_chain: Vec<&'a str>,

    /// The leaf name of the test.
    pub test_name: &'a str,

    qualified_name: &'a str,
}

impl<'a> TestHierarchy<'a> {
    /// Resolves a qualified identifier.
    ///
    /// * Two segments (`file::test`) produce an empty suite chain.
    /// * Three or more segments produce a suite chain of everything between the first and the
    ///   last segment.
    /// * A delimiter inside square brackets (as in parametrized ids like `test_x[a::b]`) does
    ///   not split.
    /// * An identifier with a single segment is treated as both the file and the test name,
    ///   with an empty suite chain.
    pub fn resolve(node_id: &'a str) -> Self {
        let segments = split_segments(node_id);
        match segments.as_slice() {
            [file_path, suite_chain @ .., test_name] => Self {
                file_path: *file_path,
                suite_chain: suite_chain.to_vec(),
                test_name: *test_name,
                qualified_name: &node_id[file_path.len() + DELIMITER.len()..],
            },
            _ => Self {
                file_path: node_id,
                suite_chain: Vec::new(),
                test_name: node_id,
                qualified_name: node_id,
            },
        }
    }

    /// Returns the identifier without its file segment, e.g. `TestMath::test_add`.
    pub fn qualified_name(&self) -> &'a str {
        self.qualified_name
    }

    /// Returns the chain of group names this test belongs to: the file, then every enclosing
    /// scope.
    pub fn group_chain(&self) -> Vec<String> {
        std::iter::once(self.file_path)
            .chain(self.suite_chain.iter().copied())
            .map(str::to_owned)
            .collect()
    }

    /// Returns the key under which outcomes for this test are deduplicated.
    pub fn test_key(&self) -> TestKey {
        TestKey {
            file_path: self.file_path.to_owned(),
            qualified_name: self.qualified_name.to_owned(),
        }
    }
}

/// Identifies a single test within a session: its file and its qualified name within the file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey {
    /// The file the test lives in.
    pub file_path: String,

    /// The identifier without its file segment.
    pub qualified_name: String,
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.file_path, self.qualified_name)
    }
}

fn split_segments(node_id: &str) -> Vec<&str> {
    let bytes = node_id.as_bytes();
    let mut segments = Vec::new();
    let mut bracket_depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => bracket_depth += 1,
            b']' => bracket_depth = bracket_depth.saturating_sub(1),
            b':' if bracket_depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                // ':' is ASCII, so both slice boundaries are on char boundaries.
                segments.push(&node_id[start..i]);
                i += DELIMITER.len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&node_id[start..]);
    segments
}
