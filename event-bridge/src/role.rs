// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detecting whether this process should report.
//!
//! Frameworks that fan out across worker processes load an independent bridge in each worker.
//! Only the coordinating process reports; workers are identified by an environment marker and
//! stay silent for their whole lifetime.

use std::{collections::BTreeMap, ffi::OsString, fmt};

/// A snapshot of the process environment.
///
/// Configuration and role detection read from a snapshot rather than the live environment, so
/// they are evaluated once and can be tested without touching the real environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessEnv {
    vars: BTreeMap<String, String>,
}

impl ProcessEnv {
    /// Captures the current process environment.
    ///
    /// Variables whose name or value isn't valid UTF-8 are skipped.
    pub fn capture() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        let vars = vars
            .into_iter()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    /// Returns the value of a variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns every variable, sorted by name.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns a copy of every variable, as consumed by the config crate.
    pub(crate) fn to_map(&self) -> config::Map<String, String> {
        self.vars
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProcessEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// The role of this process in a possibly multi-process session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessRole {
    /// The coordinating process. It reports.
    Coordinator,

    /// A worker process. It never reports.
    Worker {
        /// The marker variable that identified this process as a worker.
        marker: String,
    },
}

impl ProcessRole {
    /// Detects the role from the environment.
    ///
    /// The process is a worker if any of `markers` is set to a non-empty value.
    pub fn detect<S: AsRef<str>>(env: &ProcessEnv, markers: &[S]) -> Self {
        markers
            .iter()
            .map(AsRef::as_ref)
            .find(|marker| env.get(marker).is_some_and(|value| !value.is_empty()))
            .map_or(Self::Coordinator, |marker| Self::Worker {
                marker: marker.to_owned(),
            })
    }

    /// Returns true if this process should report.
    pub fn is_reporter(&self) -> bool {
        matches!(self, Self::Coordinator)
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinator => write!(f, "coordinator"),
            Self::Worker { marker } => write!(f, "worker (marked by {marker})"),
        }
    }
}
