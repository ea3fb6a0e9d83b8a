// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for the bridge.
//!
//! Configuration is layered, lowest priority first:
//!
//! 1. The default config, [`BridgeConfig::DEFAULT_CONFIG`].
//! 2. A TOML file named by the `EVENT_BRIDGE_CONFIG` environment variable, if set.
//! 3. Environment variables prefixed with `EVENT_BRIDGE_`, e.g. `EVENT_BRIDGE_IPC_PATH`.

use crate::{errors::ConfigParseError, role::ProcessEnv};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Overall configuration for the bridge.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    #[serde(default)]
    ipc_path: Option<Utf8PathBuf>,
    #[serde(default)]
    log_path: Option<Utf8PathBuf>,
    log_level: String,
    worker_markers: Vec<String>,
    strict_xpass_fails: bool,
    #[serde(skip)]
    unknown_keys: BTreeSet<String>,
}

impl BridgeConfig {
    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "EVENT_BRIDGE";

    /// The environment variable naming an additional config file.
    pub const CONFIG_FILE_ENV: &'static str = "EVENT_BRIDGE_CONFIG";

    /// Reads the config from the given environment snapshot.
    pub fn from_env(env: &ProcessEnv) -> Result<Self, ConfigParseError> {
        let config_file = env
            .get(Self::CONFIG_FILE_ENV)
            .filter(|file| !file.is_empty())
            .map(Utf8PathBuf::from);
        Self::from_sources(config_file.as_deref(), env)
    }

    /// Reads the config from an optional file, with overrides from the environment.
    ///
    /// A file that is named but missing is an error.
    pub fn from_sources(
        config_file: Option<&Utf8Path>,
        env: &ProcessEnv,
    ) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();

        if let Some(config_file) = config_file {
            // Build the file on its own first, so errors are attributed to it.
            let file_builder = Self::make_default_config()
                .add_source(File::new(config_file.as_str(), FileFormat::Toml));
            Self::build_and_deserialize_config(&file_builder)
                .map_err(|err| ConfigParseError::new(Some(config_file.to_owned()), err))?;

            builder = builder.add_source(File::new(config_file.as_str(), FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(Self::ENVIRONMENT_PREFIX).source(Some(env.to_map())),
        );

        let mut config = Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(None, err))?;
        // The variable naming the config file shares the prefix, but isn't a key.
        config.unknown_keys.remove("config");
        Ok(config)
    }

    /// Returns the default config.
    ///
    /// The default config is embedded in this crate, so it is a bug for it to be invalid or to
    /// contain unknown keys.
    pub fn default_config() -> Self {
        Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid")
    }

    /// The destination of the event stream. `None` means the bridge stays idle.
    pub fn ipc_path(&self) -> Option<&Utf8Path> {
        self.ipc_path
            .as_deref()
            .filter(|path| !path.as_str().is_empty())
    }

    /// The diagnostic log file. `None` means diagnostics are discarded.
    pub fn log_path(&self) -> Option<&Utf8Path> {
        self.log_path
            .as_deref()
            .filter(|path| !path.as_str().is_empty())
    }

    /// The diagnostic log level directive.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Environment variables that mark a worker process.
    pub fn worker_markers(&self) -> &[String] {
        &self.worker_markers
    }

    /// Whether a strict unexpected pass is reported as a failure.
    pub fn strict_xpass_fails(&self) -> bool {
        self.strict_xpass_fails
    }

    /// Keys that were present in the config file or environment but aren't recognized.
    ///
    /// These are ignored, and the controller logs a warning for each of them.
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        let config = builder.build_cloned()?;

        let mut unknown_keys = BTreeSet::new();
        let mut deserialized: Self =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                unknown_keys.insert(path.to_string());
            })?;
        deserialized.unknown_keys = unknown_keys;
        Ok(deserialized)
    }
}
