// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Bridges a test framework's lifecycle callbacks to a hierarchical, append-only event stream.
//!
//! The host adapter constructs one [`SessionController`](controller::SessionController) per
//! process and drives it through the [`LifecycleHooks`](hooks::LifecycleHooks) trait. The
//! controller resolves each test's group hierarchy, discovers and starts groups exactly once,
//! classifies phase reports into outcomes, and appends the resulting events to the IPC file
//! named by `EVENT_BRIDGE_IPC_PATH`.
//!
//! The wire format is defined in the `event-bridge-metadata` crate.

pub mod aggregator;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod diagnostic;
pub mod errors;
pub mod hierarchy;
pub mod hooks;
pub mod registry;
pub mod role;
pub mod sink;
mod stopwatch;
