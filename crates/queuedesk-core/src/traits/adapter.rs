// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait for long-lived backends.

use async_trait::async_trait;

use crate::error::QueueDeskError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health, and shutdown for a backend the server owns.
///
/// The `/health` endpoint reports every registered adapter through this
/// trait, and graceful shutdown calls [`PluginAdapter::shutdown`] on each.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, QueueDeskError>;

    /// Releases held resources. Called once during shutdown.
    async fn shutdown(&self) -> Result<(), QueueDeskError>;
}
