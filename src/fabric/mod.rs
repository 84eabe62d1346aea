//! Record resolution and session-bracketed parcel fabric edits.
//!
//! [`FabricClient`] is split by responsibility:
//! - `session_impl`: the begin/end bracket every mutation runs inside
//! - `record_impl`: find-or-create of the active record
//! - `operations_impl`: the five parcel fabric operations
//! - [`payload`]: pure request builders and response interpretation

pub mod in_memory;
pub mod payload;

mod operations_impl;
mod record_impl;
mod session_impl;

pub use record_impl::RecordResolution;
pub use session_impl::Released;

use crate::connection::FabricTransport;
use crate::connection::config::FabricConfig;
use crate::connection::http::HttpTransport;
use crate::core::{FabricError, Record, Result};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::version::VersionContext;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Level, event};

/// Client for one parcel fabric service and one version.
///
/// Holds the single active record. Each edit operation opens and closes its own
/// edit session; nothing is shared between calls except the active record.
pub struct FabricClient {
    config: FabricConfig,
    context: Arc<dyn VersionContext>,
    transport: Arc<dyn FabricTransport>,
    notifier: Arc<dyn Notifier>,
    active_record: RwLock<Option<Record>>,
}

impl FabricClient {
    /// Creates a client over explicit capabilities.
    pub fn new(
        config: FabricConfig,
        context: Arc<dyn VersionContext>,
        transport: Arc<dyn FabricTransport>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            context,
            transport,
            notifier: Arc::new(TracingNotifier),
            active_record: RwLock::new(None),
        })
    }

    /// Creates a client that talks to the services over HTTP.
    pub fn connect_http(config: FabricConfig, context: Arc<dyn VersionContext>) -> Result<Self> {
        Self::new(config, context, Arc::new(HttpTransport::new()))
    }

    /// Replaces the default tracing notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &FabricConfig {
        &self.config
    }

    pub fn version_name(&self) -> String {
        self.context.version_name()
    }

    /// Snapshot of the active record, if one has been resolved.
    pub async fn active_record(&self) -> Option<Record> {
        self.active_record.read().await.clone()
    }

    /// Makes `record` the active record, replacing any previous one.
    pub async fn set_active_record(&self, record: Record) {
        self.replace_active_record(record).await;
    }

    /// Drops the active record; edit operations fail until a new one is set.
    pub async fn clear_active_record(&self) {
        self.active_record.write().await.take();
    }

    async fn replace_active_record(&self, record: Record) {
        event!(
            Level::DEBUG,
            record = %record.name(),
            record_id = %record.id(),
            "active record replaced"
        );
        *self.active_record.write().await = Some(record);
    }

    async fn require_active_record(&self) -> Result<Record> {
        self.active_record
            .read()
            .await
            .clone()
            .ok_or(FabricError::NoActiveRecord)
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(&notice);
    }
}
