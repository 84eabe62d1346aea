// ============================================================================
// parcelfab Library
// ============================================================================

//! Session-bracketed edits against a versioned parcel fabric.
//!
//! Every mutation is scoped to a named version and to an active record, and
//! runs inside an edit session that is released on every exit path.
//!
//! # Examples
//!
//! ```
//! use parcelfab::in_memory::{
//!     CallJournal, InMemoryTransport, InMemoryVersionContext, add_success_response,
//!     operation_success_response, record_query_response,
//! };
//! use parcelfab::{FabricClient, FabricConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let journal = CallJournal::new();
//! let context = Arc::new(InMemoryVersionContext::new("ADMIN.Edits", journal.clone()));
//! let transport = Arc::new(InMemoryTransport::new(journal.clone()));
//! transport.respond("FeatureServer/1/query", record_query_response(&[]));
//! transport.respond("FeatureServer/applyEdits", add_success_response(1, 1, "{REC}"));
//! transport.respond("ParcelFabricServer/build", operation_success_response(json!([])));
//!
//! let client = FabricClient::new(
//!     FabricConfig::new("https://gis.example.com/server/rest/services/Parcels/"),
//!     context,
//!     transport,
//! )?;
//!
//! let resolution = client.resolve_record("Record001").await?;
//! assert!(resolution.created);
//!
//! let outcome = client.build_record().await?;
//! assert!(outcome.is_clean());
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod core;
pub mod fabric;
pub mod notify;
pub mod version;

// Re-export main types for convenience
pub use crate::core::{
    EditOutcome, ErrorKind, FabricError, FabricOperation, GlobalId, ObjectIdReservation,
    ParcelFeatureRef, Record, RequestParams, Result, SessionId,
};
pub use connection::{
    FabricTransport,
    config::{FabricConfig, RecordMatchPolicy, SpatialReference},
    http::HttpTransport,
};
pub use fabric::{FabricClient, RecordResolution, Released, in_memory, payload};
pub use notify::{Notice, Notifier, TracingNotifier};
pub use version::{SessionMode, SessionTicket, VersionContext};
