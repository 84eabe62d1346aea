pub mod config;
pub mod http;

use crate::core::{RequestParams, Result};
use async_trait::async_trait;

/// Network boundary to the feature and parcel fabric services.
///
/// One call is one request: the parameter set goes out form-encoded and the
/// JSON body comes back untouched. Implementations must not retry; a mutation
/// that reached the server may already be committed.
#[async_trait]
pub trait FabricTransport: Send + Sync {
    async fn post(&self, url: &str, params: &RequestParams) -> Result<serde_json::Value>;
}
