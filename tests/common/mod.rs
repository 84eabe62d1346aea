#![allow(dead_code)]

use parcelfab::in_memory::{CallJournal, InMemoryNotifier, InMemoryTransport, InMemoryVersionContext};
use parcelfab::{FabricClient, FabricConfig, GlobalId, Record};
use std::sync::Arc;

pub const BASE_URL: &str = "https://gis.example.com/server/rest/services/Parcels/";
pub const VERSION: &str = "ADMIN.EditorJS";

pub const QUERY: &str = "FeatureServer/1/query";
pub const APPLY_EDITS: &str = "FeatureServer/applyEdits";

pub struct Harness {
    pub journal: CallJournal,
    pub context: Arc<InMemoryVersionContext>,
    pub transport: Arc<InMemoryTransport>,
    pub notifier: Arc<InMemoryNotifier>,
    pub client: FabricClient,
}

pub fn harness() -> Harness {
    harness_with(FabricConfig::new(BASE_URL), |context| context)
}

pub fn harness_with(
    config: FabricConfig,
    configure: impl FnOnce(InMemoryVersionContext) -> InMemoryVersionContext,
) -> Harness {
    let journal = CallJournal::new();
    let context = Arc::new(configure(InMemoryVersionContext::new(VERSION, journal.clone())));
    let transport = Arc::new(InMemoryTransport::new(journal.clone()));
    let notifier = Arc::new(InMemoryNotifier::new());
    let client = FabricClient::new(config, context.clone(), transport.clone())
        .unwrap()
        .with_notifier(notifier.clone());

    Harness {
        journal,
        context,
        transport,
        notifier,
        client,
    }
}

/// Harness whose client already has `record_id` as its active record.
pub async fn harness_with_record(record_id: &str) -> Harness {
    let harness = harness();
    harness
        .client
        .set_active_record(Record::new("Record001", GlobalId::new(record_id)))
        .await;
    harness
}

pub fn operation(endpoint: &str) -> String {
    format!("ParcelFabricServer/{}", endpoint)
}
