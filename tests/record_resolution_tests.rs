/// Record resolution tests
///
/// Find-or-create of the active record against in-memory services.
/// Run with: cargo test --test record_resolution_tests
mod common;

use common::{APPLY_EDITS, BASE_URL, QUERY, VERSION, harness, harness_with};
use parcelfab::in_memory::{
    RecordedCall, add_failure_response, add_success_response, record_query_response,
};
use parcelfab::{
    ErrorKind, FabricConfig, FabricError, GlobalId, Notice, Record, RecordMatchPolicy,
};

const GENERATED: &str = "0f4c5b2a-6e31-4e4b-9d0b-0a6b3c1d2e4f";
const GENERATED_GLOBAL_ID: &str = "{0F4C5B2A-6E31-4E4B-9D0B-0A6B3C1D2E4F}";

#[tokio::test]
async fn test_existing_record_is_reused_without_create() {
    let h = harness();
    h.transport
        .respond(QUERY, record_query_response(&[("Record001", "{EXISTING-GUID}")]));

    let resolution = h.client.resolve_record("Record001").await.unwrap();

    assert!(!resolution.created);
    assert_eq!(resolution.record.id().as_str(), "{EXISTING-GUID}");
    assert_eq!(h.journal.labels(), vec!["post:query"]);
    assert_eq!(h.context.sessions_started(), 0);

    let active = h.client.active_record().await.unwrap();
    assert_eq!(active, Record::new("Record001", GlobalId::new("{EXISTING-GUID}")));
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::RecordReused {
            name: "Record001".to_string()
        }]
    );
}

#[tokio::test]
async fn test_record_query_is_scoped_to_version() {
    let h = harness();
    h.transport
        .respond(QUERY, record_query_response(&[("Record001", "{EXISTING-GUID}")]));

    h.client.resolve_record("Record001").await.unwrap();

    let queries = h.journal.posts_to(QUERY);
    assert_eq!(queries.len(), 1);
    let query = &queries[0];
    assert_eq!(query.get("where"), Some("Name = 'Record001'"));
    assert_eq!(query.get("outFields"), Some("OBJECTID,Name,GlobalID"));
    assert_eq!(query.get("gdbVersion"), Some(VERSION));
    assert_eq!(query.get("f"), Some("json"));
}

#[tokio::test]
async fn test_missing_record_is_created_in_one_session() {
    let h = harness_with(FabricConfig::new(BASE_URL), |context| {
        context.with_first_object_id(812).with_unique_ids([GENERATED])
    });
    h.transport.respond(QUERY, record_query_response(&[]));
    h.transport.respond(
        APPLY_EDITS,
        add_success_response(1, 812, "{ECHOED-RECORD-GUID}"),
    );

    let resolution = h.client.resolve_record("Record001").await.unwrap();

    assert!(resolution.created);
    assert!(resolution.release_error.is_none());
    assert_eq!(
        h.journal.labels(),
        vec!["post:query", "start", "reserve", "uuid", "post:applyEdits", "stop"]
    );

    let reserve = h
        .journal
        .calls()
        .into_iter()
        .find(|call| matches!(call, RecordedCall::ReserveObjectIds { .. }))
        .unwrap();
    assert_eq!(
        reserve,
        RecordedCall::ReserveObjectIds {
            target_url: format!("{}FeatureServer/1", BASE_URL),
            count: 1,
        }
    );

    let active = h.client.active_record().await.unwrap();
    assert_eq!(active.name(), "Record001");
    assert_eq!(active.id().as_str(), "{ECHOED-RECORD-GUID}");
    assert!(!h.context.is_session_open());
}

#[tokio::test]
async fn test_create_posts_generated_global_id_and_name() {
    let h = harness_with(FabricConfig::new(BASE_URL), |context| {
        context.with_first_object_id(812).with_unique_ids([GENERATED])
    });
    h.transport.respond(QUERY, record_query_response(&[]));
    h.transport
        .respond(APPLY_EDITS, add_success_response(1, 812, GENERATED_GLOBAL_ID));

    h.client.resolve_record("Record001").await.unwrap();

    let posts = h.journal.posts_to(APPLY_EDITS);
    assert_eq!(posts.len(), 1);
    let params = &posts[0];
    assert_eq!(params.get("sessionId"), Some("session-1"));
    assert_eq!(params.get("gdbVersion"), Some(VERSION));
    assert_eq!(params.get("rollbackOnFailure"), Some("true"));
    assert_eq!(params.get("useGlobalIds"), Some("true"));
    assert_eq!(
        params.get("returnServiceEditsOption"),
        Some("originalAndCurrentFeatures")
    );

    let edits = params.get_json("edits").unwrap();
    let attributes = &edits[0]["adds"][0]["attributes"];
    assert_eq!(attributes["globalid"], GENERATED_GLOBAL_ID);
    assert_eq!(attributes["name"], "Record001");
    assert_eq!(attributes["objectid"], 812);
    assert_eq!(edits[0]["adds"][0]["geometry"]["rings"], serde_json::json!([]));
}

#[tokio::test]
async fn test_transport_error_on_create_still_stops_session() {
    let h = harness();
    h.transport.respond(QUERY, record_query_response(&[]));
    h.transport
        .fail(APPLY_EDITS, FabricError::Transport("connection reset".to_string()));

    let err = h.client.resolve_record("Record001").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(h.client.active_record().await.is_none());
    assert_eq!(h.journal.count("stop"), 1);
    assert!(!h.context.is_session_open());
    assert!(matches!(
        h.notifier.notices().last(),
        Some(Notice::OperationFailed { operation, .. }) if operation == "createRecord"
    ));
}

#[tokio::test]
async fn test_rejected_add_leaves_previous_record_active() {
    let h = harness();
    let previous = Record::new("Record000", GlobalId::new("{PREVIOUS}"));
    h.client.set_active_record(previous.clone()).await;
    h.transport.respond(QUERY, record_query_response(&[]));
    h.transport
        .respond(APPLY_EDITS, add_failure_response(1, "Field name is required"));

    let err = h.client.resolve_record("Record001").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert!(err.to_string().contains("Field name is required"));
    assert_eq!(h.client.active_record().await, Some(previous));
    assert_eq!(h.journal.count("stop"), 1);
}

#[tokio::test]
async fn test_reservation_failure_skips_add_and_stops_session() {
    let h = harness();
    h.transport.respond(QUERY, record_query_response(&[]));
    h.context
        .fail_reserve_with(FabricError::Transport("reserve timed out".to_string()));

    let err = h.client.resolve_record("Record001").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(h.journal.labels(), vec!["post:query", "start", "reserve", "stop"]);
    assert!(h.journal.posts_to(APPLY_EDITS).is_empty());
}

#[tokio::test]
async fn test_session_start_failure_issues_no_edit_calls() {
    let h = harness();
    h.transport.respond(QUERY, record_query_response(&[]));
    h.context
        .fail_start_with(FabricError::SessionStart("version is locked".to_string()));

    let err = h.client.resolve_record("Record001").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Session);
    assert!(err.is_retry_safe());
    assert_eq!(h.journal.labels(), vec!["post:query", "start"]);
}

#[tokio::test]
async fn test_leaked_session_on_create_is_surfaced() {
    let h = harness();
    h.transport.respond(QUERY, record_query_response(&[]));
    h.transport
        .respond(APPLY_EDITS, add_success_response(1, 1, "{NEW-RECORD}"));
    h.context
        .fail_stop_with(FabricError::SessionStop("service unavailable".to_string()));

    let resolution = h.client.resolve_record("Record001").await.unwrap();

    assert!(resolution.created);
    let release_error = resolution.release_error.unwrap();
    assert_eq!(release_error.kind(), ErrorKind::Session);
    assert_eq!(
        h.client.active_record().await.unwrap().id().as_str(),
        "{NEW-RECORD}"
    );
    assert!(
        h.notifier
            .notices()
            .iter()
            .any(|notice| matches!(notice, Notice::SessionLeaked { .. }))
    );
}

#[tokio::test]
async fn test_first_match_wins_by_default() {
    let h = harness();
    h.transport.respond(
        QUERY,
        record_query_response(&[("Record001", "{FIRST}"), ("Record001", "{SECOND}")]),
    );

    let resolution = h.client.resolve_record("Record001").await.unwrap();

    assert_eq!(resolution.record.id().as_str(), "{FIRST}");
}

#[tokio::test]
async fn test_ambiguous_name_rejected_by_policy() {
    let h = harness_with(
        FabricConfig::new(BASE_URL).record_match(RecordMatchPolicy::RejectAmbiguous),
        |context| context,
    );
    h.transport.respond(
        QUERY,
        record_query_response(&[("Record001", "{FIRST}"), ("Record001", "{SECOND}")]),
    );

    let err = h.client.resolve_record("Record001").await.unwrap_err();

    assert!(matches!(err, FabricError::AmbiguousRecord { matches: 2, .. }));
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(h.client.active_record().await.is_none());
    assert_eq!(h.context.sessions_started(), 0);
}

#[tokio::test]
async fn test_quotes_in_record_name_are_escaped() {
    let h = harness();
    h.transport
        .respond(QUERY, record_query_response(&[("O'Neil Plat", "{ONEIL}")]));

    h.client.resolve_record("O'Neil Plat").await.unwrap();

    let query = &h.journal.posts_to(QUERY)[0];
    assert_eq!(query.get("where"), Some("Name = 'O''Neil Plat'"));
}

#[tokio::test]
async fn test_blank_record_name_is_rejected_before_any_call() {
    let h = harness();

    let err = h.client.resolve_record("   ").await.unwrap_err();

    assert!(matches!(err, FabricError::InvalidInput(_)));
    assert!(h.journal.is_empty());
}

#[tokio::test]
async fn test_record_exists_and_find_do_not_change_active_record() {
    let h = harness();
    h.transport
        .respond(QUERY, record_query_response(&[("Record001", "{EXISTING}")]));

    assert!(h.client.record_exists("Record001").await.unwrap());
    let found = h.client.find_record("Record001").await.unwrap().unwrap();
    assert_eq!(found.id().as_str(), "{EXISTING}");
    assert!(h.client.active_record().await.is_none());
}

#[tokio::test]
async fn test_create_record_skips_lookup() {
    let h = harness();
    h.transport
        .respond(APPLY_EDITS, add_success_response(1, 5, "{CREATED}"));

    let resolution = h.client.create_record("Record002").await.unwrap();

    assert!(resolution.created);
    assert_eq!(
        h.journal.labels(),
        vec!["start", "reserve", "uuid", "post:applyEdits", "stop"]
    );
    assert_eq!(resolution.record.name(), "Record002");
}

#[tokio::test]
async fn test_clear_active_record() {
    let h = harness();
    h.transport
        .respond(QUERY, record_query_response(&[("Record001", "{EXISTING}")]));
    h.client.resolve_record("Record001").await.unwrap();

    h.client.clear_active_record().await;

    assert!(h.client.active_record().await.is_none());
}
