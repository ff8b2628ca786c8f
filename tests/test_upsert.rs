mod common;

use common::{payload, FailingStore};
use docshard::entities::{job_parameters, job_parameters_db};
use docshard::store::InMemoryStore;
use docshard::{
    DocShardError, DocumentStore, EntitySchema, FieldType, FixedClock, IndexStatus, ManualClock,
    UnknownFieldPolicy, Upserter,
};
use serde_json::json;
use std::sync::Arc;

fn db_at(now_ms: i64) -> Upserter<Arc<InMemoryStore>, FixedClock> {
    Upserter::with_clock(
        job_parameters(),
        Arc::new(InMemoryStore::new()),
        FixedClock(now_ms),
    )
}

// ============================================================
// END TO END
// ============================================================

#[tokio::test]
async fn running_job_lands_in_its_bucket() {
    let now = 1_718_000_000_123;
    let db = db_at(now);

    let receipt = db
        .upsert("LHCb", 2_450_321u64, payload(json!({"Status": "Running"})))
        .await
        .unwrap();

    assert_eq!(receipt.index, "job_parameters_lhcb_2m");
    assert_eq!(receipt.timestamp_ms, now);
    assert_eq!(receipt.index_status, IndexStatus::Created);

    let stored = db
        .store()
        .get_document("job_parameters_lhcb_2m", receipt.doc_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored,
        payload(json!({"JobID": 2450321, "timestamp": now, "Status": "Running"}))
    );
    assert_eq!(db.store().index_names(), vec!["job_parameters_lhcb_2m"]);
}

#[tokio::test]
async fn tenant_case_does_not_split_data() {
    let db = db_at(1);
    db.upsert("LHCb", 10u64, payload(json!({"Status": "Waiting"})))
        .await
        .unwrap();
    db.upsert("lhcb", 11u64, payload(json!({"Status": "Waiting"})))
        .await
        .unwrap();
    db.upsert("LHCB", 10u64, payload(json!({"Status": "Done"})))
        .await
        .unwrap();

    assert_eq!(db.store().index_names(), vec!["job_parameters_lhcb_0m"]);
    assert_eq!(db.store().document_count("job_parameters_lhcb_0m"), 2);
    let stored = db.get("lhcb", 10u64).await.unwrap().unwrap();
    assert_eq!(stored["Status"], "Done");
}

#[tokio::test]
async fn tenants_are_isolated() {
    let db = db_at(1);
    db.upsert("lhcb", 5u64, payload(json!({"Status": "Running"})))
        .await
        .unwrap();
    db.upsert("dteam", 5u64, payload(json!({"Status": "Failed"})))
        .await
        .unwrap();

    assert_eq!(
        db.store().index_names(),
        vec!["job_parameters_dteam_0m", "job_parameters_lhcb_0m"]
    );
    assert_eq!(
        db.get("lhcb", 5u64).await.unwrap().unwrap()["Status"],
        "Running"
    );
    assert_eq!(
        db.get("dteam", 5u64).await.unwrap().unwrap()["Status"],
        "Failed"
    );
}

#[tokio::test]
async fn bucket_boundaries_pick_distinct_indices() {
    let db = db_at(1);
    for id in [0u64, 999_999, 1_000_000] {
        db.upsert("vo", id, payload(json!({}))).await.unwrap();
    }
    assert_eq!(
        db.store().index_names(),
        vec!["job_parameters_vo_0m", "job_parameters_vo_1m"]
    );
    assert_eq!(db.store().document_count("job_parameters_vo_0m"), 2);
    assert_eq!(
        db.store().mapping("job_parameters_vo_1m").unwrap(),
        job_parameters().mapping()
    );
}

// ============================================================
// IDEMPOTENCE AND PRECEDENCE
// ============================================================

#[tokio::test]
async fn repeated_upsert_replaces_and_restamps() {
    let clock = Arc::new(ManualClock::new(1_000));
    let db = Upserter::with_clock(job_parameters(), InMemoryStore::new(), Arc::clone(&clock));
    let body = json!({"Status": "Running", "HostName": "wn-1", "Memory(kB)": 2048});

    let first = db.upsert("lhcb", 42u64, payload(body.clone())).await.unwrap();
    clock.advance(500);
    let second = db.upsert("lhcb", 42u64, payload(body.clone())).await.unwrap();

    assert_eq!(first.index_status, IndexStatus::Created);
    assert_eq!(second.index_status, IndexStatus::AlreadyExists);
    assert!(second.timestamp_ms >= first.timestamp_ms);

    let stored = db.get("lhcb", 42u64).await.unwrap().unwrap();
    assert_eq!(stored["timestamp"], 1_500);
    for (key, value) in body.as_object().unwrap() {
        assert_eq!(&stored[key], value, "field {}", key);
    }
    assert_eq!(db.store().document_count("job_parameters_lhcb_0m"), 1);
    assert_eq!(db.store().write_count(), 2);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let db = db_at(7);
    db.upsert("lhcb", 9u64, payload(json!({"Status": "Running", "GridCE": "ce01"})))
        .await
        .unwrap();
    db.upsert("lhcb", 9u64, payload(json!({"Status": "Done"})))
        .await
        .unwrap();

    let stored = db.get("lhcb", 9u64).await.unwrap().unwrap();
    assert_eq!(stored["Status"], "Done");
    assert_eq!(stored["GridCE"], "ce01");
}

#[tokio::test]
async fn injected_fields_override_payload() {
    let db = db_at(99);
    db.upsert(
        "lhcb",
        123u64,
        payload(json!({"JobID": 555, "timestamp": 1, "Status": "Running"})),
    )
    .await
    .unwrap();

    let stored = db.get("lhcb", 123u64).await.unwrap().unwrap();
    assert_eq!(stored["JobID"], 123);
    assert_eq!(stored["timestamp"], 99);
}

#[tokio::test]
async fn passthrough_schema_stores_undeclared_fields() {
    let schema = EntitySchema::builder("pilot_logs")
        .identity_field("PilotID")
        .add_field("Site", FieldType::Keyword)
        .unknown_fields(UnknownFieldPolicy::Passthrough)
        .build()
        .unwrap();
    let db = Upserter::with_clock(Arc::new(schema), InMemoryStore::new(), FixedClock(3));

    let receipt = db
        .upsert(
            "dteam",
            17u64,
            payload(json!({"Site": "CERN", "Extra": {"retries": 2}, "Note": "slow"})),
        )
        .await
        .unwrap();

    assert_eq!(receipt.index, "pilot_logs_dteam_0m");
    assert_eq!(
        db.store().mapping("pilot_logs_dteam_0m").unwrap()["dynamic"],
        "true"
    );
    let stored = db.get("dteam", 17u64).await.unwrap().unwrap();
    assert_eq!(
        stored,
        payload(json!({
            "PilotID": 17,
            "timestamp": 3,
            "Site": "CERN",
            "Extra": {"retries": 2},
            "Note": "slow"
        }))
    );
}

// ============================================================
// REJECTIONS
// ============================================================

#[tokio::test]
async fn undeclared_field_is_rejected_without_write() {
    let db = db_at(1);
    let err = db
        .upsert("lhcb", 1u64, payload(json!({"Status": "Running", "Foo": "bar"})))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DocShardError::SchemaViolation { ref field, .. } if field == "Foo"
    ));
    assert!(err.is_validation());
    assert_eq!(db.store().write_count(), 0);
    assert!(db.store().index_names().is_empty());
}

#[tokio::test]
async fn wrong_value_type_is_rejected() {
    let db = db_at(1);
    let err = db
        .upsert("lhcb", 1u64, payload(json!({"Memory(kB)": "lots"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DocShardError::TypeMismatch { .. }));
    assert_eq!(db.store().write_count(), 0);
}

#[tokio::test]
async fn out_of_range_numbers_are_rejected_without_write() {
    let db = db_at(1);
    let err = db
        .upsert("lhcb", 1u64, payload(json!({"Memory(kB)": u64::MAX})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DocShardError::TypeMismatch { ref field, .. } if field == "Memory(kB)"
    ));

    let err = db
        .upsert("lhcb", u64::MAX, payload(json!({"Status": "Running"})))
        .await
        .unwrap_err();
    assert!(matches!(err, DocShardError::InvalidDocumentId(_)));

    assert_eq!(db.store().write_count(), 0);
    assert!(db.store().index_names().is_empty());
}

#[tokio::test]
async fn malformed_ids_are_rejected_before_the_store() {
    let store = Arc::new(FailingStore::default());
    let db = Upserter::new(job_parameters(), Arc::clone(&store));

    for err in [
        db.upsert("lhcb", -5i64, payload(json!({}))).await.unwrap_err(),
        db.upsert("lhcb", "12a", payload(json!({}))).await.unwrap_err(),
        db.upsert("lhcb", &json!(3.25), payload(json!({}))).await.unwrap_err(),
    ] {
        assert!(matches!(err, DocShardError::InvalidDocumentId(_)), "{err}");
    }
    for tenant in ["bad/tenant", "lhc%62"] {
        let err = db
            .upsert(tenant, 1u64, payload(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DocShardError::InvalidTenant(_)), "{tenant}");
    }

    assert_eq!(store.ensures(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn store_failure_is_propagated() {
    let store = Arc::new(FailingStore::default());
    let db = job_parameters_db(Arc::clone(&store));

    let err = db
        .upsert("lhcb", 1u64, payload(json!({"Status": "Running"})))
        .await
        .unwrap_err();

    assert!(matches!(err, DocShardError::Unavailable(_)));
    assert!(!err.is_validation());
    assert_eq!(store.writes(), 1, "no retry inside the upsert path");
}

// ============================================================
// CONCURRENCY
// ============================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_share_one_upserter() {
    let db = Arc::new(db_at(5));
    let mut handles = Vec::new();
    for i in 0..64u64 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            let id = i * 250_000;
            db.upsert("lhcb", id, payload(json!({"Status": "Running"})))
                .await
                .map(|r| r.index)
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let names = db.store().index_names();
    assert_eq!(names.len(), 16);
    let total: usize = names
        .iter()
        .map(|n| db.store().document_count(n))
        .sum();
    assert_eq!(total, 64);
}
