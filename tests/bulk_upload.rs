//! End-to-end bulk upload test against a local HTTP sink.
//!
//! Spins up an axum server that records every `/_bulk` body it receives and
//! answers with a canned bulk response, then drives the indexer through it
//! and checks the wire framing and the side files.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use sqltoelastic::elastic::BulkIndexer;
use sqltoelastic::{Config, Document, FieldValue};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Received {
    bodies: Arc<Mutex<Vec<String>>>,
}

async fn bulk_handler(State(state): State<Received>, body: String) -> Json<serde_json::Value> {
    let docs = body.lines().count() / 2;
    state.bodies.lock().unwrap().push(body);

    let items: Vec<serde_json::Value> = (0..docs)
        .map(|_| serde_json::json!({"index": {"result": "created", "status": 201}}))
        .collect();
    Json(serde_json::json!({"took": 3, "errors": false, "items": items}))
}

fn doc(id: i64, day: u32) -> Document {
    let mut doc = Document::new();
    doc.insert("id", FieldValue::Int64(id));
    doc.insert(
        "added",
        FieldValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        ),
    );
    doc.insert("msg", FieldValue::String("hello".into()));
    doc
}

#[tokio::test]
async fn uploads_documents_and_writes_side_files() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("sqltoelastic=debug")
        .try_init()
        .ok();

    let received = Received::default();
    let app = Router::new()
        .route("/_bulk", post(bulk_handler))
        .with_state(received.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Side files land in the working directory; isolate the test run.
    let workdir = tempfile::tempdir()?;
    std::env::set_current_dir(workdir.path())?;

    let config = Config {
        elasticserverurl: format!("http://{addr}"),
        indexname: "logs".into(),
        timestampfield: "added".into(),
        idfield: "id".into(),
        idprefix: "row-".into(),
        ..Config::default()
    };

    let indexer = BulkIndexer::new(&config)?;
    indexer
        .put_into_index(vec![doc(1, 5), doc(2, 6)])
        .await?;

    let bodies = received.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);

    let lines: Vec<&str> = bodies[0].lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        r#"{"index":{"_index":"logs-2024.03","_id":"row-1"}}"#
    );
    let first: serde_json::Value = serde_json::from_str(lines[1])?;
    assert_eq!(first["@timestamp"], "2024-03-05T10:00:00");
    assert_eq!(first["msg"], "hello");
    assert_eq!(
        lines[2],
        r#"{"index":{"_index":"logs-2024.03","_id":"row-2"}}"#
    );

    // The batch body is persisted before transmission, and the parsed
    // response afterwards.
    let audit = std::fs::read_to_string(workdir.path().join("bulkdata_0.txt"))?;
    assert_eq!(audit, bodies[0]);
    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(workdir.path().join("result.json"))?)?;
    assert_eq!(result["items"].as_array().unwrap().len(), 2);

    Ok(())
}

#[tokio::test]
async fn missing_timestamp_after_a_flush_still_fails_the_run(
) -> Result<(), Box<dyn std::error::Error>> {
    let received = Received::default();
    let app = Router::new()
        .route("/_bulk", post(bulk_handler))
        .with_state(received.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = Config {
        elasticserverurl: format!("http://{addr}"),
        indexname: "logs".into(),
        timestampfield: "added".into(),
        idfield: "id".into(),
        ..Config::default()
    };

    // No flush happens before the bad document is reached (the batch bound
    // is 10,000), so the failure surfaces before any request.
    let mut bad = Document::new();
    bad.insert("id", FieldValue::Int64(3));

    let indexer = BulkIndexer::new(&config)?;
    let err = indexer
        .put_into_index(vec![doc(1, 5), bad])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        sqltoelastic::Error::MissingTimestampField(f) if f == "added"
    ));
    assert!(received.bodies.lock().unwrap().is_empty());

    Ok(())
}
