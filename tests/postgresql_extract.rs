//! PostgreSQL extraction round-trip test.
//!
//! Needs a reachable server; set `SQLTOELASTIC_TEST_POSTGRES_URL` (for
//! example `host=localhost user=postgres password=postgres dbname=testdb`)
//! to enable it.

use chrono::NaiveDate;
use sqltoelastic::{source, Config, FieldRules, FieldValue};
use tokio_postgres::NoTls;

#[tokio::test]
async fn postgres_round_trips_supported_column_types() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(url) = std::env::var("SQLTOELASTIC_TEST_POSTGRES_URL") else {
        eprintln!("SQLTOELASTIC_TEST_POSTGRES_URL not set, skipping");
        return Ok(());
    };

    tracing_subscriber::fmt()
        .with_env_filter("sqltoelastic=debug")
        .try_init()
        .ok();

    let (client, connection) = tokio_postgres::connect(&url, NoTls).await?;
    tokio::spawn(connection);
    client
        .batch_execute(
            "DROP TABLE IF EXISTS sqltoelastic_roundtrip;
             CREATE TABLE sqltoelastic_roundtrip (
                 id BIGINT NOT NULL,
                 small SMALLINT,
                 level VARCHAR(16),
                 added TIMESTAMP,
                 seen TIMESTAMPTZ,
                 missing TEXT
             );
             INSERT INTO sqltoelastic_roundtrip VALUES
                 (42, 7, 'WARN', '2024-03-05 10:00:00',
                  '2024-01-15 00:00:00+02:00', NULL);",
        )
        .await?;
    drop(client);

    let config = Config {
        tolowerfields: vec!["level".into()],
        addconstantfields: vec!["source=audit".into()],
        ..Config::default()
    };
    let rules = FieldRules::from_config(&config);
    let docs = source::get_rows(
        "postgres",
        &url,
        "SELECT * FROM sqltoelastic_roundtrip",
        &rules,
    )
    .await?;

    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.get("id"), Some(&FieldValue::Int64(42)));
    assert_eq!(doc.get("small"), Some(&FieldValue::Int16(7)));
    assert_eq!(doc.get("level"), Some(&FieldValue::String("warn".into())));
    assert_eq!(
        doc.get("added"),
        Some(&FieldValue::DateTime(
            NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        ))
    );
    // Zoned values stay distinct from naive ones.
    assert!(matches!(
        doc.get("seen"),
        Some(FieldValue::DateTimeOffset(_))
    ));
    assert_eq!(doc.get("missing"), None);
    assert_eq!(doc.get("source"), Some(&FieldValue::String("audit".into())));

    Ok(())
}
