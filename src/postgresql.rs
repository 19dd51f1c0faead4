//! PostgreSQL row extraction.
//!
//! Connects with `tokio-postgres`, drives the connection on a spawned task,
//! and converts each column by an explicit match over the declared type.

use crate::error::{Error, Result};
use crate::transform::FieldRules;
use crate::types::{Document, FieldValue};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};
use tracing::{error, warn};

pub async fn extract(connstr: &str, sql: &str, rules: &FieldRules) -> Result<Vec<Document>> {
    let (client, connection) = tokio_postgres::connect(connstr, NoTls)
        .await
        .map_err(|e| Error::connection("postgres", e))?;

    // The connection object performs the actual I/O; it runs until the
    // client is dropped at the end of this function.
    let handle = tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("postgres connection error: {e}");
        }
    });

    let rows = client
        .query(sql, &[])
        .await
        .map_err(|e| Error::query("postgres", e))?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut doc = Document::new();
        for (i, column) in row.columns().iter().enumerate() {
            if let Some(value) = convert_postgres_value(row, i, rules)? {
                doc.insert(column.name().to_string(), value);
            }
        }
        rules.inject_constants(&mut doc);
        documents.push(doc);
    }

    drop(client);
    handle.await.ok();

    Ok(documents)
}

/// Convert one column value, or `None` to omit the field.
fn convert_postgres_value(
    row: &Row,
    index: usize,
    rules: &FieldRules,
) -> Result<Option<FieldValue>> {
    let column = &row.columns()[index];
    let name = column.name();

    let value = match *column.type_() {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(FieldValue::Int16),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(FieldValue::Int32),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(FieldValue::Int64),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(FieldValue::DateTime),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<FixedOffset>>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(FieldValue::DateTimeOffset),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(FieldValue::DateTime),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
            .try_get::<_, Option<String>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(|s| rules.apply_string(name, s)),
        // JSON columns arrive as structured values; their text form runs
        // through the rule set exactly like any other string column.
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .map_err(|e| Error::query("postgres", e))?
            .map(|v| rules.apply_string(name, v.to_string())),
        ref other => {
            warn!(column = name, column_type = %other, "unmapped PostgreSQL column type, omitting field");
            None
        }
    };

    Ok(value)
}
