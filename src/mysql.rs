//! MySQL row extraction.
//!
//! Runs the configured query over the text protocol and converts each
//! column into the closed [`FieldValue`] kind set. MySQL delivers most
//! text-protocol values as byte strings, so conversion dispatches on the
//! declared column type, mirroring how the wire actually behaves.

use crate::error::{Error, Result};
use crate::transform::FieldRules;
use crate::types::{Document, FieldValue};
use chrono::{NaiveDate, NaiveDateTime};
use mysql_async::consts::ColumnType;
use mysql_async::{prelude::*, Pool, Row, Value};
use tracing::warn;

pub async fn extract(connstr: &str, sql: &str, rules: &FieldRules) -> Result<Vec<Document>> {
    let pool = Pool::from_url(connstr).map_err(|e| Error::connection("mysql", e))?;
    let mut conn = pool
        .get_conn()
        .await
        .map_err(|e| Error::connection("mysql", e))?;

    let rows: Vec<Row> = conn.query(sql).await.map_err(|e| Error::query("mysql", e))?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in &rows {
        let columns = row.columns_ref();
        let mut doc = Document::new();
        for (i, column) in columns.iter().enumerate() {
            let name = column.name_str();
            let raw = row.as_ref(i).unwrap_or(&Value::NULL);
            if let Some(value) = convert_mysql_value(&name, column.column_type(), raw, rules) {
                doc.insert(name.to_string(), value);
            }
        }
        rules.inject_constants(&mut doc);
        documents.push(doc);
    }

    drop(conn);
    pool.disconnect()
        .await
        .map_err(|e| Error::connection("mysql", e))?;

    Ok(documents)
}

/// Convert one column value, or `None` to omit the field.
///
/// SQL NULL is omitted silently; a column type outside the supported set is
/// omitted with a warning naming the column and its type.
fn convert_mysql_value(
    name: &str,
    col_type: ColumnType,
    value: &Value,
    rules: &FieldRules,
) -> Option<FieldValue> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => {
            let s = String::from_utf8_lossy(bytes).to_string();
            match col_type {
                col_type if col_type.is_character_type() => Some(rules.apply_string(name, s)),
                // The server returns JSON columns as text, so the
                // expand-json rule set decides whether they stay strings.
                ColumnType::MYSQL_TYPE_JSON => Some(rules.apply_string(name, s)),
                ColumnType::MYSQL_TYPE_SHORT => {
                    parse_or_warn(name, col_type, &s, |v| v.parse().map(FieldValue::Int16))
                }
                ColumnType::MYSQL_TYPE_LONG | ColumnType::MYSQL_TYPE_INT24 => {
                    parse_or_warn(name, col_type, &s, |v| v.parse().map(FieldValue::Int32))
                }
                ColumnType::MYSQL_TYPE_LONGLONG => {
                    parse_or_warn(name, col_type, &s, |v| v.parse().map(FieldValue::Int64))
                }
                ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => {
                    match NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f") {
                        Ok(dt) => Some(FieldValue::DateTime(dt)),
                        Err(e) => {
                            warn!(column = name, value = %s, "unparseable MySQL datetime, omitting field: {e}");
                            None
                        }
                    }
                }
                ColumnType::MYSQL_TYPE_DATE => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                    Ok(date) => date.and_hms_opt(0, 0, 0).map(FieldValue::DateTime),
                    Err(e) => {
                        warn!(column = name, value = %s, "unparseable MySQL date, omitting field: {e}");
                        None
                    }
                },
                other => {
                    warn!(column = name, column_type = ?other, "unmapped MySQL column type, omitting field");
                    None
                }
            }
        }
        // Binary-protocol shapes, kept for completeness.
        Value::Int(i) => integer_by_width(col_type, *i),
        Value::UInt(u) => {
            if *u > i64::MAX as u64 {
                warn!(column = name, value = *u, "unsigned value exceeds i64, omitting field");
                None
            } else {
                integer_by_width(col_type, *u as i64)
            }
        }
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let date =
                NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day))?;
            let dt = date.and_hms_micro_opt(
                u32::from(*hour),
                u32::from(*minute),
                u32::from(*second),
                *micros,
            )?;
            Some(FieldValue::DateTime(dt))
        }
        other => {
            warn!(column = name, value = ?other, column_type = ?col_type, "unmapped MySQL value kind, omitting field");
            None
        }
    }
}

fn integer_by_width(col_type: ColumnType, v: i64) -> Option<FieldValue> {
    match col_type {
        ColumnType::MYSQL_TYPE_SHORT => i16::try_from(v).ok().map(FieldValue::Int16),
        ColumnType::MYSQL_TYPE_LONG | ColumnType::MYSQL_TYPE_INT24 => {
            i32::try_from(v).ok().map(FieldValue::Int32)
        }
        _ => Some(FieldValue::Int64(v)),
    }
}

fn parse_or_warn(
    name: &str,
    col_type: ColumnType,
    s: &str,
    parse: impl Fn(&str) -> std::result::Result<FieldValue, std::num::ParseIntError>,
) -> Option<FieldValue> {
    match parse(s) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(column = name, column_type = ?col_type, value = %s, "unparseable MySQL integer, omitting field: {e}");
            None
        }
    }
}
