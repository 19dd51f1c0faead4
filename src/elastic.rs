//! Bulk upload of documents into a date-partitioned index.
//!
//! Documents are routed to `{indexname}-{YYYY.MM}` by their timestamp
//! field, framed as newline-delimited action/document line pairs, and
//! POSTed to `{serverurl}/_bulk` in batches of 10,000. Per-item outcomes
//! from each response are aggregated across the whole run; each batch body
//! is persisted to a numbered side file before transmission.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Document, FieldValue};
use base64::Engine as _;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// Documents per bulk request.
const BATCH_SIZE: usize = 10_000;

/// File the most recent parsed bulk response is saved to.
const RESULT_FILE: &str = "result.json";

/// Accumulates action/document line pairs until a batch is full.
///
/// The buffer owns its storage and resets itself when a batch is taken, so
/// ownership and reset timing are explicit.
#[derive(Debug, Default)]
pub struct BulkBuffer {
    body: String,
    rows: usize,
}

impl BulkBuffer {
    /// Append one line pair. Returns the complete batch body when this
    /// append hits the batch bound, leaving the buffer empty.
    pub fn append(&mut self, action_line: &str, document_line: &str) -> Option<String> {
        self.body.push_str(action_line);
        self.body.push('\n');
        self.body.push_str(document_line);
        self.body.push('\n');
        self.rows += 1;
        if self.rows == BATCH_SIZE {
            self.rows = 0;
            Some(std::mem::take(&mut self.body))
        } else {
            None
        }
    }

    /// Take the final partial batch, if any rows remain.
    pub fn finish(self) -> Option<String> {
        if self.body.is_empty() {
            None
        } else {
            Some(self.body)
        }
    }
}

/// Per-item outcomes aggregated across every flushed batch.
#[derive(Debug, Default)]
pub struct BulkOutcomes {
    results: BTreeMap<String, u64>,
    statuses: BTreeMap<String, u64>,
    errors: Vec<String>,
    last_response: Option<serde_json::Value>,
}

impl BulkOutcomes {
    /// Digest one flush's response body.
    ///
    /// A body that is not JSON, or JSON without an `items` array, is logged
    /// and skipped; both are degraded-but-tolerated server behaviors.
    pub fn record_response(&mut self, body: &str) {
        let parsed: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => {
                warn!("bulk response was not JSON: {body}");
                return;
            }
        };

        let Some(items) = parsed.get("items").and_then(|v| v.as_array()) else {
            warn!("bulk response had no items array: {parsed}");
            self.last_response = Some(parsed);
            return;
        };

        for item in items {
            let Some(index) = item.get("index") else {
                continue;
            };
            // A single item may carry both a result label and an error
            // reason; the tallies are independent.
            if let Some(result) = index.get("result").and_then(|v| v.as_str()) {
                *self.results.entry(result.to_string()).or_insert(0) += 1;
            }
            if let Some(status) = index.get("status") {
                let key = match status.as_str() {
                    Some(s) => s.to_string(),
                    None => status.to_string(),
                };
                *self.statuses.entry(key).or_insert(0) += 1;
            }
            if let Some(reason) = index
                .get("error")
                .and_then(|e| e.get("reason"))
                .and_then(|r| r.as_str())
            {
                self.errors.push(reason.to_string());
            }
        }

        self.last_response = Some(parsed);
    }

    /// Log the aggregated tallies and persist the last parsed response.
    pub fn report(&self) {
        let join = |map: &BTreeMap<String, u64>| {
            map.iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        info!("Results: {}", join(&self.results));
        info!("Statuses: {}", join(&self.statuses));
        if !self.errors.is_empty() {
            info!("Got {} errors:", self.errors.len());
            for reason in &self.errors {
                info!("{reason}");
            }
        }

        if let Some(response) = &self.last_response {
            match serde_json::to_string_pretty(response) {
                Ok(pretty) => {
                    if let Err(e) = std::fs::write(RESULT_FILE, pretty) {
                        error!("failed to write '{RESULT_FILE}': {e}");
                    } else {
                        info!("Result saved to: '{RESULT_FILE}'");
                    }
                }
                Err(e) => error!("failed to render '{RESULT_FILE}': {e}"),
            }
        }
    }
}

/// The bulk upload state for one run.
pub struct BulkIndexer {
    client: reqwest::Client,
    address: String,
    indexname: String,
    timestampfield: String,
    idfield: String,
    idprefix: String,
    auth_header: Option<String>,
    outcomes: BulkOutcomes,
    bulkdata_counter: usize,
    flushes_attempted: usize,
    flushes_failed: usize,
}

impl BulkIndexer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_client(&config.cacertfile, config.allowinvalidhttpscert)?;

        let auth_header = if !config.username.is_empty() && !config.password.is_empty() {
            let credentials = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", config.username, config.password));
            Some(format!("Basic {credentials}"))
        } else {
            None
        };

        Ok(BulkIndexer {
            client,
            address: format!("{}/_bulk", config.elasticserverurl),
            indexname: config.indexname.clone(),
            timestampfield: config.timestampfield.clone(),
            idfield: config.idfield.clone(),
            idprefix: config.idprefix.clone(),
            auth_header,
            outcomes: BulkOutcomes::default(),
            bulkdata_counter: 0,
            flushes_attempted: 0,
            flushes_failed: 0,
        })
    }

    /// Upload all documents.
    ///
    /// Fails the moment any document lacks a temporal timestamp field;
    /// batches flushed before that point stay uploaded. A transport failure
    /// on an individual flush is logged and the run continues.
    pub async fn put_into_index(mut self, documents: Vec<Document>) -> Result<()> {
        let mut buffer = BulkBuffer::default();
        let mut rownum = 0usize;

        for mut doc in documents {
            let timestamp = match doc.get(&self.timestampfield) {
                Some(value) if value.is_temporal() => value.clone(),
                _ => return Err(Error::MissingTimestampField(self.timestampfield.clone())),
            };
            let Some(bucket) = month_bucket(&timestamp) else {
                return Err(Error::MissingTimestampField(self.timestampfield.clone()));
            };
            doc.insert("@timestamp", timestamp);
            let index = format!("{}-{}", self.indexname, bucket);
            let id = format!(
                "{}{}",
                self.idprefix,
                doc.get(&self.idfield)
                    .map(FieldValue::to_natural_string)
                    .unwrap_or_default()
            );

            let action = action_line(&index, &id);
            let line = serde_json::to_string(&doc)?;
            debug!("'{line}'");

            rownum += 1;
            if let Some(body) = buffer.append(&action, &line) {
                info!("Importing rows: {rownum}");
                self.flush(body).await;
            }
        }

        if let Some(body) = buffer.finish() {
            info!("Importing rows: {rownum}");
            self.flush(body).await;
        }

        self.outcomes.report();
        if self.flushes_failed > 0 {
            error!(
                "{} of {} batches failed",
                self.flushes_failed, self.flushes_attempted
            );
        }

        Ok(())
    }

    /// Flush one batch, logging and counting a failure instead of
    /// propagating it.
    async fn flush(&mut self, body: String) {
        self.flushes_attempted += 1;
        if let Err(e) = self.flush_batch(&body).await {
            error!("Put '{}': >>>{}<<<", self.address, body);
            error!("Exception: >>>{e}<<<");
            self.flushes_failed += 1;
        }
    }

    async fn flush_batch(&mut self, body: &str) -> Result<()> {
        let path = format!("bulkdata_{}.txt", self.bulkdata_counter);
        self.bulkdata_counter += 1;
        std::fs::write(&path, body).map_err(|e| Error::side_file(&path, e))?;

        let mut request = self
            .client
            .post(&self.address)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string());
        if let Some(auth) = &self.auth_header {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(&self.address, e))?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(&self.address, e))?;

        self.outcomes.record_response(&text);
        Ok(())
    }
}

fn build_client(cacertfile: &str, allow_invalid: bool) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if allow_invalid {
        warn!("TLS certificate validation disabled by configuration");
        builder = builder.danger_accept_invalid_certs(true);
    } else if !cacertfile.is_empty() {
        let pem = std::fs::read(cacertfile)
            .map_err(|e| Error::config(format!("failed to read CA certificate '{cacertfile}': {e}")))?;
        let cert = reqwest::Certificate::from_pem(&pem)
            .map_err(|e| Error::config(format!("invalid CA certificate '{cacertfile}': {e}")))?;
        // Trust only chains anchored at the configured CA.
        builder = builder
            .add_root_certificate(cert)
            .tls_built_in_root_certs(false);
    }

    builder
        .build()
        .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))
}

/// The `YYYY.MM` partition suffix for a temporal value. Zoned values keep
/// their own wall clock.
pub fn month_bucket(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::DateTime(dt) => Some(dt.format("%Y.%m").to_string()),
        FieldValue::DateTimeOffset(dt) => Some(dt.format("%Y.%m").to_string()),
        _ => None,
    }
}

/// The bulk action line for one document.
pub fn action_line(index: &str, id: &str) -> String {
    format!(r#"{{"index":{{"_index":"{index}","_id":"{id}"}}}}"#)
}
