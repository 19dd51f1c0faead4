//! Run orchestration: extract, then upload, with timing around the whole
//! pipeline.

use crate::config::Config;
use crate::elastic::BulkIndexer;
use crate::error::Result;
use crate::source;
use crate::transform::FieldRules;
use std::time::Instant;
use tracing::info;

/// Copy all rows selected by the configured query into the index.
///
/// The elapsed time covers extraction and upload together. The closing log
/// lines are emitted even when the upload aborts, so a partial run still
/// reports how long it took.
pub async fn copy_rows(config: &Config) -> Result<()> {
    info!("Starting...");

    let rules = FieldRules::from_config(config);
    let started = Instant::now();

    let rows = source::get_rows(&config.dbprovider, &config.connstr, &config.sql, &rules).await?;
    info!("Got {} rows.", rows.len());

    let indexer = BulkIndexer::new(config)?;
    let result = indexer.put_into_index(rows).await;

    info!("Time: {:?}", started.elapsed());
    info!("Done!");

    result
}
