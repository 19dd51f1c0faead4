//! Database provider dispatch for the extraction step.

use crate::error::{Error, Result};
use crate::transform::FieldRules;
use crate::types::Document;
use crate::{mysql, postgresql, sqlserver};

/// Run the query against the selected provider and return the transformed
/// documents in row order.
pub async fn get_rows(
    dbprovider: &str,
    connstr: &str,
    sql: &str,
    rules: &FieldRules,
) -> Result<Vec<Document>> {
    match dbprovider {
        "mysql" => mysql::extract(connstr, sql, rules).await,
        "postgres" => postgresql::extract(connstr, sql, rules).await,
        "sqlserver" => sqlserver::extract(connstr, sql, rules).await,
        other => Err(Error::UnsupportedProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_provider_is_a_configuration_error() {
        let rules = FieldRules::default();
        let err = get_rows("oracle", "", "select 1", &rules).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedProvider(p) if p == "oracle"));
    }
}
