//! Gateway backed by the `scylla` driver (works with Cassandra and ScyllaDB)

use async_trait::async_trait;
use cqlmig_core::{ConnectionConfig, ConsistencyLevel};
use scylla::frame::response::result::CqlValue;
use scylla::query::Query;
use scylla::statement::Consistency;
use scylla::transport::errors::{DbError, QueryError};
use scylla::{Session, SessionBuilder};
use std::time::Duration;

use super::{Gateway, GatewayError, GatewayResult, Row};
use crate::catalog::validate_keyspace;
use crate::error::{MigrationError, MigrationResult};

/// A single session against the cluster
pub struct ScyllaGateway {
    session: Session,
    request_timeout: Duration,
}

impl ScyllaGateway {
    /// Connect to the configured node, optionally selecting a keyspace.
    ///
    /// Keyspace creation connects without one, everything else selects the
    /// target keyspace so unqualified names in migration files resolve.
    pub async fn connect(
        config: &ConnectionConfig,
        keyspace: Option<&str>,
    ) -> MigrationResult<Self> {
        if let Some(keyspace) = keyspace {
            validate_keyspace(keyspace)?;
        }

        let address = config.node_address();
        let mut builder = SessionBuilder::new()
            .known_node(&address)
            .connection_timeout(config.timeout);

        if let Some((username, password)) = config.credentials() {
            builder = builder.user(username, password);
        }

        let session = builder
            .build()
            .await
            .map_err(|e| MigrationError::ConnectionFailure {
                address: address.clone(),
                reason: format!("{} (check host, port and credentials)", e),
            })?;

        if let Some(keyspace) = keyspace {
            session
                .use_keyspace(keyspace, false)
                .await
                .map_err(|e| match e {
                    QueryError::DbError(DbError::Invalid, _) => MigrationError::KeyspaceNotFound {
                        keyspace: keyspace.to_string(),
                    },
                    other => MigrationError::ConnectionFailure {
                        address: address.clone(),
                        reason: other.to_string(),
                    },
                })?;
        }

        tracing::info!(
            address = %address,
            keyspace = keyspace.unwrap_or("<none>"),
            "Connected to cluster"
        );

        Ok(Self {
            session,
            request_timeout: config.timeout,
        })
    }
}

#[async_trait]
impl Gateway for ScyllaGateway {
    async fn execute(
        &self,
        statement: &str,
        consistency: ConsistencyLevel,
        params: &[String],
    ) -> GatewayResult<Vec<Row>> {
        let mut query = Query::new(statement.to_string());
        query.set_consistency(to_driver_consistency(consistency));
        query.set_request_timeout(Some(self.request_timeout));

        let result = self
            .session
            .query(query, params.to_vec())
            .await
            .map_err(classify_error)?;

        let rows = result
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(|row| Row {
                columns: row
                    .columns
                    .into_iter()
                    .map(|value| value.as_ref().and_then(CqlValue::as_text).cloned())
                    .collect(),
            })
            .collect();

        Ok(rows)
    }
}

fn to_driver_consistency(level: ConsistencyLevel) -> Consistency {
    match level {
        ConsistencyLevel::Any => Consistency::Any,
        ConsistencyLevel::One => Consistency::One,
        ConsistencyLevel::LocalOne => Consistency::LocalOne,
        ConsistencyLevel::Quorum => Consistency::Quorum,
        ConsistencyLevel::LocalQuorum => Consistency::LocalQuorum,
        ConsistencyLevel::EachQuorum => Consistency::EachQuorum,
        ConsistencyLevel::All => Consistency::All,
    }
}

fn classify_error(error: QueryError) -> GatewayError {
    match error {
        QueryError::RequestTimeout(msg) => GatewayError::Timeout(msg),
        QueryError::TimeoutError => GatewayError::Timeout("request timed out".to_string()),
        QueryError::DbError(DbError::ReadTimeout { .. }, msg)
        | QueryError::DbError(DbError::WriteTimeout { .. }, msg) => GatewayError::Timeout(msg),
        QueryError::DbError(DbError::Unavailable { .. }, msg)
        | QueryError::DbError(DbError::Overloaded, msg)
        | QueryError::DbError(DbError::IsBootstrapping, msg) => GatewayError::NotConnected(msg),
        QueryError::DbError(_, msg) => GatewayError::InvalidRequest(msg),
        other => GatewayError::NotConnected(other.to_string()),
    }
}
