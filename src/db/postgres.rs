//! Thin wrapper over `tokio-postgres`.
//!
//! Adapts the driver to the JSON-valued query contract: positional
//! `serde_json::Value` parameters in, JSON object rows out. No pooling, no
//! retries; the fallback policy lives in [`super::Database`].

use serde_json::{Map, Value};
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use crate::config::ServerConfig;

use super::{DbError, QueryResult, Row};

pub struct PgBackend {
    client: tokio_postgres::Client,
}

impl PgBackend {
    /// Connect with the configured timeout. The connection task is spawned
    /// onto the runtime; a broken connection surfaces as query errors, which
    /// the caller's fallback policy handles.
    pub async fn connect(config: &ServerConfig) -> Result<Self, DbError> {
        let conn_str = format!(
            "host={} port={} user={} password={} dbname={}",
            config.db_host, config.db_port, config.db_user, config.db_password, config.db_name
        );

        let connect = tokio_postgres::connect(&conn_str, NoTls);
        let (client, connection) =
            tokio::time::timeout(Duration::from_millis(config.db_connect_timeout_ms), connect)
                .await
                .map_err(|_| DbError::ConnectTimeout(config.db_connect_timeout_ms))?
                .map_err(DbError::Connection)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::error!("postgres connection error: {}", e);
            }
        });

        Ok(PgBackend { client })
    }

    pub async fn query(&self, text: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let bound = bind_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> =
            bound.iter().map(|b| b.as_ref() as &(dyn ToSql + Sync)).collect();
        let rows = self
            .client
            .query(text, &refs)
            .await
            .map_err(DbError::Query)?;
        Ok(QueryResult::from_rows(rows.iter().map(row_to_json).collect()))
    }
}

fn bind_params(params: &[Value]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    params
        .iter()
        .map(|value| -> Box<dyn ToSql + Sync + Send> {
            match value {
                Value::Null => Box::new(Option::<String>::None),
                Value::Bool(b) => Box::new(*b),
                Value::Number(n) if n.is_i64() => Box::new(n.as_i64().unwrap()),
                Value::Number(n) => Box::new(n.as_f64().unwrap_or(0.0)),
                Value::String(s) => Box::new(s.clone()),
                other => Box::new(other.clone()),
            }
        })
        .collect()
}

fn row_to_json(row: &tokio_postgres::Row) -> Row {
    let mut out = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match column.type_().name() {
            "bool" => row
                .try_get::<_, Option<bool>>(idx)
                .ok()
                .flatten()
                .map(Value::Bool),
            "int2" => row
                .try_get::<_, Option<i16>>(idx)
                .ok()
                .flatten()
                .map(|v| Value::from(v as i64)),
            "int4" => row
                .try_get::<_, Option<i32>>(idx)
                .ok()
                .flatten()
                .map(|v| Value::from(v as i64)),
            "int8" => row
                .try_get::<_, Option<i64>>(idx)
                .ok()
                .flatten()
                .map(Value::from),
            "float4" | "float8" => row
                .try_get::<_, Option<f64>>(idx)
                .ok()
                .flatten()
                .and_then(|v| serde_json::Number::from_f64(v).map(Value::Number)),
            "timestamptz" => row
                .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
                .ok()
                .flatten()
                .map(|ts| Value::String(ts.to_rfc3339())),
            "timestamp" => row
                .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
                .ok()
                .flatten()
                .map(|ts| Value::String(ts.and_utc().to_rfc3339())),
            "json" | "jsonb" => row.try_get::<_, Option<Value>>(idx).ok().flatten(),
            // Everything else is read as text; unconvertible values become
            // null rather than failing the whole row.
            _ => row
                .try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map(Value::String),
        };
        out.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    out
}
