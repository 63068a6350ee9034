//! SQL Server catalog reader over `sys.*` views.

use std::sync::Arc;

use async_trait::async_trait;
use tiberius::{FromSql, Query, Row};
use tracing::{debug, info};

use super::{decode_rows, CatalogReader, ColumnRecord, Connector, ForeignKeyRow, TableRecord};
use crate::config::LoaderConfig;
use crate::error::{IntrospectError, Result};
use crate::pool::{ConnectionPool, PooledConn, TiberiusConnectionManager};
use crate::sink::SharedSink;

const TABLES_QUERY: &str =
    "SELECT object_id, name, SCHEMA_NAME(schema_id) AS schema_name FROM sys.tables ORDER BY name, schema_name";

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.name,
        TYPE_NAME(c.user_type_id) AS data_type,
        c.max_length,
        c.[precision],
        c.scale,
        c.is_nullable,
        CAST(IIF(ixc.index_column_id IS NOT NULL, 1, 0) AS BIT) AS is_primary_key,
        c.is_identity,
        CAST(ic.seed_value AS BIGINT) AS seed_value,
        CAST(ic.increment_value AS BIGINT) AS increment_value,
        df.[definition] AS default_definition
    FROM sys.columns c
    LEFT OUTER JOIN sys.indexes ix
        ON ix.object_id = c.object_id AND ix.is_primary_key = 1
    LEFT OUTER JOIN sys.index_columns ixc
        ON ixc.object_id = c.object_id AND ixc.index_id = ix.index_id AND ixc.column_id = c.column_id
    LEFT OUTER JOIN sys.default_constraints df
        ON df.parent_object_id = c.object_id AND df.parent_column_id = c.column_id
    LEFT OUTER JOIN sys.identity_columns ic
        ON ic.object_id = c.object_id AND ic.column_id = c.column_id
    WHERE c.object_id = @P1
    ORDER BY c.column_id
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        fk.name,
        pc.name AS local_column,
        OBJECT_NAME(fk.referenced_object_id) AS ref_table,
        rc.name AS ref_column
    FROM sys.foreign_keys fk
    INNER JOIN sys.foreign_key_columns fkc
        ON fkc.constraint_object_id = fk.object_id
    INNER JOIN sys.columns pc
        ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
    INNER JOIN sys.columns rc
        ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
    WHERE fk.parent_object_id = @P1
    ORDER BY fk.name, fkc.constraint_column_id
"#;

/// Catalog reader backed by a pool of Tiberius connections.
pub struct MssqlCatalogReader {
    pool: ConnectionPool<TiberiusConnectionManager>,
    sink: SharedSink,
}

impl MssqlCatalogReader {
    /// Create a reader. Connections are opened lazily by the pool.
    pub fn new(config: &LoaderConfig, sink: SharedSink) -> Result<Self> {
        let params = config.connection_parameters()?;
        info!(
            "Opening catalog reader for {} as {}",
            params.display_target(),
            params.login_name()
        );

        let manager = TiberiusConnectionManager::new(params, config)?;
        let pool = ConnectionPool::new(manager, &config.pool, Arc::clone(&sink));
        Ok(Self { pool, sink })
    }

    async fn get_client(&self) -> Result<PooledConn<TiberiusConnectionManager>> {
        self.pool.acquire().await
    }

    /// Run a catalog query with an optional object id bound to `@P1`.
    async fn fetch(
        &self,
        sql: &'static str,
        object_id: Option<i32>,
        context: &str,
    ) -> Result<Vec<Row>> {
        let mut client = self.get_client().await?;

        let mut query = Query::new(sql);
        if let Some(id) = object_id {
            query.bind(id);
        }

        let stream = query
            .query(&mut client)
            .await
            .map_err(|e| self.query_failed(context, e))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| self.query_failed(context, e))?;

        self.pool.release(client);
        Ok(rows)
    }

    fn query_failed(&self, context: &str, e: tiberius::error::Error) -> IntrospectError {
        self.sink.error("Error executing query:", &e.to_string());
        IntrospectError::query(context, e)
    }
}

#[async_trait]
impl CatalogReader for MssqlCatalogReader {
    async fn check_connectivity(&self) -> Result<()> {
        let client = self.get_client().await?;
        self.pool.release(client);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<TableRecord>> {
        let rows = self.fetch(TABLES_QUERY, None, "tables").await?;
        let tables = decode_rows(rows, "tables", self.sink.as_ref(), decode_table);
        debug!("Loaded {} tables", tables.len());
        Ok(tables)
    }

    async fn list_columns(&self, table: &TableRecord) -> Result<Vec<ColumnRecord>> {
        let context = format!("columns of {}", table.full_name());
        let rows = self
            .fetch(COLUMNS_QUERY, Some(table.object_id), &context)
            .await?;
        let columns = decode_rows(rows, &context, self.sink.as_ref(), decode_column);
        debug!("Loaded {} columns for {}", columns.len(), table.full_name());
        Ok(columns)
    }

    async fn list_foreign_keys(&self, table: &TableRecord) -> Result<Vec<ForeignKeyRow>> {
        let context = format!("foreign keys of {}", table.full_name());
        let rows = self
            .fetch(FOREIGN_KEYS_QUERY, Some(table.object_id), &context)
            .await?;
        let keys = decode_rows(rows, &context, self.sink.as_ref(), decode_foreign_key);
        debug!(
            "Loaded {} foreign key columns for {}",
            keys.len(),
            table.full_name()
        );
        Ok(keys)
    }

    async fn close(&self) {
        self.pool.drain().await;
    }
}

/// Opens [`MssqlCatalogReader`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlConnector;

#[async_trait]
impl Connector for MssqlConnector {
    type Reader = MssqlCatalogReader;

    async fn connect(&self, config: &LoaderConfig, sink: SharedSink) -> Result<MssqlCatalogReader> {
        MssqlCatalogReader::new(config, sink)
    }
}

fn required<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, column: &str) -> Result<T> {
    optional(row, idx, column)?.ok_or_else(|| IntrospectError::row(column, "unexpected NULL"))
}

fn optional<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, column: &str) -> Result<Option<T>> {
    row.try_get::<T, _>(idx)
        .map_err(|e| IntrospectError::row(column, e))
}

fn decode_table(row: &Row) -> Result<TableRecord> {
    Ok(TableRecord::new(
        required::<i32>(row, 0, "object_id")?,
        required::<&str>(row, 1, "name")?,
        required::<&str>(row, 2, "schema_name")?,
    ))
}

fn decode_column(row: &Row) -> Result<ColumnRecord> {
    Ok(ColumnRecord {
        name: required::<&str>(row, 0, "name")?.to_string(),
        data_type: required::<&str>(row, 1, "data_type")?.to_string(),
        max_length: required(row, 2, "max_length")?,
        precision: required(row, 3, "precision")?,
        scale: required(row, 4, "scale")?,
        is_nullable: optional(row, 5, "is_nullable")?.unwrap_or(true),
        is_primary_key: required(row, 6, "is_primary_key")?,
        is_identity: required(row, 7, "is_identity")?,
        seed_value: optional(row, 8, "seed_value")?,
        increment_value: optional(row, 9, "increment_value")?,
        default_definition: optional::<&str>(row, 10, "default_definition")?.map(String::from),
    })
}

fn decode_foreign_key(row: &Row) -> Result<ForeignKeyRow> {
    Ok(ForeignKeyRow {
        constraint_name: required::<&str>(row, 0, "name")?.to_string(),
        local_column: required::<&str>(row, 1, "local_column")?.to_string(),
        ref_table: required::<&str>(row, 2, "ref_table")?.to_string(),
        ref_column: required::<&str>(row, 3, "ref_column")?.to_string(),
    })
}
