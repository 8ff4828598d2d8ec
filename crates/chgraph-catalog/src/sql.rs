//! SQL-backed metadata source over `system.tables` / `system.dependencies`
//!
//! [`SqlCatalog`] owns the catalog queries and row decoding; the transport is
//! anything implementing [`QueryRunner`] (an HTTP client, a native-protocol
//! connection, a test double). Rows arrive as JSON values, which is what the
//! ClickHouse HTTP interface produces with `FORMAT JSONCompact`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let catalog = SqlCatalog::new("prod", my_runner)
//!     .with_excluded_databases(vec!["system".into(), "_temporary".into()]);
//! let relations = catalog.list_relations()?;
//! ```

use crate::source::{CatalogError, MetadataSource, Relation, MATERIALIZED_VIEW_ENGINE};
use chgraph_core::config::DEFAULT_EXCLUDED_DATABASES;
use chgraph_core::{Config, QualifiedName};
use serde_json::Value;

/// A result row: one JSON value per selected column
pub type Row = Vec<Value>;

/// Executes a read-only SQL statement and returns its rows
pub trait QueryRunner: Send + Sync {
    /// Run `sql` and return every row
    fn query(&self, sql: &str) -> Result<Vec<Row>, CatalogError>;
}

/// Metadata source that issues catalog SQL through a [`QueryRunner`]
pub struct SqlCatalog<R> {
    runner: R,
    cluster: String,
    excluded_databases: Vec<String>,
}

impl<R: QueryRunner> SqlCatalog<R> {
    /// Create a catalog reader with the default internal-database exclusions
    pub fn new(cluster: impl Into<String>, runner: R) -> Self {
        Self {
            runner,
            cluster: cluster.into(),
            excluded_databases: DEFAULT_EXCLUDED_DATABASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a catalog reader using the cluster name and exclusions from config
    pub fn from_config(config: &Config, runner: R) -> Self {
        Self::new(config.cluster.clone(), runner)
            .with_excluded_databases(config.catalog.excluded_databases.clone())
    }

    /// Replace the list of databases hidden from discovery
    pub fn with_excluded_databases(mut self, databases: Vec<String>) -> Self {
        self.excluded_databases = databases;
        self
    }

    /// Access the underlying runner
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// `WHERE` clause body shared by every `system.tables` query
    fn table_filter(&self, extra: &[String]) -> String {
        let mut conditions: Vec<String> = extra.to_vec();

        if !self.excluded_databases.is_empty() {
            let list = self
                .excluded_databases
                .iter()
                .map(|db| quote_literal(db))
                .collect::<Vec<_>>()
                .join(", ");
            conditions.push(format!("database NOT IN ({})", list));
        }

        if conditions.is_empty() {
            "1".to_string()
        } else {
            conditions.join("\n  AND ")
        }
    }

    /// SQL listing every relation
    pub fn relations_sql(&self) -> String {
        format!(
            "SELECT database, name, engine\nFROM system.tables\nWHERE {}\nORDER BY database, name",
            self.table_filter(&[])
        )
    }

    /// SQL listing materialized views
    pub fn materialized_views_sql(&self) -> String {
        format!(
            "SELECT database, name\nFROM system.tables\nWHERE {}\nORDER BY database, name",
            self.table_filter(&[format!("engine = {}", quote_literal(MATERIALIZED_VIEW_ENGINE))])
        )
    }

    /// SQL listing one view's dependencies
    pub fn dependencies_sql(view: &QualifiedName) -> String {
        format!(
            "SELECT depends_on_database, depends_on_table\nFROM system.dependencies\n\
             WHERE database = {}\n  AND table = {}\n  AND depends_on_database != ''\n  AND depends_on_table != ''",
            quote_literal(&view.database),
            quote_literal(&view.table)
        )
    }

    /// SQL fetching one view's `CREATE` statement
    pub fn create_statement_sql(view: &QualifiedName) -> String {
        format!(
            "SELECT create_table_query\nFROM system.tables\nWHERE database = {} AND name = {}",
            quote_literal(&view.database),
            quote_literal(&view.table)
        )
    }

    fn count_sql(&self, engine_condition: &str, alias: &str) -> String {
        format!(
            "SELECT database, COUNT(*) AS {}\nFROM system.tables\nWHERE {}\nGROUP BY database\nORDER BY database",
            alias,
            self.table_filter(&[engine_condition.to_string()])
        )
    }

    fn counts(&self, sql: &str) -> Result<Vec<(String, u64)>, CatalogError> {
        self.runner
            .query(sql)?
            .iter()
            .map(|row| Ok((string_at(row, 0)?, count_at(row, 1)?)))
            .collect()
    }
}

impl<R: QueryRunner> MetadataSource for SqlCatalog<R> {
    fn cluster_name(&self) -> &str {
        &self.cluster
    }

    fn list_relations(&self) -> Result<Vec<Relation>, CatalogError> {
        self.runner
            .query(&self.relations_sql())?
            .iter()
            .map(|row| Ok(Relation::new(string_at(row, 0)?, string_at(row, 1)?, string_at(row, 2)?)))
            .collect()
    }

    fn list_materialized_views(&self) -> Result<Vec<QualifiedName>, CatalogError> {
        self.runner
            .query(&self.materialized_views_sql())?
            .iter()
            .map(|row| Ok(QualifiedName::new(string_at(row, 0)?, string_at(row, 1)?)))
            .collect()
    }

    fn view_dependencies(&self, view: &QualifiedName) -> Result<Vec<QualifiedName>, CatalogError> {
        self.runner
            .query(&Self::dependencies_sql(view))?
            .iter()
            .map(|row| Ok(QualifiedName::new(string_at(row, 0)?, string_at(row, 1)?)))
            .collect()
    }

    fn create_statement(&self, view: &QualifiedName) -> Result<Option<String>, CatalogError> {
        let rows = self.runner.query(&Self::create_statement_sql(view))?;

        match rows.first().and_then(|row| row.first()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(sql)) if sql.is_empty() => Ok(None),
            Some(Value::String(sql)) => Ok(Some(sql.clone())),
            Some(other) => Err(CatalogError::InvalidResponse(format!(
                "create_table_query for {} is not a string: {}",
                view, other
            ))),
        }
    }

    fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        let sql = format!(
            "SELECT DISTINCT database\nFROM system.tables\nWHERE {}\nORDER BY database",
            self.table_filter(&[])
        );

        self.runner
            .query(&sql)?
            .iter()
            .map(|row| string_at(row, 0))
            .collect()
    }

    fn table_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
        let condition = format!("engine != {}", quote_literal(MATERIALIZED_VIEW_ENGINE));
        self.counts(&self.count_sql(&condition, "table_count"))
    }

    fn view_counts(&self) -> Result<Vec<(String, u64)>, CatalogError> {
        let condition = format!("engine = {}", quote_literal(MATERIALIZED_VIEW_ENGINE));
        self.counts(&self.count_sql(&condition, "mv_count"))
    }
}

/// Quote a string literal for ClickHouse SQL
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn string_at(row: &Row, index: usize) -> Result<String, CatalogError> {
    match row.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(CatalogError::InvalidResponse(format!(
            "expected string in column {}, got {}",
            index, other
        ))),
        None => Err(CatalogError::InvalidResponse(format!(
            "row has {} columns, expected at least {}",
            row.len(),
            index + 1
        ))),
    }
}

/// 64-bit counts arrive as strings from the HTTP interface unless
/// `output_format_json_quote_64bit_integers` is disabled, so accept both
fn count_at(row: &Row, index: usize) -> Result<u64, CatalogError> {
    match row.get(index) {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
            CatalogError::InvalidResponse(format!("count in column {} is not an unsigned integer: {}", index, n))
        }),
        Some(Value::String(s)) => s.parse::<u64>().map_err(|e| {
            CatalogError::InvalidResponse(format!("count in column {} is not numeric ({}): {}", index, s, e))
        }),
        Some(other) => Err(CatalogError::InvalidResponse(format!(
            "expected count in column {}, got {}",
            index, other
        ))),
        None => Err(CatalogError::InvalidResponse(format!(
            "row has {} columns, expected at least {}",
            row.len(),
            index + 1
        ))),
    }
}
