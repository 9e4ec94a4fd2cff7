//! SQL rendition of the [`DataStore`] contract.
//!
//! Statements are composed here and executed by an external driver behind
//! [`SqlExecutor`]. The composition rules are what keep the table safe:
//!
//! - The table name and column names enter SQL text only as [`Ident`]s,
//!   which are validated at configuration time and rendered double-quoted.
//! - Columns are reached through `FieldCatalog::column(FieldId)`; no
//!   caller-supplied string is ever turned into a column.
//! - Group names and written values are always bound parameters (`$n`).

use std::sync::Arc;

use rowfs_types::{FieldCatalog, FieldId, Ident, RowId};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::group::Group;
use crate::traits::DataStore;

/// A bound query parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
}

/// SQL text plus its positional parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    fn new(sql: String, params: Vec<SqlParam>) -> Self {
        Self { sql, params }
    }
}

/// A decoded result cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
}

/// One result row, cells in select-list order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SqlRow(pub Vec<SqlValue>);

impl SqlRow {
    fn cell(&self, idx: usize) -> StoreResult<&SqlValue> {
        self.0
            .get(idx)
            .ok_or_else(|| StoreError::Decode(format!("missing column {idx}")))
    }

    fn int(&self, idx: usize) -> StoreResult<i64> {
        match self.cell(idx)? {
            SqlValue::Int(v) => Ok(*v),
            other => Err(StoreError::Decode(format!(
                "column {idx}: expected integer, got {other:?}"
            ))),
        }
    }

    fn text(&self, idx: usize) -> StoreResult<Option<&str>> {
        match self.cell(idx)? {
            SqlValue::Text(v) => Ok(Some(v)),
            SqlValue::Null => Ok(None),
            other => Err(StoreError::Decode(format!(
                "column {idx}: expected text, got {other:?}"
            ))),
        }
    }
}

/// Failures reported by the database driver.
#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),
}

impl From<SqlError> for StoreError {
    fn from(err: SqlError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Parameterized statement execution, provided by the database driver.
///
/// Connection pooling, retries and transactions are the driver's business;
/// every call here is expected to run as its own statement.
pub trait SqlExecutor: Send + Sync {
    /// Run a statement that returns rows.
    fn query(&self, statement: &Statement) -> Result<Vec<SqlRow>, SqlError>;

    /// Run a statement and return the number of rows it affected.
    fn execute(&self, statement: &Statement) -> Result<u64, SqlError>;
}

/// Statement builder for one backing table.
#[derive(Clone, Debug)]
pub struct Queries {
    table: Ident,
}

impl Queries {
    pub fn new(table: Ident) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    pub fn list_groups(&self) -> Statement {
        Statement::new(
            format!("SELECT id, name FROM {} ORDER BY id", self.table.quoted()),
            Vec::new(),
        )
    }

    pub fn get_group(&self, name: &str) -> Statement {
        Statement::new(
            format!("SELECT id, name FROM {} WHERE name = $1", self.table.quoted()),
            vec![SqlParam::Text(name.to_string())],
        )
    }

    pub fn get_field(&self, column: &Ident, group: &str) -> Statement {
        Statement::new(
            format!(
                "SELECT id, to_json({})::text AS data FROM {} WHERE name = $1",
                column.quoted(),
                self.table.quoted()
            ),
            vec![SqlParam::Text(group.to_string())],
        )
    }

    pub fn put_field(&self, column: &Ident, group: &str, value: String) -> Statement {
        Statement::new(
            format!(
                "UPDATE {} SET {} = $1 WHERE name = $2",
                self.table.quoted(),
                column.quoted()
            ),
            vec![SqlParam::Text(value), SqlParam::Text(group.to_string())],
        )
    }

    pub fn create_group(&self, name: &str) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} (name) VALUES ($1) RETURNING id, name",
                self.table.quoted()
            ),
            vec![SqlParam::Text(name.to_string())],
        )
    }
}

/// [`DataStore`] over a SQL database reached through `E`.
pub struct SqlDataStore<E> {
    executor: E,
    catalog: Arc<FieldCatalog>,
    queries: Queries,
}

impl<E: SqlExecutor> SqlDataStore<E> {
    pub fn new(executor: E, catalog: Arc<FieldCatalog>, table: Ident) -> Self {
        Self {
            executor,
            catalog,
            queries: Queries::new(table),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    fn column(&self, field: FieldId) -> StoreResult<&Ident> {
        self.catalog
            .column(field)
            .ok_or(StoreError::UnknownField(field))
    }

    fn query(&self, statement: &Statement) -> Result<Vec<SqlRow>, SqlError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "query");
        self.executor.query(statement)
    }

    fn execute(&self, statement: &Statement) -> Result<u64, SqlError> {
        debug!(sql = %statement.sql, params = statement.params.len(), "execute");
        self.executor.execute(statement)
    }

    /// The single row of a lookup by name, or `None` for zero or several.
    fn unique(name: &str, mut rows: Vec<SqlRow>) -> Option<SqlRow> {
        match rows.len() {
            0 => None,
            1 => rows.pop(),
            n => {
                warn!(group = name, matches = n, "ambiguous group name; treating as not found");
                None
            }
        }
    }
}

fn decode_group(row: &SqlRow) -> StoreResult<Group> {
    let id = row.int(0)?;
    let id = u64::try_from(id).map_err(|_| StoreError::Decode(format!("negative row id {id}")))?;
    let row_id = RowId::new(id).map_err(|e| StoreError::Decode(e.to_string()))?;
    let name = row
        .text(1)?
        .ok_or_else(|| StoreError::Decode("group name is NULL".into()))?;
    Ok(Group::new(row_id, name))
}

impl<E: SqlExecutor> DataStore for SqlDataStore<E> {
    fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let rows = self.query(&self.queries.list_groups())?;
        rows.iter().map(decode_group).collect()
    }

    fn get_group(&self, name: &str) -> StoreResult<Option<Group>> {
        let rows = self.query(&self.queries.get_group(name))?;
        Self::unique(name, rows).as_ref().map(decode_group).transpose()
    }

    fn get_field(&self, group: &str, field: FieldId) -> StoreResult<Option<Vec<u8>>> {
        let statement = self.queries.get_field(self.column(field)?, group);
        let rows = self.query(&statement)?;
        let Some(row) = Self::unique(group, rows) else {
            return Ok(None);
        };
        // to_json(NULL) is SQL NULL, which reads back as JSON null.
        let text = row.text(1)?.unwrap_or("null");
        Ok(Some(text.as_bytes().to_vec()))
    }

    fn put_field(&self, group: &str, field: FieldId, raw: &[u8]) -> StoreResult<()> {
        let column = self.column(field)?;
        let value = String::from_utf8(raw.to_vec()).map_err(|_| StoreError::InvalidEncoding)?;
        let affected = self.execute(&self.queries.put_field(column, group, value))?;
        if affected == 0 {
            return Err(StoreError::GroupNotFound(group.to_string()));
        }
        Ok(())
    }

    fn create_group(&self, name: &str) -> StoreResult<Group> {
        let rows = match self.query(&self.queries.create_group(name)) {
            Ok(rows) => rows,
            Err(SqlError::UniqueViolation(_)) => {
                return Err(StoreError::DuplicateGroup(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let row = rows
            .first()
            .ok_or_else(|| StoreError::Decode("insert returned no row".into()))?;
        decode_group(row)
    }
}

impl<E> std::fmt::Debug for SqlDataStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDataStore")
            .field("table", &self.queries.table)
            .field("fields", &self.catalog.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every statement and answers from scripted queues. Empty
    /// queues answer with no rows / one affected row.
    #[derive(Default)]
    struct ScriptedExecutor {
        log: Mutex<Vec<Statement>>,
        rows: Mutex<VecDeque<Result<Vec<SqlRow>, SqlError>>>,
        affected: Mutex<VecDeque<Result<u64, SqlError>>>,
    }

    impl ScriptedExecutor {
        fn answer(self, rows: Result<Vec<SqlRow>, SqlError>) -> Self {
            self.rows.lock().unwrap().push_back(rows);
            self
        }

        fn affect(self, n: Result<u64, SqlError>) -> Self {
            self.affected.lock().unwrap().push_back(n);
            self
        }

        fn statements(&self) -> Vec<Statement> {
            self.log.lock().unwrap().clone()
        }
    }

    impl SqlExecutor for ScriptedExecutor {
        fn query(&self, statement: &Statement) -> Result<Vec<SqlRow>, SqlError> {
            self.log.lock().unwrap().push(statement.clone());
            self.rows.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
        }

        fn execute(&self, statement: &Statement) -> Result<u64, SqlError> {
            self.log.lock().unwrap().push(statement.clone());
            self.affected.lock().unwrap().pop_front().unwrap_or(Ok(1))
        }
    }

    fn group_row(id: i64, name: &str) -> SqlRow {
        SqlRow(vec![SqlValue::Int(id), SqlValue::Text(name.into())])
    }

    fn store(executor: ScriptedExecutor) -> SqlDataStore<ScriptedExecutor> {
        let catalog = Arc::new(FieldCatalog::with_default_base(["salary", "notes"]).unwrap());
        SqlDataStore::new(executor, catalog, Ident::new("data").unwrap())
    }

    fn text(s: &str) -> SqlParam {
        SqlParam::Text(s.into())
    }

    #[test]
    fn statement_texts() {
        let q = Queries::new(Ident::new("data").unwrap());
        let col = Ident::new("salary").unwrap();

        assert_eq!(q.list_groups().sql, r#"SELECT id, name FROM "data" ORDER BY id"#);
        assert_eq!(q.get_group("a").sql, r#"SELECT id, name FROM "data" WHERE name = $1"#);
        assert_eq!(
            q.get_field(&col, "a").sql,
            r#"SELECT id, to_json("salary")::text AS data FROM "data" WHERE name = $1"#
        );
        assert_eq!(
            q.put_field(&col, "a", "v".into()).sql,
            r#"UPDATE "data" SET "salary" = $1 WHERE name = $2"#
        );
        assert_eq!(
            q.create_group("a").sql,
            r#"INSERT INTO "data" (name) VALUES ($1) RETURNING id, name"#
        );
    }

    #[test]
    fn group_name_is_always_bound() {
        let s = store(ScriptedExecutor::default());
        let hostile = "x' OR '1'='1";
        let salary = s.catalog().lookup("salary").unwrap();

        s.get_group(hostile).unwrap();
        s.get_field(hostile, salary).unwrap();
        let _ = s.put_field(hostile, salary, b"1");
        let _ = s.create_group(hostile);

        for stmt in s.executor().statements() {
            assert!(!stmt.sql.contains(hostile), "leaked into SQL: {}", stmt.sql);
            assert!(stmt.params.contains(&text(hostile)));
        }
    }

    #[test]
    fn get_field_embeds_only_catalog_column() {
        let exec = ScriptedExecutor::default().answer(Ok(vec![SqlRow(vec![
            SqlValue::Int(3),
            SqlValue::Text("100".into()),
        ])]));
        let s = store(exec);
        let notes = s.catalog().lookup("notes").unwrap();

        let value = s.get_field("alpha", notes).unwrap();
        assert_eq!(value, Some(b"100".to_vec()));

        let stmts = s.executor().statements();
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].sql.contains(r#"to_json("notes")"#));
        assert_eq!(stmts[0].params, vec![text("alpha")]);
    }

    #[test]
    fn foreign_field_never_reaches_executor() {
        let s = store(ScriptedExecutor::default());
        let other = FieldCatalog::with_default_base(["a", "b", "c"]).unwrap();
        let third = other.lookup("c").unwrap();

        assert!(matches!(
            s.get_field("alpha", third),
            Err(StoreError::UnknownField(_))
        ));
        assert!(matches!(
            s.put_field("alpha", third, b"x"),
            Err(StoreError::UnknownField(_))
        ));
        assert!(s.executor().statements().is_empty());
    }

    #[test]
    fn null_value_reads_as_json_null() {
        let exec = ScriptedExecutor::default()
            .answer(Ok(vec![SqlRow(vec![SqlValue::Int(3), SqlValue::Null])]));
        let s = store(exec);
        let salary = s.catalog().lookup("salary").unwrap();
        assert_eq!(s.get_field("alpha", salary).unwrap(), Some(b"null".to_vec()));
    }

    #[test]
    fn list_groups_decodes_rows() {
        let exec = ScriptedExecutor::default()
            .answer(Ok(vec![group_row(3, "alpha"), group_row(4, "beta")]));
        let s = store(exec);
        let groups = s.list_groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].row_id.get(), 3);
        assert_eq!(groups[1].name, "beta");
    }

    #[test]
    fn ambiguous_group_is_not_found() {
        let exec = ScriptedExecutor::default()
            .answer(Ok(vec![group_row(3, "alpha"), group_row(9, "alpha")]));
        let s = store(exec);
        assert_eq!(s.get_group("alpha").unwrap(), None);
    }

    #[test]
    fn bad_row_id_is_decode_error() {
        let exec = ScriptedExecutor::default()
            .answer(Ok(vec![group_row(-1, "alpha")]))
            .answer(Ok(vec![group_row(0, "beta")]));
        let s = store(exec);
        assert!(matches!(s.list_groups(), Err(StoreError::Decode(_))));
        assert!(matches!(s.get_group("beta"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn put_field_binds_value_then_group() {
        let s = store(ScriptedExecutor::default());
        let salary = s.catalog().lookup("salary").unwrap();
        s.put_field("alpha", salary, b"AB").unwrap();

        let stmts = s.executor().statements();
        assert_eq!(stmts[0].params, vec![text("AB"), text("alpha")]);
    }

    #[test]
    fn put_field_matching_nothing_is_not_found() {
        let s = store(ScriptedExecutor::default().affect(Ok(0)));
        let salary = s.catalog().lookup("salary").unwrap();
        assert!(matches!(
            s.put_field("gone", salary, b"x"),
            Err(StoreError::GroupNotFound(_))
        ));
    }

    #[test]
    fn unique_violation_is_duplicate_group() {
        let exec = ScriptedExecutor::default()
            .answer(Err(SqlError::UniqueViolation("data_name_key".into())));
        let s = store(exec);
        assert!(matches!(
            s.create_group("alpha"),
            Err(StoreError::DuplicateGroup(name)) if name == "alpha"
        ));
    }

    #[test]
    fn driver_failures_are_unavailable() {
        let exec = ScriptedExecutor::default()
            .answer(Err(SqlError::Connection("refused".into())))
            .answer(Err(SqlError::Query("syntax".into())))
            .affect(Err(SqlError::Connection("reset".into())));
        let s = store(exec);
        let salary = s.catalog().lookup("salary").unwrap();

        assert!(matches!(s.list_groups(), Err(StoreError::Unavailable(_))));
        assert!(matches!(s.create_group("z"), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            s.put_field("alpha", salary, b"x"),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn create_group_returns_inserted_row() {
        let exec = ScriptedExecutor::default().answer(Ok(vec![group_row(12, "gamma")]));
        let s = store(exec);
        let g = s.create_group("gamma").unwrap();
        assert_eq!(g.row_id.get(), 12);
        assert_eq!(g.name, "gamma");
    }
}
