// sql.rs
// Backend SQLite sobre Diesel + r2d2. Las consultas se construyen con
// `sql_query` y parámetros enlazados; los nombres de tabla y columna vienen
// siempre de `schema`.
use crate::rows::{check_select, fold_case, normalize_insert, normalize_patch};
use crate::schema::{table_def, ColumnKind, TableDef};
use crate::store::{format_timestamp, next_updated_at, parse_timestamp};
use crate::{DataStore, Direction, Precondition, Predicate, Select, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use cryo_domain::{Row, Table};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::Error as DieselError;
use diesel::sql_types::{Bool, Double, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
type Query = BoxedSqlQuery<'static, Sqlite, SqlQuery>;

diesel::define_sql_function! {
  /// Minúsculas Unicode; `lower()` de SQLite sólo pliega ASCII.
  fn cryo_fold(x: Nullable<Text>) -> Nullable<Text>;
}

/// Claves foráneas activas y `cryo_fold` registrada en cada conexión del
/// pool.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        .map_err(diesel::r2d2::Error::QueryError)?;
    cryo_fold_utils::register_impl(conn, |x: Option<String>| x.map(|s| fold_case(&s)))
      .map_err(diesel::r2d2::Error::QueryError)
  }
}

#[derive(QueryableByName)]
struct JsonRow {
  #[diesel(sql_type = Text)]
  doc: String,
}

enum Bind {
  Text(String),
  Real(f64),
  Bool(bool),
  Null,
}

fn bind_all(mut query: Query, binds: Vec<Bind>) -> Query {
  for b in binds {
    query = match b {
      Bind::Text(s) => query.bind::<Text, _>(s),
      Bind::Real(f) => query.bind::<Double, _>(f),
      Bind::Bool(v) => query.bind::<Bool, _>(v),
      Bind::Null => query.bind::<Nullable<Text>, _>(None::<String>),
    };
  }
  query
}

fn to_bind(kind: ColumnKind, value: &JsonValue) -> Bind {
  match (kind, value) {
    (_, JsonValue::Null) => Bind::Null,
    (ColumnKind::Real, v) => Bind::Real(v.as_f64().unwrap_or_default()),
    (ColumnKind::Bool, v) => Bind::Bool(v.as_bool().unwrap_or_default()),
    (ColumnKind::Json, v) => Bind::Text(v.to_string()),
    (_, JsonValue::String(s)) => Bind::Text(s.clone()),
    (_, v) => Bind::Text(v.to_string()),
  }
}

fn kind_of(def: &TableDef, column: &str) -> ColumnKind {
  def.column(column).map(|c| c.kind).unwrap_or(ColumnKind::Text)
}

fn quote(ident: &str) -> String {
  format!("\"{}\"", ident)
}

/// `json_object('col', "col", ...)`: una fila completa como documento JSON.
fn row_projection(def: &TableDef) -> String {
  let fields: Vec<String> = def.columns
                               .iter()
                               .map(|c| match c.kind {
                                 ColumnKind::Json => format!("'{}', json({})", c.name, quote(c.name)),
                                 _ => format!("'{}', {}", c.name, quote(c.name)),
                               })
                               .collect();
  format!("SELECT json_object({}) AS doc FROM {}", fields.join(", "), quote(def.table.name()))
}

fn escape_like(raw: &str) -> String {
  raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn where_clause(def: &TableDef, predicates: &[Predicate], binds: &mut Vec<Bind>) -> String {
  let mut parts = Vec::new();
  for p in predicates {
    let col = quote(p.column());
    let kind = kind_of(def, p.column());
    match p {
      Predicate::Eq(_, JsonValue::Null) => parts.push(format!("{} IS NULL", col)),
      Predicate::Eq(_, v) => {
        parts.push(format!("{} = ?", col));
        binds.push(to_bind(kind, v));
      }
      Predicate::ILike(_, needle) => {
        parts.push(format!("cryo_fold({}) LIKE cryo_fold(?) ESCAPE '\\'", col));
        binds.push(Bind::Text(format!("%{}%", escape_like(needle))));
      }
      Predicate::In(_, values) if values.is_empty() => parts.push("1 = 0".to_string()),
      Predicate::In(_, values) => {
        let marks = vec!["?"; values.len()].join(", ");
        parts.push(format!("{} IN ({})", col, marks));
        binds.extend(values.iter().map(|v| to_bind(kind, v)));
      }
    }
  }
  if parts.is_empty() {
    String::new()
  } else {
    format!(" WHERE {}", parts.join(" AND "))
  }
}

/// Convierte el documento de `json_object` a fila: las columnas booleanas
/// llegan como 0/1.
fn decode_row(def: &TableDef, raw: &str) -> Result<Row, StoreError> {
  let mut row: Row = serde_json::from_str(raw)?;
  for col in def.columns.iter().filter(|c| c.kind == ColumnKind::Bool) {
    if let Some(v) = row.get_mut(col.name) {
      if let Some(n) = v.as_i64() {
        *v = JsonValue::Bool(n != 0);
      }
    }
  }
  Ok(row)
}

/// Errores internos de las transacciones.
enum TxError {
  Store(StoreError),
  Db(DieselError),
}

impl From<DieselError> for TxError {
  fn from(e: DieselError) -> Self {
    Self::Db(e)
  }
}

impl From<StoreError> for TxError {
  fn from(e: StoreError) -> Self {
    Self::Store(e)
  }
}

fn map_db_err(table: Table, e: DieselError) -> StoreError {
  match e {
    DieselError::DatabaseError(_, info) => StoreError::rejected(table, info.message()),
    DieselError::SerializationError(e) | DieselError::DeserializationError(e) => {
      StoreError::Serialization(e.to_string())
    }
    other => StoreError::rejected(table, other.to_string()),
  }
}

fn map_tx_err(table: Table, e: TxError) -> StoreError {
  match e {
    TxError::Store(s) => s,
    TxError::Db(d) => map_db_err(table, d),
  }
}

fn select_rows(conn: &mut SqliteConnection, def: &TableDef, query: &Select) -> Result<Vec<Row>, TxError> {
  let mut binds = Vec::new();
  let mut sql = row_projection(def);
  sql.push_str(&where_clause(def, &query.predicates, &mut binds));
  match &query.order {
    Some(order) => {
      let dir = match order.direction {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
      };
      sql.push_str(&format!(" ORDER BY {} {}, rowid ASC", quote(order.column), dir));
    }
    None => sql.push_str(" ORDER BY rowid ASC"),
  }
  if let Some(limit) = query.limit {
    sql.push_str(&format!(" LIMIT {}", limit));
  }
  let loaded = bind_all(diesel::sql_query(sql).into_boxed::<Sqlite>(), binds).load::<JsonRow>(conn)?;
  Ok(loaded.iter().map(|r| decode_row(def, &r.doc)).collect::<Result<Vec<_>, _>>()?)
}

fn select_by_id(conn: &mut SqliteConnection, def: &TableDef, id: &str) -> Result<Option<Row>, TxError> {
  let query = Select::from(def.table).eq("id", id);
  Ok(select_rows(conn, def, &query)?.into_iter().next())
}

pub struct SqliteStore {
  pool: Arc<DbPool>,
}

impl SqliteStore {
  /// Abre el pool y aplica las migraciones pendientes.
  pub fn new(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
    // cada conexión a ":memory:" es una base distinta
    let size = if database_url == ":memory:" { 1 } else { pool_size.max(1) };
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(size)
                              .connection_customizer(Box::new(SqlitePragmas))
                              .build(manager)
                              .map_err(|e| StoreError::Pool(format!("no se pudo crear el pool: {}", e)))?;
    let mut conn = pool.get().map_err(|e| StoreError::Pool(e.to_string()))?;
    if let Err(e) = conn.batch_execute("PRAGMA journal_mode = WAL;") {
      log::debug!("sqlite: WAL no disponible en {}: {}", database_url, e);
    }
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Pool(format!("migraciones: {}", e)))?;
    log::info!("sqlite: base lista en {}", database_url);
    Ok(Self { pool: Arc::new(pool) })
  }

  /// Ejecuta `f` con una conexión del pool fuera del runtime asíncrono.
  async fn run<T, F>(&self, table: Table, f: F) -> Result<T, StoreError>
    where T: Send + 'static,
          F: FnOnce(&mut SqliteConnection) -> Result<T, TxError> + Send + 'static
  {
    let pool = self.pool.clone();
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get().map_err(|e| StoreError::Pool(e.to_string()))?;
      f(&mut *conn).map_err(|e| map_tx_err(table, e))
    }).await
      .map_err(|e| StoreError::Pool(format!("tarea bloqueante: {}", e)))?
  }
}

#[async_trait]
impl DataStore for SqliteStore {
  async fn select(&self, query: &Select) -> Result<Vec<Row>, StoreError> {
    let def = table_def(query.table);
    check_select(def, query)?;
    let query = query.base();
    self.run(def.table, move |conn| select_rows(conn, def, &query)).await
  }

  async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
    let def = table_def(table);
    let mut row = normalize_insert(def, row)?;
    let id = Uuid::new_v4().to_string();
    let now = JsonValue::String(format_timestamp(Utc::now()));
    row.insert("id".into(), JsonValue::String(id.clone()));
    row.insert("created_at".into(), now.clone());
    row.insert("updated_at".into(), now);
    self.run(table, move |conn| {
          let names: Vec<String> = row.keys().map(|k| quote(k)).collect();
          let marks = vec!["?"; names.len()].join(", ");
          let sql = format!("INSERT INTO {} ({}) VALUES ({})", quote(table.name()), names.join(", "), marks);
          let binds = row.iter().map(|(k, v)| to_bind(kind_of(def, k), v)).collect();
          bind_all(diesel::sql_query(sql).into_boxed::<Sqlite>(), binds).execute(conn)?;
          select_by_id(conn, def, &id)?.ok_or_else(|| {
                                         TxError::Store(StoreError::rejected(table, "la fila insertada no se encontró"))
                                       })
        })
        .await
  }

  async fn update(&self,
                  table: Table,
                  id: &str,
                  patch: Row,
                  precondition: Option<&Precondition>)
                  -> Result<Option<Row>, StoreError> {
    let def = table_def(table);
    let patch = normalize_patch(def, patch)?;
    let id = id.to_string();
    let expected = precondition.map(|Precondition::UpdatedAt(ts)| *ts);
    self.run(table, move |conn| {
          conn.transaction::<_, TxError, _>(|conn| {
                let Some(current) = select_by_id(conn, def, &id)? else {
                  return Ok(None);
                };
                let previous = current.get("updated_at").and_then(JsonValue::as_str).unwrap_or_default().to_string();
                if let Some(ts) = expected {
                  if parse_timestamp(&previous) != Some(ts) {
                    return Err(StoreError::Conflict { table, id: id.clone() }.into());
                  }
                }
                let mut sets: Vec<String> = patch.keys().map(|k| format!("{} = ?", quote(k))).collect();
                sets.push("\"updated_at\" = ?".to_string());
                let sql = format!("UPDATE {} SET {} WHERE \"id\" = ? AND \"updated_at\" = ?",
                                  quote(table.name()),
                                  sets.join(", "));
                let mut binds: Vec<Bind> = patch.iter().map(|(k, v)| to_bind(kind_of(def, k), v)).collect();
                binds.push(Bind::Text(next_updated_at(Some(&previous))));
                binds.push(Bind::Text(id.clone()));
                binds.push(Bind::Text(previous));
                let affected = bind_all(diesel::sql_query(sql).into_boxed::<Sqlite>(), binds).execute(conn)?;
                if affected == 0 {
                  return Err(StoreError::Conflict { table, id: id.clone() }.into());
                }
                select_by_id(conn, def, &id)
              })
        })
        .await
  }

  async fn delete(&self, table: Table, id: &str) -> Result<Option<Row>, StoreError> {
    let def = table_def(table);
    let id = id.to_string();
    self.run(table, move |conn| {
          conn.transaction::<_, TxError, _>(|conn| {
                let Some(current) = select_by_id(conn, def, &id)? else {
                  return Ok(None);
                };
                let sql = format!("DELETE FROM {} WHERE \"id\" = ?", quote(table.name()));
                diesel::sql_query(sql).bind::<Text, _>(id.clone()).execute(conn)?;
                Ok(Some(current))
              })
        })
        .await
  }

  fn backend_name(&self) -> &'static str {
    "sqlite"
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ilike_pattern_escapes_wildcards() {
    assert_eq!(escape_like("10%_x"), "10\\%\\_x");
  }

  #[test]
  fn empty_in_matches_nothing() {
    let def = table_def(Table::Molecules);
    let mut binds = Vec::new();
    let clause = where_clause(def, &[Predicate::In("id", vec![])], &mut binds);
    assert_eq!(clause, " WHERE 1 = 0");
    assert!(binds.is_empty());
  }

  #[test]
  fn projection_unwraps_json_columns() {
    let sql = row_projection(table_def(Table::Protocols));
    assert!(sql.contains("'steps', json(\"steps\")"));
    assert!(sql.ends_with("FROM \"protocols\""));
  }

  #[test]
  fn substring_match_uses_the_unicode_fold() {
    let mut binds = Vec::new();
    let clause = where_clause(table_def(Table::Mixtures), &[Predicate::ILike("name", "Éter".into())], &mut binds);
    assert_eq!(clause, " WHERE cryo_fold(\"name\") LIKE cryo_fold(?) ESCAPE '\\'");
  }

  #[test]
  fn memory_database_opens_and_registers_the_fold() {
    // ":memory:" no admite WAL; la apertura sigue adelante
    let store = SqliteStore::new(":memory:", 4).unwrap();
    let mut conn = store.pool.get().unwrap();
    let folded: JsonRow = diesel::sql_query("SELECT cryo_fold('ÉTER-PBS Ñ') AS doc").get_result(&mut *conn).unwrap();
    assert_eq!(folded.doc, "éter-pbs ñ");
  }
}
