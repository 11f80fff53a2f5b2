// memory.rs
// Almacenamiento en memoria con las mismas reglas que el backend SQLite:
// validación contra `schema`, claves foráneas, cascadas y restricciones.
// Permite inyectar fallos y retardos por tabla para pruebas.
use crate::rows::{check_select, fold_case, json_cmp, json_eq, normalize_insert, normalize_patch};
use crate::schema::{referencing, table_def, OnDelete};
use crate::store::{format_timestamp, next_updated_at, parse_timestamp};
use crate::{DataStore, Direction, Precondition, Predicate, Select, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use cryo_domain::{Row, Table};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

pub struct InMemoryStore {
  /// Filas por tabla en orden de inserción.
  tables: Mutex<HashMap<Table, Vec<Row>>>,
  failures: Mutex<HashMap<Table, String>>,
  delays: Mutex<HashMap<Table, Duration>>,
  calls: AtomicUsize,
  calls_by_table: Mutex<HashMap<Table, usize>>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self { tables: Mutex::new(HashMap::new()),
           failures: Mutex::new(HashMap::new()),
           delays: Mutex::new(HashMap::new()),
           calls: AtomicUsize::new(0),
           calls_by_table: Mutex::new(HashMap::new()) }
  }

  /// Toda operación sobre `table` fallará con `StoreError::Rejected` y este
  /// mensaje hasta `clear_faults`.
  pub fn fail_table(&self, table: Table, message: &str) {
    self.failures.lock().unwrap_or_else(|e| e.into_inner()).insert(table, message.to_string());
  }

  /// Retrasa cada operación sobre `table` antes de ejecutarla.
  pub fn delay_table(&self, table: Table, delay: Duration) {
    self.delays.lock().unwrap_or_else(|e| e.into_inner()).insert(table, delay);
  }

  pub fn clear_faults(&self) {
    self.failures.lock().unwrap_or_else(|e| e.into_inner()).clear();
    self.delays.lock().unwrap_or_else(|e| e.into_inner()).clear();
  }

  /// Operaciones recibidas desde la creación, incluidas las fallidas.
  pub fn call_count(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn calls_for(&self, table: Table) -> usize {
    self.calls_by_table.lock().unwrap_or_else(|e| e.into_inner()).get(&table).copied().unwrap_or(0)
  }

  /// Número de filas almacenadas en `table`.
  pub fn len(&self, table: Table) -> usize {
    self.tables.lock().unwrap_or_else(|e| e.into_inner()).get(&table).map(Vec::len).unwrap_or(0)
  }

  /// Helper para mapear `Mutex::lock()` en un `Result` con
  /// `StoreError::Pool`.
  fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> Result<MutexGuard<'a, T>, StoreError> {
    m.lock().map_err(|e| StoreError::Pool(format!("mutex envenenado: {:?}", e)))
  }

  /// Cuenta la llamada y aplica los fallos configurados. Ningún lock se
  /// mantiene durante la espera.
  async fn enter(&self, table: Table) -> Result<(), StoreError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.lock(&self.calls_by_table)?.entry(table).or_insert(0) += 1;
    let delay = self.lock(&self.delays)?.get(&table).copied();
    if let Some(d) = delay {
      tokio::time::sleep(d).await;
    }
    let failure = self.lock(&self.failures)?.get(&table).cloned();
    match failure {
      Some(message) => Err(StoreError::Rejected { table, message }),
      None => Ok(()),
    }
  }

  fn check_foreign_keys(tables: &HashMap<Table, Vec<Row>>, table: Table, row: &Row) -> Result<(), StoreError> {
    for fk in &table_def(table).foreign_keys {
      let Some(value) = row.get(fk.column).filter(|v| !v.is_null()) else {
        continue;
      };
      let exists = tables.get(&fk.references)
                         .map(|rows| rows.iter().any(|r| r.get("id").is_some_and(|id| json_eq(id, value))))
                         .unwrap_or(false);
      if !exists {
        return Err(StoreError::rejected(table,
                                        format!("violación de clave foránea: {} = {} no existe en {}",
                                                fk.column, value, fk.references)));
      }
    }
    Ok(())
  }

  /// Filas a borrar empezando por `(table, id)`, siguiendo las cascadas.
  fn plan_delete(tables: &HashMap<Table, Vec<Row>>, table: Table, id: &str) -> Result<Vec<(Table, String)>, StoreError> {
    let mut plan = vec![(table, id.to_string())];
    let mut seen: HashSet<(Table, String)> = plan.iter().cloned().collect();
    let mut queue: VecDeque<(Table, String)> = plan.iter().cloned().collect();
    let mut restricted: Vec<(Table, String, Table)> = Vec::new();
    while let Some((parent, parent_id)) = queue.pop_front() {
      for (child, fk) in referencing(parent) {
        let Some(rows) = tables.get(&child) else {
          continue;
        };
        for r in rows.iter().filter(|r| r.get(fk.column).and_then(JsonValue::as_str) == Some(parent_id.as_str())) {
          let child_id = r.get("id").and_then(JsonValue::as_str).unwrap_or_default().to_string();
          match fk.on_delete {
            OnDelete::Cascade => {
              if seen.insert((child, child_id.clone())) {
                plan.push((child, child_id.clone()));
                queue.push_back((child, child_id));
              }
            }
            OnDelete::Restrict => restricted.push((child, child_id, parent)),
          }
        }
      }
    }
    if let Some((child, _, parent)) = restricted.into_iter().find(|(t, i, _)| !seen.contains(&(*t, i.clone()))) {
      return Err(StoreError::rejected(table,
                                      format!("violación de clave foránea: {} sigue referenciada desde {}",
                                              parent, child)));
    }
    Ok(plan)
  }
}

impl Default for InMemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

fn matches(row: &Row, predicate: &Predicate) -> bool {
  let null = JsonValue::Null;
  let value = row.get(predicate.column()).unwrap_or(&null);
  match predicate {
    Predicate::Eq(_, expected) => json_eq(value, expected),
    Predicate::ILike(_, needle) => {
      value.as_str().is_some_and(|s| fold_case(s).contains(&fold_case(needle)))
    }
    Predicate::In(_, list) => list.iter().any(|v| json_eq(value, v)),
  }
}

#[async_trait]
impl DataStore for InMemoryStore {
  async fn select(&self, query: &Select) -> Result<Vec<Row>, StoreError> {
    self.enter(query.table).await?;
    check_select(table_def(query.table), query)?;
    let tables = self.lock(&self.tables)?;
    let mut rows: Vec<Row> = tables.get(&query.table)
                                   .map(|rows| {
                                     rows.iter()
                                         .filter(|r| query.predicates.iter().all(|p| matches(r, p)))
                                         .cloned()
                                         .collect()
                                   })
                                   .unwrap_or_default();
    drop(tables);
    if let Some(order) = &query.order {
      // sort_by es estable: los empates conservan el orden de inserción
      let null = JsonValue::Null;
      rows.sort_by(|a, b| {
            let ord = json_cmp(a.get(order.column).unwrap_or(&null), b.get(order.column).unwrap_or(&null));
            match order.direction {
              Direction::Asc => ord,
              Direction::Desc => ord.reverse(),
            }
          });
    }
    if let Some(limit) = query.limit {
      rows.truncate(limit);
    }
    Ok(rows)
  }

  async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError> {
    self.enter(table).await?;
    let mut row = normalize_insert(table_def(table), row)?;
    let now = JsonValue::String(format_timestamp(Utc::now()));
    row.insert("id".into(), JsonValue::String(Uuid::new_v4().to_string()));
    row.insert("created_at".into(), now.clone());
    row.insert("updated_at".into(), now);
    let mut tables = self.lock(&self.tables)?;
    Self::check_foreign_keys(&tables, table, &row)?;
    tables.entry(table).or_default().push(row.clone());
    log::debug!("insert {}: {}", table, row.get("id").and_then(JsonValue::as_str).unwrap_or("-"));
    Ok(row)
  }

  async fn update(&self,
                  table: Table,
                  id: &str,
                  patch: Row,
                  precondition: Option<&Precondition>)
                  -> Result<Option<Row>, StoreError> {
    self.enter(table).await?;
    let patch = normalize_patch(table_def(table), patch)?;
    let mut tables = self.lock(&self.tables)?;
    let Some(index) = tables.get(&table)
                            .and_then(|rows| rows.iter().position(|r| r.get("id").and_then(JsonValue::as_str) == Some(id)))
    else {
      return Ok(None);
    };
    let current = tables[&table][index].clone();
    let previous = current.get("updated_at").and_then(JsonValue::as_str).map(str::to_string);
    if let Some(Precondition::UpdatedAt(expected)) = precondition {
      if previous.as_deref().and_then(parse_timestamp) != Some(*expected) {
        log::warn!("update {} {}: precondición updated_at incumplida", table, id);
        return Err(StoreError::Conflict { table, id: id.to_string() });
      }
    }
    let mut updated = current;
    for (k, v) in patch {
      updated.insert(k, v);
    }
    updated.insert("updated_at".into(), JsonValue::String(next_updated_at(previous.as_deref())));
    Self::check_foreign_keys(&tables, table, &updated)?;
    if let Some(rows) = tables.get_mut(&table) {
      rows[index] = updated.clone();
    }
    Ok(Some(updated))
  }

  async fn delete(&self, table: Table, id: &str) -> Result<Option<Row>, StoreError> {
    self.enter(table).await?;
    let mut tables = self.lock(&self.tables)?;
    let root = tables.get(&table)
                     .and_then(|rows| rows.iter().find(|r| r.get("id").and_then(JsonValue::as_str) == Some(id)))
                     .cloned();
    let Some(root) = root else {
      return Ok(None);
    };
    let plan = Self::plan_delete(&tables, table, id)?;
    for (t, row_id) in &plan {
      if let Some(rows) = tables.get_mut(t) {
        rows.retain(|r| r.get("id").and_then(JsonValue::as_str) != Some(row_id.as_str()));
      }
    }
    if plan.len() > 1 {
      log::debug!("delete {} {}: {} filas dependientes en cascada", table, id, plan.len() - 1);
    }
    Ok(Some(root))
  }

  fn backend_name(&self) -> &'static str {
    "memory"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn row(v: JsonValue) -> Row {
    v.as_object().cloned().unwrap()
  }

  #[tokio::test]
  async fn faults_apply_per_table() {
    let store = InMemoryStore::new();
    store.fail_table(Table::Molecules, "sin conexión");
    let err = store.select(&Select::from(Table::Molecules)).await.unwrap_err();
    assert_eq!(err, StoreError::rejected(Table::Molecules, "sin conexión"));
    assert!(store.select(&Select::from(Table::Mixtures)).await.is_ok());
    store.clear_faults();
    assert!(store.select(&Select::from(Table::Molecules)).await.is_ok());
    assert_eq!(store.call_count(), 3);
    assert_eq!(store.calls_for(Table::Molecules), 2);
  }

  #[tokio::test]
  async fn select_order_ties_keep_insertion_order() {
    let store = InMemoryStore::new();
    for (name, public) in [("b", true), ("a", true), ("c", false)] {
      store.insert(Table::Mixtures, row(json!({"name": name, "is_public": public}))).await.unwrap();
    }
    let rows = store.select(&Select::from(Table::Mixtures).order_by("is_public", Direction::Desc)).await.unwrap();
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["b", "a", "c"]);
  }

  #[tokio::test]
  async fn unknown_predicate_column_is_rejected() {
    let store = InMemoryStore::new();
    let err = store.select(&Select::from(Table::Molecules).eq("colour", "red")).await.unwrap_err();
    assert_eq!(err.table(), Some(Table::Molecules));
  }
}
