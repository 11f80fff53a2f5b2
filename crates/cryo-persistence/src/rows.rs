// rows.rs
// Validación de filas contra `schema`, común a ambos backends.
use crate::schema::{ColumnDef, ColumnKind, TableDef, SERVER_COLUMNS};
use crate::store::{format_timestamp, parse_timestamp};
use crate::{Select, StoreError};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

fn check_value(def: &TableDef, col: &ColumnDef, value: JsonValue) -> Result<JsonValue, StoreError> {
  let reject = |reason: &str| StoreError::rejected(def.table, format!("valor inválido para {}: {}", col.name, reason));
  if value.is_null() {
    return if col.nullable { Ok(value) } else { Err(reject("no admite null")) };
  }
  match col.kind {
    ColumnKind::Text if value.is_string() => Ok(value),
    ColumnKind::Real if value.is_number() => Ok(value),
    ColumnKind::Bool if value.is_boolean() => Ok(value),
    ColumnKind::Json => Ok(value),
    ColumnKind::Timestamp => {
      let ts = value.as_str().and_then(parse_timestamp).ok_or_else(|| reject("se esperaba fecha RFC 3339"))?;
      Ok(JsonValue::String(format_timestamp(ts)))
    }
    ColumnKind::Text => Err(reject("se esperaba texto")),
    ColumnKind::Real => Err(reject("se esperaba un número")),
    ColumnKind::Bool => Err(reject("se esperaba un booleano")),
  }
}

fn known_column<'a>(def: &'a TableDef, name: &str) -> Result<&'a ColumnDef, StoreError> {
  def.column(name)
     .ok_or_else(|| StoreError::rejected(def.table, format!("la columna {} no existe en {}", name, def.table)))
}

fn writable_column<'a>(def: &'a TableDef, name: &str) -> Result<&'a ColumnDef, StoreError> {
  if SERVER_COLUMNS.contains(&name) {
    return Err(StoreError::rejected(def.table, format!("la columna {} la asigna el almacenamiento", name)));
  }
  known_column(def, name)
}

/// Fila de alta completa: columnas desconocidas rechazadas, opcionales
/// ausentes a null. No incluye las columnas de servidor.
pub(crate) fn normalize_insert(def: &TableDef, row: cryo_domain::Row) -> Result<cryo_domain::Row, StoreError> {
  let mut out = cryo_domain::Row::new();
  for (name, value) in row {
    let col = writable_column(def, &name)?;
    out.insert(name, check_value(def, col, value)?);
  }
  for col in def.columns.iter().filter(|c| !SERVER_COLUMNS.contains(&c.name)) {
    if out.contains_key(col.name) {
      continue;
    }
    let default = match (col.kind, col.nullable) {
      (_, true) => JsonValue::Null,
      (ColumnKind::Json, false) => JsonValue::Array(Vec::new()),
      _ => {
        return Err(StoreError::rejected(def.table, format!("falta la columna obligatoria {}", col.name)));
      }
    };
    out.insert(col.name.to_string(), default);
  }
  Ok(out)
}

pub(crate) fn normalize_patch(def: &TableDef, patch: cryo_domain::Row) -> Result<cryo_domain::Row, StoreError> {
  let mut out = cryo_domain::Row::new();
  for (name, value) in patch {
    let col = writable_column(def, &name)?;
    out.insert(name, check_value(def, col, value)?);
  }
  Ok(out)
}

/// Comprueba que la consulta sólo nombra columnas conocidas.
pub(crate) fn check_select(def: &TableDef, query: &Select) -> Result<(), StoreError> {
  for p in &query.predicates {
    known_column(def, p.column())?;
  }
  if let Some(order) = &query.order {
    known_column(def, order.column)?;
  }
  Ok(())
}

/// Igualdad con números comparados como f64.
pub(crate) fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
  match (a, b) {
    (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
    _ => a == b,
  }
}

/// Orden de SQLite: null < números < texto; booleanos como 0/1.
pub(crate) fn json_cmp(a: &JsonValue, b: &JsonValue) -> Ordering {
  fn rank(v: &JsonValue) -> u8 {
    match v {
      JsonValue::Null => 0,
      JsonValue::Bool(_) | JsonValue::Number(_) => 1,
      _ => 2,
    }
  }
  fn num(v: &JsonValue) -> f64 {
    match v {
      JsonValue::Bool(b) => f64::from(u8::from(*b)),
      other => other.as_f64().unwrap_or(0.0),
    }
  }
  match rank(a).cmp(&rank(b)) {
    Ordering::Equal => match (a, b) {
      (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
      (JsonValue::Null, JsonValue::Null) => Ordering::Equal,
      (x, y) if rank(x) == 1 => num(x).partial_cmp(&num(y)).unwrap_or(Ordering::Equal),
      (x, y) => x.to_string().cmp(&y.to_string()),
    },
    other => other,
  }
}

/// Pliegue de mayúsculas de la búsqueda por subcadena, igual en ambos
/// backends.
pub(crate) fn fold_case(s: &str) -> String {
  s.to_lowercase()
}
