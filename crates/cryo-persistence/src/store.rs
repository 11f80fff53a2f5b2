// store.rs
use crate::{Select, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use cryo_domain::{Row, Table};

/// Condición previa de una actualización. `UpdatedAt` rechaza la escritura
/// con `StoreError::Conflict` si la fila cambió desde que se leyó.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
  UpdatedAt(DateTime<Utc>),
}

/// Almacenamiento relacional remoto.
///
/// - `select` ignora `joins` y `columns`: devuelve filas completas.
/// - `insert` asigna `id`, `created_at` y `updated_at` y devuelve la fila
///   almacenada.
/// - `update` y `delete` devuelven `Ok(None)` si no existe la fila.
/// - Las claves foráneas se comprueban en todas las mutaciones: las filas
///   hijas propias se borran en cascada, las referencias ajenas impiden el
///   borrado.
#[async_trait]
pub trait DataStore: Send + Sync {
  async fn select(&self, query: &Select) -> Result<Vec<Row>, StoreError>;
  async fn insert(&self, table: Table, row: Row) -> Result<Row, StoreError>;
  async fn update(&self,
                  table: Table,
                  id: &str,
                  patch: Row,
                  precondition: Option<&Precondition>)
                  -> Result<Option<Row>, StoreError>;
  async fn delete(&self, table: Table, id: &str) -> Result<Option<Row>, StoreError>;
  fn backend_name(&self) -> &'static str;
}

/// Formato de marcas de tiempo compartido por ambos backends.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc))
}

/// Siguiente `updated_at`: el reloj actual, o un microsegundo más que el
/// anterior si el reloj no avanzó.
pub(crate) fn next_updated_at(previous: Option<&str>) -> String {
  let now = Utc::now();
  let next = match previous.and_then(parse_timestamp) {
    Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
    _ => now,
  };
  format_timestamp(next)
}
