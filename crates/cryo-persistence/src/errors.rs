// errors.rs
use cryo_domain::{DomainError, Table};
use thiserror::Error;

/// Errores del almacenamiento. Los mensajes del backend se pasan tal cual.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
  /// Consulta o mutación rechazada por el almacenamiento.
  #[error("{table}: {message}")]
  Rejected { table: Table, message: String },
  /// La precondición `updated_at` no se cumplió.
  #[error("Conflicto: la fila {id} de {table} cambió desde la última lectura")]
  Conflict { table: Table, id: String },
  /// Pool de conexiones, tareas bloqueantes o mutex envenenado.
  #[error("Error de conexión: {0}")]
  Pool(String),
  #[error("Error de serialización: {0}")]
  Serialization(String),
}

impl StoreError {
  pub fn rejected(table: Table, message: impl Into<String>) -> Self {
    Self::Rejected { table, message: message.into() }
  }

  /// Tabla de origen, cuando el error proviene de una operación concreta.
  pub fn table(&self) -> Option<Table> {
    match self {
      StoreError::Rejected { table, .. } | StoreError::Conflict { table, .. } => Some(*table),
      _ => None,
    }
  }
}

impl From<DomainError> for StoreError {
  fn from(e: DomainError) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl From<serde_json::Error> for StoreError {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}
