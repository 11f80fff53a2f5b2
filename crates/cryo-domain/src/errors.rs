// errors.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Motivo por el que un campo concreto del payload no pasó la validación.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field: String,
  pub reason: String,
}

/// Error de validación previo a cualquier llamada al almacenamiento.
///
/// Acumula todos los campos inválidos para que el llamador pueda mostrarlos
/// uno a uno.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Error de validación: {}", render(.fields))]
pub struct ValidationError {
  pub fields: Vec<FieldError>,
}

fn render(fields: &[FieldError]) -> String {
  fields.iter().map(|f| format!("{}: {}", f.field, f.reason)).collect::<Vec<_>>().join("; ")
}

impl ValidationError {
  pub fn single(field: &str, reason: impl Into<String>) -> Self {
    Self { fields: vec![FieldError { field: field.to_string(), reason: reason.into() }] }
  }

  pub fn has_field(&self, field: &str) -> bool {
    self.fields.iter().any(|f| f.field == field)
  }

  pub fn reason_for(&self, field: &str) -> Option<&str> {
    self.fields.iter().find(|f| f.field == field).map(|f| f.reason.as_str())
  }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("Error de serialización: {0}")]
  Serialization(String),
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}
