use crate::{FieldError, ValidationError};

/// Validación de esquema de un payload antes de enviarlo al almacenamiento.
pub trait Validate {
  fn validate(&self) -> Result<(), ValidationError>;
}

/// Acumulador de errores por campo.
#[derive(Debug, Default)]
pub struct Validator {
  errors: Vec<FieldError>,
}

impl Validator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn check(&mut self, ok: bool, field: &str, reason: impl Into<String>) -> &mut Self {
    if !ok {
      self.errors.push(FieldError { field: field.to_string(), reason: reason.into() });
    }
    self
  }

  pub fn require_text(&mut self, field: &str, value: &str) -> &mut Self {
    self.check(!value.trim().is_empty(), field, "no puede estar vacío")
  }

  /// Un texto opcional puede faltar, pero si viene no puede estar en blanco.
  pub fn optional_text(&mut self, field: &str, value: Option<&str>) -> &mut Self {
    match value {
      Some(v) => self.require_text(field, v),
      None => self,
    }
  }

  pub fn finite(&mut self, field: &str, value: f64) -> &mut Self {
    self.check(value.is_finite(), field, "debe ser un número finito")
  }

  pub fn positive(&mut self, field: &str, value: f64) -> &mut Self {
    self.check(value.is_finite() && value > 0.0, field, "debe ser mayor que cero")
  }

  pub fn non_negative(&mut self, field: &str, value: f64) -> &mut Self {
    self.check(value.is_finite() && value >= 0.0, field, "no puede ser negativo")
  }

  /// Valores en el intervalo cerrado [0, 1] (p.ej. `confidence`).
  pub fn fraction(&mut self, field: &str, value: f64) -> &mut Self {
    self.check((0.0..=1.0).contains(&value), field, "debe estar entre 0 y 1")
  }

  pub fn finish(&mut self) -> Result<(), ValidationError> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(ValidationError { fields: std::mem::take(&mut self.errors) })
    }
  }
}
