// Archivo: errors.rs
// Propósito: errores de lectura y mutación de los módulos de consulta.
use cryo_domain::ValidationError;
use cryo_persistence::StoreError;
use thiserror::Error;

/// Errores de una consulta o mutación.
///
/// - `Validation`: el payload no pasó la validación; no hubo llamada al
///   almacenamiento.
/// - `Store`: el almacenamiento rechazó la operación.
/// - `NotFound`: la lectura o mutación por id no encontró la fila.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No encontrado: {entity} {id}")]
    NotFound { entity: &'static str, id: String },
}

impl QueryError {
    pub fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound { .. })
    }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, QueryError>;
