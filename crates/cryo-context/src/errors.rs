use thiserror::Error;

// Errores al construir la raíz de proveedores: configuración inválida o
// backend que no se pudo abrir.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
  /// El almacenamiento no se pudo abrir o migrar.
  #[error("Error de almacenamiento: {0}")]
  Store(#[from] cryo_persistence::StoreError),

  /// Variable de entorno con un valor que no se puede interpretar.
  #[error("Error de configuración: {0}")]
  Config(String),
}
