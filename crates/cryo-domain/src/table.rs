use crate::DomainError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Fila tal como viaja entre el cliente de datos y el almacenamiento.
pub type Row = serde_json::Map<String, JsonValue>;

/// Tablas del almacenamiento relacional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
  Molecules,
  MolecularProperties,
  Mixtures,
  MixtureComponents,
  Experiments,
  ExperimentProperties,
  Predictions,
  Protocols,
}

impl Table {
  pub const ALL: [Table; 8] = [Table::Molecules,
                               Table::MolecularProperties,
                               Table::Mixtures,
                               Table::MixtureComponents,
                               Table::Experiments,
                               Table::ExperimentProperties,
                               Table::Predictions,
                               Table::Protocols];

  pub fn name(&self) -> &'static str {
    match self {
      Table::Molecules => "molecules",
      Table::MolecularProperties => "molecular_properties",
      Table::Mixtures => "mixtures",
      Table::MixtureComponents => "mixture_components",
      Table::Experiments => "experiments",
      Table::ExperimentProperties => "experiment_properties",
      Table::Predictions => "predictions",
      Table::Protocols => "protocols",
    }
  }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Entidad persistida en una tabla concreta.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
  const TABLE: Table;

  fn id(&self) -> &str;
}

/// Serializa un payload a una fila. Falla si el valor no es un objeto JSON.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, DomainError> {
  match serde_json::to_value(value)? {
    JsonValue::Object(map) => Ok(map),
    other => Err(DomainError::Serialization(format!("se esperaba un objeto JSON, se obtuvo: {}", other))),
  }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, DomainError> {
  Ok(serde_json::from_value(JsonValue::Object(row))?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn table_names_are_unique() {
    let mut names: Vec<&str> = Table::ALL.iter().map(|t| t.name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), Table::ALL.len());
  }

  #[test]
  fn to_row_rejects_scalars() {
    assert!(to_row(&json!(3)).is_err());
    let row = to_row(&json!({"a": 1})).unwrap();
    assert_eq!(row["a"], json!(1));
  }
}
