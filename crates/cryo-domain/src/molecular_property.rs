// molecular_property.rs
use crate::{Record, Table, Validate, ValidationError, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tipo de propiedad física medida o predicha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
  FreezingPoint,
  GlassTransition,
  Viscosity,
  Toxicity,
  Permeability,
  Osmolality,
  Density,
  MolecularWeight,
  Solubility,
  PartitionCoefficient,
  Other,
}

impl PropertyType {
  pub const ALL: [PropertyType; 11] = [PropertyType::FreezingPoint,
                                       PropertyType::GlassTransition,
                                       PropertyType::Viscosity,
                                       PropertyType::Toxicity,
                                       PropertyType::Permeability,
                                       PropertyType::Osmolality,
                                       PropertyType::Density,
                                       PropertyType::MolecularWeight,
                                       PropertyType::Solubility,
                                       PropertyType::PartitionCoefficient,
                                       PropertyType::Other];

  pub fn as_str(&self) -> &'static str {
    match self {
      PropertyType::FreezingPoint => "freezing_point",
      PropertyType::GlassTransition => "glass_transition",
      PropertyType::Viscosity => "viscosity",
      PropertyType::Toxicity => "toxicity",
      PropertyType::Permeability => "permeability",
      PropertyType::Osmolality => "osmolality",
      PropertyType::Density => "density",
      PropertyType::MolecularWeight => "molecular_weight",
      PropertyType::Solubility => "solubility",
      PropertyType::PartitionCoefficient => "partition_coefficient",
      PropertyType::Other => "other",
    }
  }
}

impl fmt::Display for PropertyType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PropertyType {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    PropertyType::ALL.iter()
                     .copied()
                     .find(|p| p.as_str() == s)
                     .ok_or_else(|| ValidationError::single("property_type", format!("tipo desconocido: {}", s)))
  }
}

/// Valor físico de una molécula. `is_experimental` distingue medido de
/// bibliográfico o predicho.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolecularProperty {
  pub id: String,
  pub molecule_id: String,
  pub property_type: PropertyType,
  pub value: f64,
  pub unit: String,
  pub temperature: Option<f64>,
  pub pressure: Option<f64>,
  pub is_experimental: bool,
  pub confidence: Option<f64>,
  pub source: Option<String>,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for MolecularProperty {
  const TABLE: Table = Table::MolecularProperties;

  fn id(&self) -> &str {
    &self.id
  }
}

impl fmt::Display for MolecularProperty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "MolecularProperty(type: {}, value: {} {}, experimental: {})",
           self.property_type, self.value, self.unit, self.is_experimental)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMolecularProperty {
  pub molecule_id: String,
  pub property_type: PropertyType,
  pub value: f64,
  pub unit: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pressure: Option<f64>,
  pub is_experimental: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub confidence: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl NewMolecularProperty {
  pub fn new(molecule_id: &str, property_type: PropertyType, value: f64, unit: &str, is_experimental: bool) -> Self {
    Self { molecule_id: molecule_id.to_string(),
           property_type,
           value,
           unit: unit.to_string(),
           temperature: None,
           pressure: None,
           is_experimental,
           confidence: None,
           source: None,
           notes: None }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MolecularPropertyPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub property_type: Option<PropertyType>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pressure: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_experimental: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub confidence: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

fn check_measurement(v: &mut Validator, temperature: Option<f64>, pressure: Option<f64>, confidence: Option<f64>) {
  if let Some(t) = temperature {
    // temperaturas en °C
    v.check(t.is_finite() && t >= -273.15, "temperature", "por debajo del cero absoluto");
  }
  if let Some(p) = pressure {
    v.non_negative("pressure", p);
  }
  if let Some(c) = confidence {
    v.fraction("confidence", c);
  }
}

impl Validate for NewMolecularProperty {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.require_text("molecule_id", &self.molecule_id)
     .finite("value", self.value)
     .require_text("unit", &self.unit);
    check_measurement(&mut v, self.temperature, self.pressure, self.confidence);
    v.finish()
  }
}

impl Validate for MolecularPropertyPatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    if let Some(val) = self.value {
      v.finite("value", val);
    }
    v.optional_text("unit", self.unit.as_deref());
    check_measurement(&mut v, self.temperature, self.pressure, self.confidence);
    v.finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_known_types_and_rejects_unknown() {
    assert_eq!("freezing_point".parse::<PropertyType>().unwrap(), PropertyType::FreezingPoint);
    let err = "boiling_point".parse::<PropertyType>().unwrap_err();
    assert!(err.has_field("property_type"));
  }

  #[test]
  fn serde_uses_snake_case() {
    let v = serde_json::to_value(PropertyType::PartitionCoefficient).unwrap();
    assert_eq!(v, serde_json::json!("partition_coefficient"));
  }

  #[test]
  fn confidence_out_of_range_fails() {
    let mut p = NewMolecularProperty::new("m1", PropertyType::Toxicity, 1.0, "mM", false);
    p.confidence = Some(1.2);
    let err = p.validate().unwrap_err();
    assert!(err.has_field("confidence"));
  }

  #[test]
  fn missing_parent_is_a_field_error() {
    let p = NewMolecularProperty::new("", PropertyType::Density, 1.1, "g/cm3", true);
    assert!(p.validate().unwrap_err().has_field("molecule_id"));
  }
}
