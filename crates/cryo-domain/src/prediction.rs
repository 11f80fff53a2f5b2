// prediction.rs
use crate::{EntityFilter, Filter, FilterSet, PropertyType, Record, Table, Validate, ValidationError, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Estimación de una propiedad molecular generada por un modelo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
  pub id: String,
  pub molecule_id: String,
  pub property_type: PropertyType,
  pub value: f64,
  pub unit: String,
  pub confidence: f64,
  pub model_version: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for Prediction {
  const TABLE: Table = Table::Predictions;

  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
  pub molecule_id: String,
  pub property_type: PropertyType,
  pub value: f64,
  pub unit: String,
  pub confidence: f64,
  pub model_version: String,
}

impl Validate for NewPrediction {
  fn validate(&self) -> Result<(), ValidationError> {
    Validator::new().require_text("molecule_id", &self.molecule_id)
                    .finite("value", self.value)
                    .require_text("unit", &self.unit)
                    .fraction("confidence", self.confidence)
                    .require_text("model_version", &self.model_version)
                    .finish()
  }
}

/// Recalibración de una predicción existente.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub confidence: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model_version: Option<String>,
}

impl Validate for PredictionPatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    if let Some(val) = self.value {
      v.finite("value", val);
    }
    if let Some(c) = self.confidence {
      v.fraction("confidence", c);
    }
    v.optional_text("unit", self.unit.as_deref())
     .optional_text("model_version", self.model_version.as_deref())
     .finish()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionFilter {
  pub molecule_id: Option<String>,
  pub property_type: Option<PropertyType>,
  pub model_version: Option<String>,
}

impl EntityFilter for PredictionFilter {
  fn live_filters(&self) -> Vec<Filter> {
    FilterSet::new().exact("molecule_id", self.molecule_id.as_deref())
                    .exact("property_type", self.property_type.as_ref().map(|p| p.as_str()))
                    .exact("model_version", self.model_version.as_deref())
                    .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prediction_requires_model_and_bounded_confidence() {
    let p = NewPrediction { molecule_id: "m1".into(),
                            property_type: PropertyType::GlassTransition,
                            value: -115.0,
                            unit: "°C".into(),
                            confidence: -0.1,
                            model_version: " ".into() };
    let err = p.validate().unwrap_err();
    assert!(err.has_field("confidence"));
    assert!(err.has_field("model_version"));
  }
}
