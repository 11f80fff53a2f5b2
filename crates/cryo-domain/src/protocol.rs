// protocol.rs
use crate::{EntityFilter, Filter, FilterSet, Record, Table, Validate, ValidationError, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paso de protocolo. El orden dentro de `Protocol::steps` es el orden de
/// ejecución.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStep {
  pub name: String,
  pub duration: f64,
  pub duration_unit: String,
  #[serde(default)]
  pub temperature: Option<f64>,
  pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
  pub id: String,
  pub mixture_id: String,
  pub name: String,
  pub description: Option<String>,
  pub steps: Vec<ProtocolStep>,
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for Protocol {
  const TABLE: Table = Table::Protocols;

  fn id(&self) -> &str {
    &self.id
  }
}

impl Protocol {
  /// Duración total de los pasos expresados en `unit`.
  pub fn total_duration(&self, unit: &str) -> f64 {
    self.steps.iter().filter(|s| s.duration_unit == unit).map(|s| s.duration).sum()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProtocol {
  pub mixture_id: String,
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub steps: Vec<ProtocolStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Reemplaza la lista completa de pasos.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub steps: Option<Vec<ProtocolStep>>,
}

fn check_steps(v: &mut Validator, steps: &[ProtocolStep]) {
  for (i, step) in steps.iter().enumerate() {
    v.require_text(&format!("steps[{}].name", i), &step.name)
     .non_negative(&format!("steps[{}].duration", i), step.duration)
     .require_text(&format!("steps[{}].duration_unit", i), &step.duration_unit)
     .require_text(&format!("steps[{}].action", i), &step.action);
    if let Some(t) = step.temperature {
      v.check(t.is_finite() && t >= -273.15, &format!("steps[{}].temperature", i), "por debajo del cero absoluto");
    }
  }
}

impl Validate for NewProtocol {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.require_text("mixture_id", &self.mixture_id).require_text("name", &self.name);
    v.check(!self.steps.is_empty(), "steps", "un protocolo necesita al menos un paso");
    check_steps(&mut v, &self.steps);
    v.finish()
  }
}

impl Validate for ProtocolPatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.optional_text("name", self.name.as_deref());
    if let Some(steps) = &self.steps {
      v.check(!steps.is_empty(), "steps", "un protocolo necesita al menos un paso");
      check_steps(&mut v, steps);
    }
    v.finish()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFilter {
  pub name: Option<String>,
  pub mixture_id: Option<String>,
}

impl EntityFilter for ProtocolFilter {
  fn live_filters(&self) -> Vec<Filter> {
    FilterSet::new().substring("name", self.name.as_deref())
                    .exact("mixture_id", self.mixture_id.as_deref())
                    .build()
  }
}
