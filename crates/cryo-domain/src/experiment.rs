// experiment.rs
use crate::{EntityFilter, Filter, FilterSet, MixtureWithComponents, Record, Table, Validate, ValidationError, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
  Planned,
  InProgress,
  Completed,
  Failed,
  Cancelled,
}

impl ExperimentStatus {
  pub const ALL: [ExperimentStatus; 5] = [ExperimentStatus::Planned,
                                          ExperimentStatus::InProgress,
                                          ExperimentStatus::Completed,
                                          ExperimentStatus::Failed,
                                          ExperimentStatus::Cancelled];

  pub fn as_str(&self) -> &'static str {
    match self {
      ExperimentStatus::Planned => "planned",
      ExperimentStatus::InProgress => "in_progress",
      ExperimentStatus::Completed => "completed",
      ExperimentStatus::Failed => "failed",
      ExperimentStatus::Cancelled => "cancelled",
    }
  }

  /// Estados que ya no admiten cambios de resultado.
  pub fn is_terminal(&self) -> bool {
    matches!(self, ExperimentStatus::Completed | ExperimentStatus::Failed | ExperimentStatus::Cancelled)
  }
}

impl fmt::Display for ExperimentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ExperimentStatus {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ExperimentStatus::ALL.iter()
                         .copied()
                         .find(|st| st.as_str() == s)
                         .ok_or_else(|| ValidationError::single("status", format!("estado desconocido: {}", s)))
  }
}

/// Ejecución sobre una mezcla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
  pub id: String,
  pub name: String,
  pub mixture_id: String,
  pub protocol: Option<String>,
  pub temperature: Option<f64>,
  pub pressure: Option<f64>,
  pub status: ExperimentStatus,
  pub started_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  pub notes: Option<String>,
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for Experiment {
  const TABLE: Table = Table::Experiments;

  fn id(&self) -> &str {
    &self.id
  }
}

/// Detalle de experimento con la mezcla y sus componentes embebidos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDetail {
  #[serde(flatten)]
  pub experiment: Experiment,
  #[serde(default)]
  pub mixture: Option<MixtureWithComponents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExperiment {
  pub name: String,
  pub mixture_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pressure: Option<f64>,
  pub status: ExperimentStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl NewExperiment {
  pub fn planned(name: &str, mixture_id: &str) -> Self {
    Self { name: name.to_string(),
           mixture_id: mixture_id.to_string(),
           protocol: None,
           temperature: None,
           pressure: None,
           status: ExperimentStatus::Planned,
           started_at: None,
           completed_at: None,
           notes: None }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pressure: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ExperimentStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

fn check_conditions(v: &mut Validator,
                    temperature: Option<f64>,
                    pressure: Option<f64>,
                    started_at: Option<DateTime<Utc>>,
                    completed_at: Option<DateTime<Utc>>) {
  if let Some(t) = temperature {
    v.check(t.is_finite() && t >= -273.15, "temperature", "por debajo del cero absoluto");
  }
  if let Some(p) = pressure {
    v.non_negative("pressure", p);
  }
  if let (Some(start), Some(end)) = (started_at, completed_at) {
    v.check(end >= start, "completed_at", "anterior a started_at");
  }
}

impl Validate for NewExperiment {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.require_text("name", &self.name).require_text("mixture_id", &self.mixture_id);
    check_conditions(&mut v, self.temperature, self.pressure, self.started_at, self.completed_at);
    v.finish()
  }
}

impl Validate for ExperimentPatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.optional_text("name", self.name.as_deref());
    check_conditions(&mut v, self.temperature, self.pressure, self.started_at, self.completed_at);
    v.finish()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentFilter {
  pub name: Option<String>,
  pub mixture_id: Option<String>,
  pub status: Option<ExperimentStatus>,
  pub created_by: Option<String>,
}

impl EntityFilter for ExperimentFilter {
  fn live_filters(&self) -> Vec<Filter> {
    FilterSet::new().substring("name", self.name.as_deref())
                    .exact("mixture_id", self.mixture_id.as_deref())
                    .exact("status", self.status.as_ref().map(|s| s.as_str()))
                    .exact("created_by", self.created_by.as_deref())
                    .build()
  }
}

/// Medida de resultado de un experimento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
  Viability,
  Recovery,
  MembraneIntegrity,
  Morphology,
  Functionality,
  Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentProperty {
  pub id: String,
  pub experiment_id: String,
  pub property_type: OutcomeType,
  pub value: f64,
  pub unit: String,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for ExperimentProperty {
  const TABLE: Table = Table::ExperimentProperties;

  fn id(&self) -> &str {
    &self.id
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExperimentProperty {
  pub experiment_id: String,
  pub property_type: OutcomeType,
  pub value: f64,
  pub unit: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPropertyPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

impl Validate for NewExperimentProperty {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.require_text("experiment_id", &self.experiment_id)
     .finite("value", self.value)
     .require_text("unit", &self.unit);
    check_percentage(&mut v, Some(self.unit.as_str()), Some(self.value));
    v.finish()
  }
}

/// Un valor en `%` debe estar en [0, 100]. En un parche sólo se comprueba
/// si trae a la vez la unidad y el valor.
fn check_percentage(v: &mut Validator, unit: Option<&str>, value: Option<f64>) {
  if let (Some("%"), Some(value)) = (unit, value) {
    v.check((0.0..=100.0).contains(&value), "value", "porcentaje fuera de [0, 100]");
  }
}

impl Validate for ExperimentPropertyPatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    if let Some(val) = self.value {
      v.finite("value", val);
    }
    check_percentage(&mut v, self.unit.as_deref(), self.value);
    v.optional_text("unit", self.unit.as_deref()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn completion_before_start_is_rejected() {
    let now = Utc::now();
    let mut e = NewExperiment::planned("Vitrificación", "mx1");
    e.started_at = Some(now);
    e.completed_at = Some(now - Duration::hours(1));
    assert!(e.validate().unwrap_err().has_field("completed_at"));
  }

  #[test]
  fn percentage_patch_is_range_checked() {
    let patch = ExperimentPropertyPatch { value: Some(150.0), unit: Some("%".into()), notes: None };
    assert!(patch.validate().unwrap_err().has_field("value"));
    let patch = ExperimentPropertyPatch { value: Some(150.0), unit: Some("min".into()), notes: None };
    assert!(patch.validate().is_ok());
    let new = NewExperimentProperty { experiment_id: "e1".into(),
                                      property_type: OutcomeType::Recovery,
                                      value: -5.0,
                                      unit: "%".into(),
                                      notes: None };
    assert!(new.validate().unwrap_err().has_field("value"));
  }

  #[test]
  fn status_round_trips_through_str() {
    for st in ExperimentStatus::ALL {
      assert_eq!(st.as_str().parse::<ExperimentStatus>().unwrap(), st);
    }
    assert!("paused".parse::<ExperimentStatus>().is_err());
    assert!(ExperimentStatus::Cancelled.is_terminal());
    assert!(!ExperimentStatus::InProgress.is_terminal());
  }

  #[test]
  fn status_filter_uses_wire_name() {
    let f = ExperimentFilter { status: Some(ExperimentStatus::InProgress), ..Default::default() };
    assert_eq!(f.live_filters()[0].value, serde_json::json!("in_progress"));
  }

  #[test]
  fn viability_percentage_is_bounded() {
    let p = NewExperimentProperty { experiment_id: "e1".into(),
                                    property_type: OutcomeType::Viability,
                                    value: 140.0,
                                    unit: "%".into(),
                                    notes: None };
    assert!(p.validate().is_err());
  }
}
