// mixture.rs
use crate::{EntityFilter, Filter, FilterSet, MoleculeSummary, Record, Table, Validate, ValidationError, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composición con nombre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mixture {
  pub id: String,
  pub name: String,
  pub description: Option<String>,
  pub is_public: bool,
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for Mixture {
  const TABLE: Table = Table::Mixtures;

  fn id(&self) -> &str {
    &self.id
  }
}

impl fmt::Display for Mixture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Mixture(id: {}, name: {})", self.id, self.name)
  }
}

/// Relación mezcla-molécula con cantidad y rol opcional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
  pub id: String,
  pub mixture_id: String,
  pub molecule_id: String,
  pub amount: f64,
  pub amount_unit: String,
  pub role: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  /// Sólo presente cuando la lectura embebe la molécula.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub molecule: Option<MoleculeSummary>,
}

impl Record for MixtureComponent {
  const TABLE: Table = Table::MixtureComponents;

  fn id(&self) -> &str {
    &self.id
  }
}

/// Detalle de mezcla con sus componentes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureWithComponents {
  #[serde(flatten)]
  pub mixture: Mixture,
  #[serde(default)]
  pub components: Vec<MixtureComponent>,
}

impl MixtureWithComponents {
  /// Suma de las cantidades expresadas en `unit`.
  pub fn total_amount(&self, unit: &str) -> f64 {
    self.components.iter().filter(|c| c.amount_unit == unit).map(|c| c.amount).sum()
  }
}

/// `created_by` no forma parte del payload: lo aporta la sesión.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMixture {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub is_public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixturePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_public: Option<bool>,
}

impl Validate for NewMixture {
  fn validate(&self) -> Result<(), ValidationError> {
    Validator::new().require_text("name", &self.name)
                    .optional_text("description", self.description.as_deref())
                    .finish()
  }
}

impl Validate for MixturePatch {
  fn validate(&self) -> Result<(), ValidationError> {
    Validator::new().optional_text("name", self.name.as_deref())
                    .optional_text("description", self.description.as_deref())
                    .finish()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMixtureComponent {
  pub mixture_id: String,
  pub molecule_id: String,
  pub amount: f64,
  pub amount_unit: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponentPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amount: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub amount_unit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
}

impl Validate for NewMixtureComponent {
  fn validate(&self) -> Result<(), ValidationError> {
    Validator::new().require_text("mixture_id", &self.mixture_id)
                    .require_text("molecule_id", &self.molecule_id)
                    .positive("amount", self.amount)
                    .require_text("amount_unit", &self.amount_unit)
                    .optional_text("role", self.role.as_deref())
                    .finish()
  }
}

impl Validate for MixtureComponentPatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    if let Some(a) = self.amount {
      v.positive("amount", a);
    }
    v.optional_text("amount_unit", self.amount_unit.as_deref())
     .optional_text("role", self.role.as_deref())
     .finish()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixtureFilter {
  pub name: Option<String>,
  pub description: Option<String>,
  pub is_public: Option<bool>,
  pub created_by: Option<String>,
}

impl EntityFilter for MixtureFilter {
  fn live_filters(&self) -> Vec<Filter> {
    FilterSet::new().substring("name", self.name.as_deref())
                    .substring("description", self.description.as_deref())
                    .flag("is_public", self.is_public)
                    .exact("created_by", self.created_by.as_deref())
                    .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn component_amount_must_be_positive() {
    let c = NewMixtureComponent { mixture_id: "mx".into(),
                                  molecule_id: "m".into(),
                                  amount: 0.0,
                                  amount_unit: "%".into(),
                                  role: None };
    assert!(c.validate().unwrap_err().has_field("amount"));
  }

  #[test]
  fn detail_deserializes_flattened_row() {
    let raw = json!({
      "id": "mx1", "name": "DMSO-PBS Solution", "description": null, "is_public": true,
      "created_by": "u1", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z",
      "components": [{
        "id": "c1", "mixture_id": "mx1", "molecule_id": "m1", "amount": 10.0, "amount_unit": "%",
        "role": "cryoprotectant", "created_at": "2024-01-01T00:00:00Z", "updated_at": "2024-01-01T00:00:00Z",
        "molecule": {"id": "m1", "name": "DMSO", "formula": "C2H6OS", "molecular_weight": 78.13}
      }]
    });
    let detail: MixtureWithComponents = serde_json::from_value(raw).unwrap();
    assert_eq!(detail.mixture.name, "DMSO-PBS Solution");
    assert_eq!(detail.components.len(), 1);
    assert_eq!(detail.components[0].molecule.as_ref().unwrap().name, "DMSO");
    assert_eq!(detail.total_amount("%"), 10.0);
  }

  #[test]
  fn description_filter_is_substring_and_flags_are_exact() {
    let f = MixtureFilter { description: Some("pbs".into()), is_public: Some(true), ..Default::default() };
    let live = f.live_filters();
    assert_eq!(live[0].kind, crate::MatchKind::Substring);
    assert_eq!(live[1].kind, crate::MatchKind::Exact);
  }
}
