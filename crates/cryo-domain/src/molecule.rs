// molecule.rs
use crate::{EntityFilter, Filter, FilterSet, Record, Table, Validate, ValidationError, Validator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fila de la tabla `molecules`: identidad química y procedencia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
  pub id: String,
  pub name: String,
  pub smiles: Option<String>,
  pub inchi: Option<String>,
  pub inchikey: Option<String>,
  pub formula: Option<String>,
  pub molecular_weight: Option<f64>,
  pub source: Option<String>,
  pub source_id: Option<String>,
  pub source_url: Option<String>,
  pub is_verified: bool,
  pub notes: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Record for Molecule {
  const TABLE: Table = Table::Molecules;

  fn id(&self) -> &str {
    &self.id
  }
}

impl fmt::Display for Molecule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Molecule(id: {}, name: {}, formula: {})",
           self.id,
           self.name,
           self.formula.as_deref().unwrap_or("-"))
  }
}

/// Resumen embebido en componentes de mezcla.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleculeSummary {
  pub id: String,
  pub name: String,
  pub formula: Option<String>,
  pub molecular_weight: Option<f64>,
}

impl MoleculeSummary {
  pub const COLUMNS: &'static [&'static str] = &["id", "name", "formula", "molecular_weight"];
}

/// Payload de alta de una molécula.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewMolecule {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub smiles: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inchi: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inchikey: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub formula: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub molecular_weight: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_url: Option<String>,
  pub is_verified: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Parche parcial: sólo se envían los campos presentes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoleculePatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub smiles: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inchi: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inchikey: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub formula: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub molecular_weight: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_verified: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Mismo formato que acepta el motor químico: 14-10-1 caracteres en
/// mayúsculas o dígitos separados por dos guiones.
fn inchikey_is_valid(inchikey: &str) -> bool {
  if inchikey.len() != 27 || inchikey.matches('-').count() != 2 {
    return false;
  }
  let parts: Vec<&str> = inchikey.split('-').collect();
  parts.len() == 3
  && parts[0].len() == 14
  && parts[1].len() == 10
  && parts[2].len() == 1
  && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
}

fn check_identity(v: &mut Validator,
                  inchikey: Option<&str>,
                  molecular_weight: Option<f64>,
                  source_url: Option<&str>,
                  smiles: Option<&str>,
                  inchi: Option<&str>) {
  if let Some(ik) = inchikey {
    v.check(inchikey_is_valid(ik), "inchikey", "formato InChIKey inválido");
  }
  if let Some(mw) = molecular_weight {
    v.positive("molecular_weight", mw);
  }
  if let Some(url) = source_url {
    v.check(url.starts_with("http://") || url.starts_with("https://"),
            "source_url",
            "debe ser una URL http(s)");
  }
  v.optional_text("smiles", smiles).optional_text("inchi", inchi);
}

impl Validate for NewMolecule {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.require_text("name", &self.name);
    check_identity(&mut v,
                   self.inchikey.as_deref(),
                   self.molecular_weight,
                   self.source_url.as_deref(),
                   self.smiles.as_deref(),
                   self.inchi.as_deref());
    v.finish()
  }
}

impl Validate for MoleculePatch {
  fn validate(&self) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.optional_text("name", self.name.as_deref());
    check_identity(&mut v,
                   self.inchikey.as_deref(),
                   self.molecular_weight,
                   self.source_url.as_deref(),
                   self.smiles.as_deref(),
                   self.inchi.as_deref());
    v.finish()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoleculeFilter {
  pub name: Option<String>,
  pub formula: Option<String>,
  pub inchikey: Option<String>,
  pub source: Option<String>,
  pub is_verified: Option<bool>,
}

impl EntityFilter for MoleculeFilter {
  fn live_filters(&self) -> Vec<Filter> {
    FilterSet::new().substring("name", self.name.as_deref())
                    .exact("formula", self.formula.as_deref())
                    .exact("inchikey", self.inchikey.as_deref())
                    .exact("source", self.source.as_deref())
                    .flag("is_verified", self.is_verified)
                    .build()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trehalose_payload_is_valid() {
    let m = NewMolecule { name: "Trehalose".into(),
                          formula: Some("C12H22O11".into()),
                          molecular_weight: Some(342.3),
                          source: Some("PubChem".into()),
                          is_verified: false,
                          ..Default::default() };
    assert!(m.validate().is_ok());
  }

  #[test]
  fn reports_each_invalid_field() {
    let m = NewMolecule { name: "".into(),
                          inchikey: Some("not-a-key".into()),
                          molecular_weight: Some(-4.0),
                          source_url: Some("ftp://x".into()),
                          ..Default::default() };
    let err = m.validate().unwrap_err();
    for f in ["name", "inchikey", "molecular_weight", "source_url"] {
      assert!(err.has_field(f), "falta {}", f);
    }
  }

  #[test]
  fn inchikey_format() {
    assert!(inchikey_is_valid("IAJILQKETJEXLJ-UHFFFAOYSA-N"));
    assert!(!inchikey_is_valid("iajilqketjexlj-uhfffaoysa-n"));
    assert!(!inchikey_is_valid("IAJILQKETJEXLJUHFFFAOYSA--N"));
  }

  #[test]
  fn empty_patch_is_valid_and_serializes_to_nothing() {
    let p = MoleculePatch::default();
    assert!(p.validate().is_ok());
    assert_eq!(serde_json::to_value(&p).unwrap(), serde_json::json!({}));
  }

  #[test]
  fn name_filter_is_substring() {
    let f = MoleculeFilter { name: Some("treh".into()), ..Default::default() };
    let live = f.live_filters();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].kind, crate::MatchKind::Substring);
  }
}
