// filter.rs
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Cómo se compara la columna con el valor del filtro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
  /// Igualdad exacta (`eq`).
  Exact,
  /// Subcadena sin distinguir mayúsculas (`ilike '%valor%'`).
  Substring,
}

/// Filtro vivo sobre una columna conocida de la entidad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
  pub column: &'static str,
  pub kind: MatchKind,
  pub value: JsonValue,
}

/// Filtro tipado de una entidad. `live_filters` devuelve sólo los filtros con
/// valor: los ausentes y las cadenas vacías se omiten.
pub trait EntityFilter: fmt::Debug + Send + Sync {
  fn live_filters(&self) -> Vec<Filter>;
}

/// Constructor de filtros vivos usado por las implementaciones de
/// `EntityFilter`.
#[derive(Debug, Default)]
pub struct FilterSet {
  filters: Vec<Filter>,
}

impl FilterSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn exact(mut self, column: &'static str, value: Option<&str>) -> Self {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
      self.filters.push(Filter { column, kind: MatchKind::Exact, value: JsonValue::String(v.to_string()) });
    }
    self
  }

  pub fn substring(mut self, column: &'static str, value: Option<&str>) -> Self {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
      self.filters.push(Filter { column, kind: MatchKind::Substring, value: JsonValue::String(v.to_string()) });
    }
    self
  }

  pub fn flag(mut self, column: &'static str, value: Option<bool>) -> Self {
    if let Some(v) = value {
      self.filters.push(Filter { column, kind: MatchKind::Exact, value: JsonValue::Bool(v) });
    }
    self
  }

  pub fn build(self) -> Vec<Filter> {
    self.filters
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn empty_and_absent_values_are_dropped() {
    let filters = FilterSet::new().substring("name", Some(""))
                                  .exact("source", None)
                                  .flag("is_verified", Some(false))
                                  .exact("formula", Some("C2H6OS"))
                                  .build();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[0].column, "is_verified");
    assert_eq!(filters[0].value, json!(false));
    assert_eq!(filters[1].kind, MatchKind::Exact);
  }
}
