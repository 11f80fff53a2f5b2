// query.rs
use cryo_domain::{Filter, MatchKind, Table};
use serde_json::Value as JsonValue;

/// Condición sobre una columna. Todas las condiciones de una `Select` se
/// combinan con AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
  Eq(&'static str, JsonValue),
  /// Subcadena sin distinguir mayúsculas.
  ILike(&'static str, String),
  In(&'static str, Vec<JsonValue>),
}

impl Predicate {
  pub fn column(&self) -> &'static str {
    match self {
      Predicate::Eq(c, _) | Predicate::ILike(c, _) | Predicate::In(c, _) => c,
    }
  }
}

impl From<&Filter> for Predicate {
  fn from(f: &Filter) -> Self {
    match f.kind {
      MatchKind::Exact => Predicate::Eq(f.column, f.value.clone()),
      MatchKind::Substring => {
        let text = match &f.value {
          JsonValue::String(s) => s.clone(),
          other => other.to_string(),
        };
        Predicate::ILike(f.column, text)
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Asc,
  Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
  pub column: &'static str,
  pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
  /// La fila base guarda `fk_column` y se embebe la fila padre como objeto
  /// (o null).
  Parent,
  /// Las filas de `table` cuyo `fk_column` apunta a la fila base se embeben
  /// como lista.
  Children,
}

/// Relación embebida en el resultado bajo `alias`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
  pub kind: JoinKind,
  pub table: Table,
  pub fk_column: &'static str,
  pub alias: &'static str,
  pub columns: Option<&'static [&'static str]>,
  pub joins: Vec<Join>,
  pub order: Option<Order>,
}

impl Join {
  pub fn parent(table: Table, fk_column: &'static str, alias: &'static str) -> Self {
    Self { kind: JoinKind::Parent, table, fk_column, alias, columns: None, joins: Vec::new(), order: None }
  }

  pub fn children(table: Table, fk_column: &'static str, alias: &'static str) -> Self {
    Self { kind: JoinKind::Children, table, fk_column, alias, columns: None, joins: Vec::new(), order: None }
  }

  pub fn columns(mut self, columns: &'static [&'static str]) -> Self {
    self.columns = Some(columns);
    self
  }

  pub fn join(mut self, join: Join) -> Self {
    self.joins.push(join);
    self
  }

  pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
    self.order = Some(Order { column, direction });
    self
  }
}

/// Lectura declarativa. Los almacenamientos sólo interpretan tabla,
/// predicados, orden y límite; `DataClient` resuelve joins y proyección.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
  pub table: Table,
  pub columns: Option<&'static [&'static str]>,
  pub predicates: Vec<Predicate>,
  pub order: Option<Order>,
  pub joins: Vec<Join>,
  pub limit: Option<usize>,
}

impl Select {
  pub fn from(table: Table) -> Self {
    Self { table, columns: None, predicates: Vec::new(), order: None, joins: Vec::new(), limit: None }
  }

  pub fn columns(mut self, columns: &'static [&'static str]) -> Self {
    self.columns = Some(columns);
    self
  }

  pub fn eq(mut self, column: &'static str, value: impl Into<JsonValue>) -> Self {
    self.predicates.push(Predicate::Eq(column, value.into()));
    self
  }

  pub fn ilike(mut self, column: &'static str, value: impl Into<String>) -> Self {
    self.predicates.push(Predicate::ILike(column, value.into()));
    self
  }

  pub fn in_list(mut self, column: &'static str, values: Vec<JsonValue>) -> Self {
    self.predicates.push(Predicate::In(column, values));
    self
  }

  /// Añade los filtros vivos de una entidad.
  pub fn filters(mut self, filters: &[Filter]) -> Self {
    self.predicates.extend(filters.iter().map(Predicate::from));
    self
  }

  pub fn order_by(mut self, column: &'static str, direction: Direction) -> Self {
    self.order = Some(Order { column, direction });
    self
  }

  pub fn join(mut self, join: Join) -> Self {
    self.joins.push(join);
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Misma tabla y condiciones, sin joins, proyección ni límite.
  pub(crate) fn base(&self) -> Select {
    Select { table: self.table,
             columns: None,
             predicates: self.predicates.clone(),
             order: self.order,
             joins: Vec::new(),
             limit: self.limit }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cryo_domain::{EntityFilter, MoleculeFilter};
  use serde_json::json;

  #[test]
  fn entity_filters_become_predicates() {
    let filter = MoleculeFilter { name: Some("dmso".into()), is_verified: Some(true), ..Default::default() };
    let q = Select::from(Table::Molecules).filters(&filter.live_filters());
    assert_eq!(q.predicates,
               vec![Predicate::ILike("name", "dmso".into()), Predicate::Eq("is_verified", json!(true))]);
  }

  #[test]
  fn base_drops_joins_and_projection() {
    let q = Select::from(Table::Mixtures).columns(&["id"])
                                         .eq("id", "mx")
                                         .join(Join::children(Table::MixtureComponents, "mixture_id", "components"));
    let base = q.base();
    assert!(base.joins.is_empty());
    assert!(base.columns.is_none());
    assert_eq!(base.predicates.len(), 1);
  }
}
