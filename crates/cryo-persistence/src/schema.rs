// Esquema estático de las tablas. Ambos backends validan nombres de columna
// contra este esquema; el SQL de `migrations/` debe mantenerse alineado.
use cryo_domain::Table;
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
  Text,
  Real,
  Bool,
  /// Documento JSON guardado como texto.
  Json,
  /// RFC 3339 en UTC.
  Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
  pub name: &'static str,
  pub kind: ColumnKind,
  pub nullable: bool,
}

/// Qué ocurre con las filas hijas al borrar la fila referenciada.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
  Cascade,
  Restrict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
  pub column: &'static str,
  pub references: Table,
  pub on_delete: OnDelete,
}

#[derive(Debug, Clone)]
pub struct TableDef {
  pub table: Table,
  pub columns: Vec<ColumnDef>,
  pub foreign_keys: Vec<ForeignKey>,
}

/// Columnas que asigna el almacenamiento y que no se aceptan en parches.
pub const SERVER_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

impl TableDef {
  pub fn column(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.column(name).is_some()
  }

  pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
    self.foreign_keys.iter().find(|fk| fk.column == column)
  }
}

const fn text(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Text, nullable: false }
}
const fn text_opt(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Text, nullable: true }
}
const fn real(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Real, nullable: false }
}
const fn real_opt(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Real, nullable: true }
}
const fn flag(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Bool, nullable: false }
}
const fn ts(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Timestamp, nullable: false }
}
const fn ts_opt(name: &'static str) -> ColumnDef {
  ColumnDef { name, kind: ColumnKind::Timestamp, nullable: true }
}
const fn fk(column: &'static str, references: Table, on_delete: OnDelete) -> ForeignKey {
  ForeignKey { column, references, on_delete }
}

fn with_audit(mut columns: Vec<ColumnDef>) -> Vec<ColumnDef> {
  columns.insert(0, text("id"));
  columns.push(ts("created_at"));
  columns.push(ts("updated_at"));
  columns
}

static SCHEMA: Lazy<HashMap<Table, TableDef>> = Lazy::new(|| {
  let defs = vec![
    TableDef { table: Table::Molecules,
               columns: with_audit(vec![text("name"),
                                        text_opt("smiles"),
                                        text_opt("inchi"),
                                        text_opt("inchikey"),
                                        text_opt("formula"),
                                        real_opt("molecular_weight"),
                                        text_opt("source"),
                                        text_opt("source_id"),
                                        text_opt("source_url"),
                                        flag("is_verified"),
                                        text_opt("notes")]),
               foreign_keys: vec![] },
    TableDef { table: Table::MolecularProperties,
               columns: with_audit(vec![text("molecule_id"),
                                        text("property_type"),
                                        real("value"),
                                        text("unit"),
                                        real_opt("temperature"),
                                        real_opt("pressure"),
                                        flag("is_experimental"),
                                        real_opt("confidence"),
                                        text_opt("source"),
                                        text_opt("notes")]),
               foreign_keys: vec![fk("molecule_id", Table::Molecules, OnDelete::Cascade)] },
    TableDef { table: Table::Mixtures,
               columns: with_audit(vec![text("name"), text_opt("description"), flag("is_public"), text_opt("created_by")]),
               foreign_keys: vec![] },
    TableDef { table: Table::MixtureComponents,
               columns: with_audit(vec![text("mixture_id"),
                                        text("molecule_id"),
                                        real("amount"),
                                        text("amount_unit"),
                                        text_opt("role")]),
               foreign_keys: vec![fk("mixture_id", Table::Mixtures, OnDelete::Cascade),
                                  fk("molecule_id", Table::Molecules, OnDelete::Restrict)] },
    TableDef { table: Table::Experiments,
               columns: with_audit(vec![text("name"),
                                        text("mixture_id"),
                                        text_opt("protocol"),
                                        real_opt("temperature"),
                                        real_opt("pressure"),
                                        text("status"),
                                        ts_opt("started_at"),
                                        ts_opt("completed_at"),
                                        text_opt("notes"),
                                        text_opt("created_by")]),
               foreign_keys: vec![fk("mixture_id", Table::Mixtures, OnDelete::Restrict)] },
    TableDef { table: Table::ExperimentProperties,
               columns: with_audit(vec![text("experiment_id"),
                                        text("property_type"),
                                        real("value"),
                                        text("unit"),
                                        text_opt("notes")]),
               foreign_keys: vec![fk("experiment_id", Table::Experiments, OnDelete::Cascade)] },
    TableDef { table: Table::Predictions,
               columns: with_audit(vec![text("molecule_id"),
                                        text("property_type"),
                                        real("value"),
                                        text("unit"),
                                        real("confidence"),
                                        text("model_version")]),
               foreign_keys: vec![fk("molecule_id", Table::Molecules, OnDelete::Cascade)] },
    TableDef { table: Table::Protocols,
               columns: with_audit(vec![text("mixture_id"),
                                        text("name"),
                                        text_opt("description"),
                                        ColumnDef { name: "steps", kind: ColumnKind::Json, nullable: false },
                                        text_opt("created_by")]),
               foreign_keys: vec![fk("mixture_id", Table::Mixtures, OnDelete::Cascade)] },
  ];
  defs.into_iter().map(|d| (d.table, d)).collect()
});

pub fn table_def(table: Table) -> &'static TableDef {
  // el mapa se construye con todas las variantes de `Table`
  &SCHEMA[&table]
}

/// Claves foráneas de otras tablas que apuntan a `table`.
pub fn referencing(table: Table) -> Vec<(Table, ForeignKey)> {
  Table::ALL.iter()
            .flat_map(|t| table_def(*t).foreign_keys.iter().filter(|fk| fk.references == table).map(move |fk| (*t, *fk)))
            .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_table_has_audit_columns() {
    for t in Table::ALL {
      let def = table_def(t);
      for c in SERVER_COLUMNS {
        assert!(def.has_column(c), "{} sin {}", t, c);
      }
    }
  }

  #[test]
  fn molecules_are_referenced_by_children() {
    let refs = referencing(Table::Molecules);
    let tables: Vec<Table> = refs.iter().map(|(t, _)| *t).collect();
    assert!(tables.contains(&Table::MolecularProperties));
    assert!(tables.contains(&Table::MixtureComponents));
    assert!(tables.contains(&Table::Predictions));
    let restrict = refs.iter().find(|(t, _)| *t == Table::MixtureComponents).unwrap();
    assert_eq!(restrict.1.on_delete, OnDelete::Restrict);
  }
}
