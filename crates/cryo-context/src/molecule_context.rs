use crate::aggregate::CompositeView;
use crate::selection::Selection;
use cryo_domain::{MolecularProperty, Molecule, PropertyType};
use cryo_query::{MoleculeQueries, QueryResult};
use indexmap::IndexMap;

/// Molécula seleccionada junto con sus propiedades.
#[derive(Debug, Clone, PartialEq)]
pub struct MoleculeView {
  pub molecule: Molecule,
  pub properties: Vec<MolecularProperty>,
}

impl MoleculeView {
  /// Propiedades agrupadas por tipo, en el orden en que aparece cada tipo.
  pub fn properties_by_type(&self) -> IndexMap<PropertyType, Vec<&MolecularProperty>> {
    let mut groups: IndexMap<PropertyType, Vec<&MolecularProperty>> = IndexMap::new();
    for p in &self.properties {
      groups.entry(p.property_type).or_default().push(p);
    }
    groups
  }
}

/// Compone el detalle de una molécula y su subcolección de propiedades.
pub struct MoleculeContext {
  queries: MoleculeQueries,
  selection: Selection,
}

impl MoleculeContext {
  pub fn new(queries: MoleculeQueries) -> Self {
    Self { queries, selection: Selection::default() }
  }

  pub fn select(&self, id: Option<String>) {
    self.selection.set(id);
  }

  pub fn selected(&self) -> Option<String> {
    self.selection.get()
  }

  /// Estado actual en caché, sin lanzar lecturas.
  pub fn view(&self) -> CompositeView<MoleculeView> {
    match self.selected() {
      Some(id) => compose(self.queries.detail_state(&id), self.queries.properties_state(&id)),
      None => CompositeView::empty(),
    }
  }

  /// Lanza a la vez todas las lecturas del id seleccionado al empezar.
  pub async fn load(&self) -> CompositeView<MoleculeView> {
    let Some(id) = self.selected() else {
      return CompositeView::empty();
    };
    let (detail, properties) = tokio::join!(self.queries.detail(&id), self.queries.properties(&id));
    compose(detail, properties)
  }
}

fn compose(detail: QueryResult<Molecule>, properties: QueryResult<Vec<MolecularProperty>>) -> CompositeView<MoleculeView> {
  let mut view = CompositeView::compose(&[&detail, &properties], None);
  if let (Some(molecule), Some(properties)) = (detail.data, properties.data) {
    view.data = Some(MoleculeView { molecule, properties });
  }
  view
}
