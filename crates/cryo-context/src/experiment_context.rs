use crate::aggregate::CompositeView;
use crate::selection::Selection;
use cryo_domain::{ExperimentDetail, ExperimentProperty};
use cryo_query::{ExperimentQueries, QueryResult};

/// Experimento (con su mezcla anidada) y sus resultados medidos.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentView {
  pub detail: ExperimentDetail,
  pub properties: Vec<ExperimentProperty>,
}

pub struct ExperimentContext {
  queries: ExperimentQueries,
  selection: Selection,
}

impl ExperimentContext {
  pub fn new(queries: ExperimentQueries) -> Self {
    Self { queries, selection: Selection::default() }
  }

  pub fn select(&self, id: Option<String>) {
    self.selection.set(id);
  }

  pub fn selected(&self) -> Option<String> {
    self.selection.get()
  }

  pub fn view(&self) -> CompositeView<ExperimentView> {
    match self.selected() {
      Some(id) => compose(self.queries.detail_state(&id), self.queries.properties_state(&id)),
      None => CompositeView::empty(),
    }
  }

  pub async fn load(&self) -> CompositeView<ExperimentView> {
    let Some(id) = self.selected() else {
      return CompositeView::empty();
    };
    let (detail, properties) = tokio::join!(self.queries.detail(&id), self.queries.properties(&id));
    compose(detail, properties)
  }
}

fn compose(detail: QueryResult<ExperimentDetail>,
           properties: QueryResult<Vec<ExperimentProperty>>)
           -> CompositeView<ExperimentView> {
  let mut view = CompositeView::compose(&[&detail, &properties], None);
  if let (Some(detail), Some(properties)) = (detail.data, properties.data) {
    view.data = Some(ExperimentView { detail, properties });
  }
  view
}
