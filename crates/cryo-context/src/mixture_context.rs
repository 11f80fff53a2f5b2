use crate::aggregate::CompositeView;
use crate::selection::Selection;
use cryo_domain::{Mixture, MixtureComponent, MixtureWithComponents, Protocol};
use cryo_query::{MixtureQueries, ProtocolQueries, QueryResult};

/// Mezcla seleccionada. Los componentes salen sólo de la subcolección,
/// que es la clave que invalidan las altas, parches y bajas de componentes.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureView {
  pub mixture: Mixture,
  pub components: Vec<MixtureComponent>,
  pub protocols: Vec<Protocol>,
}

impl MixtureView {
  pub fn total_amount(&self, unit: &str) -> f64 {
    self.components.iter().filter(|c| c.amount_unit == unit).map(|c| c.amount).sum()
  }
}

/// Compone una mezcla con sus componentes y sus protocolos.
pub struct MixtureContext {
  mixtures: MixtureQueries,
  protocols: ProtocolQueries,
  selection: Selection,
}

impl MixtureContext {
  pub fn new(mixtures: MixtureQueries, protocols: ProtocolQueries) -> Self {
    Self { mixtures, protocols, selection: Selection::default() }
  }

  pub fn select(&self, id: Option<String>) {
    self.selection.set(id);
  }

  pub fn selected(&self) -> Option<String> {
    self.selection.get()
  }

  pub fn view(&self) -> CompositeView<MixtureView> {
    match self.selected() {
      Some(id) => compose(self.mixtures.detail_state(&id),
                          self.mixtures.components_state(&id),
                          self.protocols.by_mixture_state(&id)),
      None => CompositeView::empty(),
    }
  }

  pub async fn load(&self) -> CompositeView<MixtureView> {
    let Some(id) = self.selected() else {
      return CompositeView::empty();
    };
    let (detail, components, protocols) =
      tokio::join!(self.mixtures.detail(&id), self.mixtures.components(&id), self.protocols.by_mixture(&id));
    compose(detail, components, protocols)
  }
}

fn compose(detail: QueryResult<MixtureWithComponents>,
           components: QueryResult<Vec<MixtureComponent>>,
           protocols: QueryResult<Vec<Protocol>>)
           -> CompositeView<MixtureView> {
  let mut view = CompositeView::compose(&[&detail, &components, &protocols], None);
  if let (Some(detail), Some(components), Some(protocols)) = (detail.data, components.data, protocols.data) {
    view.data = Some(MixtureView { mixture: detail.mixture, components, protocols });
  }
  view
}
