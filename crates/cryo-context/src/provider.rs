use crate::{ContextConfig, ContextError, ExperimentContext, MixtureContext, MoleculeContext};
use cryo_persistence::{new_store, DataClient, DataStore};
use cryo_query::{CacheConfig, ExperimentQueries, MixtureQueries, MoleculeQueries, PredictionQueries, ProtocolQueries,
                 QueryCache, Session};
use std::sync::Arc;

/// Raíz de proveedores: una caché y un cliente compartidos por todos los
/// módulos de consulta y compositores. Lo que invalida una mutación en
/// cualquier módulo lo ve cualquier compositor.
pub struct ProviderRoot {
  client: DataClient,
  cache: Arc<QueryCache>,
  session: Session,
  molecules: MoleculeQueries,
  mixtures: MixtureQueries,
  experiments: ExperimentQueries,
  predictions: PredictionQueries,
  protocols: ProtocolQueries,
  molecule_context: MoleculeContext,
  mixture_context: MixtureContext,
  experiment_context: ExperimentContext,
}

impl ProviderRoot {
  pub fn new(store: Arc<dyn DataStore>, cache: CacheConfig, session: Session) -> Self {
    let client = DataClient::new(store);
    let cache = Arc::new(QueryCache::new(cache));
    let molecules = MoleculeQueries::new(client.clone(), cache.clone());
    let mixtures = MixtureQueries::new(client.clone(), cache.clone());
    let experiments = ExperimentQueries::new(client.clone(), cache.clone());
    let predictions = PredictionQueries::new(client.clone(), cache.clone());
    let protocols = ProtocolQueries::new(client.clone(), cache.clone());
    log::info!("proveedores listos sobre backend {}", client.backend_name());
    Self { molecule_context: MoleculeContext::new(molecules.clone()),
           mixture_context: MixtureContext::new(mixtures.clone(), protocols.clone()),
           experiment_context: ExperimentContext::new(experiments.clone()),
           client,
           cache,
           session,
           molecules,
           mixtures,
           experiments,
           predictions,
           protocols }
  }

  pub fn from_config(config: &ContextConfig) -> Result<Self, ContextError> {
    let store = new_store(&config.store)?;
    let session = config.user_id.as_deref().map(Session::for_user).unwrap_or_default();
    Ok(Self::new(store, config.cache, session))
  }

  /// Construye la raíz con `ContextConfig::from_env`.
  pub fn from_env() -> Result<Self, ContextError> {
    Self::from_config(&ContextConfig::from_env()?)
  }

  pub fn client(&self) -> &DataClient {
    &self.client
  }

  pub fn cache(&self) -> &Arc<QueryCache> {
    &self.cache
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn molecules(&self) -> &MoleculeQueries {
    &self.molecules
  }

  pub fn mixtures(&self) -> &MixtureQueries {
    &self.mixtures
  }

  pub fn experiments(&self) -> &ExperimentQueries {
    &self.experiments
  }

  pub fn predictions(&self) -> &PredictionQueries {
    &self.predictions
  }

  pub fn protocols(&self) -> &ProtocolQueries {
    &self.protocols
  }

  pub fn molecule_context(&self) -> &MoleculeContext {
    &self.molecule_context
  }

  pub fn mixture_context(&self) -> &MixtureContext {
    &self.mixture_context
  }

  pub fn experiment_context(&self) -> &ExperimentContext {
    &self.experiment_context
  }
}
