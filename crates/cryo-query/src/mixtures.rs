// Archivo: mixtures.rs
// Propósito: lecturas y mutaciones de mezclas y de sus componentes.
use crate::cache::{QueryCache, QueryResult};
use crate::errors::Result;
use crate::key::{EXPERIMENT_KEYS, MIXTURE_KEYS, PROTOCOL_KEYS};
use crate::ops;
use crate::session::Session;
use chrono::{DateTime, Utc};
use cryo_domain::{EntityFilter, Mixture, MixtureComponent, MixtureComponentPatch, MixtureFilter, MixturePatch,
                  MixtureWithComponents, MoleculeSummary, NewMixture, NewMixtureComponent, Table};
use cryo_persistence::{DataClient, Direction, Join, Precondition, Select};
use std::sync::Arc;

const ENTITY: &str = "mixture";
const COMPONENT_ENTITY: &str = "mixture_component";
pub const COMPONENTS: &str = "components";

/// Componentes en orden de alta, cada uno con su `MoleculeSummary`.
pub(crate) fn components_join() -> Join {
    Join::children(Table::MixtureComponents, "mixture_id", "components")
        .order_by("created_at", Direction::Asc)
        .join(Join::parent(Table::Molecules, "molecule_id", "molecule").columns(MoleculeSummary::COLUMNS))
}

#[derive(Clone)]
pub struct MixtureQueries {
    client: DataClient,
    cache: Arc<QueryCache>,
}

impl MixtureQueries {
    pub fn new(client: DataClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub async fn list(&self, filter: &MixtureFilter) -> QueryResult<Vec<Mixture>> {
        let query = Select::from(Table::Mixtures).filters(&filter.live_filters())
                                                 .order_by("created_at", Direction::Desc);
        ops::read_many(&self.cache, &self.client, MIXTURE_KEYS.list(filter), query).await
    }

    pub fn list_state(&self, filter: &MixtureFilter) -> QueryResult<Vec<Mixture>> {
        self.cache.state(&MIXTURE_KEYS.list(filter))
    }

    /// Mezcla con sus componentes embebidos. Los cambios de componentes no
    /// invalidan esta clave; la lista al día es la de `components`.
    pub async fn detail(&self, id: &str) -> QueryResult<MixtureWithComponents> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Mixtures).eq("id", id).join(components_join());
        ops::read_one(&self.cache, &self.client, MIXTURE_KEYS.detail(id), query, ENTITY, id).await
    }

    pub fn detail_state(&self, id: &str) -> QueryResult<MixtureWithComponents> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&MIXTURE_KEYS.detail(id))
    }

    pub async fn components(&self, mixture_id: &str) -> QueryResult<Vec<MixtureComponent>> {
        if mixture_id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::MixtureComponents)
            .eq("mixture_id", mixture_id)
            .order_by("created_at", Direction::Asc)
            .join(Join::parent(Table::Molecules, "molecule_id", "molecule").columns(MoleculeSummary::COLUMNS));
        ops::read_many(&self.cache, &self.client, MIXTURE_KEYS.sub(mixture_id, COMPONENTS), query).await
    }

    pub fn components_state(&self, mixture_id: &str) -> QueryResult<Vec<MixtureComponent>> {
        if mixture_id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&MIXTURE_KEYS.sub(mixture_id, COMPONENTS))
    }

    /// Alta con `created_by` del usuario de la sesión.
    pub async fn create(&self, session: &Session, payload: &NewMixture) -> Result<Mixture> {
        let row = ops::creator_row(session, payload)?;
        let created: Mixture = ops::create(&self.client, row).await?;
        self.cache.invalidate(&MIXTURE_KEYS.lists());
        log::info!("mezcla creada: {}", created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &MixturePatch) -> Result<Mixture> {
        self.apply_patch(id, patch, None).await
    }

    pub async fn update_if_unchanged(&self, id: &str, patch: &MixturePatch, seen: DateTime<Utc>) -> Result<Mixture> {
        self.apply_patch(id, patch, Some(&Precondition::UpdatedAt(seen))).await
    }

    /// Además del detalle y las listas, marca obsoletos los detalles de
    /// experimentos: embeben la fila de la mezcla.
    async fn apply_patch(&self, id: &str, patch: &MixturePatch, precondition: Option<&Precondition>) -> Result<Mixture> {
        let updated: Mixture = ops::patch(&self.client, ENTITY, id, patch, precondition).await?;
        self.cache.invalidate_exact(&MIXTURE_KEYS.detail(id));
        self.cache.invalidate(&MIXTURE_KEYS.lists());
        self.cache.invalidate(&EXPERIMENT_KEYS.details());
        Ok(updated)
    }

    /// Borra la mezcla con sus componentes y protocolos. Falla si algún
    /// experimento la referencia.
    pub async fn delete(&self, id: &str) -> Result<Mixture> {
        let deleted: Mixture = ops::remove(&self.client, ENTITY, id).await?;
        self.cache.remove(&MIXTURE_KEYS.detail(id));
        self.cache.invalidate(&MIXTURE_KEYS.lists());
        self.cache.invalidate(&PROTOCOL_KEYS.all());
        log::info!("mezcla borrada: {}", id);
        Ok(deleted)
    }

    pub async fn add_component(&self, payload: &NewMixtureComponent) -> Result<MixtureComponent> {
        let row = ops::insert_row(payload)?;
        let created: MixtureComponent = ops::create(&self.client, row).await?;
        self.cache.invalidate_exact(&MIXTURE_KEYS.sub(&created.mixture_id, COMPONENTS));
        Ok(created)
    }

    pub async fn update_component(&self, id: &str, patch: &MixtureComponentPatch) -> Result<MixtureComponent> {
        let updated: MixtureComponent = ops::patch(&self.client, COMPONENT_ENTITY, id, patch, None).await?;
        self.cache.invalidate_exact(&MIXTURE_KEYS.sub(&updated.mixture_id, COMPONENTS));
        Ok(updated)
    }

    pub async fn delete_component(&self, id: &str) -> Result<MixtureComponent> {
        let deleted: MixtureComponent = ops::remove(&self.client, COMPONENT_ENTITY, id).await?;
        self.cache.invalidate_exact(&MIXTURE_KEYS.sub(&deleted.mixture_id, COMPONENTS));
        Ok(deleted)
    }
}
