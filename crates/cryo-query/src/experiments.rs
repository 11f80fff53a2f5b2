// Archivo: experiments.rs
// Propósito: lecturas y mutaciones de experimentos y de sus resultados
// medidos (`experiment_properties`).
use crate::cache::{QueryCache, QueryResult};
use crate::errors::Result;
use crate::key::EXPERIMENT_KEYS;
use crate::mixtures::components_join;
use crate::ops;
use crate::session::Session;
use chrono::{DateTime, Utc};
use cryo_domain::{EntityFilter, Experiment, ExperimentDetail, ExperimentFilter, ExperimentPatch, ExperimentProperty,
                  ExperimentPropertyPatch, NewExperiment, NewExperimentProperty, Table};
use cryo_persistence::{DataClient, Direction, Join, Precondition, Select};
use std::sync::Arc;

const ENTITY: &str = "experiment";
const PROPERTY_ENTITY: &str = "experiment_property";
pub const PROPERTIES: &str = "properties";

#[derive(Clone)]
pub struct ExperimentQueries {
    client: DataClient,
    cache: Arc<QueryCache>,
}

impl ExperimentQueries {
    pub fn new(client: DataClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub async fn list(&self, filter: &ExperimentFilter) -> QueryResult<Vec<Experiment>> {
        let query = Select::from(Table::Experiments).filters(&filter.live_filters())
                                                    .order_by("created_at", Direction::Desc);
        ops::read_many(&self.cache, &self.client, EXPERIMENT_KEYS.list(filter), query).await
    }

    pub fn list_state(&self, filter: &ExperimentFilter) -> QueryResult<Vec<Experiment>> {
        self.cache.state(&EXPERIMENT_KEYS.list(filter))
    }

    /// Experimento con su mezcla y los componentes de ésta.
    ///
    /// Un parche de la mezcla invalida este detalle. Los cambios de
    /// componentes sólo invalidan `[mixtures, detail, id, components]`: la
    /// lista embebida aquí se renueva al invalidarse el experimento o al
    /// superar `stale_time`.
    pub async fn detail(&self, id: &str) -> QueryResult<ExperimentDetail> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Experiments)
            .eq("id", id)
            .join(Join::parent(Table::Mixtures, "mixture_id", "mixture").join(components_join()));
        ops::read_one(&self.cache, &self.client, EXPERIMENT_KEYS.detail(id), query, ENTITY, id).await
    }

    pub fn detail_state(&self, id: &str) -> QueryResult<ExperimentDetail> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&EXPERIMENT_KEYS.detail(id))
    }

    pub async fn properties(&self, experiment_id: &str) -> QueryResult<Vec<ExperimentProperty>> {
        if experiment_id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::ExperimentProperties).eq("experiment_id", experiment_id)
                                                             .order_by("created_at", Direction::Asc);
        ops::read_many(&self.cache, &self.client, EXPERIMENT_KEYS.sub(experiment_id, PROPERTIES), query).await
    }

    pub fn properties_state(&self, experiment_id: &str) -> QueryResult<Vec<ExperimentProperty>> {
        if experiment_id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&EXPERIMENT_KEYS.sub(experiment_id, PROPERTIES))
    }

    pub async fn create(&self, session: &Session, payload: &NewExperiment) -> Result<Experiment> {
        let row = ops::creator_row(session, payload)?;
        let created: Experiment = ops::create(&self.client, row).await?;
        self.cache.invalidate(&EXPERIMENT_KEYS.lists());
        log::info!("experimento creado: {} sobre la mezcla {}", created.id, created.mixture_id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &ExperimentPatch) -> Result<Experiment> {
        self.apply_patch(id, patch, None).await
    }

    pub async fn update_if_unchanged(&self,
                                     id: &str,
                                     patch: &ExperimentPatch,
                                     seen: DateTime<Utc>)
                                     -> Result<Experiment> {
        self.apply_patch(id, patch, Some(&Precondition::UpdatedAt(seen))).await
    }

    async fn apply_patch(&self,
                         id: &str,
                         patch: &ExperimentPatch,
                         precondition: Option<&Precondition>)
                         -> Result<Experiment> {
        let updated: Experiment = ops::patch(&self.client, ENTITY, id, patch, precondition).await?;
        self.cache.invalidate_exact(&EXPERIMENT_KEYS.detail(id));
        self.cache.invalidate(&EXPERIMENT_KEYS.lists());
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<Experiment> {
        let deleted: Experiment = ops::remove(&self.client, ENTITY, id).await?;
        self.cache.remove(&EXPERIMENT_KEYS.detail(id));
        self.cache.invalidate(&EXPERIMENT_KEYS.lists());
        log::info!("experimento borrado: {}", id);
        Ok(deleted)
    }

    pub async fn add_property(&self, payload: &NewExperimentProperty) -> Result<ExperimentProperty> {
        let row = ops::insert_row(payload)?;
        let created: ExperimentProperty = ops::create(&self.client, row).await?;
        self.cache.invalidate_exact(&EXPERIMENT_KEYS.sub(&created.experiment_id, PROPERTIES));
        Ok(created)
    }

    pub async fn update_property(&self, id: &str, patch: &ExperimentPropertyPatch) -> Result<ExperimentProperty> {
        let updated: ExperimentProperty = ops::patch(&self.client, PROPERTY_ENTITY, id, patch, None).await?;
        self.cache.invalidate_exact(&EXPERIMENT_KEYS.sub(&updated.experiment_id, PROPERTIES));
        Ok(updated)
    }

    pub async fn delete_property(&self, id: &str) -> Result<ExperimentProperty> {
        let deleted: ExperimentProperty = ops::remove(&self.client, PROPERTY_ENTITY, id).await?;
        self.cache.invalidate_exact(&EXPERIMENT_KEYS.sub(&deleted.experiment_id, PROPERTIES));
        Ok(deleted)
    }
}
