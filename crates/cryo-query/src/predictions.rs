// Archivo: predictions.rs
// Propósito: predicciones de propiedades por molécula.
use crate::cache::{QueryCache, QueryResult};
use crate::errors::Result;
use crate::key::{MOLECULE_KEYS, PREDICTION_KEYS};
use crate::ops;
use cryo_domain::{EntityFilter, NewPrediction, Prediction, PredictionFilter, PredictionPatch, Table};
use cryo_persistence::{DataClient, Direction, Select};
use std::sync::Arc;

const ENTITY: &str = "prediction";
pub const PREDICTIONS: &str = "predictions";

/// Las predicciones son filas hijas de una molécula: la subcolección vive
/// en `[molecules, detail, id, predictions]`. Las mutaciones invalidan esa
/// clave y las listas propias, nunca la molécula.
#[derive(Clone)]
pub struct PredictionQueries {
    client: DataClient,
    cache: Arc<QueryCache>,
}

impl PredictionQueries {
    pub fn new(client: DataClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub async fn list(&self, filter: &PredictionFilter) -> QueryResult<Vec<Prediction>> {
        let query = Select::from(Table::Predictions).filters(&filter.live_filters())
                                                    .order_by("created_at", Direction::Desc);
        ops::read_many(&self.cache, &self.client, PREDICTION_KEYS.list(filter), query).await
    }

    pub fn list_state(&self, filter: &PredictionFilter) -> QueryResult<Vec<Prediction>> {
        self.cache.state(&PREDICTION_KEYS.list(filter))
    }

    pub async fn detail(&self, id: &str) -> QueryResult<Prediction> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Predictions).eq("id", id);
        ops::read_one(&self.cache, &self.client, PREDICTION_KEYS.detail(id), query, ENTITY, id).await
    }

    pub fn detail_state(&self, id: &str) -> QueryResult<Prediction> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&PREDICTION_KEYS.detail(id))
    }

    /// Predicciones de una molécula, la más reciente primero.
    pub async fn by_molecule(&self, molecule_id: &str) -> QueryResult<Vec<Prediction>> {
        if molecule_id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Predictions).eq("molecule_id", molecule_id)
                                                    .order_by("created_at", Direction::Desc);
        ops::read_many(&self.cache, &self.client, MOLECULE_KEYS.sub(molecule_id, PREDICTIONS), query).await
    }

    pub fn by_molecule_state(&self, molecule_id: &str) -> QueryResult<Vec<Prediction>> {
        if molecule_id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&MOLECULE_KEYS.sub(molecule_id, PREDICTIONS))
    }

    fn touched(&self, molecule_id: &str) {
        self.cache.invalidate_exact(&MOLECULE_KEYS.sub(molecule_id, PREDICTIONS));
        self.cache.invalidate(&PREDICTION_KEYS.lists());
    }

    pub async fn create(&self, payload: &NewPrediction) -> Result<Prediction> {
        let row = ops::insert_row(payload)?;
        let created: Prediction = ops::create(&self.client, row).await?;
        self.touched(&created.molecule_id);
        log::info!("predicción {} creada para {}", created.model_version, created.molecule_id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &PredictionPatch) -> Result<Prediction> {
        let updated: Prediction = ops::patch(&self.client, ENTITY, id, patch, None).await?;
        self.cache.invalidate_exact(&PREDICTION_KEYS.detail(id));
        self.touched(&updated.molecule_id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<Prediction> {
        let deleted: Prediction = ops::remove(&self.client, ENTITY, id).await?;
        self.cache.remove(&PREDICTION_KEYS.detail(id));
        self.touched(&deleted.molecule_id);
        Ok(deleted)
    }
}
