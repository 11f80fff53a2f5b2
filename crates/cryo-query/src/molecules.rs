// Archivo: molecules.rs
// Propósito: lecturas y mutaciones de moléculas y de sus propiedades.
use crate::cache::{QueryCache, QueryResult};
use crate::errors::Result;
use crate::key::{MOLECULE_KEYS, PREDICTION_KEYS};
use crate::ops;
use chrono::{DateTime, Utc};
use cryo_domain::{EntityFilter, MolecularProperty, MolecularPropertyPatch, Molecule, MoleculeFilter, MoleculePatch,
                  NewMolecularProperty, NewMolecule, Table};
use cryo_persistence::{DataClient, Direction, Precondition, Select};
use std::sync::Arc;

const ENTITY: &str = "molecule";
const PROPERTY_ENTITY: &str = "molecular_property";
pub const PROPERTIES: &str = "properties";

/// Consultas de la tabla `molecules` y su subcolección de propiedades
/// (`[molecules, detail, id, properties]`).
#[derive(Clone)]
pub struct MoleculeQueries {
    client: DataClient,
    cache: Arc<QueryCache>,
}

impl MoleculeQueries {
    pub fn new(client: DataClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    fn list_query(filter: &MoleculeFilter) -> Select {
        Select::from(Table::Molecules).filters(&filter.live_filters())
                                      .order_by("created_at", Direction::Desc)
    }

    fn properties_query(molecule_id: &str) -> Select {
        Select::from(Table::MolecularProperties).eq("molecule_id", molecule_id)
                                                .order_by("created_at", Direction::Asc)
    }

    pub async fn list(&self, filter: &MoleculeFilter) -> QueryResult<Vec<Molecule>> {
        ops::read_many(&self.cache, &self.client, MOLECULE_KEYS.list(filter), Self::list_query(filter)).await
    }

    pub fn list_state(&self, filter: &MoleculeFilter) -> QueryResult<Vec<Molecule>> {
        self.cache.state(&MOLECULE_KEYS.list(filter))
    }

    /// Deshabilitada (`Idle`) si `id` está vacío.
    pub async fn detail(&self, id: &str) -> QueryResult<Molecule> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Molecules).eq("id", id);
        ops::read_one(&self.cache, &self.client, MOLECULE_KEYS.detail(id), query, ENTITY, id).await
    }

    pub fn detail_state(&self, id: &str) -> QueryResult<Molecule> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&MOLECULE_KEYS.detail(id))
    }

    /// Propiedades de la molécula en orden de alta.
    pub async fn properties(&self, molecule_id: &str) -> QueryResult<Vec<MolecularProperty>> {
        if molecule_id.is_empty() {
            return QueryResult::idle();
        }
        ops::read_many(&self.cache,
                       &self.client,
                       MOLECULE_KEYS.sub(molecule_id, PROPERTIES),
                       Self::properties_query(molecule_id)).await
    }

    pub fn properties_state(&self, molecule_id: &str) -> QueryResult<Vec<MolecularProperty>> {
        if molecule_id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&MOLECULE_KEYS.sub(molecule_id, PROPERTIES))
    }

    pub async fn create(&self, payload: &NewMolecule) -> Result<Molecule> {
        let row = ops::insert_row(payload)?;
        let created: Molecule = ops::create(&self.client, row).await?;
        self.cache.invalidate(&MOLECULE_KEYS.lists());
        log::info!("molécula creada: {}", created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &MoleculePatch) -> Result<Molecule> {
        self.apply_patch(id, patch, None).await
    }

    /// Como `update`, pero falla con `StoreError::Conflict` si la fila
    /// cambió después de `seen`.
    pub async fn update_if_unchanged(&self, id: &str, patch: &MoleculePatch, seen: DateTime<Utc>) -> Result<Molecule> {
        self.apply_patch(id, patch, Some(&Precondition::UpdatedAt(seen))).await
    }

    async fn apply_patch(&self, id: &str, patch: &MoleculePatch, precondition: Option<&Precondition>) -> Result<Molecule> {
        let updated: Molecule = ops::patch(&self.client, ENTITY, id, patch, precondition).await?;
        self.cache.invalidate_exact(&MOLECULE_KEYS.detail(id));
        self.cache.invalidate(&MOLECULE_KEYS.lists());
        Ok(updated)
    }

    /// Borra la molécula con sus propiedades y predicciones. Falla si algún
    /// componente de mezcla la usa.
    pub async fn delete(&self, id: &str) -> Result<Molecule> {
        let deleted: Molecule = ops::remove(&self.client, ENTITY, id).await?;
        self.cache.remove(&MOLECULE_KEYS.detail(id));
        self.cache.invalidate(&MOLECULE_KEYS.lists());
        // las predicciones se borran en cascada
        self.cache.invalidate(&PREDICTION_KEYS.all());
        log::info!("molécula borrada: {}", id);
        Ok(deleted)
    }

    pub async fn add_property(&self, payload: &NewMolecularProperty) -> Result<MolecularProperty> {
        let row = ops::insert_row(payload)?;
        let created: MolecularProperty = ops::create(&self.client, row).await?;
        self.cache.invalidate_exact(&MOLECULE_KEYS.sub(&created.molecule_id, PROPERTIES));
        Ok(created)
    }

    pub async fn update_property(&self, id: &str, patch: &MolecularPropertyPatch) -> Result<MolecularProperty> {
        let updated: MolecularProperty = ops::patch(&self.client, PROPERTY_ENTITY, id, patch, None).await?;
        self.cache.invalidate_exact(&MOLECULE_KEYS.sub(&updated.molecule_id, PROPERTIES));
        Ok(updated)
    }

    pub async fn delete_property(&self, id: &str) -> Result<MolecularProperty> {
        let deleted: MolecularProperty = ops::remove(&self.client, PROPERTY_ENTITY, id).await?;
        self.cache.invalidate_exact(&MOLECULE_KEYS.sub(&deleted.molecule_id, PROPERTIES));
        Ok(deleted)
    }
}
