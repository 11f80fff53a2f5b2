// Archivo: protocols.rs
// Propósito: protocolos de enfriamiento asociados a una mezcla.
use crate::cache::{QueryCache, QueryResult};
use crate::errors::Result;
use crate::key::{MIXTURE_KEYS, PROTOCOL_KEYS};
use crate::ops;
use crate::session::Session;
use cryo_domain::{EntityFilter, NewProtocol, Protocol, ProtocolFilter, ProtocolPatch, Table};
use cryo_persistence::{DataClient, Direction, Select};
use std::sync::Arc;

const ENTITY: &str = "protocol";
pub const PROTOCOLS: &str = "protocols";

/// Protocolos de una mezcla: subcolección en
/// `[mixtures, detail, id, protocols]` más listas y detalle propios.
#[derive(Clone)]
pub struct ProtocolQueries {
    client: DataClient,
    cache: Arc<QueryCache>,
}

impl ProtocolQueries {
    pub fn new(client: DataClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub async fn list(&self, filter: &ProtocolFilter) -> QueryResult<Vec<Protocol>> {
        let query = Select::from(Table::Protocols).filters(&filter.live_filters())
                                                  .order_by("created_at", Direction::Desc);
        ops::read_many(&self.cache, &self.client, PROTOCOL_KEYS.list(filter), query).await
    }

    pub fn list_state(&self, filter: &ProtocolFilter) -> QueryResult<Vec<Protocol>> {
        self.cache.state(&PROTOCOL_KEYS.list(filter))
    }

    pub async fn detail(&self, id: &str) -> QueryResult<Protocol> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Protocols).eq("id", id);
        ops::read_one(&self.cache, &self.client, PROTOCOL_KEYS.detail(id), query, ENTITY, id).await
    }

    pub fn detail_state(&self, id: &str) -> QueryResult<Protocol> {
        if id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&PROTOCOL_KEYS.detail(id))
    }

    pub async fn by_mixture(&self, mixture_id: &str) -> QueryResult<Vec<Protocol>> {
        if mixture_id.is_empty() {
            return QueryResult::idle();
        }
        let query = Select::from(Table::Protocols).eq("mixture_id", mixture_id)
                                                  .order_by("created_at", Direction::Asc);
        ops::read_many(&self.cache, &self.client, MIXTURE_KEYS.sub(mixture_id, PROTOCOLS), query).await
    }

    pub fn by_mixture_state(&self, mixture_id: &str) -> QueryResult<Vec<Protocol>> {
        if mixture_id.is_empty() {
            return QueryResult::idle();
        }
        self.cache.state(&MIXTURE_KEYS.sub(mixture_id, PROTOCOLS))
    }

    fn touched(&self, mixture_id: &str) {
        self.cache.invalidate_exact(&MIXTURE_KEYS.sub(mixture_id, PROTOCOLS));
        self.cache.invalidate(&PROTOCOL_KEYS.lists());
    }

    pub async fn create(&self, session: &Session, payload: &NewProtocol) -> Result<Protocol> {
        let row = ops::creator_row(session, payload)?;
        let created: Protocol = ops::create(&self.client, row).await?;
        self.touched(&created.mixture_id);
        log::info!("protocolo creado: {} ({} pasos)", created.id, created.steps.len());
        Ok(created)
    }

    pub async fn update(&self, id: &str, patch: &ProtocolPatch) -> Result<Protocol> {
        let updated: Protocol = ops::patch(&self.client, ENTITY, id, patch, None).await?;
        self.cache.invalidate_exact(&PROTOCOL_KEYS.detail(id));
        self.touched(&updated.mixture_id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<Protocol> {
        let deleted: Protocol = ops::remove(&self.client, ENTITY, id).await?;
        self.cache.remove(&PROTOCOL_KEYS.detail(id));
        self.touched(&deleted.mixture_id);
        Ok(deleted)
    }
}
