// Archivo: ops.rs
// Propósito: lecturas y mutaciones comunes a todos los módulos de entidad.
use crate::cache::{QueryCache, QueryResult};
use crate::errors::{QueryError, Result};
use crate::key::QueryKey;
use crate::session::Session;
use cryo_domain::{to_row, Record, Row, Validate, ValidationError};
use cryo_persistence::{DataClient, Precondition, Select, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Lectura de colección a través de la caché.
pub(crate) async fn read_many<T>(cache: &QueryCache, client: &DataClient, key: QueryKey, query: Select) -> QueryResult<Vec<T>>
    where T: DeserializeOwned + Clone + Send + Sync + 'static
{
    cache.fetch(&key, || async move { Ok(client.select_as::<T>(&query).await?) }).await
}

/// Lectura de una fila; cero filas es `NotFound`.
pub(crate) async fn read_one<T>(cache: &QueryCache,
                                client: &DataClient,
                                key: QueryKey,
                                query: Select,
                                entity: &'static str,
                                id: &str)
                                -> QueryResult<T>
    where T: DeserializeOwned + Clone + Send + Sync + 'static
{
    cache.fetch(&key, || async move {
             client.select_one::<T>(&query).await?.ok_or_else(|| QueryError::not_found(entity, id))
         })
         .await
}

pub(crate) fn insert_row<P: Validate + Serialize>(payload: &P) -> Result<Row> {
    payload.validate()?;
    encode(payload)
}

/// Fila de alta con `created_by` tomado de la sesión. Los errores del
/// payload y la falta de usuario se informan juntos.
pub(crate) fn creator_row<P: Validate + Serialize>(session: &Session, payload: &P) -> Result<Row> {
    let mut fields = payload.validate().err().map(|e| e.fields).unwrap_or_default();
    match session.require_user() {
        Ok(user) if fields.is_empty() => {
            let mut row = encode(payload)?;
            row.insert("created_by".into(), JsonValue::String(user.to_string()));
            Ok(row)
        }
        Ok(_) => Err(ValidationError { fields }.into()),
        Err(missing) => {
            fields.extend(missing.fields);
            Err(ValidationError { fields }.into())
        }
    }
}

fn encode<P: Serialize>(payload: &P) -> Result<Row> {
    to_row(payload).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

pub(crate) async fn create<R: Record>(client: &DataClient, row: Row) -> Result<R> {
    Ok(client.insert::<R>(row).await?)
}

pub(crate) async fn patch<R: Record, P: Validate + Serialize>(client: &DataClient,
                                                              entity: &'static str,
                                                              id: &str,
                                                              patch: &P,
                                                              precondition: Option<&Precondition>)
                                                              -> Result<R> {
    patch.validate()?;
    let row = encode(patch)?;
    client.update::<R>(id, row, precondition).await?.ok_or_else(|| QueryError::not_found(entity, id))
}

pub(crate) async fn remove<R: Record>(client: &DataClient, entity: &'static str, id: &str) -> Result<R> {
    client.delete::<R>(id).await?.ok_or_else(|| QueryError::not_found(entity, id))
}
