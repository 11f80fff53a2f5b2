// client.rs
use crate::{DataStore, Join, JoinKind, Precondition, Select, StoreError};
use cryo_domain::{from_row, Record, Row};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type JoinFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

/// Cliente del almacenamiento remoto. Resuelve las relaciones embebidas de
/// una `Select` con una consulta por nivel y decodifica filas a entidades.
#[derive(Clone)]
pub struct DataClient {
  store: Arc<dyn DataStore>,
}

impl DataClient {
  pub fn new(store: Arc<dyn DataStore>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<dyn DataStore> {
    &self.store
  }

  pub fn backend_name(&self) -> &'static str {
    self.store.backend_name()
  }

  pub async fn select(&self, query: &Select) -> Result<Vec<Row>, StoreError> {
    let mut rows = self.store.select(&query.base()).await?;
    self.resolve_joins(&mut rows, &query.joins).await?;
    if let Some(columns) = query.columns {
      project(&mut rows, columns, &query.joins);
    }
    Ok(rows)
  }

  pub async fn select_as<T: DeserializeOwned>(&self, query: &Select) -> Result<Vec<T>, StoreError> {
    self.select(query).await?.into_iter().map(decode).collect()
  }

  /// Primera fila de la consulta, si existe.
  pub async fn select_one<T: DeserializeOwned>(&self, query: &Select) -> Result<Option<T>, StoreError> {
    let q = query.clone().limit(1);
    Ok(self.select_as(&q).await?.into_iter().next())
  }

  pub async fn insert<R: Record>(&self, row: Row) -> Result<R, StoreError> {
    decode(self.store.insert(R::TABLE, row).await?)
  }

  pub async fn update<R: Record>(&self,
                                 id: &str,
                                 patch: Row,
                                 precondition: Option<&Precondition>)
                                 -> Result<Option<R>, StoreError> {
    self.store.update(R::TABLE, id, patch, precondition).await?.map(decode).transpose()
  }

  pub async fn delete<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
    self.store.delete(R::TABLE, id).await?.map(decode).transpose()
  }

  fn resolve_joins<'a>(&'a self, rows: &'a mut Vec<Row>, joins: &'a [Join]) -> JoinFuture<'a> {
    Box::pin(async move {
      if rows.is_empty() {
        return Ok(());
      }
      for join in joins {
        match join.kind {
          JoinKind::Parent => self.embed_parent(rows, join).await?,
          JoinKind::Children => self.embed_children(rows, join).await?,
        }
      }
      Ok(())
    })
  }

  async fn embed_parent(&self, rows: &mut [Row], join: &Join) -> Result<(), StoreError> {
    let ids = distinct(rows.iter().filter_map(|r| r.get(join.fk_column)));
    let mut parents = if ids.is_empty() {
      Vec::new()
    } else {
      self.store.select(&Select::from(join.table).in_list("id", ids)).await?
    };
    self.resolve_joins(&mut parents, &join.joins).await?;
    let mut by_id: HashMap<String, Row> = HashMap::new();
    for mut p in parents {
      let id = row_id(&p);
      if let Some(columns) = join.columns {
        project_row(&mut p, columns, &join.joins);
      }
      by_id.insert(id, p);
    }
    for row in rows.iter_mut() {
      let key = row.get(join.fk_column).and_then(JsonValue::as_str).unwrap_or_default().to_string();
      let parent = by_id.get(&key).cloned().map(JsonValue::Object).unwrap_or(JsonValue::Null);
      row.insert(join.alias.to_string(), parent);
    }
    Ok(())
  }

  async fn embed_children(&self, rows: &mut [Row], join: &Join) -> Result<(), StoreError> {
    let ids = distinct(rows.iter().filter_map(|r| r.get("id")));
    let mut query = Select::from(join.table).in_list(join.fk_column, ids);
    query.order = join.order;
    let mut children = self.store.select(&query).await?;
    self.resolve_joins(&mut children, &join.joins).await?;
    let mut groups: HashMap<String, Vec<JsonValue>> = HashMap::new();
    for mut c in children {
      let parent = c.get(join.fk_column).and_then(JsonValue::as_str).unwrap_or_default().to_string();
      if let Some(columns) = join.columns {
        project_row(&mut c, columns, &join.joins);
      }
      groups.entry(parent).or_default().push(JsonValue::Object(c));
    }
    for row in rows.iter_mut() {
      let group = groups.remove(&row_id(row)).unwrap_or_default();
      row.insert(join.alias.to_string(), JsonValue::Array(group));
    }
    Ok(())
  }
}

fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
  from_row(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn row_id(row: &Row) -> String {
  row.get("id").and_then(JsonValue::as_str).unwrap_or_default().to_string()
}

fn distinct<'a>(values: impl Iterator<Item = &'a JsonValue>) -> Vec<JsonValue> {
  let mut seen = HashSet::new();
  values.filter(|v| !v.is_null())
        .filter(|v| seen.insert(v.to_string()))
        .cloned()
        .collect()
}

/// Conserva las columnas pedidas y los alias de los joins.
fn project_row(row: &mut Row, columns: &[&str], joins: &[Join]) {
  row.retain(|k, _| columns.contains(&k.as_str()) || joins.iter().any(|j| j.alias == k.as_str()));
}

fn project(rows: &mut [Row], columns: &[&str], joins: &[Join]) {
  for row in rows.iter_mut() {
    project_row(row, columns, joins);
  }
}
