// config.rs
use crate::{DataStore, InMemoryStore, SqliteStore, StoreError};
use std::sync::Arc;

pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Selección de backend. `database_url = "memory"` usa `InMemoryStore`;
/// cualquier otro valor se abre como base SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
  pub database_url: String,
  pub pool_size: u32,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self { database_url: "memory".into(), pool_size: DEFAULT_POOL_SIZE }
  }
}

impl StoreConfig {
  /// Lee `CRYO_DB_URL` (o `DATABASE_URL`) y `CRYO_DB_POOL_SIZE`, cargando
  /// antes `.env` si existe.
  pub fn from_env() -> Result<Self, StoreError> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("CRYO_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                                   .unwrap_or_else(|_| "memory".into());
    let pool_size = match std::env::var("CRYO_DB_POOL_SIZE") {
      Ok(raw) => raw.trim()
                    .parse::<u32>()
                    .map_err(|_| StoreError::Pool(format!("CRYO_DB_POOL_SIZE inválido: {}", raw)))?,
      Err(_) => DEFAULT_POOL_SIZE,
    };
    Ok(Self { database_url, pool_size })
  }

  pub fn is_memory(&self) -> bool {
    self.database_url.eq_ignore_ascii_case("memory")
  }
}

pub fn new_store(config: &StoreConfig) -> Result<Arc<dyn DataStore>, StoreError> {
  if config.is_memory() {
    log::info!("almacenamiento en memoria");
    return Ok(Arc::new(InMemoryStore::new()));
  }
  let path = config.database_url.strip_prefix("sqlite://").unwrap_or(&config.database_url);
  Ok(Arc::new(SqliteStore::new(path, config.pool_size)?))
}

/// Crear almacenamiento desde las variables de entorno.
pub fn new_store_from_env() -> Result<Arc<dyn DataStore>, StoreError> {
  new_store(&StoreConfig::from_env()?)
}
