use crate::ContextError;
use cryo_persistence::StoreConfig;
use cryo_query::CacheConfig;
use std::time::Duration;

/// Configuración completa de la raíz de proveedores.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextConfig {
  pub store: StoreConfig,
  pub cache: CacheConfig,
  /// Usuario de la sesión; `None` deja la sesión anónima.
  pub user_id: Option<String>,
}

impl ContextConfig {
  /// Lee, además de las variables del almacenamiento:
  /// - `CRYO_CACHE_STALE_SECS` (30 por defecto)
  /// - `CRYO_CACHE_GC_SECS` (300 por defecto)
  /// - `CRYO_USER_ID`
  pub fn from_env() -> Result<Self, ContextError> {
    let store = StoreConfig::from_env()?;
    let defaults = CacheConfig::default();
    let cache = CacheConfig { stale_time: secs_var("CRYO_CACHE_STALE_SECS")?.unwrap_or(defaults.stale_time),
                              gc_time: secs_var("CRYO_CACHE_GC_SECS")?.unwrap_or(defaults.gc_time) };
    let user_id = std::env::var("CRYO_USER_ID").ok().filter(|s| !s.trim().is_empty());
    Ok(Self { store, cache, user_id })
  }
}

fn secs_var(name: &str) -> Result<Option<Duration>, ContextError> {
  match std::env::var(name) {
    Ok(raw) => parse_secs(name, &raw).map(Some),
    Err(_) => Ok(None),
  }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration, ContextError> {
  raw.trim()
     .parse::<u64>()
     .map(Duration::from_secs)
     .map_err(|_| ContextError::Config(format!("{} inválido: {}", name, raw)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seconds_are_parsed_or_rejected() {
    assert_eq!(parse_secs("X", " 45 ").unwrap(), Duration::from_secs(45));
    let err = parse_secs("CRYO_CACHE_STALE_SECS", "soon").unwrap_err();
    assert_eq!(err, ContextError::Config("CRYO_CACHE_STALE_SECS inválido: soon".into()));
  }

  #[test]
  fn default_config_is_memory_and_anonymous() {
    let config = ContextConfig::default();
    assert!(config.store.is_memory());
    assert_eq!(config.cache, CacheConfig::default());
    assert!(config.user_id.is_none());
  }
}
