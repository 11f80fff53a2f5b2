//! cryo-query: módulos de consulta por entidad sobre una caché
//! compartida.
//!
//! Cada módulo (`MoleculeQueries`, `MixtureQueries`, ...) ofrece lecturas
//! cacheadas, accesores de estado sin lectura (`*_state`) y mutaciones que
//! invalidan exactamente las claves afectadas:
//! - alta: listas de la entidad;
//! - parche: detalle y listas;
//! - borrado: listas, y el detalle se elimina con todo lo anidado;
//! - filas hijas: sólo la subcolección del padre.
//!
//! ```rust,no_run
//! use cryo_persistence::{DataClient, InMemoryStore};
//! use cryo_query::{CacheConfig, MoleculeQueries, QueryCache};
//! use std::sync::Arc;
//! let client = DataClient::new(Arc::new(InMemoryStore::new()));
//! let cache = Arc::new(QueryCache::new(CacheConfig::default()));
//! let molecules = MoleculeQueries::new(client, cache);
//! ```
pub mod cache;
pub mod errors;
pub mod experiments;
pub mod key;
pub mod mixtures;
pub mod molecules;
mod ops;
pub mod predictions;
pub mod protocols;
pub mod session;

pub use cache::{CacheConfig, CacheEvent, CacheStats, QueryCache, QueryResult, QueryStatus};
pub use errors::{QueryError, Result};
pub use experiments::ExperimentQueries;
pub use key::{KeyNamespace, QueryKey, EXPERIMENT_KEYS, MIXTURE_KEYS, MOLECULE_KEYS, PREDICTION_KEYS, PROTOCOL_KEYS};
pub use mixtures::MixtureQueries;
pub use molecules::MoleculeQueries;
pub use predictions::PredictionQueries;
pub use protocols::ProtocolQueries;
pub use session::Session;
