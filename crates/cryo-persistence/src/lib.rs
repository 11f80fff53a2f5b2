//! Cliente de datos remoto: almacenamiento relacional (`DataStore`) con un
//! backend en memoria y otro SQLite sobre Diesel, más `DataClient`, que
//! resuelve relaciones embebidas y decodifica filas a entidades de
//! `cryo-domain`.

mod client;
mod config;
mod errors;
mod memory;
mod query;
mod rows;
pub mod schema;
mod sql;
mod store;

pub use client::DataClient;
pub use config::{new_store, new_store_from_env, StoreConfig, DEFAULT_POOL_SIZE};
pub use errors::StoreError;
pub use memory::InMemoryStore;
pub use query::{Direction, Join, JoinKind, Order, Predicate, Select};
pub use sql::{SqliteStore, MIGRATIONS};
pub use store::{DataStore, Precondition};
