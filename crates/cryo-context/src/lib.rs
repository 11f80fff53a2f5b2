//! cryo-context: compositores de contexto y raíz de proveedores
//!
//! Cada compositor guarda un id seleccionado y combina varias lecturas de
//! `cryo-query` en una `CompositeView`. `ProviderRoot` construye una sola
//! caché y un solo cliente y los reparte entre módulos y compositores.

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod experiment_context;
pub mod mixture_context;
pub mod molecule_context;
pub mod provider;
mod selection;

pub use aggregate::CompositeView;
pub use config::ContextConfig;
pub use errors::ContextError;
pub use experiment_context::{ExperimentContext, ExperimentView};
pub use mixture_context::{MixtureContext, MixtureView};
pub use molecule_context::{MoleculeContext, MoleculeView};
pub use provider::ProviderRoot;
