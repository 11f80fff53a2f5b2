mod domain_stubs;
mod errors;
mod experiment;
mod filter;
mod mixture;
mod molecular_property;
mod molecule;
mod prediction;
mod protocol;
mod table;
mod validation;

pub use domain_stubs::DomainStubs;
pub use errors::{DomainError, FieldError, ValidationError};
pub use experiment::{Experiment, ExperimentDetail, ExperimentFilter, ExperimentPatch, ExperimentProperty,
                     ExperimentPropertyPatch, ExperimentStatus, NewExperiment, NewExperimentProperty, OutcomeType};
pub use filter::{EntityFilter, Filter, FilterSet, MatchKind};
pub use mixture::{Mixture, MixtureComponent, MixtureComponentPatch, MixtureFilter, MixturePatch, MixtureWithComponents,
                  NewMixture, NewMixtureComponent};
pub use molecular_property::{MolecularProperty, MolecularPropertyPatch, NewMolecularProperty, PropertyType};
pub use molecule::{Molecule, MoleculeFilter, MoleculePatch, MoleculeSummary, NewMolecule};
pub use prediction::{NewPrediction, Prediction, PredictionFilter, PredictionPatch};
pub use protocol::{NewProtocol, Protocol, ProtocolFilter, ProtocolPatch, ProtocolStep};
// Utilidades de filas JSON compartidas con los crates de persistencia y consultas
pub use table::{from_row, to_row, Record, Row, Table};
pub use validation::{Validate, Validator};
