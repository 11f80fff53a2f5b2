use crate::{NewMixture, NewMixtureComponent, NewMolecularProperty, NewMolecule, NewProtocol, PropertyType,
            ProtocolStep};

/// Payloads de ejemplo para pruebas y demos.
pub struct DomainStubs;

impl DomainStubs {
  pub fn trehalose() -> NewMolecule {
    NewMolecule { name: "Trehalose".into(),
                  formula: Some("C12H22O11".into()),
                  molecular_weight: Some(342.3),
                  source: Some("PubChem".into()),
                  is_verified: false,
                  ..Default::default() }
  }

  pub fn dmso() -> NewMolecule {
    NewMolecule { name: "Dimethyl sulfoxide".into(),
                  smiles: Some("CS(=O)C".into()),
                  inchikey: Some("IAZDPXIOMUYVGZ-UHFFFAOYSA-N".into()),
                  formula: Some("C2H6OS".into()),
                  molecular_weight: Some(78.13),
                  source: Some("PubChem".into()),
                  source_id: Some("679".into()),
                  is_verified: true,
                  ..Default::default() }
  }

  pub fn glycerol() -> NewMolecule {
    NewMolecule { name: "Glycerol".into(),
                  smiles: Some("C(C(CO)O)O".into()),
                  formula: Some("C3H8O3".into()),
                  molecular_weight: Some(92.09),
                  source: Some("PubChem".into()),
                  is_verified: true,
                  ..Default::default() }
  }

  pub fn freezing_point(molecule_id: &str) -> NewMolecularProperty {
    NewMolecularProperty::new(molecule_id, PropertyType::FreezingPoint, 18.5, "°C", true)
  }

  pub fn dmso_pbs() -> NewMixture {
    NewMixture { name: "DMSO-PBS Solution".into(),
                 description: Some("10% DMSO en PBS".into()),
                 is_public: true }
  }

  pub fn glycerol_sucrose() -> NewMixture {
    NewMixture { name: "Glycerol-Sucrose Mix".into(), description: None, is_public: false }
  }

  pub fn component(mixture_id: &str, molecule_id: &str, amount: f64) -> NewMixtureComponent {
    NewMixtureComponent { mixture_id: mixture_id.to_string(),
                          molecule_id: molecule_id.to_string(),
                          amount,
                          amount_unit: "%".into(),
                          role: Some("cryoprotectant".into()) }
  }

  pub fn slow_cooling(mixture_id: &str) -> NewProtocol {
    NewProtocol { mixture_id: mixture_id.to_string(),
                  name: "Enfriamiento lento".into(),
                  description: Some("-1 °C/min hasta -80 °C".into()),
                  steps: vec![ProtocolStep { name: "Equilibrado".into(),
                                             duration: 15.0,
                                             duration_unit: "min".into(),
                                             temperature: Some(4.0),
                                             action: "Incubar la muestra con la mezcla".into() },
                              ProtocolStep { name: "Enfriamiento".into(),
                                             duration: 84.0,
                                             duration_unit: "min".into(),
                                             temperature: Some(-80.0),
                                             action: "Descender 1 °C por minuto".into() }] }
  }
}
