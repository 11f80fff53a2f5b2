// Escenarios compartidos por los dos backends.
#![allow(dead_code)]
use cryo_domain::{to_row, DomainStubs, Mixture, MixtureComponent, MolecularProperty, Molecule, Row, Table};
use cryo_persistence::{DataClient, DataStore, Direction, Join, Precondition, Select, StoreError};
use serde_json::json;
use std::sync::Arc;

pub fn row(v: serde_json::Value) -> Row {
  v.as_object().cloned().expect("object")
}

pub async fn crud_round_trip(store: Arc<dyn DataStore>) {
  let client = DataClient::new(store);
  let m: Molecule = client.insert(to_row(&DomainStubs::trehalose()).unwrap()).await.expect("insert trehalose");
  assert_eq!(m.name, "Trehalose");
  assert_eq!(m.created_at, m.updated_at);
  assert!(!m.id.is_empty());

  let found: Vec<Molecule> = client.select_as(&Select::from(Table::Molecules).eq("id", m.id.as_str()))
                                   .await
                                   .expect("select by id");
  assert_eq!(found, vec![m.clone()]);

  let updated: Molecule = client.update(&m.id, row(json!({"is_verified": true})), None)
                                .await
                                .expect("update")
                                .expect("row exists");
  assert!(updated.is_verified);
  assert!(updated.updated_at > m.updated_at);
  assert_eq!(updated.created_at, m.created_at);

  let deleted: Option<Molecule> = client.delete(&m.id).await.expect("delete");
  assert_eq!(deleted.map(|d| d.id), Some(m.id.clone()));
  let again: Option<Molecule> = client.delete(&m.id).await.expect("second delete");
  assert!(again.is_none());
  let missing: Option<Molecule> = client.update(&m.id, row(json!({"name": "x"})), None).await.expect("update missing");
  assert!(missing.is_none());
}

pub async fn substring_filter_is_case_insensitive(store: Arc<dyn DataStore>) {
  let client = DataClient::new(store);
  for stub in [DomainStubs::dmso(), DomainStubs::glycerol(), DomainStubs::trehalose()] {
    let _: Molecule = client.insert(to_row(&stub).unwrap()).await.expect("insert");
  }
  let mut dmso = DomainStubs::dmso();
  dmso.name = "DMSO".into();
  let _: Molecule = client.insert(to_row(&dmso).unwrap()).await.expect("insert");
  let hits: Vec<Molecule> = client.select_as(&Select::from(Table::Molecules).ilike("name", "dmso")
                                                                            .order_by("name", Direction::Asc))
                                  .await
                                  .expect("ilike");
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].name, "DMSO");
  let hits: Vec<Molecule> = client.select_as(&Select::from(Table::Molecules).ilike("name", "YCER"))
                                  .await
                                  .expect("ilike");
  assert_eq!(hits.len(), 1);
  let verified: Vec<Molecule> = client.select_as(&Select::from(Table::Molecules).eq("is_verified", true))
                                      .await
                                      .expect("eq bool");
  assert_eq!(verified.len(), 3);

  let eter: Mixture = client.insert(row(json!({"name": "ÉTER-PBS", "is_public": true}))).await.expect("insert");
  let _: Mixture = client.insert(row(json!({"name": "Glicerol-Sacarosa", "description": "Ñandú PBS", "is_public": false})))
                         .await
                         .expect("insert");
  let hits: Vec<Mixture> = client.select_as(&Select::from(Table::Mixtures).ilike("name", "éter"))
                                 .await
                                 .expect("ilike unicode");
  assert_eq!(hits.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(), vec![eter.id.as_str()]);
  // la descripción nula de ÉTER-PBS no coincide ni falla
  let hits: Vec<Mixture> = client.select_as(&Select::from(Table::Mixtures).ilike("description", "ñANDÚ"))
                                 .await
                                 .expect("ilike nullable");
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].name, "Glicerol-Sacarosa");
}

pub async fn foreign_keys_cascade_and_restrict(store: Arc<dyn DataStore>) {
  let client = DataClient::new(store);
  let dmso: Molecule = client.insert(to_row(&DomainStubs::dmso()).unwrap()).await.expect("insert dmso");
  let prop: MolecularProperty =
    client.insert(to_row(&DomainStubs::freezing_point(&dmso.id)).unwrap()).await.expect("insert property");
  let mx: Mixture = client.insert(to_row(&DomainStubs::dmso_pbs()).unwrap()).await.expect("insert mixture");
  let comp: MixtureComponent = client.insert(to_row(&DomainStubs::component(&mx.id, &dmso.id, 10.0)).unwrap())
                                     .await
                                     .expect("insert component");

  let orphan = client.insert::<MixtureComponent>(to_row(&DomainStubs::component(&mx.id, "missing", 1.0)).unwrap())
                     .await;
  match orphan {
    Err(StoreError::Rejected { table: Table::MixtureComponents, .. }) => {}
    other => panic!("expected foreign key rejection, got: {:?}", other),
  }

  // el componente impide borrar la molécula
  match client.delete::<Molecule>(&dmso.id).await {
    Err(StoreError::Rejected { .. }) => {}
    other => panic!("expected restrict violation, got: {:?}", other),
  }

  let deleted: Option<Mixture> = client.delete(&mx.id).await.expect("delete mixture");
  assert!(deleted.is_some());
  let left: Vec<MixtureComponent> =
    client.select_as(&Select::from(Table::MixtureComponents).eq("id", comp.id.as_str())).await.expect("select");
  assert!(left.is_empty(), "components cascade with their mixture");

  let _: Molecule = client.delete(&dmso.id).await.expect("delete molecule").expect("exists");
  let props: Vec<MolecularProperty> =
    client.select_as(&Select::from(Table::MolecularProperties).eq("id", prop.id.as_str())).await.expect("select");
  assert!(props.is_empty(), "properties cascade with their molecule");
}

pub async fn stale_precondition_conflicts(store: Arc<dyn DataStore>) {
  let client = DataClient::new(store);
  let mx: Mixture = client.insert(to_row(&DomainStubs::glycerol_sucrose()).unwrap()).await.expect("insert");
  let first: Mixture = client.update(&mx.id,
                                     row(json!({"is_public": true})),
                                     Some(&Precondition::UpdatedAt(mx.updated_at)))
                             .await
                             .expect("fresh precondition")
                             .expect("exists");
  let stale = client.update::<Mixture>(&mx.id,
                                       row(json!({"name": "otra"})),
                                       Some(&Precondition::UpdatedAt(mx.updated_at)))
                    .await;
  assert_eq!(stale, Err(StoreError::Conflict { table: Table::Mixtures, id: mx.id.clone() }));
  let current: Vec<Mixture> = client.select_as(&Select::from(Table::Mixtures)).await.expect("select");
  assert_eq!(current, vec![first]);
}

pub async fn embedded_detail(store: Arc<dyn DataStore>) {
  let client = DataClient::new(store);
  let dmso: Molecule = client.insert(to_row(&DomainStubs::dmso()).unwrap()).await.expect("insert");
  let gly: Molecule = client.insert(to_row(&DomainStubs::glycerol()).unwrap()).await.expect("insert");
  let mx: Mixture = client.insert(to_row(&DomainStubs::dmso_pbs()).unwrap()).await.expect("insert");
  for (m, amount) in [(&dmso, 10.0), (&gly, 5.0)] {
    let _: MixtureComponent =
      client.insert(to_row(&DomainStubs::component(&mx.id, &m.id, amount)).unwrap()).await.expect("insert");
  }
  let q = Select::from(Table::Mixtures).eq("id", mx.id.as_str()).join(
    Join::children(Table::MixtureComponents, "mixture_id", "components")
      .join(Join::parent(Table::Molecules, "molecule_id", "molecule").columns(&["id", "name", "formula", "molecular_weight"])),
  );
  let detail: Option<cryo_domain::MixtureWithComponents> = client.select_one(&q).await.expect("detail");
  let detail = detail.expect("mixture exists");
  assert_eq!(detail.mixture, mx);
  assert_eq!(detail.components.len(), 2);
  assert_eq!(detail.total_amount("%"), 15.0);
  let names: Vec<String> = detail.components.iter().map(|c| c.molecule.as_ref().unwrap().name.clone()).collect();
  assert_eq!(names, vec!["Dimethyl sulfoxide".to_string(), "Glycerol".to_string()]);
}

pub async fn protocol_steps_survive_storage(store: Arc<dyn DataStore>) {
  let client = DataClient::new(store);
  let mx: Mixture = client.insert(to_row(&DomainStubs::dmso_pbs()).unwrap()).await.expect("insert");
  let stub = DomainStubs::slow_cooling(&mx.id);
  let p: cryo_domain::Protocol = client.insert(to_row(&stub).unwrap()).await.expect("insert protocol");
  assert_eq!(p.steps, stub.steps);
  assert_eq!(p.total_duration("min"), 99.0);
}
