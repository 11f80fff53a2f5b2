use cryo_domain::{DomainStubs, MixtureFilter, MixturePatch, MoleculeFilter, MoleculePatch, NewExperiment, NewMolecule,
                  NewPrediction, PredictionFilter, PropertyType, Table};
use cryo_persistence::{DataClient, InMemoryStore, StoreError};
use cryo_query::{ExperimentQueries, MixtureQueries, MoleculeQueries, PredictionQueries, ProtocolQueries, QueryCache,
                 QueryError, QueryStatus, Session, EXPERIMENT_KEYS, MIXTURE_KEYS, MOLECULE_KEYS};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    store: Arc<InMemoryStore>,
    cache: Arc<QueryCache>,
    molecules: MoleculeQueries,
    mixtures: MixtureQueries,
    experiments: ExperimentQueries,
    predictions: PredictionQueries,
    protocols: ProtocolQueries,
    session: Session,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let client = DataClient::new(store.clone());
    let cache = Arc::new(QueryCache::default());
    Fixture { molecules: MoleculeQueries::new(client.clone(), cache.clone()),
              mixtures: MixtureQueries::new(client.clone(), cache.clone()),
              experiments: ExperimentQueries::new(client.clone(), cache.clone()),
              predictions: PredictionQueries::new(client.clone(), cache.clone()),
              protocols: ProtocolQueries::new(client, cache.clone()),
              store,
              cache,
              session: Session::for_user("researcher-1") }
}

#[tokio::test]
async fn created_molecule_appears_in_cached_list() {
    let f = fixture();
    let all = MoleculeFilter::default();
    assert_eq!(f.molecules.list(&all).await.data, Some(vec![]));
    let created = f.molecules.create(&DomainStubs::trehalose()).await.expect("create");
    let listed = f.molecules.list(&all).await.data.expect("list data");
    assert!(listed.iter().any(|m| m.id == created.id));
}

#[tokio::test]
async fn deleted_molecule_is_gone_from_detail_and_list() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::dmso()).await.expect("create");
    assert!(f.molecules.detail(&m.id).await.is_success());
    assert_eq!(f.molecules.list(&MoleculeFilter::default()).await.data.map(|v| v.len()), Some(1));
    f.molecules.delete(&m.id).await.expect("delete");
    assert!(f.molecules.detail_state(&m.id).is_idle());
    let detail = f.molecules.detail(&m.id).await;
    assert!(matches!(detail.error, Some(QueryError::NotFound { entity: "molecule", .. })));
    let listed = f.molecules.list(&MoleculeFilter::default()).await.data.expect("list");
    assert!(listed.iter().all(|x| x.id != m.id));
}

#[tokio::test]
async fn identical_update_twice_is_idempotent() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::glycerol()).await.expect("create");
    let patch = MoleculePatch { notes: Some("reactivo grado USP".into()), is_verified: Some(false), ..Default::default() };
    let first = f.molecules.update(&m.id, &patch).await.expect("first update");
    let second = f.molecules.update(&m.id, &patch).await.expect("second update");
    assert_eq!(first.notes, second.notes);
    assert_eq!(first.is_verified, second.is_verified);
    assert_eq!(first.name, second.name);
    assert_eq!(first.created_at, second.created_at);
    let detail = f.molecules.detail(&m.id).await.data.expect("detail");
    assert_eq!(detail.notes.as_deref(), Some("reactivo grado USP"));
}

#[tokio::test]
async fn update_invalidates_detail_and_lists_only() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::dmso()).await.expect("create");
    f.molecules.detail(&m.id).await;
    f.molecules.properties(&m.id).await;
    f.molecules.list(&MoleculeFilter::default()).await;
    f.molecules
     .update(&m.id, &MoleculePatch { notes: Some("x".into()), ..Default::default() })
     .await
     .expect("update");
    assert!(f.cache.is_stale(&MOLECULE_KEYS.detail(&m.id)));
    assert!(f.cache.is_stale(&MOLECULE_KEYS.list(&MoleculeFilter::default())));
    assert!(!f.cache.is_stale(&MOLECULE_KEYS.sub(&m.id, "properties")));
}

#[tokio::test]
async fn child_mutation_invalidates_only_the_sub_collection() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::trehalose()).await.expect("create");
    let all = MoleculeFilter::default();
    f.molecules.list(&all).await;
    f.molecules.detail(&m.id).await;
    assert_eq!(f.molecules.properties(&m.id).await.data, Some(vec![]));

    let prop = f.molecules.add_property(&DomainStubs::freezing_point(&m.id)).await.expect("add property");
    assert!(f.cache.is_stale(&MOLECULE_KEYS.sub(&m.id, "properties")));
    assert!(!f.cache.is_stale(&MOLECULE_KEYS.detail(&m.id)));
    assert!(!f.cache.is_stale(&MOLECULE_KEYS.list(&all)));
    let props = f.molecules.properties(&m.id).await.data.expect("properties");
    assert_eq!(props.len(), 1);
    assert_eq!(props[0].property_type, PropertyType::FreezingPoint);

    f.molecules.delete_property(&prop.id).await.expect("delete property");
    assert_eq!(f.molecules.properties(&m.id).await.data, Some(vec![]));
    assert!(!f.cache.is_stale(&MOLECULE_KEYS.detail(&m.id)));
}

#[tokio::test]
async fn empty_parent_id_disables_sub_collections() {
    let f = fixture();
    let before = f.store.call_count();
    assert_eq!(f.molecules.properties("").await.status, QueryStatus::Idle);
    assert!(f.mixtures.components("").await.is_idle());
    assert!(f.protocols.by_mixture("").await.is_idle());
    assert!(f.experiments.properties("").await.is_idle());
    assert!(f.predictions.by_molecule("").await.is_idle());
    assert!(f.molecules.detail("").await.is_idle());
    assert_eq!(f.store.call_count(), before);
}

#[tokio::test]
async fn validation_runs_before_any_store_call() {
    let f = fixture();
    let before = f.store.call_count();
    let bad = NewMolecule { name: "".into(), molecular_weight: Some(-1.0), ..Default::default() };
    match f.molecules.create(&bad).await {
        Err(QueryError::Validation(e)) => {
            assert!(e.has_field("name"));
            assert!(e.has_field("molecular_weight"));
        }
        other => panic!("expected validation error, got: {:?}", other),
    }
    assert_eq!(f.store.call_count(), before);
}

#[tokio::test]
async fn creator_attribution_requires_a_session_user() {
    let f = fixture();
    match f.mixtures.create(&Session::anonymous(), &DomainStubs::dmso_pbs()).await {
        Err(QueryError::Validation(e)) => assert!(e.has_field("created_by")),
        other => panic!("expected created_by validation error, got: {:?}", other),
    }
    assert_eq!(f.store.call_count(), 0);
    let mx = f.mixtures.create(&f.session, &DomainStubs::dmso_pbs()).await.expect("create");
    assert_eq!(mx.created_by.as_deref(), Some("researcher-1"));
}

#[tokio::test]
async fn mixture_name_filter_matches_case_insensitively() {
    let f = fixture();
    let dmso = f.mixtures.create(&f.session, &DomainStubs::dmso_pbs()).await.expect("create");
    f.mixtures.create(&f.session, &DomainStubs::glycerol_sucrose()).await.expect("create");
    let filter = MixtureFilter { name: Some("dmso".into()), ..Default::default() };
    let hits = f.mixtures.list(&filter).await.data.expect("list");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, dmso.id);
    assert_eq!(hits[0].name, "DMSO-PBS Solution");
}

#[tokio::test]
async fn experiment_detail_embeds_mixture_components() {
    let f = fixture();
    let dmso = f.molecules.create(&DomainStubs::dmso()).await.expect("molecule");
    let mx = f.mixtures.create(&f.session, &DomainStubs::dmso_pbs()).await.expect("mixture");
    f.mixtures.add_component(&DomainStubs::component(&mx.id, &dmso.id, 10.0)).await.expect("component");
    let exp = f.experiments
               .create(&f.session, &NewExperiment::planned("Viabilidad HeLa", &mx.id))
               .await
               .expect("experiment");
    let detail = f.experiments.detail(&exp.id).await.data.expect("detail");
    assert_eq!(detail.experiment.created_by.as_deref(), Some("researcher-1"));
    let mixture = detail.mixture.expect("embedded mixture");
    assert_eq!(mixture.mixture.id, mx.id);
    assert_eq!(mixture.components.len(), 1);
    let summary = mixture.components[0].molecule.as_ref().expect("summary");
    assert_eq!(summary.formula.as_deref(), Some("C2H6OS"));
}

#[tokio::test]
async fn mixture_patch_refreshes_embedding_experiment_details() {
    let f = fixture();
    let mx = f.mixtures.create(&f.session, &DomainStubs::dmso_pbs()).await.expect("mixture");
    let exp = f.experiments
               .create(&f.session, &NewExperiment::planned("Run 1", &mx.id))
               .await
               .expect("experiment");
    f.experiments.detail(&exp.id).await;
    let patch = MixturePatch { name: Some("DMSO-PBS 5 %".into()), ..Default::default() };
    f.mixtures.update(&mx.id, &patch).await.expect("update");
    assert!(f.cache.is_stale(&EXPERIMENT_KEYS.detail(&exp.id)));
    let detail = f.experiments.detail(&exp.id).await.data.expect("detail");
    assert_eq!(detail.mixture.map(|m| m.mixture.name).as_deref(), Some("DMSO-PBS 5 %"));
}

#[tokio::test]
async fn referenced_mixture_cannot_be_deleted() {
    let f = fixture();
    let mx = f.mixtures.create(&f.session, &DomainStubs::dmso_pbs()).await.expect("mixture");
    f.experiments
     .create(&f.session, &NewExperiment::planned("Run 1", &mx.id))
     .await
     .expect("experiment");
    match f.mixtures.delete(&mx.id).await {
        Err(QueryError::Store(e)) => assert_eq!(e.table(), Some(Table::Mixtures)),
        other => panic!("expected store rejection, got: {:?}", other),
    }
    assert!(f.mixtures.detail(&mx.id).await.is_success());
}

#[tokio::test]
async fn stale_precondition_is_a_conflict() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::trehalose()).await.expect("create");
    let seen = m.updated_at;
    f.molecules
     .update_if_unchanged(&m.id, &MoleculePatch { is_verified: Some(true), ..Default::default() }, seen)
     .await
     .expect("first writer wins");
    let late = MoleculePatch { notes: Some("tarde".into()), ..Default::default() };
    let loser = f.molecules.update_if_unchanged(&m.id, &late, seen).await;
    assert_eq!(loser.unwrap_err(),
               QueryError::Store(StoreError::Conflict { table: Table::Molecules, id: m.id.clone() }));
}

#[tokio::test]
async fn molecule_delete_refreshes_prediction_lists() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::dmso()).await.expect("create");
    let prediction = NewPrediction { molecule_id: m.id.clone(),
                                     property_type: PropertyType::GlassTransition,
                                     value: -132.0,
                                     unit: "°C".into(),
                                     confidence: 0.8,
                                     model_version: "gnn-0.3".into() };
    f.predictions.create(&prediction).await.expect("prediction");
    let all = PredictionFilter::default();
    assert_eq!(f.predictions.list(&all).await.data.map(|v| v.len()), Some(1));
    assert_eq!(f.predictions.by_molecule(&m.id).await.data.map(|v| v.len()), Some(1));
    f.molecules.delete(&m.id).await.expect("delete");
    assert_eq!(f.predictions.list(&all).await.data.map(|v| v.len()), Some(0));
    assert!(f.predictions.by_molecule_state(&m.id).is_idle());
}

#[tokio::test]
async fn protocol_create_refreshes_the_mixture_sub_collection() {
    let f = fixture();
    let mx = f.mixtures.create(&f.session, &DomainStubs::dmso_pbs()).await.expect("mixture");
    f.mixtures.detail(&mx.id).await;
    assert_eq!(f.protocols.by_mixture(&mx.id).await.data, Some(vec![]));
    let p = f.protocols.create(&f.session, &DomainStubs::slow_cooling(&mx.id)).await.expect("protocol");
    assert!(!f.cache.is_stale(&MIXTURE_KEYS.detail(&mx.id)));
    let listed = f.protocols.by_mixture(&mx.id).await.data.expect("protocols");
    assert_eq!(listed, vec![p]);
    assert_eq!(listed[0].steps.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn late_detail_result_never_resolves_an_evicted_key() {
    let f = fixture();
    let m = f.molecules.create(&DomainStubs::dmso()).await.expect("create");
    f.store.delay_table(Table::Molecules, Duration::from_millis(200));
    let id = m.id.clone();
    let molecules = f.molecules.clone();
    let read = tokio::spawn(async move { molecules.detail(&id).await });
    while !f.molecules.detail_state(&m.id).is_loading() {
        tokio::task::yield_now().await;
    }
    f.store.clear_faults();
    f.molecules.delete(&m.id).await.expect("delete");
    let _ = read.await.expect("join");
    assert!(f.molecules.detail_state(&m.id).is_idle());
    assert_eq!(f.cache.stats().discarded, 1);
    assert!(f.molecules.detail(&m.id).await.error.is_some_and(|e| e.is_not_found()));
}
