mod common;

use cryo_domain::Table;
use cryo_persistence::{DataStore, InMemoryStore, Select, StoreError};
use std::sync::Arc;
use std::time::Duration;

fn store() -> Arc<dyn DataStore> {
  Arc::new(InMemoryStore::new())
}

#[tokio::test]
async fn memory_crud_round_trip() {
  common::crud_round_trip(store()).await;
}

#[tokio::test]
async fn memory_substring_filter() {
  common::substring_filter_is_case_insensitive(store()).await;
}

#[tokio::test]
async fn memory_foreign_keys() {
  common::foreign_keys_cascade_and_restrict(store()).await;
}

#[tokio::test]
async fn memory_precondition_conflict() {
  common::stale_precondition_conflicts(store()).await;
}

#[tokio::test]
async fn memory_embedded_detail() {
  common::embedded_detail(store()).await;
}

#[tokio::test]
async fn memory_protocol_steps() {
  common::protocol_steps_survive_storage(store()).await;
}

#[tokio::test(start_paused = true)]
async fn delayed_table_does_not_block_others() {
  let store = Arc::new(InMemoryStore::new());
  store.delay_table(Table::Molecules, Duration::from_secs(5));
  let slow = {
    let store = store.clone();
    tokio::spawn(async move { store.select(&Select::from(Table::Molecules)).await })
  };
  let fast = store.select(&Select::from(Table::Mixtures)).await.expect("mixtures");
  assert!(fast.is_empty());
  assert!(!slow.is_finished());
  let rows = slow.await.expect("join").expect("molecules");
  assert!(rows.is_empty());
}

#[tokio::test]
async fn failures_surface_the_configured_message() {
  let store = InMemoryStore::new();
  store.fail_table(Table::Experiments, "connection reset");
  match store.select(&Select::from(Table::Experiments)).await {
    Err(StoreError::Rejected { table: Table::Experiments, message }) => assert_eq!(message, "connection reset"),
    other => panic!("expected injected failure, got: {:?}", other),
  }
}
