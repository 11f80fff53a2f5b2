mod common;

use cryo_persistence::{DataStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;

// El directorio temporal debe vivir mientras se use la base.
fn store() -> (TempDir, Arc<dyn DataStore>) {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("cryo_test.db");
  let store = SqliteStore::new(path.to_str().expect("utf-8 path"), 2).expect("failed to open sqlite store");
  (dir, Arc::new(store))
}

#[tokio::test]
async fn sqlite_crud_round_trip() {
  let (_dir, store) = store();
  common::crud_round_trip(store).await;
}

#[tokio::test]
async fn sqlite_substring_filter() {
  let (_dir, store) = store();
  common::substring_filter_is_case_insensitive(store).await;
}

#[tokio::test]
async fn sqlite_foreign_keys() {
  let (_dir, store) = store();
  common::foreign_keys_cascade_and_restrict(store).await;
}

#[tokio::test]
async fn sqlite_precondition_conflict() {
  let (_dir, store) = store();
  common::stale_precondition_conflicts(store).await;
}

#[tokio::test]
async fn sqlite_embedded_detail() {
  let (_dir, store) = store();
  common::embedded_detail(store).await;
}

#[tokio::test]
async fn sqlite_protocol_steps() {
  let (_dir, store) = store();
  common::protocol_steps_survive_storage(store).await;
}

#[tokio::test]
async fn reopening_keeps_rows() {
  let dir = tempfile::tempdir().expect("tempdir");
  let path = dir.path().join("reopen.db");
  let url = path.to_str().expect("utf-8 path").to_string();
  {
    let client = cryo_persistence::DataClient::new(Arc::new(SqliteStore::new(&url, 1).expect("open")));
    let _: cryo_domain::Molecule =
      client.insert(cryo_domain::to_row(&cryo_domain::DomainStubs::dmso()).unwrap()).await.expect("insert");
  }
  let client = cryo_persistence::DataClient::new(Arc::new(SqliteStore::new(&url, 1).expect("reopen")));
  let rows: Vec<cryo_domain::Molecule> =
    client.select_as(&cryo_persistence::Select::from(cryo_domain::Table::Molecules)).await.expect("select");
  assert_eq!(rows.len(), 1);
  assert!(rows[0].is_verified);
}
