use std::sync::RwLock;

/// Id seleccionado por un compositor. Un id vacío equivale a ninguno.
#[derive(Debug, Default)]
pub(crate) struct Selection {
  id: RwLock<Option<String>>,
}

impl Selection {
  pub(crate) fn set(&self, id: Option<String>) {
    let id = id.filter(|s| !s.trim().is_empty());
    let mut guard = self.id.write().unwrap_or_else(|e| e.into_inner());
    if *guard != id {
      log::debug!("selección: {:?} -> {:?}", *guard, id);
    }
    *guard = id;
  }

  pub(crate) fn get(&self) -> Option<String> {
    self.id.read().unwrap_or_else(|e| e.into_inner()).clone()
  }
}
