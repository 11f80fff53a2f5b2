use cryo_query::{QueryError, QueryResult, QueryStatus};

/// Vista compuesta de varias lecturas.
///
/// - `is_loading`: alguna lectura sigue en curso.
/// - `is_error`: alguna lectura falló.
/// - `error`: el primer error en el orden fijo de las partes (principal,
///   subcolecciones), sin importar cuál terminó antes.
/// - `data`: sólo cuando todas las partes tienen datos.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeView<T> {
  pub data: Option<T>,
  pub is_loading: bool,
  pub is_error: bool,
  pub error: Option<QueryError>,
}

impl<T> CompositeView<T> {
  /// Vista sin selección: ni datos, ni carga, ni error.
  pub fn empty() -> Self {
    Self { data: None, is_loading: false, is_error: false, error: None }
  }

  pub(crate) fn compose(parts: &[&dyn Part], data: Option<T>) -> Self {
    let is_loading = parts.iter().any(|p| p.status() == QueryStatus::Loading);
    let error = parts.iter().find_map(|p| p.error()).cloned();
    Self { data, is_loading, is_error: error.is_some(), error }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CompositeView<U> {
    CompositeView { data: self.data.map(f), is_loading: self.is_loading, is_error: self.is_error, error: self.error }
  }
}

impl<T> Default for CompositeView<T> {
  fn default() -> Self {
    Self::empty()
  }
}

/// Lectura que participa en una vista compuesta.
pub(crate) trait Part {
  fn status(&self) -> QueryStatus;
  fn error(&self) -> Option<&QueryError>;
}

impl<T> Part for QueryResult<T> {
  fn status(&self) -> QueryStatus {
    self.status
  }

  fn error(&self) -> Option<&QueryError> {
    if self.status == QueryStatus::Error {
      self.error.as_ref()
    } else {
      None
    }
  }
}
