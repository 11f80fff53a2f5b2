// Archivo: key.rs
// Propósito: claves de caché jerárquicas y espacios de nombres por entidad.
use cryo_domain::{EntityFilter, Filter};
use std::fmt;

/// Clave jerárquica. Cada segmento es independiente, por lo que dos claves
/// sólo coinciden si todos sus segmentos coinciden.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// `true` si `prefix` es un prefijo por segmentos (o la clave misma).
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn child(&self, part: impl Into<String>) -> QueryKey {
        let mut parts = self.0.clone();
        parts.push(part.into());
        QueryKey(parts)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Codificación canónica de los filtros vivos: ordenados por columna y
/// serializados como JSON.
pub fn canonical_filters(filters: &[Filter]) -> String {
    let mut sorted: Vec<&Filter> = filters.iter().collect();
    sorted.sort_by(|a, b| a.column.cmp(b.column).then_with(|| a.value.to_string().cmp(&b.value.to_string())));
    serde_json::to_string(&sorted).unwrap_or_default()
}

/// Espacio de nombres de claves de una entidad:
///
/// - `[plural]`
/// - `[plural, "list"]` y `[plural, "list", filtros]`
/// - `[plural, "detail"]` y `[plural, "detail", id]`
/// - `[plural, "detail", id, sub]` para subcolecciones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNamespace {
    plural: &'static str,
}

impl KeyNamespace {
    pub const fn new(plural: &'static str) -> Self {
        Self { plural }
    }

    pub fn plural(&self) -> &'static str {
        self.plural
    }

    pub fn all(&self) -> QueryKey {
        QueryKey::new([self.plural])
    }

    pub fn lists(&self) -> QueryKey {
        self.all().child("list")
    }

    pub fn list(&self, filter: &dyn EntityFilter) -> QueryKey {
        self.lists().child(canonical_filters(&filter.live_filters()))
    }

    pub fn details(&self) -> QueryKey {
        self.all().child("detail")
    }

    pub fn detail(&self, id: &str) -> QueryKey {
        self.details().child(id)
    }

    pub fn sub(&self, id: &str, collection: &str) -> QueryKey {
        self.detail(id).child(collection)
    }
}

pub const MOLECULE_KEYS: KeyNamespace = KeyNamespace::new("molecules");
pub const MIXTURE_KEYS: KeyNamespace = KeyNamespace::new("mixtures");
pub const EXPERIMENT_KEYS: KeyNamespace = KeyNamespace::new("experiments");
pub const PREDICTION_KEYS: KeyNamespace = KeyNamespace::new("predictions");
pub const PROTOCOL_KEYS: KeyNamespace = KeyNamespace::new("protocols");
