// Archivo: cache.rs
// Propósito: caché compartida de resultados de consulta con invalidación
// por prefijo de clave, deduplicación de lecturas en vuelo y descarte de
// resultados tardíos por generación.
use crate::errors::QueryError;
use crate::key::QueryKey;
use dashmap::DashMap;
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::Instant;

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Edad a partir de la cual una entrada lista se vuelve a pedir.
    pub stale_time: Duration,
    /// Edad a partir de la cual `gc` elimina una entrada resuelta.
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { stale_time: DEFAULT_STALE_TIME, gc_time: DEFAULT_GC_TIME }
    }
}

/// Estado observable de una consulta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Deshabilitada o nunca pedida.
    Idle,
    Loading,
    Success,
    Error,
}

/// Resultado tipado de una lectura. Durante una recarga `data` conserva el
/// valor anterior.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<QueryError>,
}

impl<T> QueryResult<T> {
    pub fn idle() -> Self {
        Self { data: None, status: QueryStatus::Idle, error: None }
    }

    pub fn success(data: T) -> Self {
        Self { data: Some(data), status: QueryStatus::Success, error: None }
    }

    pub fn failure(error: QueryError) -> Self {
        Self { data: None, status: QueryStatus::Error, error: Some(error) }
    }

    pub fn is_idle(&self) -> bool {
        self.status == QueryStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult { data: self.data.map(f), status: self.status, error: self.error }
    }

    /// Convierte a `Result`; `Idle` y `Loading` sin datos dan `None`.
    pub fn into_result(self) -> Result<Option<T>, QueryError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.data),
        }
    }
}

/// Cambios difundidos a los suscriptores de la caché.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Invalidated(QueryKey),
    Evicted(QueryKey),
    Settled(QueryKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
    /// Resultados que llegaron cuando su entrada ya había sido invalidada o
    /// eliminada.
    pub discarded: usize,
}

type Value = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Ready,
    Failed,
}

struct Entry {
    phase: Phase,
    value: Option<Value>,
    error: Option<QueryError>,
    updated_at: Instant,
    generation: u64,
    stale: bool,
    notify: Arc<Notify>,
}

enum Begin {
    Hit(Value),
    Wait(Arc<Notify>, u64),
    Fetch(u64),
}

/// Caché de consultas compartida por todos los módulos de una raíz.
///
/// Cada entrada guarda estado, instante de la última resolución y una
/// generación. Una lectura en curso sólo escribe su resultado si la entrada
/// conserva la generación con la que empezó.
pub struct QueryCache {
    entries: DashMap<QueryKey, Entry>,
    config: CacheConfig,
    generation: AtomicU64,
    hits: AtomicUsize,
    misses: AtomicUsize,
    discarded: AtomicUsize,
    events: broadcast::Sender<CacheEvent>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { entries: DashMap::new(),
               config,
               generation: AtomicU64::new(0),
               hits: AtomicUsize::new(0),
               misses: AtomicUsize::new(0),
               discarded: AtomicUsize::new(0),
               events }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn emit(&self, event: CacheEvent) {
        // sin suscriptores el envío falla y no importa
        let _ = self.events.send(event);
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        entry.phase == Phase::Ready && !entry.stale && entry.updated_at.elapsed() < self.config.stale_time
    }

    fn begin(&self, key: &QueryKey) -> Begin {
        let generation = self.next_generation();
        let mut entry = self.entries.entry(key.clone()).or_insert_with(|| Entry { phase: Phase::Pending,
                                                                                   value: None,
                                                                                   error: None,
                                                                                   updated_at: Instant::now(),
                                                                                   generation,
                                                                                   stale: false,
                                                                                   notify: Arc::new(Notify::new()) });
        if entry.generation == generation {
            return Begin::Fetch(generation);
        }
        if entry.phase == Phase::Pending {
            return Begin::Wait(entry.notify.clone(), entry.generation);
        }
        if self.is_fresh(&entry) {
            if let Some(v) = &entry.value {
                return Begin::Hit(v.clone());
            }
        }
        entry.phase = Phase::Pending;
        entry.generation = generation;
        entry.stale = false;
        Begin::Fetch(generation)
    }

    /// Abandona una lectura que no llegó a completarse.
    fn abandon(&self, key: &QueryKey, generation: u64) {
        let removed = self.entries.remove_if(key, |_, e| e.generation == generation && e.phase == Phase::Pending);
        if let Some((_, entry)) = removed {
            log::debug!("caché: lectura abandonada {}", key);
            entry.notify.notify_waiters();
        }
    }

    fn complete(&self, key: &QueryKey, generation: u64, outcome: &Result<Value, QueryError>) {
        let notify = match self.entries.get_mut(key) {
            Some(mut entry) if entry.generation == generation && entry.phase == Phase::Pending => {
                match outcome {
                    Ok(v) => {
                        entry.phase = Phase::Ready;
                        entry.value = Some(v.clone());
                        entry.error = None;
                    }
                    Err(e) => {
                        entry.phase = Phase::Failed;
                        entry.error = Some(e.clone());
                    }
                }
                entry.updated_at = Instant::now();
                entry.notify.clone()
            }
            _ => {
                self.discarded.fetch_add(1, Ordering::SeqCst);
                log::warn!("resultado tardío descartado para {}", key);
                return;
            }
        };
        notify.notify_waiters();
        self.emit(CacheEvent::Settled(key.clone()));
    }

    /// Lee `key` de la caché o la resuelve con `fetcher`.
    ///
    /// - Entrada fresca: se devuelve sin llamar a `fetcher`.
    /// - Lectura en curso para la misma clave: se espera su resultado.
    /// - En otro caso se ejecuta `fetcher`; el resultado se guarda sólo si
    ///   la entrada no fue invalidada ni eliminada mientras tanto, pero
    ///   siempre se devuelve a este llamador.
    pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryResult<T>
        where T: Clone + Send + Sync + 'static,
              F: FnOnce() -> Fut,
              Fut: Future<Output = Result<T, QueryError>>
    {
        let generation = loop {
            match self.begin(key) {
                Begin::Hit(value) => {
                    self.hits.fetch_add(1, Ordering::SeqCst);
                    log::debug!("caché: acierto {}", key);
                    return downcast::<T>(key, &value).map(QueryResult::success)
                                                     .unwrap_or_else(QueryResult::idle);
                }
                Begin::Wait(notify, waited) => {
                    let notified = notify.notified();
                    tokio::pin!(notified);
                    // registrarse antes de volver a mirar la entrada
                    notified.as_mut().enable();
                    if let Some(settled) = self.settled::<T>(key, waited) {
                        return settled;
                    }
                    if self.still_pending(key, waited) {
                        notified.await;
                    }
                    if let Some(settled) = self.settled::<T>(key, waited) {
                        return settled;
                    }
                }
                Begin::Fetch(generation) => break generation,
            }
        };
        self.misses.fetch_add(1, Ordering::SeqCst);
        log::debug!("caché: pidiendo {}", key);
        let mut guard = InFlight { cache: self, key, generation, done: false };
        let outcome = fetcher().await;
        guard.done = true;
        match outcome {
            Ok(data) => {
                self.complete(key, generation, &Ok(Arc::new(data.clone()) as Value));
                QueryResult::success(data)
            }
            Err(e) => {
                self.complete(key, generation, &Err(e.clone()));
                QueryResult::failure(e)
            }
        }
    }

    fn still_pending(&self, key: &QueryKey, generation: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.generation == generation && e.phase == Phase::Pending)
    }

    /// Resultado de la generación `generation` si ya se resolvió.
    fn settled<T: Clone + 'static>(&self, key: &QueryKey, generation: u64) -> Option<QueryResult<T>> {
        let entry = self.entries.get(key)?;
        if entry.generation != generation {
            return None;
        }
        match entry.phase {
            Phase::Pending => None,
            Phase::Ready => entry.value.as_ref().and_then(|v| downcast::<T>(key, v)).map(QueryResult::success),
            Phase::Failed => entry.error.clone().map(QueryResult::failure),
        }
    }

    /// Estado actual de `key` sin lanzar ninguna lectura.
    pub fn state<T: Clone + 'static>(&self, key: &QueryKey) -> QueryResult<T> {
        let Some(entry) = self.entries.get(key) else {
            return QueryResult::idle();
        };
        let data = entry.value.as_ref().and_then(|v| downcast::<T>(key, v));
        match entry.phase {
            Phase::Pending => QueryResult { data, status: QueryStatus::Loading, error: None },
            Phase::Ready => QueryResult { data, status: QueryStatus::Success, error: None },
            Phase::Failed => QueryResult { data, status: QueryStatus::Error, error: entry.error.clone() },
        }
    }

    /// `true` si la entrada existe y fue invalidada desde su última
    /// resolución.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.stale)
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Marca como obsoletas las entradas bajo `prefix`. Las lecturas en
    /// curso se abandonan: su resultado ya no se guardará.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let keys: Vec<QueryKey> =
            self.entries.iter().filter(|e| e.key().starts_with(prefix)).map(|e| e.key().clone()).collect();
        keys.iter().filter(|k| self.invalidate_entry(k)).count()
    }

    /// Invalida sólo `key`, sin tocar las claves anidadas.
    pub fn invalidate_exact(&self, key: &QueryKey) -> bool {
        self.invalidate_entry(key)
    }

    fn invalidate_entry(&self, key: &QueryKey) -> bool {
        let pending = match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.stale = true;
                entry.phase == Phase::Pending
            }
            None => return false,
        };
        if pending {
            if let Some((_, entry)) = self.entries.remove_if(key, |_, e| e.phase == Phase::Pending) {
                entry.notify.notify_waiters();
            }
        }
        log::debug!("caché: invalidada {}", key);
        self.emit(CacheEvent::Invalidated(key.clone()));
        true
    }

    /// Elimina `prefix` y todas las claves anidadas.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let keys: Vec<QueryKey> =
            self.entries.iter().filter(|e| e.key().starts_with(prefix)).map(|e| e.key().clone()).collect();
        let mut removed = 0;
        for key in keys {
            if let Some((_, entry)) = self.entries.remove(&key) {
                entry.notify.notify_waiters();
                self.emit(CacheEvent::Evicted(key));
                removed += 1;
            }
        }
        removed
    }

    /// Elimina las entradas resueltas más antiguas que `gc_time`.
    pub fn gc(&self) -> usize {
        let before = self.entries.len();
        let gc_time = self.config.gc_time;
        self.entries.retain(|_, e| e.phase == Phase::Pending || e.updated_at.elapsed() < gc_time);
        before - self.entries.len()
    }

    pub fn clear(&self) {
        for entry in self.entries.iter() {
            entry.notify.notify_waiters();
        }
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { entries: self.entries.len(),
                     hits: self.hits.load(Ordering::SeqCst),
                     misses: self.misses.load(Ordering::SeqCst),
                     discarded: self.discarded.load(Ordering::SeqCst) }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Si el futuro de `fetch` se descarta a mitad, libera la entrada para que
/// quien espere vuelva a pedirla.
struct InFlight<'a> {
    cache: &'a QueryCache,
    key: &'a QueryKey,
    generation: u64,
    done: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.cache.abandon(self.key, self.generation);
        }
    }
}

fn downcast<T: Clone + 'static>(key: &QueryKey, value: &Value) -> Option<T> {
    let typed = value.downcast_ref::<T>().cloned();
    if typed.is_none() {
        log::error!("caché: tipo inesperado para {}", key);
    }
    typed
}
