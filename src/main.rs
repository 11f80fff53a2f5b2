use anyhow::Context;
use cryo_context::ProviderRoot;
use cryo_domain::{DomainStubs, NewExperiment};
use tracing_subscriber::EnvFilter;

/// Demo de la capa de consultas.
///
/// Construye la raíz de proveedores desde el entorno (`CRYO_DB_URL`,
/// `CRYO_CACHE_STALE_SECS`, `CRYO_USER_ID`, ...). Con el backend en memoria
/// siembra una molécula, una mezcla con un componente y un protocolo, y un
/// experimento; después imprime las vistas compuestas.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
                           .init();

  let root = ProviderRoot::from_env().context("no se pudo construir la raíz de proveedores")?;
  if root.client().backend_name() != "memory" {
    println!("Backend {}: la demo sólo siembra datos en memoria", root.client().backend_name());
    return Ok(());
  }
  if root.session().user_id().is_none() {
    println!("Sin CRYO_USER_ID: las altas con autor fallarán");
  }

  let dmso = root.molecules().create(&DomainStubs::dmso()).await?;
  let trehalose = root.molecules().create(&DomainStubs::trehalose()).await?;
  root.molecules().add_property(&DomainStubs::freezing_point(&trehalose.id)).await?;
  let mixture = root.mixtures().create(root.session(), &DomainStubs::dmso_pbs()).await?;
  root.mixtures().add_component(&DomainStubs::component(&mixture.id, &dmso.id, 10.0)).await?;
  root.protocols().create(root.session(), &DomainStubs::slow_cooling(&mixture.id)).await?;
  let experiment = root.experiments()
                       .create(root.session(), &NewExperiment::planned("Viabilidad HeLa", &mixture.id))
                       .await?;

  let molecules = root.molecule_context();
  molecules.select(Some(trehalose.id.clone()));
  if let Some(view) = molecules.load().await.data {
    println!("{}", serde_json::to_string_pretty(&view.molecule)?);
    for (kind, props) in view.properties_by_type() {
      println!("  {}: {} valor(es)", kind, props.len());
    }
  }

  let mixtures = root.mixture_context();
  mixtures.select(Some(mixture.id.clone()));
  match mixtures.load().await {
    view if view.is_error => println!("Error: {:?}", view.error),
    view => {
      if let Some(v) = view.data {
        println!("Mezcla {} ({} % total, {} protocolo(s))",
                 v.mixture.name,
                 v.total_amount("%"),
                 v.protocols.len());
      }
    }
  }

  let experiments = root.experiment_context();
  experiments.select(Some(experiment.id));
  if let Some(view) = experiments.load().await.data {
    println!("Experimento {} [{}]", view.detail.experiment.name, view.detail.experiment.status.as_str());
  }

  let stats = root.cache().stats();
  println!("Caché: {} entradas, {} aciertos, {} fallos", stats.entries, stats.hits, stats.misses);
  Ok(())
}
