use clap::Parser;
use pkg_constants::controller::{DEFAULT_GC_INTERVAL_SECS, DEFAULT_RECONCILE_INTERVAL_SECS};
use pkg_constants::paths::{DEFAULT_OPERATOR_CONFIG, DEFAULT_OPERATOR_DATA_DIR};
use pkg_controllers::{ApplicationSetController, OwnerGarbageCollector};
use pkg_state::{RegistryClient, StateStore};
use pkg_types::argocd::ArgoCD;
use pkg_types::config::{OperatorConfigFile, load_config_file, resolve_interval_secs};
use pkg_types::rbac::RoleBinding;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "appset-operator",
    about = "Keeps ArgoCD ApplicationSet RoleBindings converged"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_OPERATOR_CONFIG)]
    config: String,

    /// Directory for SlateDB state storage
    #[arg(long)]
    data_dir: Option<String>,

    /// Only reconcile ArgoCD instances in this namespace
    #[arg(long, short)]
    namespace: Option<String>,

    /// Seconds between reconcile passes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    reconcile_interval_secs: Option<u64>,

    /// Seconds between orphaned RoleBinding sweeps
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    gc_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: OperatorConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let data_dir = cli
        .data_dir
        .or(file_cfg.data_dir)
        .unwrap_or_else(|| DEFAULT_OPERATOR_DATA_DIR.to_string());
    let namespace = cli.namespace.or(file_cfg.namespace);
    let reconcile_interval = Duration::from_secs(resolve_interval_secs(
        "reconcile-interval-secs",
        cli.reconcile_interval_secs,
        file_cfg.reconcile_interval_secs,
        DEFAULT_RECONCILE_INTERVAL_SECS,
    )?);
    let gc_interval = Duration::from_secs(resolve_interval_secs(
        "gc-interval-secs",
        cli.gc_interval_secs,
        file_cfg.gc_interval_secs,
        DEFAULT_GC_INTERVAL_SECS,
    )?);

    info!("Starting appset-operator");
    info!("  Data dir:   {}", data_dir);
    info!("  Namespace:  {}", namespace.as_deref().unwrap_or("(all)"));
    info!("  Reconcile:  every {}s", reconcile_interval.as_secs());
    info!("  GC:         every {}s", gc_interval.as_secs());

    let store = StateStore::new(&data_dir).await?;
    let instances = RegistryClient::<ArgoCD>::new(store.clone());
    let bindings = RegistryClient::<RoleBinding>::new(store.clone());

    let controller = ApplicationSetController::new(instances.clone(), bindings.clone())
        .with_namespace(namespace.clone())
        .with_interval(reconcile_interval)
        .start();
    let gc = OwnerGarbageCollector::new(instances, bindings)
        .with_namespace(namespace)
        .with_interval(gc_interval)
        .start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down appset-operator");
    controller.abort();
    gc.abort();
    let _ = controller.await;
    let _ = gc.await;

    store.close().await?;
    Ok(())
}
