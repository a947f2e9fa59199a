use clap::Parser;

/// Runtime configuration. `clap`'s `env` feature means every flag doubles
/// as an environment variable, which is how this binary is actually run in
/// a cluster (no config file, just a `Deployment` env block).
#[derive(Parser, Clone, Debug)]
#[command(
    name = "kube-green",
    about = "Puts namespaces to sleep and wakes them on a schedule",
    version
)]
pub struct Config {
    /// How often to re-check every `SleepInfo` for a due firing, absent a
    /// more specific requeue computed from its own schedule.
    #[arg(long, env = "KUBE_GREEN_SLEEP_DELTA_SECONDS", default_value_t = 60)]
    pub sleep_delta_seconds: u64,

    /// Upper bound on reconciliations running at once.
    #[arg(long, env = "KUBE_GREEN_MAX_CONCURRENT_RECONCILES", default_value_t = 4)]
    pub max_concurrent_reconciles: u16,

    /// Compute and log what would be patched without writing anything.
    #[arg(long, env = "KUBE_GREEN_DRY_RUN", default_value_t = false)]
    pub dry_run: bool,

    /// Restrict the controller to a single namespace. Absent means
    /// cluster-wide.
    #[arg(long, env = "KUBE_GREEN_NAMESPACE")]
    pub namespace: Option<String>,
}
