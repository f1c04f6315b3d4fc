//! Dependency construction and the application boot sequence: connect the
//! database, build the process-wide singletons (AEAD key, limiter
//! registry), and hand everything to [`sentrel_scheduler::Supervisor`].

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use url::Url;

use sentrel_activity::ActivityStore;
use sentrel_data::Pool;
use sentrel_events::EventBus;
use sentrel_limits::{LimiterRegistry, RateLimitConfig, TokenBucket};
use sentrel_runtime::{migrate, ExternalProgramStore, InstanceStore, RunStore, TrackerRuleStore};
use sentrel_scheduler::{AutomationDeps, Supervisor};
use sentrel_secret::SecretBox;
use sentrel_telemetry::{build_sha, LogFormat, LoggingConfig, Metrics};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::program::ProcessProgramRunner;
use crate::qbit::{QbitCredentials, QbitHttpClient};

/// Default WebUI rate: 10 requests/second, matching qBittorrent's own
/// WebUI rate limiter so this process never trips it.
const QBIT_RATE_LIMIT: RateLimitConfig = RateLimitConfig { rate_limit: 10, rate_period: Duration::from_secs(1) };

/// Everything [`run_app_with`] needs, constructed once at startup.
pub struct BootstrapDependencies {
    config: Config,
    pool: Pool,
    secret_box: SecretBox,
    events: EventBus,
    metrics: Metrics,
    limiters: LimiterRegistry,
}

impl BootstrapDependencies {
    /// Connect the database, run migrations, and construct the
    /// process-wide singletons from an already-loaded `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection, migration, or metrics
    /// construction fails.
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let pool = Pool::connect(&config.database_url).await?;
        migrate(&pool).await?;
        sqlx::query(sentrel_activity::schema(pool.dialect())).execute(pool.any()).await.map_err(|source| {
            sentrel_data::DataError::query_failed("bootstrap.activity_schema", source)
        })?;

        let secret_box = SecretBox::new(&config.aead_key)?;
        let events = EventBus::new();
        let metrics = Metrics::new()?;
        let limiters = LimiterRegistry::new();

        Ok(Self { config, pool, secret_box, events, metrics, limiters })
    }

    fn qbit_client(&self) -> AppResult<Arc<QbitHttpClient>> {
        let base_url = Url::parse(&self.config.qbit_base_url)?;
        let host = base_url.host_str().unwrap_or("qbittorrent").to_string();
        let limiter: Arc<TokenBucket> = self.limiters.get_or_create(&host, QBIT_RATE_LIMIT);
        let credentials = QbitCredentials { base_url, username: self.config.qbit_username.clone(), password: self.config.qbit_password.clone() };
        Ok(Arc::new(QbitHttpClient::new(credentials, limiter, self.config.arr_timeout)))
    }
}

/// Entry point invoked by `main`: load configuration, wire dependencies,
/// boot the supervisor, and block until `Ctrl+C`.
///
/// # Errors
///
/// Returns an error if startup fails at any stage.
pub async fn run_app() -> AppResult<()> {
    let config = Config::from_env()?;
    let sha = build_sha();
    let logging = LoggingConfig { level: &config.log_level, format: LogFormat::infer(), build_sha: sha };
    sentrel_telemetry::init_logging(&logging)?;

    let dependencies = BootstrapDependencies::from_config(config).await?;
    run_app_with(dependencies).await
}

/// Boot sequence driven entirely by already-constructed dependencies, so
/// it can be exercised without environment variables or a live qBittorrent
/// instance in tests.
pub async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let supervisor = boot_supervisor(dependencies).await?;
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received, stopping workers");
    supervisor.shutdown().await;
    Ok(())
}

/// Build every store, the injected automation capabilities, and boot the
/// supervisor, without waiting on a shutdown signal. Split out from
/// [`run_app_with`] so tests can drive shutdown explicitly.
///
/// # Errors
///
/// Returns an error if the qBittorrent base URL fails to parse or the
/// supervisor's boot sequence (restart recovery, worker spawn) fails.
pub async fn boot_supervisor(dependencies: BootstrapDependencies) -> AppResult<Supervisor> {
    info!("sentrel application bootstrap starting");
    let _secret_box = dependencies.secret_box;
    let _metrics = dependencies.metrics;

    let instances = InstanceStore::new(dependencies.pool.clone());
    let rules = TrackerRuleStore::new(dependencies.pool.clone());
    let programs = ExternalProgramStore::new(dependencies.pool.clone());
    let runs = RunStore::new(dependencies.pool.clone());
    let activity = ActivityStore::new(dependencies.pool.clone());

    let qbit = dependencies.qbit_client()?;
    let automation = AutomationDeps { torrent_source: qbit.clone(), qbit, program_runner: Arc::new(ProcessProgramRunner::new()) };

    Supervisor::boot(instances, rules, programs, runs, activity, dependencies.events, automation).await.map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            aead_key: [7u8; sentrel_secret::KEY_LEN],
            log_level: "info".to_string(),
            default_scheduler_interval: Duration::from_secs(900),
            default_retention_days: 7,
            qbit_base_url: "http://127.0.0.1:8080".to_string(),
            qbit_username: "admin".to_string(),
            qbit_password: "adminadmin".to_string(),
            arr_timeout: Duration::from_secs(15),
            gazelle_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn boot_and_shutdown_with_no_registered_instances() {
        let dependencies = BootstrapDependencies::from_config(test_config()).await.unwrap();
        let supervisor = boot_supervisor(dependencies).await.unwrap();
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn qbit_client_rejects_an_unparsable_base_url() {
        let mut config = test_config();
        config.qbit_base_url = "not a url".to_string();
        let dependencies = BootstrapDependencies::from_config(config).await.unwrap();
        let err = dependencies.qbit_client().unwrap_err();
        assert!(matches!(err, AppError::Url(_)));
    }
}
