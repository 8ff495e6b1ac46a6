pub mod api;
pub mod config;
pub mod deploy;
pub mod error;
pub mod health;
pub mod logging;
pub mod notifier;
pub mod pipeline;
pub mod webhook;

use std::sync::Arc;
use tokio::sync::Mutex;

use config::DeployConfig;
use deploy::{Deployer, ShellRunner};
use error::{RelayError, Result};
use health::HealthChecker;
use notifier::TelegramNotifier;

pub use api::build_router;

pub struct AppState {
    pub config: DeployConfig,
    pub notifier: TelegramNotifier,
    pub deployer: Deployer,
    pub health: HealthChecker,
    /// Held for the whole deploy sequence so deliveries never overlap.
    pub deploy_lock: Mutex<()>,
}

impl AppState {
    /// Build every component from the validated configuration.
    pub fn new(config: DeployConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.http_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let notifier = TelegramNotifier::new(
            client.clone(),
            config.app_name.clone(),
            config.telegram.clone(),
        );
        let runner = ShellRunner::new(config.shell.clone(), config.command_timeout);

        Ok(Self {
            deployer: Deployer::new(runner, notifier.clone()),
            health: HealthChecker::new(client),
            notifier,
            config,
            deploy_lock: Mutex::new(()),
        })
    }
}

pub type SharedState = Arc<AppState>;
