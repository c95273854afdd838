//! # sluice-agent
//!
//! Sluice agent binary: wires the stores, the rules service, the remote
//! include cache and the command surface, then serves HTTP until ctrl-c.

#![deny(unsafe_code)]

mod health;
mod hosts;
mod interpreter;
mod server;
mod version_check;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use sluice_core::LogFormat;
use sluice_history::ComposerHistory;
use sluice_remote::RemoteRulesCache;
use sluice_rpc::{ChangeTracker, MethodRegistry, RpcContext, register_all};
use sluice_rules::{Collaborators, RulesService, Stores};
use sluice_settings::SluiceSettings;
use sluice_store::{FileStorage, Storage};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::hosts::FileHostsWriter;
use crate::interpreter::SnapshotInterpreter;
use crate::server::AppState;

/// Sluice rule composition agent.
#[derive(Parser, Debug)]
#[command(name = "sluice-agent", about = "Sluice rule composition agent")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Data directory (overrides settings).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Settings file path (defaults to `~/.sluice/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Apply CLI overrides on top of loaded settings.
    fn apply(&self, settings: &mut SluiceSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(dir) = &self.data_dir {
            settings.storage.data_dir = dir.to_string_lossy().into_owned();
        }
    }
}

fn open_storage(path: PathBuf) -> Result<Arc<FileStorage>> {
    let storage = FileStorage::open(&path)
        .with_context(|| format!("Failed to open storage: {}", path.display()))?;
    Ok(Arc::new(storage))
}

/// Recompose whenever a remote include changes.
fn spawn_change_listener(cache: &RemoteRulesCache, rules: Arc<RulesService>) -> JoinHandle<()> {
    let mut changes = cache.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(key) => {
                    tracing::debug!(key = %key, "remote include changed, recomposing");
                    rules.request_recompose();
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "remote change notifications lagged");
                    rules.request_recompose();
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(sluice_settings::settings_path);
    let loaded = sluice_settings::load_settings_from_path(&settings_path);
    let mut settings = match &loaded {
        Ok(settings) => settings.clone(),
        Err(_) => SluiceSettings::default(),
    };
    args.apply(&mut settings);

    let format = settings
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();
    sluice_core::init_subscriber(&settings.logging.level, format);
    if let Err(e) = &loaded {
        tracing::warn!(path = %settings_path.display(), error = %e, "invalid settings file, using defaults");
    }

    // Stores
    let home = sluice_settings::home_dir();
    let data_dir = settings.storage.data_path(&home);
    let rules_store = open_storage(settings.storage.rules_path(&home))?;
    let values_store = open_storage(settings.storage.values_path(&home))?;
    let properties_store = open_storage(settings.storage.properties_path(&home))?;
    let composed_store = open_storage(data_dir.join("composed"))?;
    let properties: Arc<dyn Storage> = properties_store;

    // Collaborators
    let cache = RemoteRulesCache::new(settings.remote.clone())
        .context("Failed to create remote include cache")?;
    let interpreter = Arc::new(SnapshotInterpreter::new(composed_store));
    let hosts = Arc::new(FileHostsWriter::new(&settings.hosts.path));

    let rules = Arc::new(RulesService::new(
        settings.rules.clone(),
        home,
        Stores {
            rules: rules_store,
            values: values_store,
            properties: properties.clone(),
        },
        Collaborators {
            fetcher: Arc::new(cache.clone()),
            interpreter,
            hosts,
        },
    ));

    // Background tasks
    let mut tasks = vec![
        rules.spawn_recomposer(),
        cache.spawn_refresher(),
        spawn_change_listener(&cache, rules.clone()),
    ];
    if let Some(handle) = version_check::spawn_version_check(&settings.update, properties.clone())
        .context("Failed to start version check")?
    {
        tasks.push(handle);
    }
    rules.request_recompose();

    let history = ComposerHistory::load(
        properties,
        Duration::from_millis(settings.history.persist_delay_ms),
    );

    let mut registry = MethodRegistry::new();
    register_all(&mut registry);
    let method_count = registry.methods().len();

    let state = AppState {
        registry: Arc::new(registry),
        ctx: RpcContext {
            rules,
            history: history.clone(),
            changes: Arc::new(ChangeTracker::new()),
            start_time: Instant::now(),
        },
    };

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let (local_addr, server) = server::serve(&addr, server::router(state), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
        }
    })
    .await
    .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(
        data_dir = %data_dir.display(),
        "Sluice agent listening on http://{local_addr} ({method_count} RPC methods registered)"
    );

    server
        .await
        .context("Server task panicked")?
        .context("Server error")?;

    tracing::info!("Shutting down...");
    for task in tasks {
        task.abort();
    }
    history.flush();
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_rules::{InlineValueMap, RuleInterpreter};
    use sluice_settings::{RemoteSettings, RulesSettings};
    use sluice_store::MemoryStorage;

    #[test]
    fn cli_defaults_leave_settings_alone() {
        let cli = Cli::parse_from(["sluice-agent"]);
        let mut settings = SluiceSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8899);
        assert_eq!(settings.storage.data_dir, "~/.sluice");
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "sluice-agent",
            "--host",
            "0.0.0.0",
            "--port",
            "0",
            "--data-dir",
            "/var/lib/sluice",
        ]);
        let mut settings = SluiceSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 0);
        assert_eq!(settings.storage.data_dir, "/var/lib/sluice");
    }

    #[test]
    fn cli_settings_path() {
        let cli = Cli::parse_from(["sluice-agent", "--settings", "/tmp/s.json"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/s.json")));
    }

    #[derive(Default)]
    struct Counter(parking_lot::Mutex<usize>);

    impl RuleInterpreter for Counter {
        fn load(&self, _text: &str, _values: &InlineValueMap) {
            *self.0.lock() += 1;
        }
    }

    #[tokio::test]
    async fn remote_changes_trigger_recompose() {
        let dir = tempfile::tempdir().unwrap();
        let include = dir.path().join("inc.txt");
        std::fs::write(&include, "inc.test 1.1.1.1").unwrap();

        let cache = RemoteRulesCache::new(RemoteSettings::default()).unwrap();
        let counter = Arc::new(Counter::default());
        let rules = Arc::new(RulesService::new(
            RulesSettings::default(),
            dir.path().to_path_buf(),
            Stores {
                rules: Arc::new(MemoryStorage::new()),
                values: Arc::new(MemoryStorage::new()),
                properties: Arc::new(MemoryStorage::new()),
            },
            Collaborators {
                fetcher: Arc::new(cache.clone()),
                interpreter: counter.clone(),
                hosts: Arc::new(FileHostsWriter::new(dir.path().join("hosts"))),
            },
        ));
        let listener = spawn_change_listener(&cache, rules.clone());

        assert!(rules.registry().set_default(&format!("@{}", include.display())));
        // First pass starts the load; the change notification drives a second.
        let _ = rules.recompose();
        let before = rules.trigger().requests();
        let mut requested = false;
        for _ in 0..100 {
            if rules.trigger().requests() > before {
                requested = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        listener.abort();
        assert!(requested);
        assert_eq!(*counter.0.lock(), 1);
    }
}
