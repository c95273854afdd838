//! Latest-version polling.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sluice_core::constants::PROP_LATEST_VERSION;
use sluice_settings::UpdateSettings;
use sluice_store::Storage;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fetch the published version once and store it as `latestVersion`.
///
/// Returns the version when the body carried one.
pub async fn check_once(
    client: &reqwest::Client,
    url: &str,
    properties: &dyn Storage,
) -> anyhow::Result<Option<String>> {
    let body: Value = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let Some(version) = body.get("version").and_then(Value::as_str) else {
        debug!(url, "version response without a version string");
        return Ok(None);
    };
    let changed = properties.property(PROP_LATEST_VERSION).as_ref().and_then(Value::as_str)
        != Some(version);
    if changed {
        properties.set_property(PROP_LATEST_VERSION, Value::String(version.to_string()))?;
        info!(version, "latest version recorded");
    }
    Ok(Some(version.to_string()))
}

/// Start polling. Returns `None` when checks are disabled.
pub fn spawn_version_check(
    settings: &UpdateSettings,
    properties: Arc<dyn Storage>,
) -> anyhow::Result<Option<JoinHandle<()>>> {
    if !settings.enabled || settings.registry_url.is_empty() {
        debug!("version check disabled");
        return Ok(None);
    }
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("sluice/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let url = settings.registry_url.clone();
    let initial = Duration::from_millis(settings.initial_delay_ms);
    let period = Duration::from_secs(settings.interval_secs.max(1));

    Ok(Some(tokio::spawn(async move {
        tokio::time::sleep(initial).await;
        let mut ticker = tokio::time::interval(period);
        loop {
            let _ = ticker.tick().await;
            if let Err(e) = check_once(&client, &url, properties.as_ref()).await {
                warn!(url = %url, error = %e, "version check failed");
            }
        }
    })))
}
