//! Live dashboard for the tank sensor.
//!
//! Owns the device client and wires together all background tasks:
//! - Telemetry poller (distance → rolling series → sink)
//! - Calibration table refresh
//! - Liveness ping (fire-and-forget)
//! - Config file watcher (live reload of history length and estimate floor)
//!
//! Everything is torn down when the shutdown future resolves; responses
//! still in flight at that point are dropped.

use cuve_config::{CuveConfig, ConfigWatcher};
use cuve_core::{Message, Notice, RenderSink, Result, RollingSeries};
use cuve_device::DeviceClient;
use cuve_renderer::TerminalSink;
use cuve_telemetry::{PollSettings, Poller, SamplePolicy};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, info, warn};

/// Running dashboard: configuration plus the device it talks to.
pub struct Dashboard {
    config:          CuveConfig,
    config_path:     Option<PathBuf>,
    device_override: Option<String>,
    client:          DeviceClient,
}

impl Dashboard {
    /// Build a dashboard. `config_path` enables live reload when set;
    /// `device_override` replaces `device.base_url`, including on reload.
    pub fn new(
        config: CuveConfig,
        config_path: Option<PathBuf>,
        device_override: Option<String>,
    ) -> Result<Self> {
        let config = with_device_override(config, device_override.as_deref());
        let client = DeviceClient::new(
            &config.device.base_url,
            Duration::from_millis(config.device.timeout_ms),
        )?;
        Ok(Self { config, config_path, device_override, client })
    }

    pub fn client(&self) -> &DeviceClient {
        &self.client
    }

    /// Draw on stdout until Ctrl-C.
    pub async fn run_terminal(self) -> Result<()> {
        let sink = TerminalSink::new(std::io::stdout(), &self.config.chart);
        self.run_until(sink, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
        .map(drop)
    }

    /// Run every task until `shutdown` resolves and return the final series.
    pub async fn run_until<K, F>(self, sink: K, shutdown: F) -> Result<RollingSeries>
    where
        K: RenderSink + 'static,
        F: Future<Output = ()>,
    {
        info!("Dashboard for {} starting", self.client.base_url());

        let poll = &self.config.poll;
        let poller = Poller::new(self.client.clone(), sink, poll_settings(&self.config));
        let (poller_task, control) = poller.spawn();

        let mut background = JoinSet::new();
        background.spawn(calibs_loop(
            self.client.clone(),
            Duration::from_millis(poll.calibs_interval_ms),
            control.clone(),
        ));
        background.spawn(ping_loop(
            self.client.clone(),
            Duration::from_millis(poll.ping_interval_ms),
            poll.ping_page.clone(),
            control.clone(),
        ));
        if let Some(path) = self.config_path.clone() {
            background.spawn(config_loop(
                path,
                self.config.clone(),
                self.device_override.clone(),
                control.clone(),
            ));
        }

        shutdown.await;
        info!("Shutting down");

        background.shutdown().await;
        // The poller may already have stopped if its control channel closed.
        let _ = control.send(Message::Shutdown).await;

        let poller = poller_task
            .await
            .map_err(|e| cuve_core::CuveError::Io { source: std::io::Error::other(e) })?;
        Ok(poller.series().clone())
    }
}

fn poll_settings(config: &CuveConfig) -> PollSettings {
    PollSettings {
        interval:    Duration::from_millis(config.poll.interval_ms),
        history_len: config.poll.history_len,
        policy:      SamplePolicy { estimated_floor: config.poll.estimated_floor },
    }
}

// ── Background tasks ──────────────────────────────────────────────────────────

/// Fetch the calibration table every `period` and forward it to the poller.
async fn calibs_loop(client: DeviceClient, period: Duration, control: mpsc::Sender<Message>) {
    let mut ticker = time::interval(period);

    loop {
        ticker.tick().await;
        let msg = match client.calibrations().await {
            Ok(calibs) => Message::Calibrations(calibs),
            Err(e) => {
                warn!("Calibration refresh failed: {e}");
                Message::Notify(Notice::Error, format!("calibrations: {e}"))
            }
        };
        if control.send(msg).await.is_err() {
            break; // poller stopped
        }
    }
}

/// Send a liveness ping every `period`. Pings run detached; their outcome is
/// only logged.
async fn ping_loop(
    client: DeviceClient,
    period: Duration,
    page: String,
    control: mpsc::Sender<Message>,
) {
    let mut ticker = time::interval(period);

    while !control.is_closed() {
        ticker.tick().await;
        let client = client.clone();
        let page = page.clone();
        tokio::spawn(async move {
            match client.ping(&page).await {
                Ok(()) => debug!("Ping delivered"),
                Err(e) => debug!("Ping failed: {e}"),
            }
        });
    }
}

/// Reload `cuve.toml` on change and push the settings that can change live.
async fn config_loop(
    path: PathBuf,
    mut current: CuveConfig,
    device_override: Option<String>,
    control: mpsc::Sender<Message>,
) {
    let (_watcher, mut rx) = ConfigWatcher::spawn(&path);

    while rx.recv().await.is_some() {
        let msgs = match cuve_config::load(&path) {
            Ok(cfg) => {
                info!("Config reloaded");
                let cfg = with_device_override(cfg, device_override.as_deref());
                let msgs = reload_messages(&current, &cfg);
                current = cfg;
                msgs
            }
            Err(e) => {
                warn!("Config reload failed: {e}");
                vec![Message::Notify(Notice::Error, format!("config reload failed: {e}"))]
            }
        };

        for msg in msgs {
            if control.send(msg).await.is_err() {
                return;
            }
        }
    }
}

/// Replace `device.base_url` when the command line named a device.
fn with_device_override(mut config: CuveConfig, device: Option<&str>) -> CuveConfig {
    if let Some(url) = device {
        config.device.base_url = url.to_string();
    }
    config
}

/// Messages describing what changed between two configs.
fn reload_messages(old: &CuveConfig, new: &CuveConfig) -> Vec<Message> {
    let mut msgs = Vec::new();

    if old.poll.history_len != new.poll.history_len
        || old.poll.estimated_floor != new.poll.estimated_floor
    {
        msgs.push(Message::Reconfigure {
            history_len:     new.poll.history_len,
            estimated_floor: new.poll.estimated_floor,
        });
    }

    let needs_restart = old.device != new.device
        || old.chart != new.chart
        || old.poll.interval_ms != new.poll.interval_ms
        || old.poll.calibs_interval_ms != new.poll.calibs_interval_ms
        || old.poll.ping_interval_ms != new.poll.ping_interval_ms
        || old.poll.ping_page != new.poll.ping_page;
    if needs_restart {
        msgs.push(Message::Notify(
            Notice::Info,
            "device, timer and chart changes apply after restart".to_string(),
        ));
    }

    msgs
}
