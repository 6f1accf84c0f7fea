pub mod browser;
pub mod config;
pub mod crash_log;
pub mod current_tabs;
pub mod drag_drop;
pub mod error;
pub mod identity;
pub mod native;
pub mod router;
pub mod settings;
pub mod suggestions;
pub mod sync;
pub mod tab_groups;
pub mod tabs;

use browser::BrowserApi;
use config::Config;
use native::{InboundMessage, NativePort, PortEvent};
use router::{Action, Router};
use std::path::Path;
use std::sync::Arc;
use sync::envelope::PersistedState;
use sync::storage::{SqliteStorage, StorageArea};
use sync::PersistenceEngine;
use tokio::sync::mpsc;

pub use error::{Error, Result};

/// Input to the app loop.
#[derive(Debug)]
pub enum AppEvent {
    Action(Action),
    Port(PortEvent),
    Connect(NativePort),
    /// A newer envelope arrived from another device.
    RemoteApplied(PersistedState),
    Shutdown,
}

pub struct App {
    config: Config,
    router: Router,
    engine: Arc<PersistenceEngine>,
}

/// Local storage area at the configured path.
pub fn open_local_storage(config: &Config) -> Result<Arc<dyn StorageArea>> {
    Ok(Arc::new(SqliteStorage::open(&config.db_path())?))
}

/// Process entry point: load config, install logging, open local storage and
/// drive the app loop until `events` closes or `Shutdown` arrives.
pub async fn run(
    data_dir: &Path,
    browser: Arc<dyn BrowserApi>,
    remote: Option<Arc<dyn StorageArea>>,
    events: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let config = Config::load(data_dir);
    crash_log::init(&config.data_dir, false);
    tracing::info!(
        data_dir = %config.data_dir.display(),
        pid = std::process::id(),
        "tab groups core starting"
    );

    let local = open_local_storage(&config)?;
    App::start(config, browser, local, remote).await.run(events).await;
    Ok(())
}

impl App {
    /// Rehydrate persisted state and seed live tabs from the browser.
    pub async fn start(
        config: Config,
        browser: Arc<dyn BrowserApi>,
        local: Arc<dyn StorageArea>,
        remote: Option<Arc<dyn StorageArea>>,
    ) -> App {
        let remote = if config.remote_sync { remote } else { None };
        let engine = Arc::new(PersistenceEngine::new(local, remote));

        let mut router = Router::new(browser, config.notify_debounce());
        router.restore(engine.rehydrate().await);
        crash_log::set_debug(router.settings().debug_logging);
        router.load_tabs().await;
        tracing::info!(
            groups = router.groups().groups.len(),
            tabs = router.current().state().tabs.len(),
            "tab groups core started"
        );

        App {
            config,
            router,
            engine,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Apply one event. Returns false once the loop should stop.
    pub async fn handle(&mut self, event: AppEvent) -> bool {
        let persist = match event {
            AppEvent::Action(action) => {
                let persist = action.touches_persisted();
                let logging_changed = matches!(
                    &action,
                    Action::UpdateSettings(p) if p.debug_logging.is_some()
                );
                self.router.handle(action).await;
                if logging_changed {
                    crash_log::set_debug(self.router.settings().debug_logging);
                }
                persist
            }
            AppEvent::Port(event) => {
                let persist = matches!(
                    event,
                    PortEvent::Message(InboundMessage::UpdateGroups(_)) | PortEvent::Disconnected
                );
                self.router.handle_port(event).await;
                persist
            }
            AppEvent::Connect(port) => {
                self.router.connect(port);
                false
            }
            AppEvent::RemoteApplied(state) => {
                tracing::info!("applying state synced from another device");
                self.router.restore(state);
                crash_log::set_debug(self.router.settings().debug_logging);
                false
            }
            AppEvent::Shutdown => return false,
        };

        if persist {
            if let Err(e) = self.engine.persist(&self.router.snapshot()).await {
                tracing::warn!("persist failed: {}", e);
            }
        }
        true
    }

    /// Process events until `Shutdown` or until every sender is gone. Runs
    /// the storage sync timer alongside.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<AppEvent>) {
        let (pulled_tx, mut pulled_rx) = mpsc::unbounded_channel();
        let timer = sync::sync_engine::spawn_sync_timer(
            Arc::clone(&self.engine),
            self.config.sync_interval(),
            self.config.sync_deadline(),
            pulled_tx,
        );

        loop {
            let event = tokio::select! {
                ev = events.recv() => match ev {
                    Some(ev) => ev,
                    None => break,
                },
                Some(state) = pulled_rx.recv() => AppEvent::RemoteApplied(state),
            };
            if !self.handle(event).await {
                break;
            }
        }

        timer.abort();
        tracing::info!("tab groups core stopped");
    }
}
