//! Session lifecycle: start, stop and the cooldown-delayed self-restart.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use super::context::{ProbeDeps, SessionContext};
use super::crawl::run_crawl;
use super::pool::WorkerPool;
use super::stats::{SessionStats, StatsHandle};
use super::trackers::run_trackers;
use super::types::{Pipeline, ProbeError, ProbeStatus, SessionParams, StartOutcome, StopOutcome};
use crate::config::ProbeConfig;
use crate::metrics;

/// Pool of the current pass. Emptied between passes and on stop.
type PoolSlot = Arc<Mutex<Option<Arc<WorkerPool>>>>;

struct ActiveSession {
    ctx: SessionContext,
    pool: PoolSlot,
    params: SessionParams,
}

/// Owns the single probe session of the process.
pub struct ProbeController {
    config: ProbeConfig,
    deps: ProbeDeps,
    stats: Arc<SessionStats>,
    session: Arc<Mutex<Option<ActiveSession>>>,
}

impl ProbeController {
    pub fn new(config: ProbeConfig, deps: ProbeDeps) -> Self {
        Self {
            config,
            deps,
            stats: Arc::new(SessionStats::new()),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a session in the background.
    ///
    /// Parameters are validated first. A session that is already running is
    /// left untouched.
    pub async fn start(&self, params: SessionParams) -> Result<StartOutcome, ProbeError> {
        params.validate()?;

        let mut session = self.session.lock().await;
        if session.is_some() {
            warn!("Probe session already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let pool = provision_pool(&self.deps, &params)?;
        let handle = self.stats.begin();
        metrics::SESSIONS_STARTED.inc();

        let ctx = SessionContext::new();
        let slot: PoolSlot = Arc::new(Mutex::new(pool));
        let task = SessionTask {
            ctx: ctx.clone(),
            params: params.clone(),
            deps: self.deps.clone(),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
            pool: Arc::clone(&slot),
            session: Arc::clone(&self.session),
        };
        let shutdown_rx = ctx.subscribe();
        tokio::spawn(task.run(handle, shutdown_rx));

        info!(
            workers = params.workers,
            listener_budget = params.listener_budget,
            pipelines = ?params.pipelines,
            "Probe session started"
        );
        *session = Some(ActiveSession {
            ctx,
            pool: slot,
            params,
        });
        Ok(StartOutcome::Started)
    }

    /// Stop the running session. Engines are destroyed immediately and a
    /// pending restart is cancelled.
    pub async fn stop(&self) -> StopOutcome {
        let mut session = self.session.lock().await;
        let Some(active) = session.take() else {
            warn!("Probe session not running");
            return StopOutcome::NotRunning;
        };

        active.ctx.cancel();
        if let Some(pool) = active.pool.lock().await.take() {
            pool.destroy_all();
        }
        self.stats.finish();

        info!(pipelines = ?active.params.pipelines, "Probe session stopped");
        StopOutcome::Stopped
    }

    pub fn status(&self) -> ProbeStatus {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.stats.is_running()
    }

    /// Parameters of the running session, if any.
    pub async fn current_params(&self) -> Option<SessionParams> {
        self.session.lock().await.as_ref().map(|s| s.params.clone())
    }

    /// Session parameters from configuration.
    pub fn default_params(&self) -> SessionParams {
        SessionParams {
            workers: self.config.default_workers,
            listener_budget: self.config.default_listener_budget,
            pipelines: self.config.default_pipelines.clone(),
        }
    }

    /// Start with the configured defaults if `autostart` is enabled.
    pub async fn autostart(&self) -> Result<Option<StartOutcome>, ProbeError> {
        if !self.config.autostart {
            return Ok(None);
        }
        info!("Autostarting probe session");
        self.start(self.default_params()).await.map(Some)
    }
}

fn provision_pool(
    deps: &ProbeDeps,
    params: &SessionParams,
) -> Result<Option<Arc<WorkerPool>>, ProbeError> {
    if !params.includes(Pipeline::DhtCrawl) {
        return Ok(None);
    }
    let pool = WorkerPool::provision(deps.engines.as_ref(), params.workers, params.listener_budget)?;
    Ok(Some(Arc::new(pool)))
}

/// Everything the background task of one session needs.
struct SessionTask {
    ctx: SessionContext,
    params: SessionParams,
    deps: ProbeDeps,
    config: ProbeConfig,
    stats: Arc<SessionStats>,
    pool: PoolSlot,
    session: Arc<Mutex<Option<ActiveSession>>>,
}

impl SessionTask {
    async fn run(self, mut handle: StatsHandle, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            self.run_pass(&handle).await;

            if let Some(pool) = self.pool.lock().await.take() {
                pool.destroy_all();
            }
            if !self.ctx.is_alive() {
                break;
            }

            info!(
                cooldown_secs = self.config.cooldown_secs,
                "Pass complete, restarting after cooldown"
            );
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(self.config.cooldown()) => {}
            }

            match self.restart().await {
                Ok(Some(next)) => handle = next,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to restart probe session");
                    self.end().await;
                    break;
                }
            }
        }
        debug!("Session task finished");
    }

    async fn run_pass(&self, handle: &StatsHandle) {
        let pool = self.pool.lock().await.clone();

        let crawl = async {
            if let Some(pool) = pool.as_deref() {
                run_crawl(&self.ctx, &self.deps, pool, handle, &self.config).await;
            }
        };
        let trackers = async {
            if self.params.includes(Pipeline::QueryTrackers) {
                run_trackers(&self.ctx, &self.deps, handle, &self.config).await;
            }
        };
        tokio::join!(crawl, trackers);
    }

    /// Fresh pool and counters for the next pass. `None` if the session was
    /// stopped in the meantime.
    async fn restart(&self) -> Result<Option<StatsHandle>, ProbeError> {
        // Holding the slot orders this against a concurrent stop.
        let mut slot = self.pool.lock().await;
        if !self.ctx.is_alive() {
            return Ok(None);
        }
        *slot = provision_pool(&self.deps, &self.params)?;
        let handle = self.stats.begin();
        metrics::SESSIONS_STARTED.inc();
        info!(generation = handle.generation(), "Probe session restarted");
        Ok(Some(handle))
    }

    /// Tear down after an internal failure, as if stopped.
    async fn end(&self) {
        let mut session = self.session.lock().await;
        if !self.ctx.cancel() {
            return;
        }
        if session
            .as_ref()
            .is_some_and(|active| active.ctx.same_session(&self.ctx))
        {
            *session = None;
            self.stats.finish();
        }
    }
}
