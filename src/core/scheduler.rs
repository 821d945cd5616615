//! Scan cycle orchestration
//!
//! A cycle reloads configuration, rediscovers repositories when due, checks a
//! snapshot of the cache, and publishes a [`ScanReport`]. Timer ticks and manual
//! rescans run the exact same cycle.
//!
//! Cycles never overlap: the scheduler runs in one task and awaits each cycle
//! before looking at the next trigger. Rescan requests that arrive while a cycle
//! is in flight are coalesced into a single follow-up cycle, and missed timer
//! ticks are delayed rather than replayed in a burst.

use anyhow::{Context, Result};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::cache::RepoCache;
use super::config::{Config, ConfigSource, DEFAULT_POLL_INTERVAL_SECS};
use super::discovery::discover;
use super::filter::IgnoreMatcher;
use super::report::ScanReport;
use super::watcher::{apply_event, LiveRepoWatcher, WatchEvent};
use crate::git::{StatusChecker, VcsQuery};

/// Requests coming from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Run a cycle now
    Rescan,
    /// Forwarded unchanged to the host's open-request channel
    OpenRepository(PathBuf),
    /// Stop the scheduler after the current cycle
    Shutdown,
}

/// Drives discovery, status checks and publication
pub struct ScanScheduler {
    config_source: Arc<dyn ConfigSource>,
    query: Arc<dyn VcsQuery>,
    cache: Arc<RepoCache>,
    watcher: Option<LiveRepoWatcher>,
    watch_tx: UnboundedSender<WatchEvent>,
    watch_rx: UnboundedReceiver<WatchEvent>,
    config: Option<Config>,
    last_discovery: Option<Instant>,
    discovered_roots: Vec<PathBuf>,
}

impl ScanScheduler {
    pub fn new(config_source: Arc<dyn ConfigSource>, query: Arc<dyn VcsQuery>) -> Self {
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();
        Self {
            config_source,
            query,
            cache: Arc::new(RepoCache::new()),
            watcher: Some(LiveRepoWatcher::new(watch_tx.clone())),
            watch_tx,
            watch_rx,
            config: None,
            last_discovery: None,
            discovered_roots: Vec::new(),
        }
    }

    /// Disables filesystem subscriptions; new repositories are then only found
    /// by full discovery or by events sent through [`Self::watch_sender`]
    pub fn without_watcher(mut self) -> Self {
        self.watcher = None;
        self
    }

    /// Sender feeding the same queue the filesystem subscriptions use
    pub fn watch_sender(&self) -> UnboundedSender<WatchEvent> {
        self.watch_tx.clone()
    }

    pub fn cache(&self) -> Arc<RepoCache> {
        Arc::clone(&self.cache)
    }

    /// Configuration loaded by the most recent successful cycle
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// Forgets the last discovery so the next cycle walks the roots again
    pub fn force_discovery(&mut self) {
        self.last_discovery = None;
    }

    /// Runs one full cycle; failures become a global-error report
    pub async fn run_cycle(&mut self) -> ScanReport {
        self.apply_watch_events();
        match self.try_cycle().await {
            Ok(report) => report,
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "scan cycle failed");
                ScanReport::global_error(message)
            }
        }
    }

    async fn try_cycle(&mut self) -> Result<ScanReport> {
        let started = Instant::now();
        let config = self
            .config_source
            .load()
            .context("loading configuration")?;

        if self.discovery_due(&config) {
            self.rediscover(&config).await?;
        }
        self.config = Some(config.clone());

        let matcher = IgnoreMatcher::new(&config.ignore_patterns);
        let snapshot: Vec<PathBuf> = self
            .cache
            .snapshot()
            .into_iter()
            .filter(|path| !matcher.matches(path))
            .collect();

        let checker = StatusChecker::new(Arc::clone(&self.query), config.check_concurrency());
        let statuses = checker.check_all(&snapshot).await;
        let report = ScanReport::from_statuses(statuses);

        info!(
            repos = report.statuses.len(),
            severity = report.severity.text(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan cycle complete"
        );
        Ok(report)
    }

    fn discovery_due(&self, config: &Config) -> bool {
        match self.last_discovery {
            None => true,
            Some(at) => {
                at.elapsed() >= config.discovery_interval() || self.discovered_roots != config.roots
            }
        }
    }

    async fn rediscover(&mut self, config: &Config) -> Result<()> {
        let roots = config.roots.clone();
        let patterns = config.ignore_patterns.clone();
        let found = tokio::task::spawn_blocking(move || discover(&roots, &patterns))
            .await
            .context("repository discovery failed")?;

        self.cache.replace(found);
        if let Some(mut watcher) = self.watcher.take() {
            // Recursive subscriptions walk the whole tree before returning
            let roots = config.roots.clone();
            match tokio::task::spawn_blocking(move || {
                watcher.subscribe(&roots);
                watcher
            })
            .await
            {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => warn!(error = %e, "watch subscription failed; live detection disabled"),
            }
        }
        self.discovered_roots = config.roots.clone();
        self.last_discovery = Some(Instant::now());
        Ok(())
    }

    /// Applies every queued watch event against the current ignore patterns
    fn apply_watch_events(&mut self) {
        while let Ok(event) = self.watch_rx.try_recv() {
            self.handle_watch_event(event);
        }
    }

    fn handle_watch_event(&self, event: WatchEvent) {
        let patterns = self
            .config
            .as_ref()
            .map(|c| c.ignore_patterns.as_slice())
            .unwrap_or_default();
        apply_event(event, &self.cache, &IgnoreMatcher::new(patterns));
    }

    /// Spawns the scheduler loop onto the current runtime
    pub fn spawn(self) -> ScannerHandle {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = watch::channel(None);
        let (open_tx, open_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(self.run(signal_rx, report_tx, open_tx));

        ScannerHandle {
            signals: signal_tx,
            reports: report_rx,
            open_requests: open_rx,
            task,
        }
    }

    /// Scheduler loop: periodic ticks, presentation signals and watch events
    ///
    /// Returns on [`Signal::Shutdown`] or when every signal sender is dropped.
    pub async fn run(
        mut self,
        mut signals: UnboundedReceiver<Signal>,
        reports: watch::Sender<Option<ScanReport>>,
        opens: UnboundedSender<PathBuf>,
    ) {
        let mut period = self
            .config_source
            .load()
            .map(|c| c.poll_interval())
            .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        let mut ticker = new_ticker(Instant::now(), period);

        loop {
            let flow = tokio::select! {
                _ = ticker.tick() => self.cycle_until_settled(&mut signals, &reports, &opens).await,
                signal = signals.recv() => match signal {
                    Some(Signal::Rescan) => {
                        debug!("manual rescan requested");
                        self.cycle_until_settled(&mut signals, &reports, &opens).await
                    }
                    Some(Signal::OpenRepository(path)) => {
                        forward_open(&opens, path);
                        ControlFlow::Continue(())
                    }
                    Some(Signal::Shutdown) | None => ControlFlow::Break(()),
                },
                Some(event) = self.watch_rx.recv() => {
                    self.handle_watch_event(event);
                    ControlFlow::Continue(())
                }
            };

            if flow.is_break() {
                info!("scheduler stopped");
                return;
            }

            if let Some(configured) = self.config.as_ref().map(Config::poll_interval) {
                if configured != period {
                    debug!(seconds = configured.as_secs(), "poll interval changed");
                    period = configured;
                    ticker = new_ticker(Instant::now() + period, period);
                }
            }
        }
    }

    /// Runs a cycle, then keeps running one more while rescans queued up meanwhile
    async fn cycle_until_settled(
        &mut self,
        signals: &mut UnboundedReceiver<Signal>,
        reports: &watch::Sender<Option<ScanReport>>,
        opens: &UnboundedSender<PathBuf>,
    ) -> ControlFlow<()> {
        loop {
            let report = self.run_cycle().await;
            reports.send_replace(Some(report));

            let mut rerun = false;
            while let Ok(signal) = signals.try_recv() {
                match signal {
                    Signal::Rescan => rerun = true,
                    Signal::OpenRepository(path) => forward_open(opens, path),
                    Signal::Shutdown => return ControlFlow::Break(()),
                }
            }
            if !rerun {
                return ControlFlow::Continue(());
            }
            debug!("running coalesced rescan");
        }
    }
}

fn new_ticker(start: Instant, period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn forward_open(opens: &UnboundedSender<PathBuf>, path: PathBuf) {
    debug!(path = %path.display(), "open requested");
    if opens.send(path).is_err() {
        debug!("no receiver for open requests");
    }
}

/// Presentation-side handle to a running scheduler
pub struct ScannerHandle {
    signals: UnboundedSender<Signal>,
    reports: watch::Receiver<Option<ScanReport>>,
    open_requests: UnboundedReceiver<PathBuf>,
    task: JoinHandle<()>,
}

impl ScannerHandle {
    pub fn rescan(&self) {
        let _ = self.signals.send(Signal::Rescan);
    }

    pub fn open_repository(&self, path: impl Into<PathBuf>) {
        let _ = self.signals.send(Signal::OpenRepository(path.into()));
    }

    /// Receiver observing every published report
    pub fn reports(&self) -> watch::Receiver<Option<ScanReport>> {
        self.reports.clone()
    }

    /// Latest published report, if any
    pub fn latest_report(&self) -> Option<ScanReport> {
        self.reports.borrow().clone()
    }

    /// Waits for the next report published after the last one seen here
    pub async fn next_report(&mut self) -> Option<ScanReport> {
        self.reports.changed().await.ok()?;
        self.reports.borrow_and_update().clone()
    }

    /// Waits for the next open request routed through the scheduler
    pub async fn next_open_request(&mut self) -> Option<PathBuf> {
        self.open_requests.recv().await
    }

    /// Stops the scheduler and waits for it to finish its current cycle
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.signals.send(Signal::Shutdown);
        self.task.await.context("scheduler task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::{Severity, ALL_CLEAN_MESSAGE};
    use crate::core::config::{ConfigError, StaticConfig};
    use crate::git::{GitOutput, RepoState};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Every repository is clean, except those whose name starts with "dirty"
    struct FakeGit;

    #[async_trait]
    impl VcsQuery for FakeGit {
        async fn short_status(&self, path: &Path) -> anyhow::Result<GitOutput> {
            let name = crate::utils::repo_name(path);
            if name.starts_with("dirty") {
                Ok(GitOutput::ok(" M file.txt"))
            } else {
                Ok(GitOutput::ok(""))
            }
        }

        async fn tracking_status(&self, _path: &Path) -> anyhow::Result<GitOutput> {
            Ok(GitOutput::ok("# branch.head main\n# branch.ab +0 -0"))
        }
    }

    /// Config source whose value can be changed between cycles, or made to fail
    struct SharedConfig {
        config: Mutex<Config>,
        failing: AtomicBool,
    }

    impl SharedConfig {
        fn new(config: Config) -> Arc<Self> {
            Arc::new(Self {
                config: Mutex::new(config),
                failing: AtomicBool::new(false),
            })
        }

        fn set(&self, config: Config) {
            *self.config.lock().unwrap() = config;
        }
    }

    impl ConfigSource for SharedConfig {
        fn load(&self) -> Result<Config, ConfigError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ConfigError::NoConfigDir);
            }
            Ok(self.config.lock().unwrap().clone().normalized())
        }
    }

    fn make_repo(path: &Path) {
        std::fs::create_dir_all(path.join(".git")).unwrap();
    }

    fn scheduler_for(config: Config) -> ScanScheduler {
        ScanScheduler::new(Arc::new(StaticConfig(config)), Arc::new(FakeGit)).without_watcher()
    }

    #[tokio::test]
    async fn test_first_cycle_discovers_and_checks() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("alpha"));
        make_repo(&temp.path().join("dirty-beta"));

        let mut scheduler = scheduler_for(Config::with_roots([temp.path()]));
        let report = scheduler.run_cycle().await;

        assert_eq!(report.statuses.len(), 2);
        assert_eq!(report.severity, Severity::Red);
        assert_eq!(report.statuses[0].state, RepoState::Clean);
        assert_eq!(report.statuses[1].state, RepoState::Dirty);
        assert_eq!(report.summary, "Dirty: 1. e.g. dirty-beta");
        assert_eq!(scheduler.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_no_rediscovery_before_interval() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("first"));

        let mut scheduler = scheduler_for(Config::with_roots([temp.path()]));
        scheduler.run_cycle().await;

        make_repo(&temp.path().join("second"));
        let report = scheduler.run_cycle().await;
        assert_eq!(report.statuses.len(), 1, "cache should not be re-walked yet");

        scheduler.force_discovery();
        let report = scheduler.run_cycle().await;
        assert_eq!(report.statuses.len(), 2);
    }

    #[tokio::test]
    async fn test_zero_interval_rediscovers_every_cycle() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("first"));

        let mut config = Config::with_roots([temp.path()]);
        config.discovery_interval_minutes = 0;
        let mut scheduler = scheduler_for(config);
        scheduler.run_cycle().await;

        std::fs::remove_dir_all(temp.path().join("first")).unwrap();
        make_repo(&temp.path().join("second"));
        let report = scheduler.run_cycle().await;

        assert_eq!(report.statuses.len(), 1);
        assert!(report.statuses[0].path.ends_with("second"));
    }

    #[tokio::test]
    async fn test_watch_events_fill_cache_between_discoveries() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("first"));

        let mut config = Config::with_roots([temp.path()]);
        config.ignore_patterns = vec!["scratch".to_string()];
        let mut scheduler = scheduler_for(config);
        scheduler.run_cycle().await;

        let events = scheduler.watch_sender();
        let fresh = temp.path().join("fresh");
        make_repo(&fresh);
        events.send(WatchEvent::MarkerCreated(fresh.clone())).unwrap();
        events
            .send(WatchEvent::MarkerCreated(temp.path().join("scratch")))
            .unwrap();

        let report = scheduler.run_cycle().await;
        assert_eq!(report.statuses.len(), 2);
        assert!(scheduler.cache().contains(&fresh));
        assert!(!scheduler.cache().contains(&temp.path().join("scratch")));
    }

    #[tokio::test]
    async fn test_changed_roots_force_discovery() {
        let one = TempDir::new().unwrap();
        let two = TempDir::new().unwrap();
        make_repo(&one.path().join("a"));
        make_repo(&two.path().join("b"));
        make_repo(&two.path().join("c"));

        let source = SharedConfig::new(Config::with_roots([one.path()]));
        let mut scheduler =
            ScanScheduler::new(source.clone(), Arc::new(FakeGit)).without_watcher();
        assert_eq!(scheduler.run_cycle().await.statuses.len(), 1);

        source.set(Config::with_roots([two.path()]));
        assert_eq!(scheduler.run_cycle().await.statuses.len(), 2);
    }

    #[tokio::test]
    async fn test_new_ignore_pattern_applies_without_rediscovery() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("keep"));
        make_repo(&temp.path().join("legacy"));

        let source = SharedConfig::new(Config::with_roots([temp.path()]));
        let mut scheduler =
            ScanScheduler::new(source.clone(), Arc::new(FakeGit)).without_watcher();
        assert_eq!(scheduler.run_cycle().await.statuses.len(), 2);

        let mut config = Config::with_roots([temp.path()]);
        config.ignore_patterns = vec!["legacy".to_string()];
        source.set(config);
        let report = scheduler.run_cycle().await;
        assert_eq!(report.statuses.len(), 1);
        assert!(report.statuses[0].path.ends_with("keep"));
    }

    #[tokio::test]
    async fn test_config_failure_publishes_global_error_and_recovers() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("repo"));

        let source = SharedConfig::new(Config::with_roots([temp.path()]));
        let mut scheduler =
            ScanScheduler::new(source.clone(), Arc::new(FakeGit)).without_watcher();

        source.failing.store(true, Ordering::SeqCst);
        let report = scheduler.run_cycle().await;
        assert_eq!(report.severity, Severity::GlobalError);
        assert!(report.summary.starts_with("Scan failed: loading configuration"));

        source.failing.store(false, Ordering::SeqCst);
        let report = scheduler.run_cycle().await;
        assert_eq!(report.severity, Severity::Green);
        assert_eq!(report.summary, ALL_CLEAN_MESSAGE);
    }

    #[tokio::test]
    async fn test_config_kept_from_last_successful_cycle() {
        let temp = TempDir::new().unwrap();
        let source = SharedConfig::new(Config::with_roots([temp.path()]));
        let mut scheduler =
            ScanScheduler::new(source.clone(), Arc::new(FakeGit)).without_watcher();
        assert!(scheduler.config().is_none());

        scheduler.run_cycle().await;
        let roots = scheduler.config().map(|c| c.roots.clone());
        assert_eq!(roots, Some(vec![temp.path().to_path_buf()]));

        source.failing.store(true, Ordering::SeqCst);
        scheduler.run_cycle().await;
        let roots = scheduler.config().map(|c| c.roots.clone());
        assert_eq!(roots, Some(vec![temp.path().to_path_buf()]));
    }

    #[tokio::test]
    async fn test_spawned_scheduler_handles_signals() {
        let temp = TempDir::new().unwrap();
        make_repo(&temp.path().join("repo"));

        let mut handle = scheduler_for(Config::with_roots([temp.path()])).spawn();

        let first = tokio::time::timeout(Duration::from_secs(10), handle.next_report())
            .await
            .expect("first report")
            .expect("scheduler alive");
        assert_eq!(first.severity, Severity::Green);

        handle.rescan();
        let second = tokio::time::timeout(Duration::from_secs(10), handle.next_report())
            .await
            .expect("rescan report")
            .expect("scheduler alive");
        assert!(second.completed_at >= first.completed_at);

        handle.open_repository(temp.path().join("repo"));
        let opened = tokio::time::timeout(Duration::from_secs(10), handle.next_open_request())
            .await
            .expect("open request");
        assert_eq!(opened, Some(temp.path().join("repo")));

        handle.shutdown().await.unwrap();
    }
}
