//! The polling loop.
//!
//! Each iteration waits, asks the [`VersionSource`] for the latest version,
//! and, when it differs from the last one notified, tries to fetch, format
//! and deliver its changelog. The wait oscillates between the poll interval
//! and the shorter changelog retry interval while a new version's changelog
//! is still missing.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::WatchConfig;
use crate::extract::ChangelogSource;
use crate::format::build_message;
use crate::manifest::VersionSource;
use crate::notify::Notifier;
use crate::store::VersionStore;
use crate::types::VersionDescriptor;

/// What a single poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The latest version is the one already notified.
    Unchanged,
    /// A new version exists but its changelog is not published yet.
    PendingChangelog,
    /// The changelog retry budget ran out; the version stays unseen.
    GaveUp,
    /// A notification was sent and the version recorded.
    Delivered,
    /// The manifest could not be fetched or understood.
    Unavailable,
}

/// Mutable loop context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchState {
    /// Last version a notification was sent for.
    pub last_seen: Option<VersionDescriptor>,
    /// Delay before the next poll.
    pub wait: Duration,
    /// Short waits left for the current pending changelog.
    pub changelog_retries: u32,
    /// Completed polls.
    pub iterations: u64,
}

/// Interval and budget settings the loop runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub poll_interval: Duration,
    pub retry_interval: Duration,
    pub changelog_retries: u32,
    pub max_message_len: usize,
}

impl From<&WatchConfig> for Schedule {
    fn from(config: &WatchConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            retry_interval: config.retry_interval,
            changelog_retries: config.changelog_retries,
            max_message_len: config.max_message_len,
        }
    }
}

/// Version watcher wiring a version source, changelog source, notifier and
/// store together.
pub struct Watcher<V, C, N, S> {
    versions: V,
    changelogs: C,
    notifier: N,
    store: S,
    schedule: Schedule,
    state: WatchState,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<V, C, N, S> Watcher<V, C, N, S>
where
    V: VersionSource,
    C: ChangelogSource,
    N: Notifier,
    S: VersionStore,
{
    /// Creates a watcher, loading the last-seen version from `store`.
    ///
    /// The first poll happens without waiting.
    pub fn new(versions: V, changelogs: C, notifier: N, store: S, schedule: Schedule) -> Self {
        let last_seen = store.load();
        match &last_seen {
            Some(version) => info!(id = %version.id, "Last notified version"),
            None => info!("No version notified yet"),
        }

        Self {
            versions,
            changelogs,
            notifier,
            store,
            schedule,
            state: WatchState {
                last_seen,
                wait: Duration::ZERO,
                changelog_retries: schedule.changelog_retries,
                iterations: 0,
            },
            shutdown: None,
        }
    }

    /// Stops the loop at its next wait once `shutdown` becomes `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    /// Polls forever, or until shutdown is signalled.
    pub async fn run(&mut self) {
        self.run_until(|_| false).await;
    }

    /// Polls until `done` returns true or shutdown is signalled.
    ///
    /// `done` is checked at the top of every iteration, before waiting.
    pub async fn run_until<F>(&mut self, mut done: F)
    where
        F: FnMut(&WatchState) -> bool,
    {
        loop {
            if done(&self.state) {
                debug!(iterations = self.state.iterations, "Exit condition met");
                break;
            }

            if !self.pause().await {
                info!("Shutdown requested, stopping watcher");
                break;
            }

            self.poll_once().await;
        }
    }

    /// Performs one poll without waiting first.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let outcome = self.transition().await;
        self.state.iterations += 1;
        debug!(?outcome, wait_secs = self.state.wait.as_secs(), "Poll finished");
        outcome
    }

    async fn transition(&mut self) -> PollOutcome {
        let current = match self.versions.latest_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "Version manifest unavailable");
                self.state.wait = self.schedule.poll_interval;
                return PollOutcome::Unavailable;
            }
        };

        if self
            .state
            .last_seen
            .as_ref()
            .is_some_and(|seen| seen.same_version(&current))
        {
            self.state.wait = self.schedule.poll_interval;
            return PollOutcome::Unchanged;
        }

        info!("New Minecraft version {} available", current.id);

        let changelog = self.changelogs.fetch_changelog(&current).await;

        if changelog.is_empty() {
            if self.state.changelog_retries > 0 {
                info!("Changelog for {} is not available yet", current.id);
                self.state.changelog_retries -= 1;
                self.state.wait = self.schedule.retry_interval;
                return PollOutcome::PendingChangelog;
            }

            warn!("Changelog for {} is still missing, giving up until the next poll", current.id);
            self.state.changelog_retries = self.schedule.changelog_retries;
            self.state.wait = self.schedule.poll_interval;
            return PollOutcome::GaveUp;
        }

        let message = build_message(&current.changelog_url, &changelog, self.schedule.max_message_len);
        match self.notifier.deliver(&message).await {
            Ok(()) => info!(id = %current.id, "Message sent"),
            Err(e) => error!(id = %current.id, error = %e, "Failed to deliver message"),
        }

        if let Err(e) = self.store.save(&current) {
            error!(id = %current.id, error = %e, "Failed to persist version");
        }

        self.state.last_seen = Some(current);
        self.state.changelog_retries = self.schedule.changelog_retries;
        self.state.wait = self.schedule.poll_interval;
        PollOutcome::Delivered
    }

    /// Sleeps for the current wait. Returns false if shutdown was signalled.
    async fn pause(&mut self) -> bool {
        let wait = self.state.wait;
        let Some(shutdown) = self.shutdown.as_mut() else {
            tokio::time::sleep(wait).await;
            return true;
        };

        if *shutdown.borrow_and_update() {
            return false;
        }

        let sleep = tokio::time::sleep(wait);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return true,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone; nobody can ask us to stop any more.
                        (&mut sleep).await;
                        return true;
                    }
                    if *shutdown.borrow_and_update() {
                        return false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HOUR, TEN_MINUTES};
    use crate::error::{FetchError, NotifyError, StoreError, WatchError};
    use crate::types::{Changelog, Feature, VersionKind};
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn version(id: &str) -> VersionDescriptor {
        VersionDescriptor {
            kind: VersionKind::Snapshot,
            id: id.to_string(),
            release_time: Utc.with_ymd_and_hms(2020, 11, 11, 15, 30, 32).unwrap(),
            changelog_url: format!("https://www.minecraft.net/en-us/article/minecraft-snapshot-{id}"),
        }
    }

    fn changelog() -> Changelog {
        vec![Feature::with_items("Fixed bugs in 20w46a", ["MC-2490 - TNT animation ends at 80 ticks"])]
    }

    fn schedule() -> Schedule {
        Schedule::from(&WatchConfig::default())
    }

    /// Returns the same version forever, or fails when `None`.
    struct FixedVersion(Option<VersionDescriptor>);

    impl VersionSource for FixedVersion {
        async fn latest_version(&self) -> Result<VersionDescriptor, WatchError> {
            self.0.clone().ok_or(WatchError::Fetch(FetchError::Exhausted {
                url: "manifest".to_string(),
                tries: 3,
            }))
        }
    }

    /// Hands out queued changelogs, then empty ones; counts requests.
    #[derive(Clone, Default)]
    struct QueuedChangelogs {
        queue: Arc<Mutex<VecDeque<Changelog>>>,
        requests: Arc<Mutex<u32>>,
    }

    impl QueuedChangelogs {
        fn with(changelogs: Vec<Changelog>) -> Self {
            Self {
                queue: Arc::new(Mutex::new(changelogs.into())),
                requests: Arc::default(),
            }
        }

        fn requests(&self) -> u32 {
            *self.requests.lock().unwrap()
        }
    }

    impl ChangelogSource for QueuedChangelogs {
        async fn fetch_changelog(&self, _version: &VersionDescriptor) -> Changelog {
            *self.requests.lock().unwrap() += 1;
            self.queue.lock().unwrap().pop_front().unwrap_or_default()
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Notifier for RecordingNotifier {
        async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.fail {
                return Err(NotifyError::Rejected {
                    status: 400,
                    body: "Bad Request".to_string(),
                });
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        saved: Arc<Mutex<Option<VersionDescriptor>>>,
    }

    impl VersionStore for MemoryStore {
        fn load(&self) -> Option<VersionDescriptor> {
            self.saved.lock().unwrap().clone()
        }

        fn save(&self, version: &VersionDescriptor) -> Result<(), StoreError> {
            *self.saved.lock().unwrap() = Some(version.clone());
            Ok(())
        }
    }

    fn seeded_store(id: &str) -> MemoryStore {
        let store = MemoryStore::default();
        store.save(&version(id)).unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_polls_wait_full_interval_without_fetching_changelog() {
        let changelogs = QueuedChangelogs::default();
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            changelogs.clone(),
            RecordingNotifier::default(),
            seeded_store("20w46a"),
            schedule(),
        );

        let mut waits = Vec::new();
        watcher
            .run_until(|state| {
                waits.push(state.wait);
                state.iterations == 5
            })
            .await;

        assert_eq!(waits, vec![Duration::ZERO, HOUR, HOUR, HOUR, HOUR, HOUR]);
        assert_eq!(changelogs.requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_changelog_retries_then_delivers() {
        let changelogs = QueuedChangelogs::with(vec![vec![], vec![], vec![], changelog()]);
        let notifier = RecordingNotifier::default();
        let store = seeded_store("20w45a");

        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            changelogs.clone(),
            notifier.clone(),
            store.clone(),
            schedule(),
        );

        let mut waits = Vec::new();
        let mut seen = Vec::new();
        watcher
            .run_until(|state| {
                waits.push(state.wait);
                seen.push(state.last_seen.as_ref().map(|v| v.id.clone()));
                state.iterations == 4
            })
            .await;

        assert_eq!(
            waits,
            vec![Duration::ZERO, TEN_MINUTES, TEN_MINUTES, TEN_MINUTES, HOUR]
        );
        let old = Some("20w45a".to_string());
        let new = Some("20w46a".to_string());
        assert_eq!(seen, vec![old.clone(), old.clone(), old.clone(), old, new]);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
        assert_eq!(store.load().map(|v| v.id), Some("20w46a".to_string()));
        assert_eq!(watcher.state().changelog_retries, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_give_up_without_persisting() {
        let changelogs = QueuedChangelogs::default();
        let store = seeded_store("20w45a");

        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            changelogs.clone(),
            RecordingNotifier::default(),
            store.clone(),
            schedule(),
        );

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(watcher.poll_once().await);
        }

        assert_eq!(
            outcomes,
            vec![
                PollOutcome::PendingChangelog,
                PollOutcome::PendingChangelog,
                PollOutcome::PendingChangelog,
                PollOutcome::GaveUp,
                PollOutcome::PendingChangelog,
            ]
        );
        assert_eq!(store.load().map(|v| v.id), Some("20w45a".to_string()));
        assert_eq!(changelogs.requests(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn gave_up_waits_full_interval() {
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            QueuedChangelogs::default(),
            RecordingNotifier::default(),
            MemoryStore::default(),
            schedule(),
        );

        for _ in 0..3 {
            watcher.poll_once().await;
        }
        assert_eq!(watcher.state().wait, TEN_MINUTES);
        assert_eq!(watcher.poll_once().await, PollOutcome::GaveUp);
        assert_eq!(watcher.state().wait, HOUR);
        assert_eq!(watcher.state().changelog_retries, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_delivers_and_persists() {
        let notifier = RecordingNotifier::default();
        let store = MemoryStore::default();
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            QueuedChangelogs::with(vec![changelog()]),
            notifier.clone(),
            store.clone(),
            schedule(),
        );

        assert_eq!(watcher.poll_once().await, PollOutcome::Delivered);
        assert_eq!(watcher.poll_once().await, PollOutcome::Unchanged);

        let sent = notifier.sent.lock().unwrap();
        assert!(sent[0].starts_with(
            "<a href=\"https://www.minecraft.net/en-us/article/minecraft-snapshot-20w46a\">"
        ));
        assert!(sent[0].contains("MC-2490"));
        assert_eq!(store.load(), Some(version("20w46a")));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_delivery_still_advances() {
        let store = MemoryStore::default();
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            QueuedChangelogs::with(vec![changelog()]),
            RecordingNotifier {
                fail: true,
                ..Default::default()
            },
            store.clone(),
            schedule(),
        );

        assert_eq!(watcher.poll_once().await, PollOutcome::Delivered);
        assert_eq!(store.load().map(|v| v.id), Some("20w46a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_manifest_waits_full_interval() {
        let changelogs = QueuedChangelogs::default();
        let mut watcher = Watcher::new(
            FixedVersion(None),
            changelogs.clone(),
            RecordingNotifier::default(),
            MemoryStore::default(),
            schedule(),
        );

        assert_eq!(watcher.poll_once().await, PollOutcome::Unavailable);
        assert_eq!(watcher.state().wait, HOUR);
        assert_eq!(watcher.state().iterations, 1);
        assert_eq!(changelogs.requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_loop_at_wait_point() {
        let (tx, rx) = watch::channel(false);
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            QueuedChangelogs::default(),
            RecordingNotifier::default(),
            seeded_store("20w46a"),
            schedule(),
        )
        .with_shutdown(rx);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90 * 60)).await;
            tx.send(true).unwrap();
            tx
        });

        watcher.run().await;

        // First poll is immediate, the second after an hour, then the signal
        // arrives half way through the next wait.
        assert_eq!(watcher.state().iterations, 2);
        drop(stopper.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_start_skips_polling() {
        let (tx, rx) = watch::channel(true);
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            QueuedChangelogs::default(),
            RecordingNotifier::default(),
            MemoryStore::default(),
            schedule(),
        )
        .with_shutdown(rx);

        watcher.run().await;
        assert_eq!(watcher.state().iterations, 0);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn logs_state_transitions() {
        let mut watcher = Watcher::new(
            FixedVersion(Some(version("20w46a"))),
            QueuedChangelogs::with(vec![vec![], changelog()]),
            RecordingNotifier::default(),
            MemoryStore::default(),
            schedule(),
        );

        watcher.poll_once().await;
        watcher.poll_once().await;

        assert!(logs_contain("New Minecraft version 20w46a available"));
        assert!(logs_contain("Changelog for 20w46a is not available yet"));
        assert!(logs_contain("Message sent"));
    }
}
