//! Dashboard session state.
//!
//! Settings are edited in a draft and only take effect on `apply`. Every
//! recalculation gets a fresh run id from one monotonic counter; a result
//! is committed only while its run is still the latest of its kind and no
//! input changed since it started. Last writer by generation wins, nothing
//! is interrupted.

use crate::run::{Commit, DistributionRun, MapRun, RunOutput};
use std::sync::Arc;
use surge_core::config::DistributionConfig;
use surge_core::{Config, Error, HexIndexer, MultiplierRule, Result, Snapshot, TimestampMs};
use surge_distribution::{DistributionReport, TimeRange};
use surge_ingestion::{Dataset, Upload};
use tracing::{debug, info, warn};

pub struct DashboardSession<H: HexIndexer> {
    indexer: Arc<H>,
    dataset: Arc<Dataset>,
    draft: Config,
    applied: Arc<Config>,
    generation: u64,
    pending_map: Option<u64>,
    pending_distribution: Option<u64>,
    map: Option<Snapshot>,
    distribution: Option<DistributionReport>,
}

impl<H: HexIndexer> DashboardSession<H> {
    /// Empty session with default settings.
    pub fn new(indexer: H) -> Self {
        let config = Config::default();
        Self {
            indexer: Arc::new(indexer),
            dataset: Arc::new(Dataset::default()),
            draft: config.clone(),
            applied: Arc::new(config),
            generation: 0,
            pending_map: None,
            pending_distribution: None,
            map: None,
            distribution: None,
        }
    }

    /// Session starting from `config`, which becomes both draft and applied.
    pub fn with_config(indexer: H, config: Config) -> Result<Self> {
        config.validate()?;
        let mut session = Self::new(indexer);
        session.draft = config.clone();
        session.applied = Arc::new(config);
        Ok(session)
    }

    pub fn draft(&self) -> &Config {
        &self.draft
    }

    /// Edit settings without affecting the applied configuration.
    pub fn draft_mut(&mut self) -> &mut Config {
        &mut self.draft
    }

    pub fn applied(&self) -> &Config {
        &self.applied
    }

    /// True when the draft differs from the applied configuration.
    pub fn is_dirty(&self) -> bool {
        self.draft != *self.applied
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Validate the draft and swap it in. Outstanding runs become stale and
    /// views committed under the old settings are dropped.
    ///
    /// Returns the new generation. An invalid draft leaves everything as it
    /// was.
    pub fn apply(&mut self) -> Result<u64> {
        self.draft.validate()?;
        self.applied = Arc::new(self.draft.clone());
        self.map = None;
        self.distribution = None;
        self.invalidate();
        info!(generation = self.generation, "settings applied");
        Ok(self.generation)
    }

    /// Change only the distribution settings, in both the draft and the
    /// applied configuration. Other pending draft edits stay pending, and
    /// the committed map stays valid.
    pub fn apply_distribution<F>(&mut self, update: F) -> Result<u64>
    where
        F: FnOnce(&mut DistributionConfig),
    {
        let mut applied = (*self.applied).clone();
        update(&mut applied.distribution);
        applied.validate()?;

        self.draft.distribution = applied.distribution.clone();
        self.applied = Arc::new(applied);
        self.distribution = None;
        self.pending_distribution = None;
        self.generation += 1;
        info!(generation = self.generation, "distribution settings applied");
        Ok(self.generation)
    }

    /// Replace the dataset. Committed views and outstanding runs are dropped.
    pub fn load_dataset(&mut self, dataset: Dataset) -> u64 {
        self.dataset = Arc::new(dataset);
        self.map = None;
        self.distribution = None;
        self.invalidate();
        info!(
            generation = self.generation,
            demand = self.dataset.demand().len(),
            supply = self.dataset.supply().len(),
            "dataset loaded"
        );
        self.generation
    }

    /// Load an upload. A non-empty multiplier table replaces the one in
    /// both the draft and the applied settings.
    pub fn load_upload(&mut self, upload: Upload) -> u64 {
        if !upload.multipliers.is_empty() {
            self.replace_multipliers(upload.multipliers);
        }
        self.load_dataset(upload.dataset)
    }

    fn replace_multipliers(&mut self, rules: Vec<MultiplierRule>) {
        self.draft.pricing.multipliers = rules.clone();
        let mut applied = (*self.applied).clone();
        applied.pricing.multipliers = rules;
        self.applied = Arc::new(applied);
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.pending_map = None;
        self.pending_distribution = None;
    }

    fn next_run_id(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Start a map recalculation at `ts_ms` and mark the map as loading.
    pub fn begin_map(&mut self, ts_ms: TimestampMs) -> MapRun<H> {
        let run_id = self.next_run_id();
        self.pending_map = Some(run_id);
        debug!(run_id, ts_ms, "map run started");
        MapRun {
            run_id,
            ts_ms,
            indexer: Arc::clone(&self.indexer),
            dataset: Arc::clone(&self.dataset),
            config: Arc::clone(&self.applied),
        }
    }

    /// Start a distribution recalculation and mark it as loading.
    pub fn begin_distribution(&mut self, range: Option<TimeRange>) -> DistributionRun<H> {
        let run_id = self.next_run_id();
        self.pending_distribution = Some(run_id);
        debug!(run_id, ?range, "distribution run started");
        DistributionRun {
            run_id,
            range,
            indexer: Arc::clone(&self.indexer),
            dataset: Arc::clone(&self.dataset),
            config: Arc::clone(&self.applied),
        }
    }

    pub fn commit_map(&mut self, output: RunOutput<Snapshot>) -> Commit {
        if self.pending_map != Some(output.run_id()) {
            debug!(run_id = output.run_id(), "discarding superseded map run");
            return Commit::Superseded;
        }
        self.pending_map = None;
        self.map = Some(output.into_value());
        Commit::Applied
    }

    pub fn commit_distribution(&mut self, output: RunOutput<DistributionReport>) -> Commit {
        if self.pending_distribution != Some(output.run_id()) {
            debug!(run_id = output.run_id(), "discarding superseded distribution run");
            return Commit::Superseded;
        }
        self.pending_distribution = None;
        self.distribution = Some(output.into_value());
        Commit::Applied
    }

    /// Latest committed map snapshot.
    pub fn map(&self) -> Option<&Snapshot> {
        self.map.as_ref()
    }

    /// Latest committed distribution.
    pub fn distribution(&self) -> Option<&DistributionReport> {
        self.distribution.as_ref()
    }

    pub fn map_loading(&self) -> bool {
        self.pending_map.is_some()
    }

    pub fn distribution_loading(&self) -> bool {
        self.pending_distribution.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.map_loading() || self.distribution_loading()
    }
}

impl<H: HexIndexer + 'static> DashboardSession<H> {
    /// Flip the loading flag, compute off the caller's thread, commit.
    pub async fn recalculate_map(&mut self, ts_ms: TimestampMs) -> Result<Commit> {
        let run = self.begin_map(ts_ms);
        let run_id = run.run_id();
        match tokio::task::spawn_blocking(move || run.execute()).await {
            Ok(output) => Ok(self.commit_map(output)),
            Err(e) => {
                if self.pending_map == Some(run_id) {
                    self.pending_map = None;
                }
                warn!(run_id, error = %e, "map run failed");
                Err(Error::Other(format!("map run {} failed: {}", run_id, e)))
            }
        }
    }

    pub async fn recalculate_distribution(&mut self, range: Option<TimeRange>) -> Result<Commit> {
        let run = self.begin_distribution(range);
        let run_id = run.run_id();
        match tokio::task::spawn_blocking(move || run.execute()).await {
            Ok(output) => Ok(self.commit_distribution(output)),
            Err(e) => {
                if self.pending_distribution == Some(run_id) {
                    self.pending_distribution = None;
                }
                warn!(run_id, error = %e, "distribution run failed");
                Err(Error::Other(format!(
                    "distribution run {} failed: {}",
                    run_id, e
                )))
            }
        }
    }

    /// Apply the draft, then recompute the map at `ts_ms` and the
    /// distribution over `range` once under the new settings.
    pub async fn apply_and_recalculate(
        &mut self,
        ts_ms: TimestampMs,
        range: Option<TimeRange>,
    ) -> Result<(Commit, Commit)> {
        self.apply()?;
        let map = self.recalculate_map(ts_ms).await?;
        let distribution = self.recalculate_distribution(range).await?;
        Ok((map, distribution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surge_core::{DemandEvent, H3Indexer, SupplyRecord, ValueMode, MINUTE_MS};

    const T0: i64 = 1_700_000_000_000;

    fn make_event(ts_ms: i64) -> DemandEvent {
        DemandEvent {
            ts_ms,
            lat: 40.4168,
            lng: -3.7038,
        }
    }

    fn make_supply(start_ms: i64, end_ms: i64) -> SupplyRecord {
        SupplyRecord {
            start_ms,
            end_ms,
            lat: 40.4168,
            lng: -3.7038,
        }
    }

    fn make_session() -> DashboardSession<H3Indexer> {
        let mut session = DashboardSession::new(H3Indexer::new());
        session.load_dataset(Dataset::new(
            vec![make_event(T0 - 20 * MINUTE_MS), make_event(T0)],
            vec![make_supply(T0 - 60 * MINUTE_MS, T0 + 60 * MINUTE_MS)],
        ));
        session
    }

    #[test]
    fn test_draft_does_not_leak_until_apply() {
        let mut session = make_session();
        session.draft_mut().window.lookback_minutes = 5;

        assert!(session.is_dirty());
        assert_eq!(session.applied().window.lookback_minutes, 30);

        let before = session.generation();
        let generation = session.apply().unwrap();
        assert!(generation > before);
        assert!(!session.is_dirty());
        assert_eq!(session.applied().window.lookback_minutes, 5);
    }

    #[test]
    fn test_invalid_draft_rejected() {
        let mut session = make_session();
        session.draft_mut().grid.resolution = 16;
        let before = session.generation();

        assert!(session.apply().is_err());
        assert_eq!(session.generation(), before);
        assert_eq!(session.applied().grid.resolution, 8);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_with_config_validates() {
        let mut config = Config::default();
        config.distribution.step_minutes = 0;
        assert!(DashboardSession::with_config(H3Indexer::new(), config).is_err());
    }

    #[test]
    fn test_map_run_commits() {
        let mut session = make_session();
        let run = session.begin_map(T0);
        assert!(session.map_loading());
        assert!(!session.distribution_loading());

        let output = run.execute();
        assert_eq!(session.commit_map(output), Commit::Applied);
        assert!(!session.is_loading());

        let map = session.map().unwrap();
        assert_eq!(map.mode, ValueMode::Coefficient);
        let active: Vec<_> = map.active_cells().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].demand_count, 2);
        assert_eq!(map.halo_cells().count(), 6);
    }

    #[test]
    fn test_newer_run_supersedes_older() {
        let mut session = make_session();
        let first = session.begin_map(T0);
        let second = session.begin_map(T0 + MINUTE_MS);

        assert_eq!(session.commit_map(first.execute()), Commit::Superseded);
        assert!(session.map().is_none());
        assert!(session.map_loading());

        assert_eq!(session.commit_map(second.execute()), Commit::Applied);
        assert_eq!(session.map().unwrap().ts_ms, T0 + MINUTE_MS);
    }

    #[test]
    fn test_apply_supersedes_outstanding_runs() {
        let mut session = make_session();
        let map_run = session.begin_map(T0);
        let dist_run = session.begin_distribution(None);

        session.draft_mut().ratio.policy = surge_core::RatioPolicy::Log;
        session.apply().unwrap();
        assert!(!session.is_loading());

        assert_eq!(session.commit_map(map_run.execute()), Commit::Superseded);
        assert_eq!(session.commit_distribution(dist_run.execute()), Commit::Superseded);
        assert!(session.map().is_none());
        assert!(session.distribution().is_none());
    }

    #[test]
    fn test_map_and_distribution_runs_independent() {
        let mut session = make_session();
        let map_run = session.begin_map(T0);
        let dist_run = session.begin_distribution(None);

        assert_eq!(session.commit_distribution(dist_run.execute()), Commit::Applied);
        assert_eq!(session.commit_map(map_run.execute()), Commit::Applied);
    }

    #[test]
    fn test_run_keeps_inputs_it_started_with() {
        let mut session = make_session();
        let run = session.begin_map(T0);

        // Shrinking the window after the run started must not affect it
        session.draft_mut().window.lookback_minutes = 5;
        session.apply().unwrap();

        let snapshot = run.execute().into_value();
        assert_eq!(snapshot.active_cells().next().unwrap().demand_count, 2);

        let rerun = session.begin_map(T0).execute().into_value();
        assert_eq!(rerun.active_cells().next().unwrap().demand_count, 1);
    }

    #[test]
    fn test_load_dataset_clears_results() {
        let mut session = make_session();
        let run = session.begin_map(T0);
        session.commit_map(run.execute());
        assert!(session.map().is_some());

        let stale = session.begin_map(T0);
        session.load_dataset(Dataset::default());
        assert!(session.map().is_none());
        assert_eq!(session.commit_map(stale.execute()), Commit::Superseded);

        let run = session.begin_map(T0);
        session.commit_map(run.execute());
        assert!(session.map().unwrap().is_empty());
        assert_eq!(session.map().unwrap().mode, ValueMode::Empty);
    }

    #[test]
    fn test_load_upload_installs_multipliers() {
        let mut session = DashboardSession::new(H3Indexer::new());
        session.draft_mut().window.lookback_minutes = 10;

        let upload = surge_ingestion::from_json_str(
            r#"{
                "demand": [
                    {"timestamp": "2024-01-01T00:00:00Z", "latitude": 40.4168, "longitude": -3.7038}
                ],
                "supply": [],
                "multipliers": [{"min_ratio": 0.0, "multiplier": 1.2}]
            }"#,
        )
        .unwrap();
        session.load_upload(upload);

        assert_eq!(session.applied().pricing.multipliers, vec![MultiplierRule::new(0.0, 1.2)]);
        assert_eq!(session.draft().pricing.multipliers, vec![MultiplierRule::new(0.0, 1.2)]);
        // The pending lookback edit survives
        assert!(session.is_dirty());
        assert_eq!(session.dataset().demand().len(), 1);
    }

    #[test]
    fn test_apply_drops_views_from_old_settings() {
        let mut session = make_session();
        let run = session.begin_map(T0);
        session.commit_map(run.execute());
        let run = session.begin_distribution(None);
        session.commit_distribution(run.execute());
        assert_eq!(session.map().unwrap().active_cells().next().unwrap().demand_count, 2);

        session.draft_mut().window.lookback_minutes = 5;
        session.apply().unwrap();

        // Nothing computed under the 30-minute window survives
        assert!(session.map().is_none());
        assert!(session.distribution().is_none());

        let run = session.begin_map(T0);
        session.commit_map(run.execute());
        assert_eq!(session.map().unwrap().active_cells().next().unwrap().demand_count, 1);
    }

    #[test]
    fn test_apply_distribution_leaves_other_edits_pending() {
        let mut session = make_session();
        let run = session.begin_map(T0);
        session.commit_map(run.execute());

        session.draft_mut().grid.resolution = 6;
        session
            .apply_distribution(|d| {
                d.step_minutes = 5;
                d.bin_count = 10;
            })
            .unwrap();

        assert_eq!(session.applied().distribution.step_minutes, 5);
        assert_eq!(session.draft().distribution.bin_count, 10);
        assert_eq!(session.applied().grid.resolution, 8);
        assert!(session.is_dirty());
        assert!(session.map().is_some());
    }

    #[test]
    fn test_apply_distribution_rejects_invalid_section() {
        let mut session = make_session();
        let before = session.generation();

        assert!(session.apply_distribution(|d| d.step_minutes = 0).is_err());
        assert_eq!(session.applied().distribution.step_minutes, 15);
        assert_eq!(session.draft().distribution.step_minutes, 15);
        assert_eq!(session.generation(), before);
    }

    #[tokio::test]
    async fn test_apply_and_recalculate() {
        let mut session = make_session();
        session.recalculate_map(T0).await.unwrap();

        session.draft_mut().window.lookback_minutes = 5;
        let (map, distribution) = session.apply_and_recalculate(T0, None).await.unwrap();

        assert_eq!((map, distribution), (Commit::Applied, Commit::Applied));
        assert!(!session.is_loading());
        assert_eq!(session.map().unwrap().active_cells().next().unwrap().demand_count, 1);
        assert!(session.distribution().is_some());
    }

    #[tokio::test]
    async fn test_recalculate_map() {
        let mut session = make_session();
        let commit = session.recalculate_map(T0).await.unwrap();

        assert_eq!(commit, Commit::Applied);
        assert!(!session.is_loading());
        assert_eq!(session.map().unwrap().active_cells().count(), 1);
    }

    #[tokio::test]
    async fn test_recalculate_distribution() {
        let mut session = make_session();
        let range = TimeRange::new(T0 - 20 * MINUTE_MS, T0);
        let commit = session.recalculate_distribution(Some(range)).await.unwrap();

        assert_eq!(commit, Commit::Applied);
        let report = session.distribution().unwrap();
        // T0-20, T0-5, T0
        assert_eq!(report.instants, 3);
        assert_eq!(report.histogram.total_count(), 3);
    }
}
