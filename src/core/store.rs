use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use shakmaty::{Chess, Position};
use tracing::{debug, error, info, warn};
use crate::core::config::{OptionChange, StoreConfig};
use crate::core::error::Result;
use crate::core::stats::StoreStats;
use crate::core::types::{
    Fingerprint, LearningMode, Move, PersistedLearningMove, IMPORT_DEPTH, IMPORT_VALUE, MAX_PLY, VALUE_INFINITE,
};
use crate::index::position_index::{ChainNode, PositionIndex};
use crate::scoring::quality::{quality, Evaluator};
use crate::storage::experience_file::{self, LoadReport, SaveReport};
use crate::storage::file_lock::FileLock;
use crate::storage::record::{Format, Record};

type LoadResult = Result<(PositionIndex, LoadReport)>;

/// Process-wide experience store, shared between the search threads and the
/// option layer as `Arc<ExperienceStore>`.
///
/// Probes read an immutable `Arc<PositionIndex>` snapshot. Submitted facts
/// collect in a separate pending buffer and only reach the index on persist.
pub struct ExperienceStore {
    config: RwLock<StoreConfig>,
    paused: AtomicBool,
    dirty: AtomicBool,
    loading: AtomicBool,
    index: RwLock<Arc<PositionIndex>>,
    pending: Mutex<Vec<PersistedLearningMove>>,
    loader: Mutex<Option<JoinHandle<LoadResult>>>,
    /// Serializes persists so each one starts from the index the last one published
    persisting: Mutex<()>,
    history: Mutex<History>,
}

#[derive(Default)]
struct History {
    last_load: Option<DateTime<Utc>>,
    last_load_report: Option<LoadReport>,
    last_persist: Option<DateTime<Utc>>,
    last_persist_report: Option<SaveReport>,
}

/// Candidate moves of one position, pinned to the index snapshot they came from
#[derive(Clone)]
pub struct ExperienceView {
    index: Arc<PositionIndex>,
    key: Fingerprint,
}

impl ExperienceView {
    pub fn key(&self) -> Fingerprint {
        self.key
    }

    pub fn head(&self) -> Option<&ChainNode> {
        self.index.head(self.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.index.find(self.key).into_iter().flatten()
    }

    pub fn best(&self) -> Option<&Record> {
        self.index.best(self.key)
    }

    pub fn find(&self, mv: Move) -> Option<&Record> {
        self.index.find_move(self.key, mv)
    }

    pub fn find_with_min_depth(&self, mv: Move, min_depth: i32) -> Option<&Record> {
        self.index.find_move_with_min_depth(self.key, mv, min_depth)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head().is_none()
    }
}

impl Default for ExperienceStore {
    fn default() -> Self {
        ExperienceStore {
            config: RwLock::new(StoreConfig::default()),
            paused: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            loading: AtomicBool::new(false),
            index: RwLock::new(Arc::new(PositionIndex::new())),
            pending: Mutex::new(Vec::new()),
            loader: Mutex::new(None),
            persisting: Mutex::new(()),
            history: Mutex::new(History::default()),
        }
    }
}

impl ExperienceStore {
    pub fn new() -> Self {
        ExperienceStore::default()
    }

    /// Creates a store and starts loading `config.path` in the background.
    pub fn with_config(config: StoreConfig) -> Result<Arc<Self>> {
        let store = Arc::new(ExperienceStore::new());
        store.initialize(config)?;
        Ok(store)
    }

    /// (Re)configures the store. Facts pending under the previous configuration
    /// are persisted first; then the index is dropped and, when learning is
    /// enabled, reloaded from `config.path` on a background thread.
    pub fn initialize(&self, config: StoreConfig) -> Result<()> {
        self.wait_for_loading_finished();

        if self.dirty.load(Ordering::Acquire) {
            if let Err(e) = self.persist() {
                warn!(error = %e, "could not persist pending experience before reinitializing");
            }
        }

        *self.index.write() = Arc::new(PositionIndex::new());
        self.pending.lock().clear();
        self.dirty.store(false, Ordering::Release);

        let enabled = config.enabled();
        let path = config.path.clone();
        let concurrent = config.concurrent;
        info!(
            mode = %config.mode,
            read_only = config.read_only,
            concurrent,
            path = %path.display(),
            "experience store initialized"
        );
        *self.config.write() = config;

        if !enabled {
            return Ok(());
        }

        let mut loader = self.loader.lock();
        self.loading.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name("experience-loader".to_string())
            .spawn(move || -> LoadResult {
                let _lock = if concurrent {
                    match FileLock::acquire(&path, false) {
                        Ok(lock) => Some(lock),
                        // no writer has created the lock file yet
                        Err(e) if e.is_not_found() => None,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "loading experience without a shared lock");
                            None
                        }
                    }
                } else {
                    None
                };
                experience_file::load(&path)
            });
        match spawned {
            Ok(handle) => {
                *loader = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.loading.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Load barrier: returns once the background load (if any) has been
    /// published. A failed load leaves the store empty but enabled.
    pub fn wait_for_loading_finished(&self) {
        if !self.loading.load(Ordering::Acquire) {
            return;
        }

        // Held until the index is published so concurrent waiters block too.
        let mut loader = self.loader.lock();
        let Some(handle) = loader.take() else {
            return;
        };

        let path = self.config.read().path.clone();
        let index = match handle.join() {
            Ok(Ok((index, report))) => {
                info!(
                    path = %path.display(),
                    positions = index.positions(),
                    records = index.len(),
                    duplicates = report.merged,
                    "experience loaded"
                );
                let mut history = self.history.lock();
                history.last_load = Some(Utc::now());
                history.last_load_report = Some(report);
                index
            }
            Ok(Err(e)) if e.is_not_found() => {
                info!(path = %path.display(), "no experience file yet, starting empty");
                PositionIndex::new()
            }
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "failed to load experience, starting empty");
                PositionIndex::new()
            }
            Err(_) => {
                error!(path = %path.display(), "experience loader panicked, starting empty");
                PositionIndex::new()
            }
        };

        *self.index.write() = Arc::new(index);
        self.loading.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.config.read().enabled()
    }

    pub fn mode(&self) -> LearningMode {
        self.config.read().mode
    }

    pub fn is_read_only(&self) -> bool {
        self.config.read().read_only
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    pub fn config(&self) -> StoreConfig {
        self.config.read().clone()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        debug!("learning paused");
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        debug!("learning resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Applies one option-layer setting; mode and file changes reinitialize.
    pub fn set_option(&self, name: &str, value: &str) -> Result<()> {
        let mut config = self.config.read().clone();
        match config.apply_option(name, value)? {
            OptionChange::Reinitialize => self.initialize(config),
            OptionChange::Flags => {
                debug!(option = name, value, "experience option changed");
                *self.config.write() = config;
                Ok(())
            }
        }
    }

    /// Current index snapshot; stays valid after later reloads.
    pub fn snapshot(&self) -> Arc<PositionIndex> {
        self.wait_for_loading_finished();
        self.index.read().clone()
    }

    pub fn probe(&self, key: Fingerprint) -> Option<ExperienceView> {
        if self.is_paused() || !self.is_enabled() {
            return None;
        }

        let index = self.snapshot();
        index.head(key)?;
        Some(ExperienceView { index, key })
    }

    pub fn probe_move(&self, key: Fingerprint, mv: Move) -> Option<Record> {
        self.probe(key)?.find(mv).copied()
    }

    pub fn submit(&self, key: Fingerprint, mv: Move, value: i32, depth: i32) -> bool {
        self.submit_learning(PersistedLearningMove::new(key, mv, value, depth))
    }

    pub fn submit_with_performance(&self, key: Fingerprint, mv: Move, value: i32, depth: i32, performance: i32) -> bool {
        let mut fact = PersistedLearningMove::new(key, mv, value, depth);
        fact.learning_move.performance = performance;
        self.submit_learning(fact)
    }

    /// Queues a fact for the next persist. Dropped silently while disabled,
    /// paused or read-only. Whether book or forced moves are submitted at all
    /// is up to the caller.
    pub fn submit_learning(&self, fact: PersistedLearningMove) -> bool {
        if self.is_paused() {
            return false;
        }
        {
            let config = self.config.read();
            if !config.enabled() || config.read_only {
                return false;
            }
        }
        if fact.learning_move.mv.is_none() {
            return false;
        }

        let mut fact = fact;
        let lm = &mut fact.learning_move;
        lm.depth = lm.depth.clamp(0, MAX_PLY);
        lm.score = lm.score.clamp(-VALUE_INFINITE, VALUE_INFINITE);
        lm.performance = lm.performance.clamp(0, 100);

        self.pending.lock().push(fact);
        self.dirty.store(true, Ordering::Release);
        true
    }

    /// Records every move of a played game line with placeholder value and
    /// depth. Self-play mode learns from its own searches only.
    pub fn observe_game_line(&self, start: &Chess, moves: &[shakmaty::Move]) -> usize {
        if self.mode() != LearningMode::Standard {
            return 0;
        }

        let mut pos = start.clone();
        let mut recorded = 0;
        for m in moves {
            if !pos.is_legal(m) {
                break;
            }
            if self.submit(Fingerprint::of(&pos), Move::from(m), IMPORT_VALUE, IMPORT_DEPTH) {
                recorded += 1;
            }
            pos.play_unchecked(m);
        }
        recorded
    }

    fn fold(fact: &PersistedLearningMove, mode: LearningMode) -> Record {
        let lm = &fact.learning_move;
        let value = match mode {
            LearningMode::SelfPlay => (lm.score as i64 * lm.performance as i64 / 100) as i32,
            _ => lm.score,
        };
        Record::clamped(fact.key, lm.mv, value, lm.depth)
    }

    /// Folds pending facts into the experience file. Returns `None` when there
    /// was nothing to do (read-only, disabled or clean).
    ///
    /// With `concurrent` set the file is re-read under an exclusive lock and
    /// merged with the pending facts, so siblings' writes survive.
    pub fn persist(&self) -> Result<Option<SaveReport>> {
        let config = self.config.read().clone();
        if config.read_only || !config.enabled() || !self.is_dirty() {
            return Ok(None);
        }

        self.wait_for_loading_finished();

        let _persisting = self.persisting.lock();
        if !self.is_dirty() {
            return Ok(None);
        }
        let pending = mem::take(&mut *self.pending.lock());
        match self.write_through(&config, &pending) {
            Ok(report) => {
                let queue = self.pending.lock();
                self.dirty.store(!queue.is_empty(), Ordering::Release);
                drop(queue);

                info!(
                    path = %config.path.display(),
                    folded = pending.len(),
                    records = report.records,
                    positions = report.positions,
                    "experience persisted"
                );
                let mut history = self.history.lock();
                history.last_persist = Some(Utc::now());
                history.last_persist_report = Some(report.clone());
                Ok(Some(report))
            }
            Err(e) => {
                let mut queue = self.pending.lock();
                let newer = mem::replace(&mut *queue, pending);
                queue.extend(newer);
                Err(e)
            }
        }
    }

    fn write_through(&self, config: &StoreConfig, pending: &[PersistedLearningMove]) -> Result<SaveReport> {
        let _lock = if config.concurrent { Some(FileLock::acquire(&config.path, true)?) } else { None };

        let mut index = if config.concurrent {
            match experience_file::load(&config.path) {
                Ok((index, _)) => index,
                Err(e) if e.is_not_found() => PositionIndex::new(),
                Err(e) => return Err(e),
            }
        } else {
            (**self.index.read()).clone()
        };

        for fact in pending {
            index.insert(Self::fold(fact, config.mode));
        }

        let report = experience_file::save(&config.path, &index)?;
        *self.index.write() = Arc::new(index);
        Ok(report)
    }

    /// Final persist, then releases the index and any pending facts.
    pub fn shutdown(&self) -> Result<()> {
        self.wait_for_loading_finished();
        let result = self.persist();

        *self.index.write() = Arc::new(PositionIndex::new());
        self.pending.lock().clear();
        self.dirty.store(false, Ordering::Release);

        result.map(|_| ())
    }

    /// Candidate moves of `pos`, best first, one line each.
    pub fn show(&self, pos: &Chess, extended: bool, evaluator: &dyn Evaluator) -> Vec<String> {
        let key = Fingerprint::of(pos);
        let Some(view) = self.probe(key) else {
            return Vec::new();
        };

        let mut records: Vec<Record> = view.iter().copied().collect();
        records.sort_by(|a, b| b.compare(a, Format::CURRENT));

        let eval_importance = self.config.read().eval_importance;
        let mut lines = vec![format!("Fingerprint: {}", key)];
        for (i, record) in records.iter().enumerate() {
            let mut line = format!(
                "{:>2}: {:<6} value: {:>6} depth: {:>3} count: {:>5}",
                i + 1,
                record.mv.to_string(),
                record.value,
                record.depth,
                record.count
            );
            if extended {
                let (score, reliable) = quality(record, pos, eval_importance, evaluator);
                line.push_str(&format!(
                    " quality: {:>6}{}",
                    score,
                    if reliable { "" } else { " (unreliable)" }
                ));
            }
            lines.push(line);
        }
        lines
    }

    pub fn stats(&self) -> StoreStats {
        let config = self.config.read().clone();
        let index = self.index.read().clone();
        let pending = self.pending.lock().len();
        let history = self.history.lock();

        StoreStats {
            mode: config.mode,
            paused: self.is_paused(),
            read_only: config.read_only,
            dirty: self.is_dirty(),
            positions: index.positions(),
            records: index.len(),
            pending,
            last_load: history.last_load,
            last_load_report: history.last_load_report.clone(),
            last_persist: history.last_persist,
            last_persist_report: history.last_persist_report.clone(),
        }
    }
}
