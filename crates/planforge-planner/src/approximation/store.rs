//! Shared cache of constraint approximations.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use planforge_config::ApproximationConfig;
use planforge_core::{ConstraintSignature, Result, Termination};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::build::{grow, ManifoldSampler};
use super::persistence;
use super::{ApproximationKey, BuildMetadata, ConstraintApproximation};
use crate::termination::{OrTermination, TimeTermination};

type EntryTable = HashMap<ApproximationKey, Arc<ConstraintApproximation>>;

/// Cache of [`ConstraintApproximation`]s keyed by (signature, group).
///
/// Lookups run concurrently with builds of other keys. At most one build
/// per key runs at a time: a second caller for the same key waits for the
/// first and receives its result, or builds itself if the first failed.
/// `save` and `load` hold the table exclusively.
#[derive(Debug)]
pub struct ConstraintApproximationStore {
    entries: RwLock<EntryTable>,
    building: Mutex<HashSet<ApproximationKey>>,
    build_finished: Condvar,
    config: ApproximationConfig,
    seed: Option<u64>,
    builds_started: AtomicUsize,
}

impl Default for ConstraintApproximationStore {
    fn default() -> Self {
        Self::new(ApproximationConfig::default())
    }
}

impl ConstraintApproximationStore {
    pub fn new(config: ApproximationConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            building: Mutex::new(HashSet::new()),
            build_finished: Condvar::new(),
            config,
            seed: None,
            builds_started: AtomicUsize::new(0),
        }
    }

    /// Seeds every build, making them reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &ApproximationConfig {
        &self.config
    }

    /// Returns the entry built for exactly this signature and group.
    pub fn find(
        &self,
        signature: &ConstraintSignature,
        group: &str,
    ) -> Option<Arc<ConstraintApproximation>> {
        let key = ApproximationKey::new(signature.clone(), group);
        self.read().get(&key).cloned()
    }

    /// Builds and publishes an approximation, bounded by the configured
    /// build time.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::ApproximationBuildFailed`] if no valid
    /// state was sampled.
    ///
    /// [`PlanForgeError::ApproximationBuildFailed`]: planforge_core::PlanForgeError::ApproximationBuildFailed
    pub fn build(
        &self,
        signature: &ConstraintSignature,
        group: &str,
        sampler: &dyn ManifoldSampler,
    ) -> Result<Arc<ConstraintApproximation>> {
        let deadline = TimeTermination::new(self.config.max_build_time());
        self.build_bounded(signature, group, sampler, &deadline)
    }

    /// Like [`build`](Self::build), also stopping when `termination` fires.
    pub fn build_until(
        &self,
        signature: &ConstraintSignature,
        group: &str,
        sampler: &dyn ManifoldSampler,
        termination: &dyn Termination,
    ) -> Result<Arc<ConstraintApproximation>> {
        let deadline = TimeTermination::new(self.config.max_build_time());
        self.build_bounded(
            signature,
            group,
            sampler,
            &OrTermination::new(deadline, termination),
        )
    }

    fn build_bounded(
        &self,
        signature: &ConstraintSignature,
        group: &str,
        sampler: &dyn ManifoldSampler,
        termination: &dyn Termination,
    ) -> Result<Arc<ConstraintApproximation>> {
        let key = ApproximationKey::new(signature.clone(), group);

        let _claim = match self.claim(&key) {
            Claim::Owner(claim) => claim,
            Claim::Finished(entry) => {
                tracing::debug!(group, signature = %signature, "Reusing concurrently built approximation");
                return Ok(entry);
            }
        };

        self.builds_started.fetch_add(1, Ordering::SeqCst);
        tracing::info!(group, signature = %signature, samples = self.config.samples, "Building constraint approximation");

        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };

        let outcome = grow(sampler, &self.config, termination, &mut rng)?;

        let metadata = BuildMetadata {
            samples_drawn: outcome.samples_drawn,
            build_millis: outcome.build_millis,
            tolerances: sampler.tolerances(),
        };
        let approximation = {
            // storage path must be picked under the write lock
            let mut entries = self.write();
            let storage_path = match entries.get(&key) {
                Some(existing) => existing.storage_path().to_string(),
                None => free_storage_path(&entries, group),
            };
            let approximation = Arc::new(ConstraintApproximation::new(
                key.clone(),
                outcome.graph,
                storage_path,
                metadata,
            ));
            entries.insert(key, approximation.clone());
            approximation
        };
        tracing::info!(
            group,
            states = approximation.state_count(),
            edges = approximation.edge_count(),
            drawn = outcome.samples_drawn,
            millis = outcome.build_millis,
            path = approximation.storage_path(),
            "Constraint approximation built"
        );
        Ok(approximation)
    }

    /// Publishes an entry, replacing any with the same key.
    pub fn insert(
        &self,
        approximation: ConstraintApproximation,
    ) -> Option<Arc<ConstraintApproximation>> {
        let key = approximation.key().clone();
        self.write().insert(key, Arc::new(approximation))
    }

    pub fn remove(
        &self,
        signature: &ConstraintSignature,
        group: &str,
    ) -> Option<Arc<ConstraintApproximation>> {
        self.write()
            .remove(&ApproximationKey::new(signature.clone(), group))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Keys of all entries, sorted.
    pub fn keys(&self) -> Vec<ApproximationKey> {
        let mut keys: Vec<_> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> Vec<Arc<ConstraintApproximation>> {
        let mut entries: Vec<_> = self.read().values().cloned().collect();
        entries.sort_by(|a, b| a.key().cmp(b.key()));
        entries
    }

    /// Number of builds that actually sampled (reused results excluded).
    pub fn builds_started(&self) -> usize {
        self.builds_started.load(Ordering::SeqCst)
    }

    /// Writes a snapshot of every entry to `path`.
    ///
    /// The file is written next to `path` and renamed into place.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let entries = self.write();
        let mut sorted: Vec<_> = entries.values().cloned().collect();
        sorted.sort_by(|a, b| a.key().cmp(b.key()));
        persistence::write_store(path, &sorted)?;
        tracing::info!(path = %path.display(), entries = sorted.len(), "Saved constraint approximations");
        Ok(())
    }

    /// Replaces the whole store with the snapshot at `path`.
    ///
    /// Nothing changes unless the entire file validates.
    ///
    /// # Errors
    ///
    /// Returns [`PlanForgeError::CorruptStore`] for malformed files and
    /// [`PlanForgeError::Io`] if the file cannot be read.
    ///
    /// [`PlanForgeError::CorruptStore`]: planforge_core::PlanForgeError::CorruptStore
    /// [`PlanForgeError::Io`]: planforge_core::PlanForgeError::Io
    pub fn load(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let loaded = persistence::read_store(path)?;
        let count = loaded.len();
        let table: EntryTable = loaded
            .into_iter()
            .map(|a| (a.key().clone(), Arc::new(a)))
            .collect();
        *self.write() = table;
        tracing::info!(path = %path.display(), entries = count, "Loaded constraint approximations");
        Ok(count)
    }

    fn claim(&self, key: &ApproximationKey) -> Claim<'_> {
        let mut building = self.building.lock().unwrap_or_else(PoisonError::into_inner);
        let mut waited = false;
        loop {
            if !building.contains(key) {
                if waited {
                    if let Some(entry) = self.read().get(key).cloned() {
                        return Claim::Finished(entry);
                    }
                }
                building.insert(key.clone());
                return Claim::Owner(BuildClaim {
                    store: self,
                    key: key.clone(),
                });
            }
            waited = true;
            building = self
                .build_finished
                .wait(building)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, EntryTable> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, EntryTable> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Claim<'a> {
    Owner(BuildClaim<'a>),
    Finished(Arc<ConstraintApproximation>),
}

/// Marks a key as being built; released (and waiters woken) on drop,
/// whether the build succeeded or not.
struct BuildClaim<'a> {
    store: &'a ConstraintApproximationStore,
    key: ApproximationKey,
}

impl Drop for BuildClaim<'_> {
    fn drop(&mut self) {
        let mut building = self
            .store
            .building
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        building.remove(&self.key);
        self.store.build_finished.notify_all();
    }
}

/// First `{group}/approximation_{n}.graph` not held by any entry.
fn free_storage_path(entries: &EntryTable, group: &str) -> String {
    let taken: HashSet<&str> = entries.values().map(|e| e.storage_path()).collect();
    (0..)
        .map(|n| format!("{group}/approximation_{n}.graph"))
        .find(|path| !taken.contains(path.as_str()))
        .unwrap_or_default()
}
