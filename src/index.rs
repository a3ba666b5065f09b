use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::media::MediaId;

/// Append-only set of media ids with uniform random selection.
///
/// Writers take the exclusive side of the lock; pickers share the read side and
/// only serialise on the RNG itself. Ids are never removed or rewritten.
pub struct SharedIndex {
    ids: RwLock<Vec<MediaId>>,
    rng: Mutex<StdRng>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            ids: RwLock::new(Vec::with_capacity(1024)),
            rng: Mutex::new(rng),
        }
    }

    /// Appends every id in `ids`. Duplicates are kept as separate entries.
    pub fn push<I>(&self, ids: I)
    where
        I: IntoIterator<Item = MediaId>,
    {
        let batch: Vec<MediaId> = ids.into_iter().collect();
        if batch.is_empty() {
            return;
        }
        self.ids.write().extend(batch);
    }

    /// Picks one id uniformly over everything pushed so far.
    pub fn random_pick(&self) -> Option<MediaId> {
        let ids = self.ids.read();
        if ids.is_empty() {
            return None;
        }
        let idx = self.rng.lock().random_range(0..ids.len());
        Some(ids[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.ids.read().iter().any(|known| known == id)
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new()
    }
}
