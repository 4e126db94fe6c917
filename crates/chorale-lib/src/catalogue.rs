use ahash::{HashMap, HashMapExt};

use crate::SingerRef;

/// Read access to the installed singers, by id.
pub trait SingerLookup {
    fn by_id(&self, id: &str) -> Option<SingerRef>;
}

/// In-memory singer catalogue. Whoever scans the disk fills this in, and calls
/// [`crate::Project::on_catalog_refreshed`] after every rescan.
#[derive(Debug, Default)]
pub struct SingerCatalogue {
    singers: HashMap<Box<str>, SingerRef>,
}

impl SingerCatalogue {
    pub fn new() -> Self {
        Self {
            singers: HashMap::new(),
        }
    }

    /// Returns the singer previously registered under the same id, if any.
    pub fn insert(&mut self, singer: SingerRef) -> Option<SingerRef> {
        let replaced = self.singers.insert(singer.id().into(), singer);
        if let Some(replaced) = &replaced {
            tracing::debug!("singer {:?} replaced in catalogue", replaced.id());
        }
        replaced
    }
    pub fn remove(&mut self, id: &str) -> Option<SingerRef> {
        self.singers.remove(id)
    }

    /// Swaps out the whole catalogue, e.g. after a rescan.
    pub fn replace_all(&mut self, singers: impl IntoIterator<Item = SingerRef>) {
        self.singers.clear();
        for singer in singers {
            if let Some(dup) = self.insert(singer) {
                tracing::warn!("duplicate singer id {:?}, keeping the last one", dup.id());
            }
        }
    }

    /// Sorted for consistent display.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.singers.keys().map(|id| &**id).collect();
        ids.sort_unstable();
        ids
    }
    pub fn iter(&self) -> impl Iterator<Item = &SingerRef> {
        self.singers.values()
    }
    pub fn len(&self) -> usize {
        self.singers.len()
    }
    pub fn is_empty(&self) -> bool {
        self.singers.is_empty()
    }
}

impl SingerLookup for SingerCatalogue {
    fn by_id(&self, id: &str) -> Option<SingerRef> {
        self.singers.get(id).cloned()
    }
}
