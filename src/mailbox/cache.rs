use indexmap::IndexSet;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 10;

/// Recency-ordered set of opened thread ids. The front is the least
/// recently viewed entry.
#[derive(Debug, Clone)]
pub struct RecentlyViewed {
    capacity: usize,
    ids: IndexSet<String>,
}

impl Default for RecentlyViewed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RecentlyViewed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ids: IndexSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Marks `id` most recently viewed and hands every id pushed out over
    /// capacity to `on_evict`.
    pub fn touch(&mut self, id: &str, mut on_evict: impl FnMut(&str)) {
        self.ids.shift_remove(id);
        self.ids.insert(id.to_string());

        while self.ids.len() > self.capacity {
            let Some(evicted) = self.ids.shift_remove_index(0) else {
                break;
            };
            debug!(thread = %evicted, "evicting thread content");
            on_evict(&evicted);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eleventh_touch_evicts_least_recent() {
        let mut cache = RecentlyViewed::new(10);
        let mut evicted = Vec::new();

        for i in 0..11 {
            cache.touch(&format!("t{i}"), |id| evicted.push(id.to_string()));
        }

        assert_eq!(evicted, ["t0"]);
        assert_eq!(cache.len(), 10);
        assert!(!cache.contains("t0"));
    }

    #[test]
    fn retouching_refreshes_recency() {
        let mut cache = RecentlyViewed::new(2);
        let mut evicted = Vec::new();

        cache.touch("a", |id| evicted.push(id.to_string()));
        cache.touch("b", |id| evicted.push(id.to_string()));
        cache.touch("a", |id| evicted.push(id.to_string()));
        cache.touch("c", |id| evicted.push(id.to_string()));

        assert_eq!(evicted, ["b"]);
        assert!(cache.contains("a"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut cache = RecentlyViewed::new(0);
        assert_eq!(cache.capacity(), 1);

        cache.touch("a", |_| {});
        cache.clear();
        assert!(cache.is_empty());
    }
}
