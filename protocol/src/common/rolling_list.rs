//! Bounded sliding window over an ever-growing, globally indexed stream.
//!
//! Items are addressed by their *global index*: the position they were
//! appended at since the list was created. Only a recent suffix of the
//! stream is kept in memory. The buffer is allowed to grow to twice the
//! window size before the oldest half is dropped in one go ("roll"), which
//! keeps `add` O(1) amortized instead of shifting on every insert.
//!
//! Lookups distinguish two misses: an index that has already been rolled
//! away (`TooLate`) and one that has not been appended yet (`NotFound`).
//! Both are ordinary outcomes for a gossip peer asking "what did I miss?".

/// Lookup misses on a [`RollingList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RollingListError {
    /// The item was compacted away; the oldest retained index is `oldest`.
    #[error("too late: index {index} precedes oldest cached index {oldest}")]
    TooLate { index: usize, oldest: usize },
    /// The item does not exist yet; only `total` items were ever appended.
    #[error("not found: index {index} is beyond {total} appended items")]
    NotFound { index: usize, total: usize },
}

/// A window over the most recent items of an append-only stream.
///
/// After the first roll the buffer always holds between `size` and
/// `2 * size` items, namely those with global index
/// `[total - len, total - 1]`.
#[derive(Debug, Clone)]
pub struct RollingList<T> {
    size: usize,
    total: usize,
    items: Vec<T>,
}

impl<T> RollingList<T> {
    /// Creates an empty list retaining at least `size` recent items.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            total: 0,
            items: Vec::with_capacity(2 * size),
        }
    }

    /// Appends an item, rolling the buffer first if it is full.
    pub fn add(&mut self, item: T) {
        if self.items.len() >= 2 * self.size {
            self.roll();
        }
        self.items.push(item);
        self.total += 1;
    }

    /// The buffered suffix and the number of items ever appended.
    ///
    /// The slice borrows the list, so it cannot outlive the next `add`.
    pub fn get(&self) -> (&[T], usize) {
        (&self.items, self.total)
    }

    /// Looks up the item at `index` in global (stream) coordinates.
    pub fn get_item(&self, index: usize) -> Result<&T, RollingListError> {
        let oldest = self.oldest_cached();
        if index < oldest {
            return Err(RollingListError::TooLate { index, oldest });
        }
        self.items
            .get(index - oldest)
            .ok_or(RollingListError::NotFound {
                index,
                total: self.total,
            })
    }

    /// Every buffered item from global `index` to the newest.
    ///
    /// `index == total` yields an empty slice: the caller is up to date.
    pub fn items_from(&self, index: usize) -> Result<&[T], RollingListError> {
        let oldest = self.oldest_cached();
        if index < oldest {
            return Err(RollingListError::TooLate { index, oldest });
        }
        if index > self.total {
            return Err(RollingListError::NotFound {
                index,
                total: self.total,
            });
        }
        Ok(&self.items[index - oldest..])
    }

    /// Global index of the oldest item still buffered.
    pub fn oldest_cached(&self) -> usize {
        self.total - self.items.len()
    }

    /// Number of items ever appended.
    pub fn total(&self) -> usize {
        self.total
    }

    /// The configured window size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of items currently buffered.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // Keeps the newest `size` items.
    fn roll(&mut self) {
        let drop = self.items.len() - self.size.min(self.items.len());
        self.items.drain(..drop);
    }
}
