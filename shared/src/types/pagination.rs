//! Pagination window for repository list queries

use serde::{Deserialize, Serialize};

/// A window onto an ordered result set.
///
/// `limit == 0` means "no limit": the window runs from `offset` to the end
/// of the results. This mirrors the storage convention where a zero limit
/// omits the LIMIT clause entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Number of records to skip from the start of the ordered results
    #[serde(default)]
    pub offset: u64,

    /// Maximum number of records to return; 0 disables the limit
    #[serde(default)]
    pub limit: u64,
}

impl Default for Paging {
    fn default() -> Self {
        Self::all()
    }
}

impl Paging {
    /// Create a new pagination window
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// The full result set, no offset and no limit
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: 0,
        }
    }

    /// Check whether this window has no upper bound
    pub fn is_unbounded(&self) -> bool {
        self.limit == 0
    }

    /// Calculate the offset as i64 for SQL queries
    pub fn offset_i64(&self) -> i64 {
        self.offset as i64
    }

    /// Calculate the limit as i64 for SQL queries
    pub fn limit_i64(&self) -> i64 {
        self.limit as i64
    }

    /// Apply this window to an already-ordered iterator
    pub fn clip<I>(&self, iter: I) -> impl Iterator<Item = I::Item>
    where
        I: Iterator,
    {
        let take = if self.limit == 0 {
            usize::MAX
        } else {
            self.limit as usize
        };
        iter.skip(self.offset as usize).take(take)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_unbounded() {
        assert!(Paging::all().is_unbounded());
        assert!(!Paging::new(0, 5).is_unbounded());
    }

    #[test]
    fn test_clip_windows() {
        let items: Vec<i32> = (1..=10).collect();

        let page1: Vec<i32> = Paging::new(0, 5).clip(items.iter().copied()).collect();
        assert_eq!(page1, vec![1, 2, 3, 4, 5]);

        let page2: Vec<i32> = Paging::new(5, 5).clip(items.iter().copied()).collect();
        assert_eq!(page2, vec![6, 7, 8, 9, 10]);

        let page3: Vec<i32> = Paging::new(10, 5).clip(items.iter().copied()).collect();
        assert!(page3.is_empty());
    }

    #[test]
    fn test_clip_unbounded_with_offset() {
        let items: Vec<i32> = (1..=10).collect();
        let tail: Vec<i32> = Paging::new(7, 0).clip(items.iter().copied()).collect();
        assert_eq!(tail, vec![8, 9, 10]);
    }
}
