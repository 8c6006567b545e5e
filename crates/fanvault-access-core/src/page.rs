//! Feed pagination

/// A 1-based page request, clamped to the configured bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    /// Default page size when the caller gives none
    pub const DEFAULT_SIZE: u32 = 20;

    /// Build a page, clamping `number` to at least 1 and `size` to `[1, max_size]`
    pub fn new(number: Option<u32>, size: Option<u32>, max_size: u32) -> Self {
        let max_size = max_size.max(1);
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, max_size),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rows to skip
    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }

    /// Rows to return
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}
