//! Limit/offset paging shared by every list operation.

use serde::Deserialize;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Page {
    /// Clamp to `1..=MAX_PAGE_SIZE` and a non-negative offset.
    pub fn normalized(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_clamps_bounds() {
        let page = Page { limit: 10_000, offset: -3 }.normalized();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset, 0);

        let page = Page { limit: 0, offset: 5 }.normalized();
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset, 5);
    }
}
