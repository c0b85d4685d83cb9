//! Limit/offset pagination for feed endpoints.

/// Page size when `limit` is not given.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page a client may request.
pub const MAX_LIMIT: u32 = 200;

/// A resolved page of a newest-first feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    /// Resolve raw query values. `limit` is clamped to [1, MAX_LIMIT].
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
