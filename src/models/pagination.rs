use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Optional equality filters for listing cards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub active: Option<bool>,
    pub blocked: Option<bool>,
}

impl CardFilter {
    pub fn matches(&self, active: bool, blocked: bool) -> bool {
        self.active.map_or(true, |a| a == active) && self.blocked.map_or(true, |b| b == blocked)
    }
}

/// A 1-based page request. Construct through `new` so bounds always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Clamps `page` to at least 1 and `limit` into [1, 100]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_records: u64,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(request: PageRequest, total_records: u64) -> Self {
        Self {
            current_page: request.page(),
            total_pages: total_records.div_ceil(u64::from(request.limit())),
            total_records,
            page_size: request.limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub pagination: Pagination,
}
