use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;

/// The `(page, limit)` slice of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

impl PageWindow {
    /// Lenient parse: missing, non-numeric or non-positive values fall back to
    /// the defaults, and `max_limit` (when configured) caps the page size.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u64, max_limit: Option<u64>) -> Self {
        let page = page.and_then(leading_positive_int).unwrap_or(DEFAULT_PAGE);
        let mut limit = limit.and_then(leading_positive_int).unwrap_or(default_limit.max(1));
        if let Some(max) = max_limit.filter(|m| *m > 0) {
            if limit > max {
                tracing::debug!("limit {} exceeds max {}, capping", limit, max);
                limit = max;
            }
        }
        Self { page, limit }
    }

    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn end_index(&self) -> u64 {
        self.page.saturating_mul(self.limit)
    }

    pub fn paginate(&self, total: u64) -> Pagination {
        Pagination {
            next: (self.end_index() < total).then(|| PageRef { page: self.page + 1, limit: self.limit }),
            prev: (self.start_index() > 0).then(|| PageRef { page: self.page - 1, limit: self.limit }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Links to neighbouring pages; serializes as `{}` when neither exists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Leading-digit integer parse: `"2abc"` is 2, `"abc"` and `"0"` are rejected
fn leading_positive_int(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let digits: &str = &trimmed[..trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len())];
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(page: Option<&str>, limit: Option<&str>) -> PageWindow {
        PageWindow::parse(page, limit, DEFAULT_LIMIT, None)
    }

    #[test]
    fn falls_back_to_defaults() {
        assert_eq!(window(None, None), PageWindow { page: 1, limit: 25 });
        assert_eq!(window(Some("abc"), Some("")), PageWindow { page: 1, limit: 25 });
        assert_eq!(window(Some("0"), Some("-4")), PageWindow { page: 1, limit: 25 });
        assert_eq!(window(Some("2abc"), Some(" 10")), PageWindow { page: 2, limit: 10 });
    }

    #[test]
    fn caps_limit_when_configured() {
        assert_eq!(PageWindow::parse(None, Some("500"), 25, Some(100)).limit, 100);
        assert_eq!(PageWindow::parse(None, Some("50"), 25, Some(100)).limit, 50);
    }

    #[test]
    fn next_and_prev_follow_window_bounds() {
        for total in 0..12u64 {
            for page in 1..5u64 {
                for limit in 1..4u64 {
                    let w = PageWindow { page, limit };
                    let p = w.paginate(total);
                    assert_eq!(p.next.is_some(), page * limit < total);
                    assert_eq!(p.prev.is_some(), (page - 1) * limit > 0);
                }
            }
        }
    }

    #[test]
    fn second_page_of_three() {
        let p = PageWindow { page: 2, limit: 2 }.paginate(3);
        assert_eq!(p.prev, Some(PageRef { page: 1, limit: 2 }));
        assert_eq!(p.next, None);
        assert_eq!(serde_json::to_value(&p).unwrap(), serde_json::json!({ "prev": { "page": 1, "limit": 2 } }));
    }
}
