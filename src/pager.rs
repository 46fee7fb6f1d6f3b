use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerEvent {
    PageChanged(usize),
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Page navigation state. The current page is always within `[0, max_page]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pager {
    current: usize,
    page_size: usize,
    total: usize,
}

impl Pager {
    pub fn new(page_size: usize, total: usize) -> Self {
        Pager {
            current: 0,
            page_size,
            total,
        }
    }

    /// Takes new totals and goes back to the first page. The caller
    /// triggered this, so no event is emitted.
    pub fn configure(&mut self, page_size: usize, total: usize) {
        self.page_size = page_size;
        self.total = total;
        self.current = 0;
        trace!(
            "Pager configured: {} items, {} per page, {} pages",
            total,
            page_size,
            self.page_count()
        );
    }

    /// Takes a new total while staying on the current page. Emits only when
    /// the current page no longer exists and had to be clamped.
    pub fn set_total(&mut self, total: usize) -> Option<PagerEvent> {
        if total == self.total {
            return None;
        }
        self.total = total;
        let page = std::cmp::min(self.current, self.max_page());
        if page == self.current {
            return None;
        }
        self.current = page;
        trace!("Pager clamped to page {} of {} items", page, total);
        Some(PagerEvent::PageChanged(page))
    }

    pub fn go_to(&mut self, page: usize) -> Option<PagerEvent> {
        let page = std::cmp::min(page, self.max_page());
        if page == self.current {
            return None;
        }
        self.current = page;
        trace!("Pager moved to page {}", page);
        Some(PagerEvent::PageChanged(page))
    }

    pub fn step(&mut self, delta: isize) -> Option<PagerEvent> {
        let target = self.current.saturating_add_signed(delta);
        self.go_to(target)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }

    pub fn max_page(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    pub fn prev_enabled(&self) -> bool {
        self.current > 0
    }

    pub fn next_enabled(&self) -> bool {
        self.current < self.max_page()
    }

    /// 1-based inclusive item range shown on the current page and the total.
    /// An empty result yields `(0, 0, 0)`.
    pub fn range(&self) -> (usize, usize, usize) {
        let min = self.current * self.page_size + 1;
        let max = std::cmp::min(min + self.page_size - 1, self.total);
        (std::cmp::min(min, max), max, self.total)
    }
}
