use tracing::{trace, warn};

pub const PAGE_SIZE_OPTIONS: [usize; 5] = [3, 5, 10, 15, 20];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSizeEvent {
    Changed(usize),
}

/// Holds the rows-per-page value out of a fixed, ordered option set.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSizeSelector {
    options: Vec<usize>,
    selected: usize, // Index into options
}

impl PageSizeSelector {
    /// Unknown or zero options are dropped. A default that is not an option
    /// falls back to the middle one.
    pub fn new(options: &[usize], default: usize) -> Self {
        let mut options: Vec<usize> = options.iter().copied().filter(|&o| o > 0).collect();
        options.sort_unstable();
        options.dedup();
        if options.is_empty() {
            warn!("No usable page size options, using {:?}", PAGE_SIZE_OPTIONS);
            options = PAGE_SIZE_OPTIONS.to_vec();
        }
        let selected = match options.iter().position(|&o| o == default) {
            Some(idx) => idx,
            None => {
                let idx = (options.len() - 1) / 2;
                warn!(
                    "Page size {} is not one of {:?}, using {}",
                    default, options, options[idx]
                );
                idx
            }
        };
        PageSizeSelector { options, selected }
    }

    pub fn value(&self) -> usize {
        self.options[self.selected]
    }

    pub fn options(&self) -> &[usize] {
        &self.options
    }

    /// Emits only if `value` is an option and differs from the current one.
    pub fn select(&mut self, value: usize) -> Option<PageSizeEvent> {
        let idx = self.options.iter().position(|&o| o == value)?;
        if idx == self.selected {
            return None;
        }
        self.selected = idx;
        trace!("Page size changed to {}", value);
        Some(PageSizeEvent::Changed(value))
    }

    pub fn select_next(&mut self) -> Option<PageSizeEvent> {
        let value = *self.options.get(self.selected + 1)?;
        self.select(value)
    }

    pub fn select_prev(&mut self) -> Option<PageSizeEvent> {
        let value = *self.options.get(self.selected.checked_sub(1)?)?;
        self.select(value)
    }
}

impl Default for PageSizeSelector {
    fn default() -> Self {
        PageSizeSelector::new(&PAGE_SIZE_OPTIONS, 5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_of_the_catalogue_options() {
        let selector = PageSizeSelector::default();
        assert_eq!(selector.value(), 5);
        assert_eq!(selector.options(), &[3, 5, 10, 15, 20]);
    }

    #[test]
    fn select_emits_only_on_change() {
        let mut selector = PageSizeSelector::default();
        assert_eq!(selector.select(5), None);
        assert_eq!(selector.select(7), None);
        assert_eq!(selector.value(), 5);
        assert_eq!(selector.select(3), Some(PageSizeEvent::Changed(3)));
        assert_eq!(selector.value(), 3);
    }

    #[test]
    fn next_and_prev_stop_at_the_ends() {
        let mut selector = PageSizeSelector::new(&[10, 3, 5], 3);
        assert_eq!(selector.select_prev(), None);
        assert_eq!(selector.select_next(), Some(PageSizeEvent::Changed(5)));
        assert_eq!(selector.select_next(), Some(PageSizeEvent::Changed(10)));
        assert_eq!(selector.select_next(), None);
        assert_eq!(selector.select_prev(), Some(PageSizeEvent::Changed(5)));
    }

    #[test]
    fn unknown_default_falls_back_to_middle_option() {
        assert_eq!(PageSizeSelector::new(&PAGE_SIZE_OPTIONS, 7).value(), 10);
        assert_eq!(PageSizeSelector::new(&[0], 0).value(), 10);
    }
}
