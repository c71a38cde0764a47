//! Character-window marquee for network names that do not fit the row.

pub const DEFAULT_SCROLL_LIMIT: usize = 20;
pub const DEFAULT_SCROLL_PADDING: usize = 5;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone)]
pub struct SsidScroller {
    text: Vec<char>,
    padded: Vec<char>,
    limit: usize,
    offset: usize,
    running: bool,
}

impl SsidScroller {
    pub fn new(text: &str, limit: usize, padding: usize) -> Self {
        let text: Vec<char> = text.chars().collect();
        let mut padded = text.clone();
        padded.extend(std::iter::repeat(' ').take(padding));
        Self {
            text,
            padded,
            limit,
            offset: 0,
            running: false,
        }
    }

    pub fn needs_scrolling(&self) -> bool {
        self.text.len() > self.limit
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Truncated name shown while the pointer is outside the row.
    pub fn idle_text(&self) -> String {
        if self.needs_scrolling() {
            let mut s: String = self.text[..self.limit].iter().collect();
            s.push_str(ELLIPSIS);
            s
        } else {
            self.text.iter().collect()
        }
    }

    /// Returns false when there is nothing to scroll or it is already running.
    pub fn start(&mut self) -> bool {
        if !self.needs_scrolling() || self.running {
            return false;
        }
        self.running = true;
        self.offset = 0;
        true
    }

    /// Stops scrolling and returns the text to restore.
    pub fn stop(&mut self) -> String {
        self.running = false;
        self.offset = 0;
        self.idle_text()
    }

    /// Advances one character and returns the visible window.
    pub fn tick(&mut self) -> String {
        let len = self.padded.len();
        if len == 0 {
            return String::new();
        }
        self.offset += 1;
        if self.offset >= len {
            self.offset = 0;
        }
        self.padded
            .iter()
            .cycle()
            .skip(self.offset)
            .take(self.limit.min(len))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "ThisIsAVeryLongNetworkName42";

    fn scroller(text: &str) -> SsidScroller {
        SsidScroller::new(text, DEFAULT_SCROLL_LIMIT, DEFAULT_SCROLL_PADDING)
    }

    #[test]
    fn test_short_name_is_not_truncated() {
        let s = scroller("HomeNet");
        assert!(!s.needs_scrolling());
        assert_eq!(s.idle_text(), "HomeNet");
    }

    #[test]
    fn test_exact_limit_does_not_scroll() {
        let name = "a".repeat(20);
        let s = scroller(&name);
        assert!(!s.needs_scrolling());
        assert_eq!(s.idle_text(), name);
    }

    #[test]
    fn test_long_name_idle_text_has_ellipsis() {
        let s = scroller(LONG);
        assert!(s.needs_scrolling());
        assert_eq!(s.idle_text(), "ThisIsAVeryLongNetwo...");
    }

    #[test]
    fn test_short_name_never_starts() {
        let mut s = scroller("HomeNet");
        assert!(!s.start());
        assert!(!s.is_running());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut s = scroller(LONG);
        assert!(s.start());
        assert!(!s.start());
        assert!(s.is_running());
    }

    #[test]
    fn test_first_tick_starts_at_offset_one() {
        let mut s = scroller(LONG);
        s.start();
        assert_eq!(s.tick(), "hisIsAVeryLongNetwor");
        assert_eq!(s.tick(), "isIsAVeryLongNetwork");
    }

    #[test]
    fn test_tick_wraps_through_padding() {
        // 28 chars + 5 padding = 33
        let mut s = scroller(LONG);
        s.start();
        let mut last = String::new();
        for _ in 0..22 {
            last = s.tick();
        }
        assert_eq!(last, "Name42     ThisIsAVe");
        assert_eq!(last.chars().count(), 20);
    }

    #[test]
    fn test_offset_resets_after_full_cycle() {
        let mut s = scroller(LONG);
        s.start();
        let mut last = String::new();
        for _ in 0..33 {
            last = s.tick();
        }
        assert_eq!(last, "ThisIsAVeryLongNetwo");
    }

    #[test]
    fn test_stop_restores_idle_text() {
        let mut s = scroller(LONG);
        s.start();
        s.tick();
        assert_eq!(s.stop(), "ThisIsAVeryLongNetwo...");
        assert!(!s.is_running());
        assert!(s.start());
        assert_eq!(s.tick(), "hisIsAVeryLongNetwor");
    }

    #[test]
    fn test_multibyte_names_count_chars() {
        let name = "Café☕Café☕Café☕Café☕Café☕";
        let s = scroller(name);
        assert!(s.needs_scrolling());
        assert_eq!(s.idle_text().chars().count(), 23);
    }
}
