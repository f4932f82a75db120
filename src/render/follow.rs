//! Auto-follow policy for a scrolling view

use super::Projection;

/// Rows (or pixels) of slack before a manual scroll counts as leaving the bottom
pub const DEFAULT_TOLERANCE: u32 = 10;

/// Tracks whether the display should stay pinned to the newest output
///
/// The view is pinned until the user scrolls more than `tolerance` away
/// from the bottom, and pinned again once they scroll back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollFollow {
    tolerance: u32,
    user_scrolled: bool,
}

impl Default for ScrollFollow {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl ScrollFollow {
    pub fn new(tolerance: u32) -> Self {
        Self {
            tolerance,
            user_scrolled: false,
        }
    }

    /// Record a scroll position reported by the display
    pub fn on_scroll(&mut self, value: u32, maximum: u32) {
        self.user_scrolled = value < maximum.saturating_sub(self.tolerance);
    }

    pub fn is_pinned(&self) -> bool {
        !self.user_scrolled
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Whether the display should jump to the bottom after this projection
    pub fn should_follow(&self, projection: &Projection<'_>) -> bool {
        projection.changed && self.is_pinned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(changed: bool) -> Projection<'static> {
        Projection {
            text: "",
            changed,
            appended: changed,
            line_count: 0,
        }
    }

    #[test]
    fn test_pinned_by_default() {
        let follow = ScrollFollow::default();
        assert!(follow.is_pinned());
        assert!(follow.should_follow(&projection(true)));
        assert!(!follow.should_follow(&projection(false)));
    }

    #[test]
    fn test_small_scroll_within_tolerance() {
        let mut follow = ScrollFollow::new(10);
        follow.on_scroll(95, 100);
        assert!(follow.is_pinned());
    }

    #[test]
    fn test_scrolling_away_unpins() {
        let mut follow = ScrollFollow::new(10);
        follow.on_scroll(50, 100);
        assert!(!follow.is_pinned());
        assert!(!follow.should_follow(&projection(true)));

        follow.on_scroll(100, 100);
        assert!(follow.should_follow(&projection(true)));
    }

    #[test]
    fn test_short_content_never_unpins() {
        let mut follow = ScrollFollow::new(10);
        follow.on_scroll(0, 5);
        assert!(follow.is_pinned());
    }
}
