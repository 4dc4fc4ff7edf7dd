//! The visible slice of the score.

use std::ops::Range;

use follow_conf::WindowMode;

use crate::error::{FollowError, Result};

/// `width` consecutive measures starting at `head`.
///
/// Always satisfies `head + width <= total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreWindow {
    head: usize,
    width: usize,
    configured_width: usize,
    total: usize,
    mode: WindowMode,
}

impl ScoreWindow {
    pub fn new(total: usize, width: usize, mode: WindowMode) -> Result<Self> {
        if width == 0 {
            return Err(FollowError::InvalidConfig("window size must be positive".into()));
        }
        if width > total {
            return Err(FollowError::WindowTooLarge {
                window_size: width,
                measures: total,
            });
        }
        Ok(Self {
            head: 0,
            width,
            configured_width: width,
            total,
            mode,
        })
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// Current width; below the configured width only after a dynamic
    /// window has shrunk at the end of the score.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn configured_width(&self) -> usize {
        self.configured_width
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Absolute measure indices currently visible.
    pub fn range(&self) -> Range<usize> {
        self.head..self.head + self.width
    }

    /// Window-relative index of an absolute measure, if visible.
    pub fn local(&self, measure: usize) -> Option<usize> {
        self.range().contains(&measure).then(|| measure - self.head)
    }

    /// Restore the configured width and move the head, clamped so the
    /// window still fits.
    pub fn reset(&mut self, head: usize) {
        self.width = self.configured_width;
        self.head = head.min(self.total - self.width);
    }

    pub fn stay(&mut self) {}

    pub fn slide(&mut self) {
        match self.mode {
            WindowMode::Static => {
                self.head = (self.head + self.width).min(self.total - self.width);
            }
            WindowMode::Dynamic => {
                let next = self.head + self.width;
                if next < self.total {
                    self.head = next;
                    self.width = self.width.min(self.total - next);
                }
            }
        }
    }

    pub fn at_end(&self) -> bool {
        self.head + self.width == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_fits(window: &ScoreWindow) {
        assert!(window.head() + window.width() <= window.total());
    }

    #[test]
    fn too_wide_is_rejected() {
        let err = ScoreWindow::new(4, 5, WindowMode::Static).unwrap_err();
        assert!(matches!(
            err,
            FollowError::WindowTooLarge {
                window_size: 5,
                measures: 4
            }
        ));
        assert!(ScoreWindow::new(4, 4, WindowMode::Static).is_ok());
    }

    #[test]
    fn static_slide_clamps_at_end() {
        let mut window = ScoreWindow::new(10, 4, WindowMode::Static).unwrap();
        window.slide();
        assert_eq!(window.range(), 4..8);
        window.slide();
        assert_eq!(window.range(), 6..10);
        window.slide();
        assert_eq!(window.range(), 6..10);
        assert!(window.at_end());
        assert_fits(&window);
    }

    #[test]
    fn dynamic_slide_shrinks_then_stops() {
        let mut window = ScoreWindow::new(10, 4, WindowMode::Dynamic).unwrap();
        window.slide();
        assert_eq!(window.range(), 4..8);
        window.slide();
        assert_eq!(window.range(), 8..10);
        assert_eq!(window.width(), 2);
        window.slide();
        assert_eq!(window.range(), 8..10);
        assert_fits(&window);

        window.reset(0);
        assert_eq!(window.range(), 0..4);
    }

    #[test]
    fn stay_is_a_no_op() {
        let mut window = ScoreWindow::new(10, 4, WindowMode::Static).unwrap();
        window.reset(3);
        window.stay();
        assert_eq!(window.range(), 3..7);
    }

    #[test]
    fn reset_clamps_head() {
        let mut window = ScoreWindow::new(10, 4, WindowMode::Static).unwrap();
        window.reset(9);
        assert_eq!(window.range(), 6..10);
    }

    #[test]
    fn local_index() {
        let mut window = ScoreWindow::new(10, 4, WindowMode::Static).unwrap();
        window.reset(2);
        assert_eq!(window.local(2), Some(0));
        assert_eq!(window.local(5), Some(3));
        assert_eq!(window.local(6), None);
        assert_eq!(window.local(1), None);
    }

    #[test]
    fn invariant_holds_over_many_slides() {
        for mode in [WindowMode::Static, WindowMode::Dynamic] {
            for total in 1..12 {
                for width in 1..=total {
                    let mut window = ScoreWindow::new(total, width, mode).unwrap();
                    for _ in 0..total + 2 {
                        window.slide();
                        assert_fits(&window);
                        assert!(window.width() > 0);
                    }
                }
            }
        }
    }
}
