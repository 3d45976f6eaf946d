//! Window dimensions and cursor position, passed explicitly into spawn and
//! update calls.
//!
//! Three coordinate spaces are involved:
//! - screen: pixels, origin top-left, y down (what the window reports)
//! - cartesian: pixels, origin at the window centre, y up
//! - NDC: `[-1, 1]²`, origin at the centre, y up

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportContext {
    pub width: u32,
    pub height: u32,
    /// Cursor position in screen pixels.
    pub cursor: Vec2,
}

impl ViewportContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cursor: Vec2::ZERO,
        }
    }

    pub fn with_cursor(mut self, cursor: Vec2) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> Vec2 {
        // A minimised window reports 0x0; keep the divisions finite.
        Vec2::new(self.width.max(1) as f32, self.height.max(1) as f32)
    }

    /// Cartesian pixel delta to an NDC delta (no origin shift).
    pub fn cartesian_to_ndc(&self, cartesian: Vec2) -> Vec2 {
        2.0 * cartesian / self.size()
    }

    pub fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        let size = self.size();
        Vec2::new(
            (2.0 * screen.x) / size.x - 1.0,
            -((2.0 * screen.y) / size.y - 1.0),
        )
    }

    pub fn screen_to_cartesian(&self, screen: Vec2) -> Vec2 {
        let size = self.size();
        Vec2::new(screen.x - size.x / 2.0, -(screen.y - size.y / 2.0))
    }

    pub fn cursor_ndc(&self) -> Vec2 {
        self.screen_to_ndc(self.cursor)
    }

    pub fn cursor_cartesian(&self) -> Vec2 {
        self.screen_to_cartesian(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> ViewportContext {
        ViewportContext::new(800, 600)
    }

    #[test]
    fn screen_corners_map_to_ndc_corners() {
        let v = viewport();
        assert_eq!(v.screen_to_ndc(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0));
        assert_eq!(v.screen_to_ndc(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0));
        assert_eq!(v.screen_to_ndc(Vec2::new(400.0, 300.0)), Vec2::ZERO);
    }

    #[test]
    fn cartesian_origin_is_window_centre() {
        let v = viewport();
        assert_eq!(v.screen_to_cartesian(Vec2::new(400.0, 300.0)), Vec2::ZERO);
        assert_eq!(v.screen_to_cartesian(Vec2::new(0.0, 0.0)), Vec2::new(-400.0, 300.0));
    }

    #[test]
    fn cartesian_delta_scales_by_half_extent() {
        let v = viewport();
        assert_eq!(v.cartesian_to_ndc(Vec2::new(400.0, 300.0)), Vec2::ONE);
        assert_eq!(v.cartesian_to_ndc(Vec2::new(-40.0, 30.0)), Vec2::new(-0.1, 0.1));
    }

    #[test]
    fn cursor_follows_screen_mapping() {
        let v = viewport().with_cursor(Vec2::new(200.0, 150.0));
        assert_eq!(v.cursor_ndc(), Vec2::new(-0.5, 0.5));
        assert_eq!(v.cursor_cartesian(), Vec2::new(-200.0, 150.0));
    }

    #[test]
    fn zero_sized_viewport_stays_finite() {
        let v = ViewportContext::new(0, 0);
        assert!(v.cartesian_to_ndc(Vec2::new(5.0, 5.0)).is_finite());
    }
}
