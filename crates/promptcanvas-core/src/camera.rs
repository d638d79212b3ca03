//! Camera for converting between page and screen space.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Camera describing how the page is projected onto the screen.
///
/// `offset` is the screen position of the page origin; `zoom` scales page
/// units to screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan), in screen pixels.
    pub offset: Vec2,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera from a pan offset and zoom.
    pub fn with_offset(offset: Vec2, zoom: f64) -> Self {
        Self { offset, zoom }
    }

    /// Transform from page coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Transform from screen coordinates to page coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    /// Convert a page point to screen coordinates.
    pub fn page_to_screen(&self, page_point: Point) -> Point {
        self.transform() * page_point
    }

    /// Convert a screen point to page coordinates.
    pub fn screen_to_page(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a page-space rectangle to screen space.
    pub fn page_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.page_to_screen(Point::new(rect.x0, rect.y0)),
            self.page_to_screen(Point::new(rect.x1, rect.y1)),
        )
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom the camera, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = self.zoom * factor;
        if new_zoom <= 0.0 || (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let page_point = self.screen_to_page(screen_point);
        self.zoom = new_zoom;

        let new_screen = self.page_to_screen(page_point);
        self.offset += Vec2::new(
            screen_point.x - new_screen.x,
            screen_point.y - new_screen.y,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera_is_identity() {
        let camera = Camera::new();
        let p = Point::new(100.0, 200.0);
        assert_eq!(camera.page_to_screen(p), p);
        assert_eq!(camera.screen_to_page(p), p);
    }

    #[test]
    fn test_screen_to_page_with_offset_and_zoom() {
        let camera = Camera::with_offset(Vec2::new(400.0, 300.0), 2.0);
        let page = camera.screen_to_page(Point::new(400.0, 300.0));
        assert!(page.x.abs() < f64::EPSILON);
        assert!(page.y.abs() < f64::EPSILON);

        let screen = camera.page_to_screen(Point::new(10.0, -5.0));
        assert!((screen.x - 420.0).abs() < f64::EPSILON);
        assert!((screen.y - 290.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_page_rect_to_screen() {
        let camera = Camera::with_offset(Vec2::new(50.0, 50.0), 0.5);
        let rect = camera.page_rect_to_screen(Rect::new(0.0, 0.0, 100.0, 40.0));
        assert!((rect.x0 - 50.0).abs() < f64::EPSILON);
        assert!((rect.width() - 50.0).abs() < f64::EPSILON);
        assert!((rect.height() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut camera = Camera::with_offset(Vec2::new(30.0, -20.0), 1.5);
        let anchor = Point::new(123.0, 456.0);
        let before = camera.screen_to_page(anchor);
        camera.zoom_at(anchor, 2.0);
        let after = camera.page_to_screen(before);

        assert!((after.x - anchor.x).abs() < 1e-10);
        assert!((after.y - anchor.y).abs() < 1e-10);
        assert!((camera.zoom - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan() {
        let mut camera = Camera::new();
        camera.pan(Vec2::new(10.0, 20.0));
        assert!((camera.offset.x - 10.0).abs() < f64::EPSILON);
        assert!((camera.offset.y - 20.0).abs() < f64::EPSILON);
    }
}
