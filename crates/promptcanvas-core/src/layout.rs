//! Element sizing and batch grid placement.
//!
//! Everything here is pure: no engine access, no state.

use crate::request::{AspectRatio, GenerationRequest};
use kurbo::{Point, Size};

/// Default length of an element's longer edge, in page units.
pub const DEFAULT_BASE_EDGE: f64 = 256.0;

/// Default spacing between cells of a batch.
pub const DEFAULT_GRID_GAP: f64 = 20.0;

/// Size of an element for the given ratio.
///
/// The longer edge is `base_edge`; the shorter is rounded to the nearest
/// integer. `keep` falls back to `1:1` here; see [`size_for_source`].
pub fn size_for_aspect_ratio(ratio: AspectRatio, base_edge: f64) -> Size {
    let (w, h) = ratio.ratio().unwrap_or((1, 1));
    scaled_to_base_edge(w as f64, h as f64, base_edge)
}

/// Size of an element that keeps a source image's own ratio.
pub fn size_for_source(width: u32, height: u32, base_edge: f64) -> Size {
    if width == 0 || height == 0 {
        return size_for_aspect_ratio(AspectRatio::Square, base_edge);
    }
    scaled_to_base_edge(width as f64, height as f64, base_edge)
}

/// Size of every element produced by `request`.
pub fn size_for_request(request: &GenerationRequest, base_edge: f64) -> Size {
    match (request.aspect_ratio, request.source_image()) {
        (AspectRatio::Keep, Some(source)) => size_for_source(source.width, source.height, base_edge),
        (ratio, _) => size_for_aspect_ratio(ratio, base_edge),
    }
}

fn scaled_to_base_edge(w: f64, h: f64, base_edge: f64) -> Size {
    let base = base_edge.round();
    if w >= h {
        Size::new(base, (base * h / w).round().max(1.0))
    } else {
        Size::new((base * w / h).round().max(1.0), base)
    }
}

/// Placement of a batch on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPlan {
    /// Top-left corner of the whole block.
    pub start: Point,
    pub cols: usize,
    pub rows: usize,
    /// Batches of exactly four are laid out 2×2.
    pub is_square_batch: bool,
}

impl GridPlan {
    /// Top-left corners of the first `count` cells.
    pub fn cells(&self, element_size: Size, count: usize, gap: f64) -> Vec<Point> {
        (0..count)
            .map(|index| cell_position(self.start, index, element_size, self.is_square_batch, gap))
            .collect()
    }
}

/// Plan a batch block of `count` cells centered on `center`.
pub fn plan_grid(center: Point, element_size: Size, count: usize, gap: f64) -> GridPlan {
    let count = count.max(1);
    let is_square_batch = count == 4;
    let (cols, rows) = if is_square_batch { (2, 2) } else { (count, 1) };

    let total_width = cols as f64 * element_size.width + (cols - 1) as f64 * gap;
    let total_height = rows as f64 * element_size.height + (rows - 1) as f64 * gap;

    GridPlan {
        start: Point::new(center.x - total_width / 2.0, center.y - total_height / 2.0),
        cols,
        rows,
        is_square_batch,
    }
}

/// Top-left corner of cell `index`.
pub fn cell_position(
    start: Point,
    index: usize,
    element_size: Size,
    is_square_batch: bool,
    gap: f64,
) -> Point {
    let (row, col) = if is_square_batch {
        (index / 2, index % 2)
    } else {
        (0, index)
    };
    Point::new(
        start.x + col as f64 * (element_size.width + gap),
        start.y + row as f64 * (element_size.height + gap),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{MediaKind, ReferenceImage};

    #[test]
    fn test_sizes_for_known_ratios() {
        let cases = [
            (AspectRatio::Square, 256.0, 256.0),
            (AspectRatio::Landscape16x9, 256.0, 144.0),
            (AspectRatio::Portrait9x16, 144.0, 256.0),
            (AspectRatio::Landscape4x3, 256.0, 192.0),
            (AspectRatio::Portrait3x4, 192.0, 256.0),
        ];
        for (ratio, w, h) in cases {
            let size = size_for_aspect_ratio(ratio, DEFAULT_BASE_EDGE);
            assert_eq!(size, Size::new(w, h), "ratio {}", ratio);
        }
    }

    #[test]
    fn test_sizes_keep_ratio_within_a_pixel() {
        for ratio in [
            AspectRatio::Landscape16x9,
            AspectRatio::Portrait9x16,
            AspectRatio::Landscape4x3,
            AspectRatio::Portrait3x4,
        ] {
            for base in [100.0, 173.0, 300.0] {
                let size = size_for_aspect_ratio(ratio, base);
                let (rw, rh) = ratio.ratio().unwrap();
                assert!(size.width > 0.0 && size.height > 0.0);
                assert_eq!(size.width.fract(), 0.0);
                assert_eq!(size.height.fract(), 0.0);
                let ideal_height = size.width * rh as f64 / rw as f64;
                assert!((size.height - ideal_height).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_keep_falls_back_to_square() {
        assert_eq!(
            size_for_aspect_ratio(AspectRatio::Keep, 256.0),
            Size::new(256.0, 256.0)
        );
    }

    #[test]
    fn test_keep_uses_source_image() {
        let request = GenerationRequest::new(MediaKind::Image, "m", "p")
            .with_aspect_ratio(AspectRatio::Keep)
            .with_reference_image(ReferenceImage::new("ref.png", 1000, 500));
        assert_eq!(size_for_request(&request, 256.0), Size::new(256.0, 128.0));

        assert_eq!(size_for_source(0, 10, 256.0), Size::new(256.0, 256.0));
    }

    #[test]
    fn test_plan_grid_square_batch() {
        let plan = plan_grid(Point::ZERO, Size::new(100.0, 50.0), 4, 20.0);
        assert!(plan.is_square_batch);
        assert_eq!((plan.cols, plan.rows), (2, 2));
        assert_eq!(plan.start, Point::new(-110.0, -60.0));
    }

    #[test]
    fn test_plan_grid_single_row() {
        for count in [1, 2, 3, 5, 6] {
            let plan = plan_grid(Point::ZERO, Size::new(100.0, 100.0), count, 20.0);
            assert!(!plan.is_square_batch);
            assert_eq!(plan.rows, 1);
            assert_eq!(plan.cols, count);
        }
    }

    #[test]
    fn test_single_element_centered() {
        let size = Size::new(256.0, 144.0);
        let plan = plan_grid(Point::new(10.0, 20.0), size, 1, 20.0);
        assert_eq!(plan.start, Point::new(10.0 - 128.0, 20.0 - 72.0));
    }

    #[test]
    fn test_cell_positions() {
        let size = Size::new(100.0, 50.0);
        let start = Point::ZERO;
        assert_eq!(cell_position(start, 3, size, true, 20.0), Point::new(120.0, 70.0));
        assert_eq!(cell_position(start, 2, size, true, 20.0), Point::new(0.0, 70.0));
        assert_eq!(cell_position(start, 2, size, false, 20.0), Point::new(240.0, 0.0));
    }

    #[test]
    fn test_cells_block_is_centered() {
        let size = Size::new(80.0, 60.0);
        let plan = plan_grid(Point::new(500.0, 500.0), size, 3, 20.0);
        let cells = plan.cells(size, 3, 20.0);
        let left = cells[0].x;
        let right = cells[2].x + size.width;
        assert!(((left + right) / 2.0 - 500.0).abs() < f64::EPSILON);
        assert!((cells[0].y + size.height / 2.0 - 500.0).abs() < f64::EPSILON);
    }
}
