//! Placement math shared by the crop and compose stages.
//!
//! Both stages draw content "contained" in a square and then position it with a
//! [`LayerTransform`]. Keeping the fitting rule in one place keeps the crop preview and the
//! final composite framed identically.

use crate::foundation::core::{Affine, LayerTransform, Point, Rect, Size, Vec2};

/// Uniformly scale `content` so it fits inside a `target`x`target` square.
///
/// Wide content (aspect > 1) fits the width; tall or square content fits the height.
pub fn contain_size(content: Size, target: f64) -> Size {
    let aspect = if content.height > 0.0 {
        content.width / content.height
    } else {
        1.0
    };
    if aspect > 1.0 {
        Size::new(target, target / aspect)
    } else {
        Size::new(target * aspect, target)
    }
}

/// Rect of `size` centered on the local origin.
pub fn centered_rect(size: Size) -> Rect {
    Rect::from_origin_size(Point::new(-size.width / 2.0, -size.height / 2.0), size)
}

/// Where a layer lands on the canvas: the layer affine plus the local rect its content fills.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub layer: Affine,
    pub dest: Rect,
}

impl Placement {
    pub fn new(origin: Point, transform: LayerTransform, draw_size: Size) -> Self {
        Self {
            layer: transform.to_affine(origin),
            dest: centered_rect(draw_size),
        }
    }

    /// Affine mapping source pixel coordinates of a `src_w`x`src_h` image onto the canvas.
    pub fn image_to_canvas(&self, src_w: u32, src_h: u32) -> Affine {
        let sx = self.dest.width() / f64::from(src_w.max(1));
        let sy = self.dest.height() / f64::from(src_h.max(1));
        self.layer
            * Affine::translate(Vec2::new(self.dest.x0, self.dest.y0))
            * Affine::scale_non_uniform(sx, sy)
    }

    /// Canvas position of the content's center.
    pub fn content_center(&self) -> Point {
        self.layer * self.dest.center()
    }

    /// Axis-aligned canvas bounds of the transformed content.
    pub fn canvas_bounds(&self) -> Rect {
        self.layer.transform_rect_bbox(self.dest)
    }
}

/// Photo placement: origin at the canvas center, contain-fitted against the full square.
pub fn photo_placement(content: Size, canvas_size: f64, transform: LayerTransform) -> Placement {
    let center = Point::new(canvas_size / 2.0, canvas_size / 2.0);
    Placement::new(center, transform, contain_size(content, canvas_size))
}

/// Overlay placement: origin at the canvas top-left, `footprint` wide with the overlay's own
/// aspect ratio.
pub fn overlay_placement(content: Size, footprint: f64, transform: LayerTransform) -> Placement {
    let height = if content.width > 0.0 {
        content.height / content.width * footprint
    } else {
        footprint
    };
    Placement::new(Point::ORIGIN, transform, Size::new(footprint, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contain_wide_fits_width() {
        let s = contain_size(Size::new(400.0, 200.0), 800.0);
        assert_eq!(s, Size::new(800.0, 400.0));
    }

    #[test]
    fn contain_tall_and_square_fit_height() {
        assert_eq!(
            contain_size(Size::new(200.0, 400.0), 800.0),
            Size::new(400.0, 800.0)
        );
        assert_eq!(
            contain_size(Size::new(280.0, 280.0), 800.0),
            Size::new(800.0, 800.0)
        );
    }

    #[test]
    fn photo_placement_identity_covers_canvas() {
        let p = photo_placement(Size::new(10.0, 10.0), 100.0, LayerTransform::default());
        let b = p.canvas_bounds();
        assert!((b.x0).abs() < 1e-9 && (b.y0).abs() < 1e-9);
        assert!((b.x1 - 100.0).abs() < 1e-9 && (b.y1 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn image_to_canvas_maps_corners_to_dest() {
        let p = photo_placement(
            Size::new(40.0, 20.0),
            100.0,
            LayerTransform::translation(5.0, 0.0),
        );
        let a = p.image_to_canvas(40, 20);
        let tl = a * Point::new(0.0, 0.0);
        let br = a * Point::new(40.0, 20.0);
        assert!((tl.x - 5.0).abs() < 1e-9 && (tl.y - 25.0).abs() < 1e-9);
        assert!((br.x - 105.0).abs() < 1e-9 && (br.y - 75.0).abs() < 1e-9);
    }

    #[test]
    fn overlay_placement_keeps_aspect_and_anchors_at_top_left() {
        let p = overlay_placement(
            Size::new(200.0, 100.0),
            50.0,
            LayerTransform::translation(30.0, 40.0),
        );
        assert_eq!(p.dest.size(), Size::new(50.0, 25.0));
        let c = p.content_center();
        assert!((c.x - 30.0).abs() < 1e-9 && (c.y - 40.0).abs() < 1e-9);
    }
}
