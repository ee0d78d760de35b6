pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Smallest scale a layer may take; smaller or non-finite values are clamped to this.
pub const MIN_SCALE: f64 = 1e-3;

/// Straight (non-premultiplied) RGBA8 pixel.
pub type Rgba8 = [u8; 4];

pub const WHITE: Rgba8 = [255, 255, 255, 255];

/// Pixel-space placement of a layer relative to some origin.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayerTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64, // must be > 0
    pub rotation_degrees: f64,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
            rotation_degrees: 0.0,
        }
    }
}

impl LayerTransform {
    pub fn translation(x: f64, y: f64) -> Self {
        Self {
            translate_x: x,
            translate_y: y,
            ..Self::default()
        }
    }

    /// Copy with every field made finite and the scale clamped to [`MIN_SCALE`].
    pub fn sanitized(self) -> Self {
        fn finite_or(v: f64, fallback: f64) -> f64 {
            if v.is_finite() { v } else { fallback }
        }

        Self {
            translate_x: finite_or(self.translate_x, 0.0),
            translate_y: finite_or(self.translate_y, 0.0),
            scale: finite_or(self.scale, MIN_SCALE).max(MIN_SCALE),
            rotation_degrees: finite_or(self.rotation_degrees, 0.0),
        }
    }

    /// Affine mapping layer-local coordinates onto the canvas.
    ///
    /// Canonical order: T(origin) * T(translate) * R(rotation) * S(scale).
    pub fn to_affine(self, origin: Point) -> Affine {
        let t = self.sanitized();
        let t_origin = Affine::translate(origin.to_vec2());
        let t_translate = Affine::translate(Vec2::new(t.translate_x, t.translate_y));
        let t_rotate = Affine::rotate(t.rotation_degrees.to_radians());
        let t_scale = Affine::scale(t.scale);

        t_origin * t_translate * t_rotate * t_scale
    }
}

/// Size-independent pan/zoom of the photo layer.
///
/// `x`/`y` are fractions of the container the user edited in, so the same framing can be
/// replayed on a canvas of any size.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NormalizedTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for NormalizedTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl NormalizedTransform {
    pub fn to_pixels(self, canvas_size: f64) -> LayerTransform {
        LayerTransform {
            translate_x: self.x * canvas_size,
            translate_y: self.y * canvas_size,
            scale: self.scale,
            rotation_degrees: 0.0,
        }
    }
}

/// Placement of the overlay layer; `x`/`y` are fractions of the canvas measured from its
/// top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation_degrees: f64,
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.2,
            scale: 1.0,
            rotation_degrees: 0.0,
        }
    }
}

impl OverlayTransform {
    pub fn to_pixels(self, canvas_size: f64) -> LayerTransform {
        LayerTransform {
            translate_x: self.x * canvas_size,
            translate_y: self.y * canvas_size,
            scale: self.scale,
            rotation_degrees: self.rotation_degrees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_transform_identity_and_translation() {
        let t = LayerTransform::default();
        assert_eq!(t.to_affine(Point::ORIGIN), Affine::IDENTITY);

        let t = LayerTransform::translation(10.0, -2.5);
        assert_eq!(
            t.to_affine(Point::new(1.0, 1.0)),
            Affine::translate(Vec2::new(11.0, -1.5))
        );
    }

    #[test]
    fn scale_applies_around_translated_origin() {
        let t = LayerTransform {
            translate_x: 10.0,
            translate_y: 0.0,
            scale: 2.0,
            rotation_degrees: 90.0,
        };
        let p = t.to_affine(Point::new(100.0, 100.0)) * Point::new(1.0, 0.0);
        // (1,0) scaled to (2,0), rotated to (0,2), then moved to the origin (110,100).
        assert!((p.x - 110.0).abs() < 1e-9);
        assert!((p.y - 102.0).abs() < 1e-9);
    }

    #[test]
    fn sanitized_clamps_scale_and_non_finite_fields() {
        let t = LayerTransform {
            translate_x: f64::NAN,
            translate_y: 3.0,
            scale: -1.0,
            rotation_degrees: f64::INFINITY,
        }
        .sanitized();
        assert_eq!(t.translate_x, 0.0);
        assert_eq!(t.translate_y, 3.0);
        assert_eq!(t.scale, MIN_SCALE);
        assert_eq!(t.rotation_degrees, 0.0);
    }

    #[test]
    fn normalized_transform_scales_with_canvas() {
        let n = NormalizedTransform {
            x: 0.25,
            y: -0.1,
            scale: 1.5,
        };
        let small = n.to_pixels(280.0);
        let large = n.to_pixels(800.0);
        assert!((small.translate_x - 70.0).abs() < 1e-9);
        assert!((large.translate_x - 200.0).abs() < 1e-9);
        assert!((large.translate_y + 80.0).abs() < 1e-9);
        assert_eq!(large.scale, 1.5);
    }
}
