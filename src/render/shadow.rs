use crate::foundation::error::HatfitResult;
use crate::foundation::math::premultiply;
use crate::render::blur::{blur_rgba8_premul, radius_for_sigma};
use crate::render::surface::{PixelBounds, Surface};

/// Canvas-style drop shadow: the layer's alpha, offset, blurred and tinted.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DropShadow {
    /// Blur amount in the canvas sense; the Gaussian sigma is half of it.
    pub blur: f32,
    pub offset_x: f64,
    pub offset_y: f64,
    pub color: [u8; 3],
    pub opacity: f32,
}

impl Default for DropShadow {
    fn default() -> Self {
        Self {
            blur: 10.0,
            offset_x: 0.0,
            offset_y: 5.0,
            color: [0, 0, 0],
            opacity: 0.3,
        }
    }
}

impl DropShadow {
    pub fn sigma(&self) -> f32 {
        (self.blur / 2.0).max(0.0)
    }

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0 && self.opacity.is_finite()
    }

    /// How far outside a layer's pixels the shadow can reach.
    pub fn reach(&self) -> u32 {
        if !self.is_visible() {
            return 0;
        }
        let (dx, dy) = self.offset_px();
        radius_for_sigma(self.sigma()) + dx.unsigned_abs().max(dy.unsigned_abs()) as u32
    }

    fn offset_px(&self) -> (i64, i64) {
        (self.offset_x.round() as i64, self.offset_y.round() as i64)
    }

    /// Paint the shadow of `layer` (restricted to `layer_bounds`) onto `canvas`.
    ///
    /// `layer` extends `inset` pixels past the canvas on every side, so content slightly
    /// off-canvas still casts its shadow onto the visible area.
    pub fn paint(
        &self,
        canvas: &mut Surface,
        layer: &Surface,
        layer_bounds: PixelBounds,
        inset: u32,
    ) -> HatfitResult<()> {
        if !self.is_visible() || layer_bounds.is_empty() {
            return Ok(());
        }
        let (dx, dy) = self.offset_px();
        let radius = radius_for_sigma(self.sigma());
        let region = layer_bounds.expand(self.reach(), layer.width(), layer.height());

        let [r, g, b] = self.color;
        let mut mask = Vec::with_capacity((region.width() * region.height() * 4) as usize);
        for y in region.y0..region.y1 {
            for x in region.x0..region.x1 {
                let sx = i64::from(x) - dx;
                let sy = i64::from(y) - dy;
                let inside = sx >= 0
                    && sy >= 0
                    && sx < i64::from(layer.width())
                    && sy < i64::from(layer.height());
                let a = if inside {
                    layer.premul_at(sx as u32, sy as u32)[3]
                } else {
                    0
                };
                mask.extend_from_slice(&premultiply([r, g, b, a]));
            }
        }

        let blurred = blur_rgba8_premul(
            &mask,
            region.width(),
            region.height(),
            radius,
            self.sigma(),
        )?;
        canvas.blend_region(&blurred, region, inset, self.opacity)
    }
}
