//! Final two-layer composite: photo below, matted overlay (with drop shadow) above.

use crate::codec::{self, OutputFormat};
use crate::crop::paint_photo;
use crate::foundation::core::{NormalizedTransform, OverlayTransform, Size, WHITE};
use crate::foundation::error::{HatfitError, HatfitResult};
use crate::raster::RasterBuffer;
use crate::render::draw::{ImagePaint, draw_image};
use crate::render::shadow::DropShadow;
use crate::render::surface::Surface;
use crate::transform::overlay_placement;

pub const DEFAULT_CANVAS_SIZE: u32 = 800;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ComposeSettings {
    pub canvas_size: u32,
    /// Overlay base width as a fraction of the canvas edge.
    pub overlay_footprint: f64,
    pub shadow: DropShadow,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            overlay_footprint: 0.5,
            shadow: DropShadow::default(),
        }
    }
}

impl ComposeSettings {
    pub fn with_canvas_size(mut self, canvas_size: u32) -> Self {
        self.canvas_size = canvas_size;
        self
    }

    pub fn validate(&self) -> HatfitResult<()> {
        if self.canvas_size == 0 {
            return Err(HatfitError::validation("canvas size must be > 0"));
        }
        if !self.overlay_footprint.is_finite() || self.overlay_footprint <= 0.0 {
            return Err(HatfitError::validation("overlay footprint must be > 0"));
        }
        if !self.shadow.blur.is_finite() || self.shadow.blur < 0.0 {
            return Err(HatfitError::validation("shadow blur must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.shadow.opacity) {
            return Err(HatfitError::validation("shadow opacity must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Draws the photo and overlay layers onto one square canvas.
#[derive(Clone, Copy, Debug, Default)]
pub struct LayerComposer {
    settings: ComposeSettings,
}

impl LayerComposer {
    pub fn new(settings: ComposeSettings) -> HatfitResult<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ComposeSettings {
        &self.settings
    }

    /// Background first, overlay second; the overlay always ends up on top.
    #[tracing::instrument(skip(self, photo, overlay), fields(canvas = self.settings.canvas_size))]
    pub fn compose(
        &self,
        photo: &RasterBuffer,
        photo_transform: NormalizedTransform,
        overlay: &RasterBuffer,
        overlay_transform: OverlayTransform,
    ) -> HatfitResult<RasterBuffer> {
        let size = self.settings.canvas_size;
        let mut canvas = Surface::filled(size, size, WHITE)?;

        paint_photo(&mut canvas, photo, photo_transform)?;
        self.paint_overlay(&mut canvas, overlay, overlay_transform)?;

        let out = canvas.into_raster()?;
        debug_assert!(out.is_opaque());
        Ok(out)
    }

    fn paint_overlay(
        &self,
        canvas: &mut Surface,
        overlay: &RasterBuffer,
        transform: OverlayTransform,
    ) -> HatfitResult<()> {
        let size = f64::from(canvas.width());
        let content = Size::new(f64::from(overlay.width()), f64::from(overlay.height()));
        let placement = overlay_placement(
            content,
            size * self.settings.overlay_footprint,
            transform.to_pixels(size),
        );
        let to_canvas = placement.image_to_canvas(overlay.width(), overlay.height());

        // padded so content just off the canvas still casts its shadow onto it
        let inset = self.settings.shadow.reach();
        let mut layer = Surface::transparent(
            canvas.width() + 2 * inset,
            canvas.height() + 2 * inset,
        )?;
        let image = ImagePaint::from_raster(overlay)?;
        let Some(bounds) = draw_image(&mut layer, &image, to_canvas, inset)? else {
            tracing::debug!("overlay lies entirely outside the canvas");
            return Ok(());
        };

        self.settings.shadow.paint(canvas, &layer, bounds, inset)?;
        let pixels = layer.copy_region(bounds);
        canvas.blend_region(&pixels, bounds, inset, 1.0)
    }
}

/// Compose with default settings at `canvas_size`.
pub fn compose_final(
    photo: &RasterBuffer,
    photo_transform: NormalizedTransform,
    overlay: &RasterBuffer,
    overlay_transform: OverlayTransform,
    canvas_size: u32,
) -> HatfitResult<RasterBuffer> {
    let composer = LayerComposer::new(ComposeSettings::default().with_canvas_size(canvas_size))?;
    composer.compose(photo, photo_transform, overlay, overlay_transform)
}

/// Compose and encode as PNG.
pub fn compose_final_png(
    photo: &RasterBuffer,
    photo_transform: NormalizedTransform,
    overlay: &RasterBuffer,
    overlay_transform: OverlayTransform,
    canvas_size: u32,
) -> HatfitResult<Vec<u8>> {
    let out = compose_final(
        photo,
        photo_transform,
        overlay,
        overlay_transform,
        canvas_size,
    )?;
    codec::encode_image(&out, OutputFormat::Png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::assert_rgba_near;

    fn no_shadow(size: u32) -> LayerComposer {
        LayerComposer::new(ComposeSettings {
            canvas_size: size,
            shadow: DropShadow {
                opacity: 0.0,
                ..DropShadow::default()
            },
            ..ComposeSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn settings_validation() {
        assert!(LayerComposer::new(ComposeSettings::default().with_canvas_size(0)).is_err());
        let composer =
            LayerComposer::new(ComposeSettings::default().with_canvas_size(64)).unwrap();
        assert_eq!(composer.settings().canvas_size, 64);
        assert_eq!(composer.settings().shadow, DropShadow::default());
        let bad = ComposeSettings {
            overlay_footprint: 0.0,
            ..ComposeSettings::default()
        };
        assert!(bad.validate().is_err());
        let bad = ComposeSettings {
            shadow: DropShadow {
                opacity: 1.5,
                ..DropShadow::default()
            },
            ..ComposeSettings::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn overlay_footprint_is_half_the_canvas() {
        let photo = RasterBuffer::filled(8, 8, [0, 0, 255, 255]).unwrap();
        let overlay = RasterBuffer::filled(4, 2, [255, 0, 0, 255]).unwrap();
        let t = OverlayTransform {
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            rotation_degrees: 0.0,
        };
        let out = no_shadow(40)
            .compose(&photo, NormalizedTransform::default(), &overlay, t)
            .unwrap();
        // overlay spans x in [10, 30) and y in [15, 25)
        assert_rgba_near(out.pixel(10, 20), [255, 0, 0, 255]);
        assert_rgba_near(out.pixel(29, 15), [255, 0, 0, 255]);
        assert_rgba_near(out.pixel(9, 20), [0, 0, 255, 255]);
        assert_rgba_near(out.pixel(20, 14), [0, 0, 255, 255]);
    }

    #[test]
    fn rotation_turns_the_overlay_footprint() {
        let photo = RasterBuffer::filled(8, 8, [255, 255, 255, 255]).unwrap();
        let overlay = RasterBuffer::filled(4, 1, [0, 0, 0, 255]).unwrap();
        let t = OverlayTransform {
            x: 0.5,
            y: 0.5,
            scale: 1.0,
            rotation_degrees: 90.0,
        };
        let out = no_shadow(40)
            .compose(&photo, NormalizedTransform::default(), &overlay, t)
            .unwrap();
        // a 20x5 bar turned upright
        assert_rgba_near(out.pixel(20, 12), [0, 0, 0, 255]);
        assert_rgba_near(out.pixel(12, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_overlay_pixels_show_the_photo() {
        let photo = RasterBuffer::filled(8, 8, [0, 200, 0, 255]).unwrap();
        let overlay = RasterBuffer::filled(4, 4, [255, 0, 0, 0]).unwrap();
        let out = compose_final(
            &photo,
            NormalizedTransform::default(),
            &overlay,
            OverlayTransform::default(),
            32,
        )
        .unwrap();
        for px in out.pixels() {
            assert_rgba_near(Some(px), [0, 200, 0, 255]);
        }
    }

    #[test]
    fn shadow_darkens_photo_below_overlay() {
        let photo = RasterBuffer::filled(8, 8, [255, 255, 255, 255]).unwrap();
        let overlay = RasterBuffer::filled(4, 4, [255, 0, 0, 255]).unwrap();
        let t = OverlayTransform {
            x: 0.5,
            y: 0.4,
            scale: 0.5,
            rotation_degrees: 0.0,
        };
        let out = compose_final(&photo, NormalizedTransform::default(), &overlay, t, 80).unwrap();
        // overlay covers [30, 50) x [22, 42); the shadow falls 5px lower
        assert_rgba_near(out.pixel(40, 30), [255, 0, 0, 255]);
        let below = out.pixel(40, 44).unwrap();
        assert!(below[0] < 255);
        assert_eq!(below[3], 255);
        assert_rgba_near(out.pixel(2, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn overlay_just_above_the_canvas_still_shades_the_top_rows() {
        let photo = RasterBuffer::filled(8, 8, [255, 255, 255, 255]).unwrap();
        let overlay = RasterBuffer::filled(4, 1, [255, 0, 0, 255]).unwrap();
        // a 40x10 bar centered at y = -5, so it covers rows [-10, 0)
        let t = OverlayTransform {
            x: 0.5,
            y: -5.0 / 80.0,
            scale: 1.0,
            rotation_degrees: 0.0,
        };
        let out = compose_final(&photo, NormalizedTransform::default(), &overlay, t, 80).unwrap();
        let shaded = out.pixel(40, 1).unwrap();
        // gray, not red: only the shadow reaches the canvas
        assert!(shaded[0] < 240 && shaded[1] < 240, "{shaded:?}");
        assert_rgba_near(out.pixel(40, 40), [255, 255, 255, 255]);
        assert!(out.is_opaque());
    }
}
