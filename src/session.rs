//! State of the interactive editing step.
//!
//! Pointer and slider handlers mutate one of two transforms; every change can be followed by
//! a fresh [`EditSession::render_preview`]. Renders are pure, so a stale preview is simply
//! dropped by the caller.

use crate::codec::{self, OutputFormat};
use crate::compose::{ComposeSettings, LayerComposer};
use crate::foundation::core::{MIN_SCALE, NormalizedTransform, OverlayTransform, Vec2};
use crate::foundation::error::{HatfitError, HatfitResult};
use crate::raster::RasterBuffer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveLayer {
    Photo,
    #[default]
    Overlay,
}

#[derive(Clone, Debug)]
pub struct EditSession {
    photo: RasterBuffer,
    overlay: RasterBuffer,
    photo_transform: NormalizedTransform,
    overlay_transform: OverlayTransform,
    active: ActiveLayer,
    settings: ComposeSettings,
}

impl EditSession {
    /// Start editing with the framing chosen during cropping and the overlay at its default
    /// spot near the top of the canvas.
    pub fn new(
        photo: RasterBuffer,
        overlay: RasterBuffer,
        photo_transform: NormalizedTransform,
        settings: ComposeSettings,
    ) -> HatfitResult<Self> {
        settings.validate()?;
        Ok(Self {
            photo,
            overlay,
            photo_transform,
            overlay_transform: OverlayTransform::default(),
            active: ActiveLayer::default(),
            settings,
        })
    }

    pub fn active_layer(&self) -> ActiveLayer {
        self.active
    }

    pub fn select(&mut self, layer: ActiveLayer) {
        self.active = layer;
    }

    pub fn photo_transform(&self) -> NormalizedTransform {
        self.photo_transform
    }

    pub fn overlay_transform(&self) -> OverlayTransform {
        self.overlay_transform
    }

    /// Swap in a regenerated overlay, keeping its placement.
    pub fn replace_overlay(&mut self, overlay: RasterBuffer) {
        self.overlay = overlay;
    }

    /// Move the active layer by a pointer delta measured in preview-container pixels.
    pub fn drag(
        &mut self,
        delta: Vec2,
        container_width: f64,
        container_height: f64,
    ) -> HatfitResult<()> {
        if !(container_width > 0.0 && container_height > 0.0) {
            return Err(HatfitError::validation(
                "drag container must have a positive size",
            ));
        }
        let dx = delta.x / container_width;
        let dy = delta.y / container_height;
        if !dx.is_finite() || !dy.is_finite() {
            return Err(HatfitError::validation("drag delta must be finite"));
        }
        match self.active {
            ActiveLayer::Photo => {
                self.photo_transform.x += dx;
                self.photo_transform.y += dy;
            }
            ActiveLayer::Overlay => {
                self.overlay_transform.x += dx;
                self.overlay_transform.y += dy;
            }
        }
        Ok(())
    }

    /// Set the zoom of the active layer; clamped to a small positive minimum.
    pub fn set_scale(&mut self, scale: f64) {
        let scale = if scale.is_finite() { scale.max(MIN_SCALE) } else { 1.0 };
        match self.active {
            ActiveLayer::Photo => self.photo_transform.scale = scale,
            ActiveLayer::Overlay => self.overlay_transform.scale = scale,
        }
    }

    /// Overlay rotation in degrees; the photo layer never rotates.
    pub fn set_overlay_rotation(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.overlay_transform.rotation_degrees = degrees;
        }
    }

    pub fn render_preview(&self, size: u32) -> HatfitResult<RasterBuffer> {
        self.composer(size)?.compose(
            &self.photo,
            self.photo_transform,
            &self.overlay,
            self.overlay_transform,
        )
    }

    /// Final composite at the configured canvas size, PNG encoded.
    pub fn export_png(&self) -> HatfitResult<Vec<u8>> {
        let out = self.render_preview(self.settings.canvas_size)?;
        codec::encode_image(&out, OutputFormat::Png)
    }

    fn composer(&self, size: u32) -> HatfitResult<LayerComposer> {
        LayerComposer::new(self.settings.with_canvas_size(size))
    }
}

/// Download name for an exported composite, e.g. `XMAS_GIFT_1734567890123.png`.
pub fn export_file_name(unix_millis: u128) -> String {
    format!("XMAS_GIFT_{unix_millis}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EditSession {
        let photo = RasterBuffer::filled(10, 10, [0, 0, 255, 255]).unwrap();
        let overlay = RasterBuffer::filled(4, 4, [255, 0, 0, 255]).unwrap();
        EditSession::new(
            photo,
            overlay,
            NormalizedTransform::default(),
            ComposeSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn starts_on_overlay_with_default_placement() {
        let s = session();
        assert_eq!(s.active_layer(), ActiveLayer::Overlay);
        assert_eq!(
            s.overlay_transform(),
            OverlayTransform {
                x: 0.5,
                y: 0.2,
                scale: 1.0,
                rotation_degrees: 0.0
            }
        );
    }

    #[test]
    fn drag_moves_only_the_active_layer() {
        let mut s = session();
        s.drag(Vec2::new(30.0, -60.0), 300.0, 300.0).unwrap();
        let o = s.overlay_transform();
        assert!((o.x - 0.6).abs() < 1e-12 && o.y.abs() < 1e-12);
        assert_eq!(s.photo_transform(), NormalizedTransform::default());

        s.select(ActiveLayer::Photo);
        s.drag(Vec2::new(-15.0, 0.0), 300.0, 300.0).unwrap();
        assert!((s.photo_transform().x + 0.05).abs() < 1e-12);
        assert!(s.drag(Vec2::new(1.0, 1.0), 0.0, 300.0).is_err());
    }

    #[test]
    fn scale_is_clamped_and_rotation_ignores_nan() {
        let mut s = session();
        s.set_scale(-2.0);
        assert_eq!(s.overlay_transform().scale, MIN_SCALE);
        s.set_overlay_rotation(45.0);
        s.set_overlay_rotation(f64::NAN);
        assert_eq!(s.overlay_transform().rotation_degrees, 45.0);
    }

    #[test]
    fn preview_renders_are_repeatable() {
        let mut s = session();
        s.set_overlay_rotation(30.0);
        let a = s.render_preview(48).unwrap();
        let b = s.render_preview(48).unwrap();
        assert_eq!(a, b);
        assert_eq!((a.width(), a.height()), (48, 48));
        assert!(a.is_opaque());
    }

    #[test]
    fn replaced_overlay_keeps_its_placement() {
        let mut s = session();
        s.drag(Vec2::new(0.0, 90.0), 300.0, 300.0).unwrap();
        let placed = s.overlay_transform();
        let before = s.render_preview(40).unwrap();

        s.replace_overlay(RasterBuffer::filled(4, 4, [0, 255, 0, 255]).unwrap());
        assert_eq!(s.overlay_transform(), placed);
        let after = s.render_preview(40).unwrap();
        assert_ne!(before, after);
        // overlay centered at (20, 20) on a 40px preview
        let px = after.pixel(20, 20).unwrap();
        assert!(px[1] > 240 && px[0] < 20, "{px:?}");
    }

    #[test]
    fn export_name_is_timestamped_png() {
        assert_eq!(export_file_name(42), "XMAS_GIFT_42.png");
    }
}
