//! Reframe a source photo into an opaque square using the user's pan/zoom.

use crate::codec;
use crate::foundation::core::{NormalizedTransform, Size, Vec2, WHITE};
use crate::foundation::error::{HatfitError, HatfitResult};
use crate::raster::RasterBuffer;
use crate::render::draw::{ImagePaint, draw_image};
use crate::render::surface::Surface;
use crate::transform::photo_placement;

pub const DEFAULT_OUTPUT_SIZE: u32 = 800;

/// Pan/zoom state captured from the on-screen crop container.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CropRequest {
    /// Pan in container pixels, relative to the container center.
    pub pan: Vec2,
    pub zoom: f64,
    /// Displayed edge length of the square container.
    pub container_size: f64,
    pub output_size: u32,
}

impl CropRequest {
    pub fn new(pan: Vec2, zoom: f64, container_size: f64) -> Self {
        Self {
            pan,
            zoom,
            container_size,
            output_size: DEFAULT_OUTPUT_SIZE,
        }
    }

    pub fn with_output_size(mut self, output_size: u32) -> Self {
        self.output_size = output_size;
        self
    }

    pub fn validate(&self) -> HatfitResult<()> {
        if !self.container_size.is_finite() || self.container_size <= 0.0 {
            return Err(HatfitError::validation("crop container size must be > 0"));
        }
        if self.output_size == 0 {
            return Err(HatfitError::validation("crop output size must be > 0"));
        }
        if !self.pan.x.is_finite() || !self.pan.y.is_finite() || !self.zoom.is_finite() {
            return Err(HatfitError::validation("crop pan and zoom must be finite"));
        }
        Ok(())
    }

    /// The size-independent form of this request, replayable at any canvas size.
    pub fn normalized(&self) -> NormalizedTransform {
        NormalizedTransform {
            x: self.pan.x / self.container_size,
            y: self.pan.y / self.container_size,
            scale: self.zoom,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CropOutput {
    pub raster: RasterBuffer,
    pub transform: NormalizedTransform,
}

/// Render `source` framed by `request` onto an opaque white square.
#[tracing::instrument(skip(source), fields(src_w = source.width(), src_h = source.height()))]
pub fn crop_photo(source: &RasterBuffer, request: &CropRequest) -> HatfitResult<CropOutput> {
    request.validate()?;
    let transform = request.normalized();
    let raster = render_photo_layer(source, transform, request.output_size)?;
    Ok(CropOutput { raster, transform })
}

/// Decode `bytes` and crop; undecodable input fails with a decode error.
pub fn crop_photo_bytes(bytes: &[u8], request: &CropRequest) -> HatfitResult<CropOutput> {
    let source = codec::decode_image(bytes)?;
    crop_photo(&source, request)
}

/// White square with the photo drawn through its normalized transform.
///
/// The crop step and the background layer of the final composite both go through here,
/// which is what keeps a chosen framing identical across output sizes.
pub(crate) fn render_photo_layer(
    source: &RasterBuffer,
    transform: NormalizedTransform,
    size: u32,
) -> HatfitResult<RasterBuffer> {
    let mut canvas = Surface::filled(size, size, WHITE)?;
    paint_photo(&mut canvas, source, transform)?;
    canvas.into_raster()
}

pub(crate) fn paint_photo(
    canvas: &mut Surface,
    source: &RasterBuffer,
    transform: NormalizedTransform,
) -> HatfitResult<()> {
    let size = f64::from(canvas.width());
    let content = Size::new(f64::from(source.width()), f64::from(source.height()));
    let placement = photo_placement(content, size, transform.to_pixels(size));
    let to_canvas = placement.image_to_canvas(source.width(), source.height());
    let image = ImagePaint::from_raster(source)?;
    if draw_image(canvas, &image, to_canvas, 0)?.is_none() {
        tracing::debug!("photo layer lies entirely outside the canvas");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::assert_rgba_near;

    #[test]
    fn normalized_transform_divides_pan_by_container() {
        let req = CropRequest::new(Vec2::new(28.0, -70.0), 1.5, 280.0);
        assert_eq!(
            req.normalized(),
            NormalizedTransform {
                x: 0.1,
                y: -0.25,
                scale: 1.5
            }
        );
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let src = RasterBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let bad = CropRequest::new(Vec2::ZERO, 1.0, 0.0);
        assert!(crop_photo(&src, &bad).is_err());
        let bad = CropRequest::new(Vec2::ZERO, 1.0, 280.0).with_output_size(0);
        assert!(crop_photo(&src, &bad).is_err());
        let bad = CropRequest::new(Vec2::new(f64::NAN, 0.0), 1.0, 280.0);
        assert!(crop_photo(&src, &bad).is_err());
    }

    #[test]
    fn wide_source_leaves_white_bands() {
        let src = RasterBuffer::filled(20, 10, [0, 0, 255, 255]).unwrap();
        let req = CropRequest::new(Vec2::ZERO, 1.0, 100.0).with_output_size(40);
        let out = crop_photo(&src, &req).unwrap();
        assert_eq!(out.raster.width(), 40);
        assert_eq!(out.raster.pixel(20, 2), Some([255, 255, 255, 255]));
        assert_rgba_near(out.raster.pixel(20, 20), [0, 0, 255, 255]);
        assert_eq!(out.raster.pixel(20, 37), Some([255, 255, 255, 255]));
        assert!(out.raster.is_opaque());
    }

    #[test]
    fn pan_shifts_content_by_scaled_offset() {
        let src = RasterBuffer::filled(10, 10, [0, 0, 0, 255]).unwrap();
        // zoom 0.5 leaves a 20px square; pan 25 container px == 10 output px
        let req = CropRequest::new(Vec2::new(25.0, 0.0), 0.5, 100.0).with_output_size(40);
        let out = crop_photo(&src, &req).unwrap();
        // content now spans x in [20, 40) and y in [10, 30)
        assert_eq!(out.raster.pixel(19, 20), Some([255, 255, 255, 255]));
        assert_rgba_near(out.raster.pixel(20, 20), [0, 0, 0, 255]);
        assert_rgba_near(out.raster.pixel(39, 20), [0, 0, 0, 255]);
        assert_eq!(out.raster.pixel(20, 9), Some([255, 255, 255, 255]));
        assert_rgba_near(out.raster.pixel(20, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        let req = CropRequest::new(Vec2::ZERO, 1.0, 280.0);
        let err = crop_photo_bytes(b"not an image", &req).unwrap_err();
        assert!(err.is_decode());
    }
}
