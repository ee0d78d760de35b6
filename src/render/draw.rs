use std::sync::Arc;

use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::HatfitResult;
use crate::raster::RasterBuffer;
use crate::render::surface::{PixelBounds, Surface, raster_to_pixmap};

/// A raster prepared as a `vello_cpu` image paint.
#[derive(Clone)]
pub struct ImagePaint {
    paint: vello_cpu::Image,
    width: f64,
    height: f64,
}

impl ImagePaint {
    pub fn from_raster(raster: &RasterBuffer) -> HatfitResult<Self> {
        let pixmap = raster_to_pixmap(raster)?;
        Ok(Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            width: f64::from(raster.width()),
            height: f64::from(raster.height()),
        })
    }

    fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Draw `image` onto `dst` through `to_canvas`, which maps image pixel coordinates to
/// surface coordinates. `inset` shifts the surface origin, so a padded layer can hold content
/// that lies just outside the canvas.
///
/// Returns the pixels that may have been touched, or `None` when the image lands entirely
/// outside `dst`.
pub fn draw_image(
    dst: &mut Surface,
    image: &ImagePaint,
    to_canvas: Affine,
    inset: u32,
) -> HatfitResult<Option<PixelBounds>> {
    if to_canvas.determinant().abs() < f64::EPSILON {
        return Ok(None);
    }
    let to_surface = Affine::translate((f64::from(inset), f64::from(inset))) * to_canvas;
    let Some(bounds) = PixelBounds::enclosing(
        to_surface.transform_rect_bbox(image.rect()),
        dst.width(),
        dst.height(),
    ) else {
        return Ok(None);
    };

    let mut layer = Surface::transparent(dst.width(), dst.height())?;
    let mut ctx = layer.render_context();
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_transform(affine_to_cpu(to_surface));
    ctx.set_paint(image.paint.clone());
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        image.width,
        image.height,
    ));
    ctx.flush();
    ctx.render_to_pixmap(layer.pixmap_mut());

    dst.blend_region(&layer.copy_region(bounds), bounds, 0, 1.0)?;
    Ok(Some(bounds))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}
