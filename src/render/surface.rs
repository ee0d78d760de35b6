use crate::foundation::core::{Rect, Rgba8};
use crate::foundation::error::{HatfitError, HatfitResult};
use crate::foundation::math::{premultiply, unpremultiply};
use crate::raster::RasterBuffer;

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)` inside a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelBounds {
    /// Pixels touched by `rect`, clipped to a `width`x`height` surface.
    pub fn enclosing(rect: Rect, width: u32, height: u32) -> Option<Self> {
        if ![rect.x0, rect.y0, rect.x1, rect.y1].iter().all(|v| v.is_finite()) {
            return None;
        }
        let clamp_x = |v: f64| v.clamp(0.0, f64::from(width)) as u32;
        let clamp_y = |v: f64| v.clamp(0.0, f64::from(height)) as u32;
        let b = Self {
            x0: clamp_x(rect.x0.floor()),
            y0: clamp_y(rect.y0.floor()),
            x1: clamp_x(rect.x1.ceil()),
            y1: clamp_y(rect.y1.ceil()),
        };
        (!b.is_empty()).then_some(b)
    }

    pub fn width(self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Grow by `margin` on every side, clamped to a `width`x`height` surface.
    pub fn expand(self, margin: u32, width: u32, height: u32) -> Self {
        Self {
            x0: self.x0.saturating_sub(margin),
            y0: self.y0.saturating_sub(margin),
            x1: self.x1.saturating_add(margin).min(width),
            y1: self.y1.saturating_add(margin).min(height),
        }
    }
}

/// Premultiplied RGBA8 render target backed by a `vello_cpu` pixmap.
pub struct Surface {
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    pub fn transparent(width: u32, height: u32) -> HatfitResult<Self> {
        let (w, h) = surface_dims(width, height)?;
        Ok(Self {
            pixmap: vello_cpu::Pixmap::new(w, h),
        })
    }

    pub fn filled(width: u32, height: u32, px: Rgba8) -> HatfitResult<Self> {
        let mut surface = Self::transparent(width, height)?;
        clear_pixmap(&mut surface.pixmap, premultiply(px));
        Ok(surface)
    }

    pub fn into_raster(self) -> HatfitResult<RasterBuffer> {
        let mut data = self.pixmap.data_as_u8_slice().to_vec();
        for px in data.chunks_exact_mut(4) {
            let straight = unpremultiply([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&straight);
        }
        RasterBuffer::from_rgba8(self.width(), self.height(), data)
    }

    pub fn width(&self) -> u32 {
        u32::from(self.pixmap.width())
    }

    pub fn height(&self) -> u32 {
        u32::from(self.pixmap.height())
    }

    pub(crate) fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub(crate) fn render_context(&self) -> vello_cpu::RenderContext {
        vello_cpu::RenderContext::new(self.pixmap.width(), self.pixmap.height())
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut vello_cpu::Pixmap {
        &mut self.pixmap
    }

    pub(crate) fn premul_at(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        let data = self.data();
        [data[i], data[i + 1], data[i + 2], data[i + 3]]
    }

    /// Copy a region out as a tightly packed premultiplied buffer.
    pub(crate) fn copy_region(&self, region: PixelBounds) -> Vec<u8> {
        let data = self.data();
        let mut out = Vec::with_capacity((region.width() * region.height() * 4) as usize);
        for y in region.y0..region.y1 {
            let start = self.index(region.x0, y);
            let end = start + (region.width() as usize) * 4;
            out.extend_from_slice(&data[start..end]);
        }
        out
    }

    /// Source-over a tightly packed premultiplied buffer covering `region`.
    ///
    /// `region` is expressed in a frame whose origin sits at `(-inset, -inset)` on this
    /// surface; whatever falls outside the surface is dropped.
    pub(crate) fn blend_region(
        &mut self,
        src: &[u8],
        region: PixelBounds,
        inset: u32,
        opacity: f32,
    ) -> HatfitResult<()> {
        let row_len = (region.width() as usize) * 4;
        if src.len() != row_len * region.height() as usize {
            return Err(HatfitError::validation(
                "blend_region expects src matching region size",
            ));
        }
        let x0 = region.x0.max(inset);
        let y0 = region.y0.max(inset);
        let x1 = region.x1.min(inset + self.width());
        let y1 = region.y1.min(inset + self.height());
        if x0 >= x1 || y0 >= y1 {
            return Ok(());
        }

        let span = ((x1 - x0) as usize) * 4;
        for y in y0..y1 {
            let src_start =
                ((y - region.y0) as usize) * row_len + ((x0 - region.x0) as usize) * 4;
            let dst_start = self.index(x0 - inset, y - inset);
            let dst = &mut self.pixmap.data_as_u8_slice_mut()[dst_start..dst_start + span];
            super::composite::over_in_place(dst, &src[src_start..src_start + span], opacity)?;
        }
        Ok(())
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width() as usize) + (x as usize)) * 4
    }
}

fn surface_dims(width: u32, height: u32) -> HatfitResult<(u16, u16)> {
    if width == 0 || height == 0 {
        return Err(HatfitError::validation("surface size must be non-zero"));
    }
    let w: u16 = width
        .try_into()
        .map_err(|_| HatfitError::validation("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| HatfitError::validation("surface height exceeds u16"))?;
    Ok((w, h))
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, premul: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&premul);
    }
}

/// Premultiplied pixmap holding `raster`, usable as an image paint.
pub(crate) fn raster_to_pixmap(raster: &RasterBuffer) -> HatfitResult<vello_cpu::Pixmap> {
    let (w, h) = surface_dims(raster.width(), raster.height())?;
    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(raster.width() as usize * raster.height() as usize);
    for px in raster.pixels() {
        let [r, g, b, a] = premultiply(px);
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 { r, g, b, a });
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_surface_reads_back_as_straight_rgba() {
        let px = [10, 200, 30, 255];
        let back = Surface::filled(3, 2, px).unwrap().into_raster().unwrap();
        assert_eq!(back, RasterBuffer::filled(3, 2, px).unwrap());
        let clear = Surface::transparent(2, 2).unwrap().into_raster().unwrap();
        assert!(clear.pixels().all(|px| px == [0, 0, 0, 0]));
    }

    #[test]
    fn pixmap_from_raster_is_premultiplied() {
        let raster = RasterBuffer::from_fn(2, 1, |x, _| {
            if x == 0 {
                [200, 100, 50, 255]
            } else {
                [200, 100, 50, 0]
            }
        })
        .unwrap();
        let pixmap = raster_to_pixmap(&raster).unwrap();
        assert_eq!(
            pixmap.data_as_u8_slice(),
            &[200, 100, 50, 255, 0, 0, 0, 0][..]
        );
    }

    #[test]
    fn oversized_and_empty_surfaces_are_rejected() {
        assert!(Surface::transparent(70_000, 4).is_err());
        assert!(Surface::transparent(4, 0).is_err());
    }

    #[test]
    fn copy_and_blend_region_address_the_same_pixels() {
        let mut s = Surface::filled(4, 4, [255, 255, 255, 255]).unwrap();
        let region = PixelBounds {
            x0: 1,
            y0: 2,
            x1: 3,
            y1: 4,
        };
        let red = [255u8, 0, 0, 255].repeat(4);
        s.blend_region(&red, region, 0, 1.0).unwrap();
        assert_eq!(s.copy_region(region), red);
        assert_eq!(s.premul_at(0, 0), [255, 255, 255, 255]);
        assert_eq!(s.premul_at(2, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn inset_blend_drops_pixels_outside_the_surface() {
        let mut s = Surface::filled(4, 4, [255, 255, 255, 255]).unwrap();
        // a 3x3 red block at (-1, -1) in surface space
        let region = PixelBounds {
            x0: 1,
            y0: 1,
            x1: 4,
            y1: 4,
        };
        s.blend_region(&[255u8, 0, 0, 255].repeat(9), region, 2, 1.0)
            .unwrap();
        assert_eq!(s.premul_at(0, 0), [255, 0, 0, 255]);
        assert_eq!(s.premul_at(1, 1), [255, 0, 0, 255]);
        assert_eq!(s.premul_at(2, 2), [255, 255, 255, 255]);
        assert_eq!(s.premul_at(2, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn enclosing_clips_and_rejects_off_surface_rects() {
        let b = PixelBounds::enclosing(Rect::new(-3.5, 1.2, 2.5, 9.0), 6, 8).unwrap();
        assert_eq!(
            b,
            PixelBounds {
                x0: 0,
                y0: 1,
                x1: 3,
                y1: 8
            }
        );
        assert!(PixelBounds::enclosing(Rect::new(10.0, 0.0, 12.0, 2.0), 6, 8).is_none());
        assert!(PixelBounds::enclosing(Rect::new(f64::NAN, 0.0, 1.0, 1.0), 6, 8).is_none());
    }

    #[test]
    fn expand_clamps_to_surface() {
        let b = PixelBounds {
            x0: 2,
            y0: 2,
            x1: 5,
            y1: 5,
        }
        .expand(4, 6, 8);
        assert_eq!(
            b,
            PixelBounds {
                x0: 0,
                y0: 0,
                x1: 6,
                y1: 8
            }
        );
    }
}
