use crate::foundation::core::Rgba8;
use crate::foundation::error::{HatfitError, HatfitResult};

/// Owned straight-alpha RGBA8 image, row-major and tightly packed.
///
/// Every constructor checks `data.len() == width * height * 4`, so a `RasterBuffer` can never
/// exist with the wrong size or channel count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> HatfitResult<Self> {
        let expected_len = byte_len(width, height)?;
        if data.len() != expected_len {
            return Err(HatfitError::validation(format!(
                "raster data length {} does not match {width}x{height} rgba8",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: u32, height: u32, px: Rgba8) -> HatfitResult<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..(len / 4) {
            data.extend_from_slice(&px);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> Rgba8,
    ) -> HatfitResult<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    pub fn pixels(&self) -> impl Iterator<Item = Rgba8> + '_ {
        self.data
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    pub(crate) fn pixels_mut(&mut self) -> std::slice::ChunksExactMut<'_, u8> {
        self.data.chunks_exact_mut(4)
    }

    pub fn is_opaque(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 255)
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

impl TryFrom<image::RgbaImage> for RasterBuffer {
    type Error = HatfitError;

    fn try_from(img: image::RgbaImage) -> HatfitResult<Self> {
        let (width, height) = img.dimensions();
        Self::from_rgba8(width, height, img.into_raw())
    }
}

fn byte_len(width: u32, height: u32) -> HatfitResult<usize> {
    if width == 0 || height == 0 {
        return Err(HatfitError::validation(format!(
            "raster dimensions must be non-zero, got {width}x{height}"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| HatfitError::validation("raster buffer size overflow"))
}

/// Rendered pixels may be off by a rounding step or two after resampling.
#[cfg(test)]
pub(crate) fn assert_rgba_near(actual: Option<Rgba8>, expected: Rgba8) {
    let Some(px) = actual else {
        panic!("pixel out of bounds, expected {expected:?}");
    };
    assert!(
        px.iter().zip(expected).all(|(&a, e)| a.abs_diff(e) <= 2),
        "{px:?} vs {expected:?}"
    );
}
