//! Image codec boundary: bytes and data URIs in, RGBA rasters out, and back again.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{
    ExtendedColorType, ImageEncoder,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    imageops::FilterType,
};

use crate::foundation::error::{HatfitError, HatfitResult};
use crate::raster::RasterBuffer;

/// Longest edge accepted for source photos before they are scaled down.
pub const DEFAULT_MAX_SOURCE_DIMENSION: u32 = 1280;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "format")]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    /// Encoding used for crop previews.
    pub const PREVIEW_JPEG: Self = Self::Jpeg { quality: 95 };

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }
}

pub fn decode_image(bytes: &[u8]) -> HatfitResult<RasterBuffer> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| HatfitError::decode(format!("decode image from memory: {e}")))?;
    RasterBuffer::try_from(dyn_img.to_rgba8())
}

/// Decode with a format hint taken from a mime type such as `image/png`.
pub fn decode_image_with_mime(bytes: &[u8], mime_type: &str) -> HatfitResult<RasterBuffer> {
    let Some(format) = image::ImageFormat::from_mime_type(mime_type) else {
        return decode_image(bytes);
    };
    let dyn_img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| HatfitError::decode(format!("decode {mime_type} image: {e}")))?;
    RasterBuffer::try_from(dyn_img.to_rgba8())
}

/// Split a `data:<mime>;base64,<payload>` URI into its mime type and decoded bytes.
pub fn parse_data_uri(uri: &str) -> HatfitResult<(String, Vec<u8>)> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| HatfitError::decode("data URI must start with 'data:'"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| HatfitError::decode("data URI is missing ','"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| HatfitError::decode("only base64 data URIs are supported"))?;
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| HatfitError::decode(format!("data URI payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}

pub fn decode_data_uri(uri: &str) -> HatfitResult<RasterBuffer> {
    let (mime, bytes) = parse_data_uri(uri)?;
    decode_image_with_mime(&bytes, &mime)
}

pub fn encode_image(raster: &RasterBuffer, format: OutputFormat) -> HatfitResult<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        OutputFormat::Png => {
            PngEncoder::new(&mut buffer)
                .write_image(
                    raster.as_bytes(),
                    raster.width(),
                    raster.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| HatfitError::encode(format!("encode png: {e}")))?;
        }
        OutputFormat::Jpeg { quality } => {
            // JPEG has no alpha channel; flatten onto white like the crop canvas does.
            let rgb = flatten_on_white(raster);
            JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
                .write_image(
                    &rgb,
                    raster.width(),
                    raster.height(),
                    ExtendedColorType::Rgb8,
                )
                .map_err(|e| HatfitError::encode(format!("encode jpeg: {e}")))?;
        }
    }
    Ok(buffer)
}

pub fn encode_data_uri(raster: &RasterBuffer, format: OutputFormat) -> HatfitResult<String> {
    let bytes = encode_image(raster, format)?;
    Ok(format!(
        "data:{};base64,{}",
        format.mime_type(),
        BASE64.encode(bytes)
    ))
}

/// Scale `raster` down so neither side exceeds `max_dimension`, keeping its aspect ratio.
pub fn limit_dimensions(raster: RasterBuffer, max_dimension: u32) -> HatfitResult<RasterBuffer> {
    let (w, h) = (raster.width(), raster.height());
    if max_dimension == 0 || (w <= max_dimension && h <= max_dimension) {
        return Ok(raster);
    }
    let (nw, nh) = if w > h {
        let nh = (f64::from(h) * f64::from(max_dimension) / f64::from(w)).round() as u32;
        (max_dimension, nh.max(1))
    } else {
        let nw = (f64::from(w) * f64::from(max_dimension) / f64::from(h)).round() as u32;
        (nw.max(1), max_dimension)
    };
    tracing::debug!(from = ?(w, h), to = ?(nw, nh), "downscaling source image");
    let resized = image::imageops::resize(&raster.to_rgba_image(), nw, nh, FilterType::Triangle);
    RasterBuffer::try_from(resized)
}

fn flatten_on_white(raster: &RasterBuffer) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(raster.as_bytes().len() / 4 * 3);
    for [r, g, b, a] in raster.pixels() {
        let a = u32::from(a);
        for c in [r, g, b] {
            let v = (u32::from(c) * a + 255 * (255 - a) + 127) / 255;
            rgb.push(v as u8);
        }
    }
    rgb
}
