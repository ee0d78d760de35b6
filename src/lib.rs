//! hatfit crops a photo, strips the background from a generated overlay, and composites the
//! two into one square image.
//!
//! # Pipeline overview
//!
//! 1. **Crop**: `source + pan/zoom -> opaque square + NormalizedTransform` ([`crop_photo`])
//! 2. **Matte**: `generated overlay -> hard-alpha overlay` ([`MatteExtractor`])
//! 3. **Compose**: `photo + overlay + transforms -> opaque square` ([`LayerComposer`])
//! 4. **Encode**: PNG for the final image, JPEG for crop previews ([`encode_image`])
//!
//! Every stage is a pure function over owned RGBA8 buffers. Layers are drawn on the CPU with
//! `vello_cpu`, so output is deterministic for a given input.
#![forbid(unsafe_code)]

mod foundation;
mod render;

pub mod codec;
pub mod compose;
pub mod config;
pub mod crop;
pub mod matte;
pub mod overlay;
pub mod raster;
pub mod session;
pub mod transform;

pub use codec::{
    DEFAULT_MAX_SOURCE_DIMENSION, OutputFormat, decode_data_uri, decode_image,
    decode_image_with_mime, encode_data_uri, encode_image, limit_dimensions, parse_data_uri,
};
pub use compose::{
    ComposeSettings, DEFAULT_CANVAS_SIZE, LayerComposer, compose_final, compose_final_png,
};
pub use config::{CropSettings, PipelineConfig, SourceSettings};
pub use crop::{CropOutput, CropRequest, DEFAULT_OUTPUT_SIZE, crop_photo, crop_photo_bytes};
pub use foundation::core::{
    Affine, LayerTransform, MIN_SCALE, NormalizedTransform, OverlayTransform, Point, Rect, Rgba8,
    Size, Vec2, WHITE,
};
pub use foundation::error::{HatfitError, HatfitResult};
pub use matte::{
    BackgroundKind, Matte, MatteExtractor, MatteParams, MatteReport, MatteWarning, extract_matte,
};
pub use overlay::{
    GeneratedOverlay, HatColor, HatMaterial, HatOptions, HatPattern, HatTrim, OverlayGenerator,
    build_prompt, generate_overlay, prepare_overlay,
};
pub use raster::RasterBuffer;
pub use render::shadow::DropShadow;
pub use session::{ActiveLayer, EditSession, export_file_name};
