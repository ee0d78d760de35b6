//! Seam to the external generative-image service plus the prompt it is given.
//!
//! The service itself (network client, retries, credentials) lives outside this crate.
//! Callers implement [`OverlayGenerator`]; this module turns whatever comes back into a
//! matted overlay raster.

use crate::codec;
use crate::foundation::error::{HatfitError, HatfitResult};
use crate::matte::{Matte, MatteExtractor};
use crate::raster::RasterBuffer;

/// Raw, fully received generator output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedOverlay {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub trait OverlayGenerator {
    fn generate(
        &mut self,
        photo: &RasterBuffer,
        options: &HatOptions,
    ) -> HatfitResult<GeneratedOverlay>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatPattern {
    #[default]
    Solid,
    Striped,
    Plaid,
    Snowflakes,
    Dots,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatColor {
    #[default]
    Red,
    Blue,
    Gold,
    Pink,
    Green,
    Silver,
    Black,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatMaterial {
    #[default]
    Velvet,
    Knit,
    Silk,
    Fur,
    Felt,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HatTrim {
    #[default]
    Classic,
    None,
    Gold,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum HatOptions {
    Structured {
        #[serde(default)]
        pattern: HatPattern,
        #[serde(default)]
        color: HatColor,
        #[serde(default)]
        material: HatMaterial,
        #[serde(default)]
        trim: HatTrim,
        #[serde(default)]
        decor: Vec<String>,
    },
    Freeform {
        prompt: String,
    },
}

impl Default for HatOptions {
    fn default() -> Self {
        Self::Structured {
            pattern: HatPattern::default(),
            color: HatColor::default(),
            material: HatMaterial::default(),
            trim: HatTrim::default(),
            decor: Vec::new(),
        }
    }
}

impl HatPattern {
    fn describe(self) -> &'static str {
        match self {
            Self::Solid => "Solid color design, no pattern",
            Self::Striped => "Candy Cane Stripes pattern (diagonal stripes)",
            Self::Plaid => "Scottish Tartan Plaid pattern",
            Self::Snowflakes => "Nordic pattern with Snowflake motifs",
            Self::Dots => "Polka Dot pattern",
        }
    }
}

impl HatColor {
    fn describe(self) -> &'static str {
        match self {
            Self::Red => "Vibrant Cardinal Red",
            Self::Blue => "Royal Blue",
            Self::Gold => "Metallic Gold",
            Self::Pink => "Pastel Pink",
            Self::Green => "Forest Green",
            Self::Silver => "Shimmering Silver",
            Self::Black => "Elegant Black",
        }
    }
}

impl HatMaterial {
    fn describe(self) -> &'static str {
        match self {
            Self::Velvet => "Plush Velvet fabric",
            Self::Knit => "Chunky Hand-Knitted Wool texture",
            Self::Silk => "Smooth Satin/Silk",
            Self::Fur => "Faux Fur texture all over",
            Self::Felt => "Stiff Felt material",
        }
    }
}

impl HatTrim {
    fn describe(self) -> &'static str {
        match self {
            Self::Classic => "thick fluffy white fur brim and pompom",
            Self::None => "simple fabric brim (no fur)",
            Self::Gold => "gold braided brim",
        }
    }
}

impl HatOptions {
    pub fn object_description(&self) -> String {
        match self {
            Self::Freeform { prompt } => prompt.trim().to_string(),
            Self::Structured {
                pattern,
                color,
                material,
                trim,
                decor,
            } => {
                let mut out = String::from(
                    "A Christmas Santa Hat (classic conical shape with folded brim and a pompom at the tip). ",
                );
                out.push_str(&format!("Pattern: {}. ", pattern.describe()));
                out.push_str(&format!("Main Color: {}. ", color.describe()));
                out.push_str(&format!("Material: {}. ", material.describe()));
                out.push_str(&format!("Trim Style: {}. ", trim.describe()));
                let decor: Vec<&str> = decor
                    .iter()
                    .map(|d| d.trim())
                    .filter(|d| !d.is_empty())
                    .collect();
                if !decor.is_empty() {
                    out.push_str(&format!(
                        "Decorations: {} attached to the hat. ",
                        decor.join(", ")
                    ));
                }
                out.trim_end().to_string()
            }
        }
    }
}

/// Full prompt for the generator. The background constraint is what the green-screen
/// matte path relies on.
pub fn build_prompt(options: &HatOptions) -> String {
    format!(
        "TASK: Generate a SINGLE, ISOLATED Christmas Hat asset that looks like it belongs in the provided user image.

[STYLE]
1. Match the input image's art style, rendering, texture and noise level.
2. Match its sharpness: blurry input gets a blurry hat, crisp input a crisp hat.
3. Match the lighting direction, color temperature and contrast.

[OBJECT DESCRIPTION]
{}

[TECHNICAL CONSTRAINTS]
1. BACKGROUND: Pure Chroma Key Green (Hex #00FF00). Flat color. NO gradients.
2. LIGHTING: Self-shadows on the hat only; DO NOT cast a shadow on the green background.
3. OPACITY: The object must be 100% solid and opaque.
4. PERSPECTIVE: Match the camera angle of the subject in the input image.
5. COMPOSITION: Center the object and keep it fully visible within the frame.",
        options.object_description()
    )
}

/// Decode generator output and strip its background.
///
/// A decode failure is terminal for this request; nothing here retries.
#[tracing::instrument(skip(generated, extractor), fields(mime = %generated.mime_type, len = generated.bytes.len()))]
pub fn prepare_overlay(
    generated: &GeneratedOverlay,
    extractor: &MatteExtractor,
) -> HatfitResult<Matte> {
    let mime = generated.mime_type.trim();
    let mime = if mime.is_empty() { "image/png" } else { mime };
    if !mime.starts_with("image/") {
        return Err(HatfitError::decode(format!(
            "generator returned non-image content '{mime}'"
        )));
    }
    let raster = codec::decode_image_with_mime(&generated.bytes, mime)?;
    Ok(extractor.extract(raster))
}

/// Ask `generator` for an overlay matching `photo`, then matte it.
pub fn generate_overlay(
    generator: &mut dyn OverlayGenerator,
    photo: &RasterBuffer,
    options: &HatOptions,
    extractor: &MatteExtractor,
) -> HatfitResult<Matte> {
    let generated = generator.generate(photo, options)?;
    prepare_overlay(&generated, extractor)
}
