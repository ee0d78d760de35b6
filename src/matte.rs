//! Background classification and hard-matte extraction for generated overlays.
//!
//! Generated overlays are requested on a flat chroma-key green. When the generator honors
//! that, the green-screen path removes the key and despills edges. Otherwise the top-left
//! pixel is taken as the background color and everything close to it is removed.

use crate::raster::RasterBuffer;

/// Tunable thresholds for classification and extraction.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MatteParams {
    /// Reference green must exceed this to count as a chroma key.
    pub key_green_min: u8,
    /// Reference red and blue must stay below this to count as a chroma key.
    pub key_other_max: u8,
    /// `G - max(R, B)` above this marks a pixel as key background.
    pub dominance_threshold: i16,
    /// Pixels with both R and B above this are never keyed out (white fur, highlights).
    pub bright_threshold: u8,
    /// Euclidean RGB distance below which a pixel matches a solid background.
    pub distance_threshold: f32,
}

impl Default for MatteParams {
    fn default() -> Self {
        Self {
            key_green_min: 150,
            key_other_max: 100,
            dominance_threshold: 45,
            bright_threshold: 70,
            distance_threshold: 40.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackgroundKind {
    GreenScreen,
    SolidColor { reference: [u8; 3] },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatteWarning {
    /// No foreground/background separation was found; the matte is uniform.
    Degenerate { all_transparent: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatteReport {
    pub background: BackgroundKind,
    pub transparent_pixels: usize,
    pub opaque_pixels: usize,
    pub warnings: Vec<MatteWarning>,
}

#[derive(Clone, Debug)]
pub struct Matte {
    pub raster: RasterBuffer,
    pub report: MatteReport,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MatteExtractor {
    params: MatteParams,
}

impl MatteExtractor {
    pub fn new(params: MatteParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MatteParams {
        &self.params
    }

    /// Decide the background kind from the top-left pixel.
    ///
    /// A raster that already carries a hard matte with an opaque top-left pixel is treated as
    /// green-screen output: the solid-color rule always removes its own reference pixel, so
    /// only a protected, despilled key pixel survives in that corner.
    pub fn classify(&self, raster: &RasterBuffer) -> BackgroundKind {
        let [r, g, b, a] = raster.pixel(0, 0).unwrap_or([0, 0, 0, 0]);
        if a == 255 && self.params.distance_threshold > 0.0 && is_hard_matte(raster) {
            return BackgroundKind::GreenScreen;
        }
        let p = &self.params;
        if g > p.key_green_min && r < p.key_other_max && b < p.key_other_max {
            BackgroundKind::GreenScreen
        } else {
            BackgroundKind::SolidColor {
                reference: [r, g, b],
            }
        }
    }

    /// Replace the background with full transparency and force everything else opaque.
    ///
    /// The output alpha is always 0 or 255. RGB of removed pixels is left untouched, and
    /// pixels that arrive fully transparent stay transparent, so extracting twice is a no-op
    /// on alpha.
    #[tracing::instrument(skip(self, raster), fields(width = raster.width(), height = raster.height()))]
    pub fn extract(&self, mut raster: RasterBuffer) -> Matte {
        let background = self.classify(&raster);
        tracing::debug!(?background, "classified overlay background");

        let mut transparent_pixels = 0usize;
        for px in raster.pixels_mut() {
            let keep = px[3] != 0
                && match background {
                    BackgroundKind::GreenScreen => self.key_green(px),
                    BackgroundKind::SolidColor { reference } => {
                        self.differs_from(px, reference)
                    }
                };
            if keep {
                px[3] = 255;
            } else {
                px[3] = 0;
                transparent_pixels += 1;
            }
        }

        let total = (raster.width() as usize) * (raster.height() as usize);
        let opaque_pixels = total - transparent_pixels;
        let mut warnings = Vec::new();
        if transparent_pixels == 0 || opaque_pixels == 0 {
            let all_transparent = opaque_pixels == 0;
            tracing::warn!(
                all_transparent,
                "matte has no foreground/background separation"
            );
            warnings.push(MatteWarning::Degenerate { all_transparent });
        }

        Matte {
            raster,
            report: MatteReport {
                background,
                transparent_pixels,
                opaque_pixels,
                warnings,
            },
        }
    }

    /// Green-screen rule; despills retained pixels in place. Returns whether to keep `px`.
    fn key_green(&self, px: &mut [u8]) -> bool {
        let (r, g, b) = (px[0], px[1], px[2]);
        let max_rb = r.max(b);
        let dominance = i16::from(g) - i16::from(max_rb);
        let bright = r > self.params.bright_threshold && b > self.params.bright_threshold;

        if dominance > self.params.dominance_threshold && !bright {
            return false;
        }
        if dominance > 0 {
            px[1] = max_rb;
        }
        true
    }

    fn differs_from(&self, px: &[u8], reference: [u8; 3]) -> bool {
        let d2: f32 = (0..3)
            .map(|c| {
                let d = f32::from(px[c]) - f32::from(reference[c]);
                d * d
            })
            .sum();
        d2.sqrt() >= self.params.distance_threshold
    }
}

/// Alpha is only ever 0 or 255 and at least one pixel has been removed.
fn is_hard_matte(raster: &RasterBuffer) -> bool {
    let mut any_removed = false;
    for px in raster.pixels() {
        match px[3] {
            0 => any_removed = true,
            255 => {}
            _ => return false,
        }
    }
    any_removed
}

/// Extract a hard matte with default thresholds.
pub fn extract_matte(overlay: RasterBuffer) -> RasterBuffer {
    MatteExtractor::default().extract(overlay).raster
}
