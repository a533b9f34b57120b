use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::{EmbeddingError, FaceEmbedding, FaceEncoder};

const THUMB_WIDTH: u32 = 16;
const THUMB_HEIGHT: u32 = 8;

/// Below this L2 norm (after mean-centring) the picture is considered flat.
const MIN_CONTRAST: f32 = 1e-3;

/// Deterministic stand-in for a real face model.
///
/// The whole image is treated as a single "face": it is shrunk to a 16x8
/// grayscale thumbnail, mean-centred and L2-normalised into a 128-dim vector.
/// Two renditions of the same picture end up close together; unrelated
/// pictures end up roughly `sqrt(2)` apart. Images with no contrast at all
/// produce no face.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThumbnailEncoder;

impl ThumbnailEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`FaceEncoder::encode`].
    pub fn embed(&self, image: &RgbImage) -> Option<FaceEmbedding> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }

        let gray = imageops::grayscale(image);
        let thumb = imageops::resize(&gray, THUMB_WIDTH, THUMB_HEIGHT, FilterType::Triangle);

        let mut v: Vec<f32> = thumb.pixels().map(|p| f32::from(p.0[0]) / 255.0).collect();
        let mean = v.iter().sum::<f32>() / v.len() as f32;
        for value in v.iter_mut() {
            *value -= mean;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < MIN_CONTRAST {
            return None;
        }
        for value in v.iter_mut() {
            *value /= norm;
        }
        Some(FaceEmbedding::new(v))
    }
}

#[async_trait]
impl FaceEncoder for ThumbnailEncoder {
    async fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEmbedding>, EmbeddingError> {
        Ok(self.embed(image).into_iter().collect())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
