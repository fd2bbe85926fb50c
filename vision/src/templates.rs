//! Per-card reference templates built from the deck sprite sheet.

use std::sync::Arc;

use anyhow::{Result, ensure};
use image::RgbaImage;
use sprites::{CardClass, DECK_SIZE};

use crate::features::{Descriptor, FeatureExtractor};
use crate::image::OwnedImage;
use crate::matcher::MatchConfig;

/// Reference data for one card class.
pub struct TemplateEntry {
    pub card: CardClass,
    /// Grayscale top-left corner of the card sprite.
    pub corner: image::GrayImage,
    /// `None` when the corner has too few keypoints to match reliably; such
    /// templates are compared by correlation instead.
    pub descriptors: Option<Vec<Descriptor>>,
}

/// All 52 templates plus the extractor that produced their descriptors.
///
/// Queries must be described by the same extractor so sampling patterns line
/// up; the bank lends its own out for that reason.
pub struct TemplateBank {
    entries: Vec<TemplateEntry>,
    extractor: FeatureExtractor,
}

impl TemplateBank {
    /// Build templates from the deck sprites, in card-class order.
    pub fn build(sprites: &[Arc<RgbaImage>], config: &MatchConfig) -> Result<Self> {
        ensure!(
            sprites.len() == DECK_SIZE,
            "expected {DECK_SIZE} deck sprites, got {}",
            sprites.len()
        );

        let extractor = FeatureExtractor::new(config.fast_threshold, config.max_features);
        let mut entries = Vec::with_capacity(DECK_SIZE);
        let mut featureless = 0usize;

        for (card, sprite) in CardClass::all().zip(sprites) {
            let owned = OwnedImage::from_rgba_image(sprite);
            let corner = owned
                .as_image()
                .corner(config.corner_fraction)
                .to_gray_image();

            let descriptors = extractor.describe(&corner);
            let descriptors = if descriptors.len() < config.min_keypoints {
                tracing::debug!(
                    card = %card,
                    keypoints = descriptors.len(),
                    "template corner has too few keypoints, correlation only"
                );
                featureless += 1;
                None
            } else {
                Some(descriptors)
            };

            entries.push(TemplateEntry {
                card,
                corner,
                descriptors,
            });
        }

        tracing::debug!(total = entries.len(), featureless, "template bank built");
        Ok(Self { entries, extractor })
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }
}
