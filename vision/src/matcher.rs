//! Card identification against the template bank.
//!
//! The primary path matches binary descriptors between the query corner and
//! each template corner. Corners with too little texture (flat card faces,
//! heavy occlusion) fall back to normalized cross-correlation, per side: a
//! featureless query compares every template by correlation, and a
//! featureless template is compared by correlation even under a feature-rich
//! query.

use image::GrayImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use sprites::CardClass;

use crate::detect::Region;
use crate::features::{Descriptor, match_descriptors};
use crate::image::Image;
use crate::templates::TemplateBank;

/// How a score was produced. Feature scores outrank correlation scores on
/// ties; they carry more evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Feature,
    Correlation,
}

impl MatchMethod {
    fn rank(self) -> u8 {
        match self {
            Self::Feature => 0,
            Self::Correlation => 1,
        }
    }
}

/// One scored candidate for a region, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub card: CardClass,
    pub score: f32,
    pub method: MatchMethod,
}

/// Matching thresholds and scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Fraction of card width/height used as the identification corner.
    pub corner_fraction: f32,
    /// Below this many keypoints a corner is considered featureless.
    pub min_keypoints: usize,
    /// FAST corner threshold.
    pub fast_threshold: u8,
    /// Keep at most this many keypoints per corner.
    pub max_features: usize,
    /// Keep the best `1/divisor` of cross-checked matches for scoring.
    pub good_match_divisor: usize,
    /// Hamming-distance normalization constant.
    pub distance_scale: f32,
    /// Divides the raw match count to land scores in `[0, 1]`.
    pub score_divisor: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            corner_fraction: 0.35,
            min_keypoints: 10,
            fast_threshold: 20,
            max_features: 500,
            good_match_divisor: 3,
            distance_scale: 100.0,
            score_divisor: 20.0,
        }
    }
}

/// Scores capture regions against every template in the bank.
pub struct CardMatcher {
    bank: TemplateBank,
    config: MatchConfig,
}

impl CardMatcher {
    pub fn new(bank: TemplateBank, config: MatchConfig) -> Self {
        Self { bank, config }
    }

    pub fn bank(&self) -> &TemplateBank {
        &self.bank
    }

    /// Score `region` of `capture` against all 52 templates.
    ///
    /// Returns one result per card class, sorted best first: score descending,
    /// then feature before correlation, then card index.
    pub fn match_region(&self, capture: Image<'_>, region: Region) -> Vec<MatchResult> {
        let card_view = capture.sub_image(region.x, region.y, region.w, region.h);
        let corner = card_view.corner(self.config.corner_fraction).to_gray_image();

        let query = self.bank.extractor().describe(&corner);
        let use_features = query.len() >= self.config.min_keypoints;
        if !use_features {
            tracing::debug!(
                keypoints = query.len(),
                "query corner featureless, correlation fallback"
            );
        }

        let mut results: Vec<MatchResult> = self
            .bank
            .entries()
            .iter()
            .map(|entry| match &entry.descriptors {
                Some(train) if use_features => MatchResult {
                    card: entry.card,
                    score: self.feature_score(&query, train),
                    method: MatchMethod::Feature,
                },
                _ => MatchResult {
                    card: entry.card,
                    score: correlation_score(&corner, &entry.corner),
                    method: MatchMethod::Correlation,
                },
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.method.rank().cmp(&b.method.rank()))
                .then_with(|| a.card.index().cmp(&b.card.index()))
        });
        results
    }

    fn feature_score(&self, query: &[Descriptor], train: &[Descriptor]) -> f32 {
        let mut matches = match_descriptors(query, train);
        if matches.is_empty() {
            return 0.0;
        }

        // Already sorted by distance; keep the best third (at least one).
        let keep = (matches.len() / self.config.good_match_divisor.max(1)).max(1);
        matches.truncate(keep);

        let mean_distance =
            matches.iter().map(|m| m.distance as f32).sum::<f32>() / matches.len() as f32;
        let raw = matches.len() as f32 / (1.0 + mean_distance / self.config.distance_scale);
        (raw / self.config.score_divisor).min(1.0)
    }
}

/// Correlation fallback score.
///
/// The template is scaled toward the query by the mean of the two axis ratios
/// (capped so it still fits inside the query), then slid over every alignment;
/// the best zero-mean normalized cross-correlation wins. Anti-correlation is
/// clamped to zero.
fn correlation_score(query: &GrayImage, template: &GrayImage) -> f32 {
    let (qw, qh) = query.dimensions();
    let (tw, th) = template.dimensions();
    if qw == 0 || qh == 0 || tw == 0 || th == 0 {
        return 0.0;
    }

    let scale = (qw as f32 / tw as f32 + qh as f32 / th as f32) / 2.0;
    let sw = ((tw as f32 * scale) as u32).clamp(1, qw);
    let sh = ((th as f32 * scale) as u32).clamp(1, qh);
    let scaled = if (sw, sh) == (tw, th) {
        template.clone()
    } else {
        imageops::resize(template, sw, sh, FilterType::Triangle)
    };

    best_zncc(query, &scaled).max(0.0)
}

/// Maximum zero-mean normalized cross-correlation of `kernel` over `image`.
/// Expects `kernel` to fit inside `image`.
fn best_zncc(image: &GrayImage, kernel: &GrayImage) -> f32 {
    let (iw, ih) = image.dimensions();
    let (kw, kh) = kernel.dimensions();
    if kw > iw || kh > ih {
        return 0.0;
    }

    let n = (kw * kh) as f32;
    let k: Vec<f32> = kernel.pixels().map(|p| p.0[0] as f32).collect();
    let k_mean = k.iter().sum::<f32>() / n;
    let k_dev: Vec<f32> = k.iter().map(|v| v - k_mean).collect();
    let k_norm2: f32 = k_dev.iter().map(|v| v * v).sum();
    if k_norm2 == 0.0 {
        return 0.0;
    }

    let mut best = f32::MIN;
    for oy in 0..=(ih - kh) {
        for ox in 0..=(iw - kw) {
            let mut sum = 0.0f32;
            let mut sum2 = 0.0f32;
            for y in 0..kh {
                for x in 0..kw {
                    let v = image.get_pixel(ox + x, oy + y).0[0] as f32;
                    sum += v;
                    sum2 += v * v;
                }
            }
            let w_norm2 = sum2 - sum * sum / n;
            if w_norm2 <= 0.0 {
                continue;
            }

            let w_mean = sum / n;
            let mut cross = 0.0f32;
            let mut i = 0;
            for y in 0..kh {
                for x in 0..kw {
                    let v = image.get_pixel(ox + x, oy + y).0[0] as f32;
                    cross += (v - w_mean) * k_dev[i];
                    i += 1;
                }
            }

            let score = cross / (w_norm2 * k_norm2).sqrt();
            if score > best {
                best = score;
            }
        }
    }

    if best == f32::MIN { 0.0 } else { best }
}
