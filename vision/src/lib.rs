//! Card recognition engine: region detection plus template matching.
//!
//! The pipeline takes a capture of the hand area and answers "which cards are
//! on screen, and where". Detection finds card-shaped regions by contour
//! analysis; identification scores each region's top-left corner against the
//! 52 deck templates, by binary feature matching with a correlation fallback.

mod image;
pub use image::*;
mod detect;
pub use detect::*;
mod features;
pub use features::*;
mod matcher;
pub use matcher::*;
mod templates;
pub use templates::*;

pub use sprites::CardClass;

use serde::{Deserialize, Serialize};

/// Full recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub detector: DetectorConfig,
    pub matcher: MatchConfig,
    /// Minimum best score for a region to count as identified.
    pub accept_threshold: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            matcher: MatchConfig::default(),
            accept_threshold: 0.4,
        }
    }
}

/// One detected card slot: always reports where a card sits, even when no
/// template scored well enough to say which card it is.
#[derive(Debug, Clone, Copy)]
pub struct HandSlot {
    pub region: Region,
    /// Best candidate at or above the accept threshold, if any.
    pub result: Option<MatchResult>,
    /// Best score seen for the region, accepted or not.
    pub best_score: f32,
}

impl HandSlot {
    pub fn is_recognized(&self) -> bool {
        self.result.is_some()
    }
}

/// Detection and identification behind one facade.
pub struct Recognizer {
    detector: RegionDetector,
    matcher: CardMatcher,
    accept_threshold: f32,
}

impl Recognizer {
    pub fn new(bank: TemplateBank, config: RecognizerConfig) -> Self {
        Self {
            detector: RegionDetector::new(config.detector),
            matcher: CardMatcher::new(bank, config.matcher),
            accept_threshold: config.accept_threshold,
        }
    }

    /// Card-shaped regions in the capture, left to right.
    pub fn detect_cards(&self, capture: Image<'_>) -> Vec<Region> {
        self.detector.detect(capture)
    }

    /// All 52 candidates for one region, best first.
    pub fn match_region(&self, capture: Image<'_>, region: Region) -> Vec<MatchResult> {
        self.matcher.match_region(capture, region)
    }

    /// Detect every card slot and identify each one.
    pub fn recognize_hand(&self, capture: Image<'_>) -> Vec<HandSlot> {
        self.detect_cards(capture)
            .into_iter()
            .map(|region| {
                let ranked = self.matcher.match_region(capture, region);
                let top = ranked.into_iter().next();
                let best_score = top.map(|m| m.score).unwrap_or(0.0);
                let result = top.filter(|m| m.score >= self.accept_threshold);

                match &result {
                    Some(m) => tracing::debug!(
                        card = %m.card,
                        score = m.score,
                        method = ?m.method,
                        x = region.x,
                        "slot identified"
                    ),
                    None => tracing::debug!(best_score, x = region.x, "slot unidentified"),
                }

                HandSlot {
                    region,
                    result,
                    best_score,
                }
            })
            .collect()
    }
}
