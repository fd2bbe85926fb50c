//! Card-shaped region detection via edge and contour analysis.
//!
//! The input is a capture already cropped to the hand area. The detector is
//! intentionally conservative: if nothing card-like is found it returns an
//! empty list instead of guessing.

use imageproc::contours::{BorderType, find_contours};
use imageproc::edges::canny;
use serde::{Deserialize, Serialize};

use crate::image::Image;

/// Axis-aligned bounding box in the coordinate space of the cropped capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.w as f32 / self.h as f32
    }
}

/// Detection thresholds.
///
/// All of these are empirically tuned, not derived; they are exposed so a
/// deployment can tighten the aspect band for precision or loosen it for
/// recall.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Canny gradient thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Minimum bounding-box area in pixels².
    pub min_area: u32,
    /// Card-like aspect band (w/h). Cards are taller than wide, roughly 0.7.
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            min_area: 5000,
            min_aspect: 0.4,
            max_aspect: 1.2,
        }
    }
}

/// Finds card-shaped bounding boxes inside a cropped capture.
#[derive(Debug, Clone, Default)]
pub struct RegionDetector {
    config: DetectorConfig,
}

impl RegionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect card-shaped regions, sorted left to right.
    pub fn detect(&self, capture: Image<'_>) -> Vec<Region> {
        if capture.width() == 0 || capture.height() == 0 {
            return vec![];
        }

        let gray = capture.to_gray_image();
        let edges = canny(&gray, self.config.canny_low, self.config.canny_high);
        let contours = find_contours::<i32>(&edges);

        let mut regions = Vec::new();
        for contour in contours {
            if contour.border_type != BorderType::Outer {
                continue;
            }

            let mut min_x = i32::MAX;
            let mut min_y = i32::MAX;
            let mut max_x = i32::MIN;
            let mut max_y = i32::MIN;
            for p in &contour.points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
            if min_x < 0 || min_y < 0 || max_x < min_x || max_y < min_y {
                continue;
            }

            let region = Region {
                x: min_x as u32,
                y: min_y as u32,
                w: (max_x - min_x + 1) as u32,
                h: (max_y - min_y + 1) as u32,
            };
            if region.w == 0 || region.h == 0 {
                continue;
            }

            if region.area() <= self.config.min_area {
                continue;
            }
            let aspect = region.aspect_ratio();
            if aspect <= self.config.min_aspect || aspect >= self.config.max_aspect {
                continue;
            }

            regions.push(region);
        }

        // Cards are laid out horizontally; report them in reading order.
        regions.sort_by_key(|r| r.x);

        tracing::debug!(count = regions.len(), "detected card regions");
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::OwnedImage;

    /// Black canvas with filled white card-aspect rectangles.
    fn synthetic_capture(cards: &[(u32, u32, u32, u32)]) -> OwnedImage {
        let width = 400u32;
        let height = 160u32;
        let mut bytes = vec![0u8; (width * height * 4) as usize];
        for i in (3..bytes.len()).step_by(4) {
            bytes[i] = 255;
        }

        for &(cx, cy, cw, ch) in cards {
            for y in cy..cy + ch {
                for x in cx..cx + cw {
                    let i = ((y * width + x) * 4) as usize;
                    bytes[i] = 255;
                    bytes[i + 1] = 255;
                    bytes[i + 2] = 255;
                }
            }
        }
        OwnedImage::from_rgba(width as usize, &bytes)
    }

    #[test]
    fn test_three_cards_sorted_left_to_right() {
        // 70x110 is card aspect (~0.64) and area 7700 > 5000.
        let capture = synthetic_capture(&[(230, 20, 70, 110), (10, 20, 70, 110), (120, 20, 70, 110)]);
        let detector = RegionDetector::default();
        let regions = detector.detect(capture.as_image());

        assert_eq!(regions.len(), 3);
        assert!(regions[0].x < regions[1].x && regions[1].x < regions[2].x);
        for (region, expected_x) in regions.iter().zip([10u32, 120, 230]) {
            assert!(
                region.x.abs_diff(expected_x) <= 3,
                "region at {} expected near {}",
                region.x,
                expected_x
            );
            assert!(region.w.abs_diff(70) <= 5);
            assert!(region.h.abs_diff(110) <= 5);
        }
    }

    #[test]
    fn test_small_and_wide_shapes_filtered() {
        // One tiny box (area too small) and one very wide box (aspect too big).
        let capture = synthetic_capture(&[(10, 20, 30, 40), (100, 20, 260, 60)]);
        let detector = RegionDetector::default();
        assert!(detector.detect(capture.as_image()).is_empty());
    }

    #[test]
    fn test_blank_capture_is_empty_not_error() {
        let capture = synthetic_capture(&[]);
        let detector = RegionDetector::default();
        assert!(detector.detect(capture.as_image()).is_empty());
    }
}
