//! Keypoint detection and binary descriptors for corner matching.
//!
//! FAST-9 corners with BRIEF-style binary descriptors: each descriptor is 256
//! intensity comparisons at fixed offsets inside a blurred patch around the
//! keypoint, compared by Hamming distance. The offset pattern comes from a
//! seeded ChaCha8 stream so every extractor (templates and queries alike)
//! samples identically.

use image::GrayImage;
use imageproc::corners::corners_fast9;
use imageproc::filter::gaussian_blur_f32;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Number of comparison bits per descriptor.
const DESCRIPTOR_BITS: usize = 256;
/// Comparison offsets stay within this radius of the keypoint.
const PATCH_RADIUS: i32 = 8;
/// Keypoints closer than this to an image edge cannot be described.
const BORDER: u32 = (PATCH_RADIUS + 1) as u32;
/// Blur applied to the patch source; raw pixel comparisons are too noisy.
const BLUR_SIGMA: f32 = 2.0;
/// Fixed seed for the sampling pattern.
const SAMPLING_SEED: u64 = 0x5eed;

/// A located keypoint plus its 256-bit comparison signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub x: u32,
    pub y: u32,
    bits: [u64; 4],
}

impl Descriptor {
    /// Hamming distance between two descriptors.
    pub fn distance(&self, other: &Self) -> u32 {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }
}

/// One mutually-best correspondence between a query and a train descriptor.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorMatch {
    pub query: usize,
    pub train: usize,
    pub distance: u32,
}

/// Computes descriptors with a fixed sampling pattern.
///
/// The template bank owns one extractor and lends it to every query, so
/// pattern bits always line up.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    pairs: Vec<(i32, i32, i32, i32)>,
    fast_threshold: u8,
    max_features: usize,
}

impl FeatureExtractor {
    pub fn new(fast_threshold: u8, max_features: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(SAMPLING_SEED);
        let pairs = (0..DESCRIPTOR_BITS)
            .map(|_| {
                (
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                    rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                )
            })
            .collect();

        Self {
            pairs,
            fast_threshold,
            max_features,
        }
    }

    /// Detect keypoints and compute their descriptors.
    ///
    /// Keypoints too close to the border are dropped; the strongest
    /// `max_features` survive. An empty result is not an error; the caller
    /// falls back to correlation.
    pub fn describe(&self, gray: &GrayImage) -> Vec<Descriptor> {
        let (w, h) = gray.dimensions();
        if w <= 2 * BORDER || h <= 2 * BORDER {
            return vec![];
        }

        let mut corners = corners_fast9(gray, self.fast_threshold);
        corners.retain(|c| {
            c.x >= BORDER && c.y >= BORDER && c.x < w - BORDER && c.y < h - BORDER
        });
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(self.max_features);
        if corners.is_empty() {
            return vec![];
        }

        let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
        corners
            .iter()
            .map(|c| self.sample(&blurred, c.x, c.y))
            .collect()
    }

    fn sample(&self, patch_src: &GrayImage, x: u32, y: u32) -> Descriptor {
        let mut bits = [0u64; 4];
        for (i, &(x0, y0, x1, y1)) in self.pairs.iter().enumerate() {
            let p0 = patch_src.get_pixel((x as i32 + x0) as u32, (y as i32 + y0) as u32).0[0];
            let p1 = patch_src.get_pixel((x as i32 + x1) as u32, (y as i32 + y1) as u32).0[0];
            if p0 < p1 {
                bits[i / 64] |= 1 << (i % 64);
            }
        }
        Descriptor { x, y, bits }
    }
}

/// Brute-force matching with cross-check: only mutually-best pairs survive,
/// returned sorted by ascending distance.
pub fn match_descriptors(query: &[Descriptor], train: &[Descriptor]) -> Vec<DescriptorMatch> {
    if query.is_empty() || train.is_empty() {
        return vec![];
    }

    let best_train: Vec<usize> = query
        .iter()
        .map(|q| nearest(q, train))
        .collect();
    let best_query: Vec<usize> = train
        .iter()
        .map(|t| nearest(t, query))
        .collect();

    let mut matches: Vec<DescriptorMatch> = best_train
        .iter()
        .enumerate()
        .filter(|&(qi, &ti)| best_query[ti] == qi)
        .map(|(qi, &ti)| DescriptorMatch {
            query: qi,
            train: ti,
            distance: query[qi].distance(&train[ti]),
        })
        .collect();

    matches.sort_by_key(|m| m.distance);
    matches
}

fn nearest(needle: &Descriptor, haystack: &[Descriptor]) -> usize {
    let mut best = 0;
    let mut best_distance = u32::MAX;
    for (i, candidate) in haystack.iter().enumerate() {
        let distance = needle.distance(candidate);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}
