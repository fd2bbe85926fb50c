//! Fixed-layout cropping for full-window captures.
//!
//! The game keeps its stats panel on the left quarter of the screen and the
//! play/score area in the top third; the hand sits in what remains. Detection
//! runs on that crop so panel artwork never produces card-shaped contours.

use vision::{Image, OwnedImage};

/// Fraction of the capture width taken by the left stats panel.
const PANEL_FRAC: f32 = 0.25;
/// Fraction of the capture height above the hand area.
const TOP_FRAC: f32 = 0.30;

/// Top-left corner of the hand area within the full capture.
pub fn hand_offset(capture: &OwnedImage) -> (u32, u32) {
    (
        (capture.width() as f32 * PANEL_FRAC) as u32,
        (capture.height() as f32 * TOP_FRAC) as u32,
    )
}

/// Crop a full-window capture down to the hand area.
pub fn hand_area(capture: &OwnedImage) -> Image<'_> {
    let full = capture.as_image();
    let (x, y) = hand_offset(capture);
    full.sub_image(x, y, full.width() - x, full.height() - y)
}
