//! End-to-end recognition over a synthetic capture: one textured card the
//! bank knows, one flat decoy card it cannot identify.

use std::sync::Arc;

use image::{Rgba, RgbaImage, imageops};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use vision::{MatchConfig, MatchMethod, OwnedImage, Recognizer, RecognizerConfig, TemplateBank};

const SPRITE_W: u32 = 140;
const SPRITE_H: u32 = 200;

/// Deck of deterministic sprites: solid white cards (one clean outer contour
/// against a dark capture) with a unique noise patch in the identification
/// corner, so every corner is feature-rich and distinct. The patch stays
/// below the detector's area filter, so it never reads as a card itself.
fn synthetic_deck() -> Vec<Arc<RgbaImage>> {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    (0..52)
        .map(|_| {
            let mut sprite = RgbaImage::from_pixel(SPRITE_W, SPRITE_H, Rgba([255, 255, 255, 255]));
            for y in 3..67 {
                for x in 3..46 {
                    let v: u8 = if rng.gen_range(0..2) == 0 { 20 } else { 235 };
                    sprite.put_pixel(x, y, Rgba([v, v, v, 255]));
                }
            }
            Arc::new(sprite)
        })
        .collect()
}

fn paste_flat_card(canvas: &mut RgbaImage, x: u32, y: u32) {
    for dy in 0..SPRITE_H {
        for dx in 0..SPRITE_W {
            canvas.put_pixel(x + dx, y + dy, Rgba([255, 255, 255, 255]));
        }
    }
}

#[test]
fn test_recognize_hand_identifies_known_card_and_flags_decoy() {
    let deck = synthetic_deck();
    let bank = TemplateBank::build(&deck, &MatchConfig::default()).unwrap();
    let recognizer = Recognizer::new(bank, RecognizerConfig::default());

    let mut canvas = RgbaImage::from_pixel(460, 260, Rgba([0, 0, 0, 255]));
    imageops::replace(&mut canvas, deck[14].as_ref(), 40, 30);
    paste_flat_card(&mut canvas, 250, 30);
    let capture = OwnedImage::from_rgba_image(&canvas);

    let slots = recognizer.recognize_hand(capture.as_image());
    assert_eq!(slots.len(), 2, "slots: {slots:?}");

    // Left slot: the known sprite, identified by features with a strong score.
    let known = &slots[0];
    assert!(known.region.x.abs_diff(40) <= 3);
    let result = known.result.expect("left slot should be identified");
    assert_eq!(result.card.index(), 14);
    assert_eq!(result.method, MatchMethod::Feature);
    assert!(result.score >= 0.8, "score {}", result.score);

    // Right slot: detected but no template should claim it.
    let decoy = &slots[1];
    assert!(decoy.region.x.abs_diff(250) <= 3);
    assert!(!decoy.is_recognized(), "decoy matched: {:?}", decoy.result);
    assert!(decoy.best_score < 0.4, "best_score {}", decoy.best_score);
}

#[test]
fn test_every_template_matches_itself_best() {
    let deck = synthetic_deck();
    let bank = TemplateBank::build(&deck, &MatchConfig::default()).unwrap();
    let recognizer = Recognizer::new(bank, RecognizerConfig::default());

    for index in [0usize, 14, 27, 51] {
        let capture = OwnedImage::from_rgba_image(deck[index].as_ref());
        let region = vision::Region {
            x: 0,
            y: 0,
            w: SPRITE_W,
            h: SPRITE_H,
        };
        let ranked = recognizer.match_region(capture.as_image(), region);
        assert_eq!(usize::from(ranked[0].card.index()), index, "card {index}");
        assert!(ranked[0].score >= 0.9, "card {index} score {}", ranked[0].score);
    }
}
