//! Layered modifier compositing.
//!
//! The pipeline order is fixed: base selection, enhancement, edition, seal,
//! debuff. Every incoming modifier is resized to the running canvas before
//! blending, so mismatched dimensions are never an error.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::cards::CardClass;
use crate::modifier::{BlendMode, ModifierCategory, ModifierSelection, ModifierSpec, RenderMode};

/// A rendered card plus provenance: which modifiers were baked in, in
/// application order.
#[derive(Debug, Clone)]
pub struct ComposedCard {
    pub image: RgbaImage,
    pub base_card: CardClass,
    pub applied: Vec<ModifierSpec>,
}

/// Compose a card bitmap with the active modifiers.
///
/// `base` is the complete card sprite (face on back); `face` is the bare face
/// art, needed only when a background-mode enhancement has to show through
/// near-transparent face pixels. Without a face, background mode degrades to
/// a plain overlay.
pub fn compose(
    card: CardClass,
    base: &RgbaImage,
    face: Option<&RgbaImage>,
    selection: &ModifierSelection,
) -> ComposedCard {
    let enhancement = selection.get(ModifierCategory::Enhancement);
    let wants_background = enhancement
        .map(|m| m.render_mode == RenderMode::Background)
        .unwrap_or(false);

    // A background enhancement replaces the card back, so the starting layer
    // has to be the bare face, not the back-composited sprite.
    let mut canvas = match (wants_background, face) {
        (true, Some(face)) => face.clone(),
        _ => base.clone(),
    };

    if let Some(enhancement) = enhancement {
        match (enhancement.render_mode, face) {
            (RenderMode::Background, Some(_)) => {
                let mut backdrop =
                    resize_to(&enhancement.sprite, canvas.width(), canvas.height());
                imageops::overlay(&mut backdrop, &canvas, 0, 0);
                canvas = backdrop;
            }
            (RenderMode::Background, None) => {
                tracing::debug!(
                    sheet = %enhancement.sheet,
                    index = enhancement.index,
                    "no face art supplied; drawing background enhancement as overlay"
                );
                alpha_over(&mut canvas, &enhancement.sprite);
            }
            (RenderMode::Overlay, _) => alpha_over(&mut canvas, &enhancement.sprite),
        }
    }

    if let Some(edition) = selection.get(ModifierCategory::Edition) {
        canvas = blend_edition(&canvas, edition);
    }
    if let Some(seal) = selection.get(ModifierCategory::Seal) {
        alpha_over(&mut canvas, &seal.sprite);
    }
    if let Some(debuff) = selection.get(ModifierCategory::Debuff) {
        alpha_over(&mut canvas, &debuff.sprite);
    }

    ComposedCard {
        image: canvas,
        base_card: card,
        applied: selection.active().into_iter().cloned().collect(),
    }
}

fn resize_to(image: &RgbaImage, w: u32, h: u32) -> RgbaImage {
    if image.dimensions() == (w, h) {
        image.clone()
    } else {
        imageops::resize(image, w, h, FilterType::Lanczos3)
    }
}

/// Resize `top` to the canvas and alpha-composite it over.
fn alpha_over(canvas: &mut RgbaImage, top: &RgbaImage) {
    let top = resize_to(top, canvas.width(), canvas.height());
    imageops::overlay(canvas, &top, 0, 0);
}

fn blend_edition(canvas: &RgbaImage, edition: &ModifierSpec) -> RgbaImage {
    let sprite = resize_to(&edition.sprite, canvas.width(), canvas.height());
    match edition.blend_mode {
        BlendMode::Normal => {
            let mut out = canvas.clone();
            let mut top = sprite;
            if edition.opacity < 1.0 {
                scale_alpha(&mut top, edition.opacity);
            }
            imageops::overlay(&mut out, &top, 0, 0);
            out
        }
        BlendMode::Multiply => multiply(canvas, &sprite),
        BlendMode::Color => color_transfer(canvas, &sprite, edition.opacity),
    }
}

fn scale_alpha(image: &mut RgbaImage, opacity: f32) {
    let opacity = opacity.clamp(0.0, 1.0);
    for px in image.pixels_mut() {
        px.0[3] = (f32::from(px.0[3]) * opacity).round() as u8;
    }
}

/// Per-channel RGB product; the canvas alpha is kept unchanged.
fn multiply(canvas: &RgbaImage, top: &RgbaImage) -> RgbaImage {
    let mut out = canvas.clone();
    for (dst, src) in out.pixels_mut().zip(top.pixels()) {
        for c in 0..3 {
            dst.0[c] = ((u16::from(dst.0[c]) * u16::from(src.0[c])) / 255) as u8;
        }
    }
    out
}

/// Keep the canvas luma, take the edition chroma (BT.601), then lerp the
/// recolored result toward the original canvas by `1 - opacity`. The canvas
/// alpha is kept unchanged.
fn color_transfer(canvas: &RgbaImage, top: &RgbaImage, opacity: f32) -> RgbaImage {
    let opacity = opacity.clamp(0.0, 1.0);
    let mut out = canvas.clone();
    for (dst, src) in out.pixels_mut().zip(top.pixels()) {
        let [r, g, b, a] = dst.0;
        let y = luma(r, g, b);
        let (cb, cr) = chroma(src.0[0], src.0[1], src.0[2]);
        let (nr, ng, nb) = ycbcr_to_rgb(y, cb, cr);

        let mix = |old: u8, new: u8| {
            (f32::from(old) + (f32::from(new) - f32::from(old)) * opacity).round() as u8
        };
        dst.0 = [mix(r, nr), mix(g, ng), mix(b, nb), a];
    }
    out
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

fn chroma(r: u8, g: u8, b: u8) -> (f32, f32) {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    (
        128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b,
        128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b,
    )
}

fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> (u8, u8, u8) {
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344_136 * (cb - 128.0) - 0.714_136 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);
    (
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    )
}
