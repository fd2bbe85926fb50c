//! Card modifier model: categories, render/blend parameters, selection state
//! and the configuration that materializes modifier specs from sheets.

use std::sync::Arc;

use image::RgbaImage;
use image::imageops;
use serde::{Deserialize, Serialize};

use crate::atlas::SpriteAtlas;
use crate::error::SpriteError;

/// Horizontal band of a seal cell that holds the round glyph; the rest of the
/// cell is surrounding sheet artwork.
const SEAL_BAND: (u32, u32) = (13, 40);
const SEAL_BAND_DEN: u32 = 69;

/// The four modifier categories, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCategory {
    Enhancement,
    Edition,
    Seal,
    Debuff,
}

impl ModifierCategory {
    pub const ALL: [Self; 4] = [Self::Enhancement, Self::Edition, Self::Seal, Self::Debuff];
}

/// Whether a modifier draws beneath the card art or above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Overlay,
    Background,
}

/// Pixel-combination rule for edition modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Color,
}

/// One concrete modifier: a sheet cell plus its render parameters.
#[derive(Debug, Clone)]
pub struct ModifierSpec {
    pub category: ModifierCategory,
    /// Source sheet and cell, kept for provenance and equality.
    pub sheet: String,
    pub index: u32,
    pub sprite: Arc<RgbaImage>,
    pub render_mode: RenderMode,
    pub opacity: f32,
    pub blend_mode: BlendMode,
}

impl PartialEq for ModifierSpec {
    /// Sprites are cached per (sheet, index), so identity is the source cell
    /// plus the render parameters; the bitmap itself is not compared.
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category
            && self.sheet == other.sheet
            && self.index == other.index
            && self.render_mode == other.render_mode
            && self.opacity == other.opacity
            && self.blend_mode == other.blend_mode
    }
}

/// At most one active modifier per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifierSelection {
    enhancement: Option<ModifierSpec>,
    edition: Option<ModifierSpec>,
    seal: Option<ModifierSpec>,
    debuff: Option<ModifierSpec>,
}

impl ModifierSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: ModifierCategory) -> Option<&ModifierSpec> {
        self.slot(category).as_ref()
    }

    /// Select a modifier for its category; selecting the already-active spec
    /// clears the slot instead (idempotent toggle).
    pub fn toggle(&mut self, spec: ModifierSpec) {
        let slot = self.slot_mut(spec.category);
        if slot.as_ref() == Some(&spec) {
            *slot = None;
        } else {
            *slot = Some(spec);
        }
    }

    pub fn clear(&mut self) {
        for category in ModifierCategory::ALL {
            *self.slot_mut(category) = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        ModifierCategory::ALL
            .iter()
            .all(|&category| self.get(category).is_none())
    }

    /// Active specs in application order.
    pub fn active(&self) -> Vec<&ModifierSpec> {
        ModifierCategory::ALL
            .iter()
            .filter_map(|&category| self.get(category))
            .collect()
    }

    fn slot(&self, category: ModifierCategory) -> &Option<ModifierSpec> {
        match category {
            ModifierCategory::Enhancement => &self.enhancement,
            ModifierCategory::Edition => &self.edition,
            ModifierCategory::Seal => &self.seal,
            ModifierCategory::Debuff => &self.debuff,
        }
    }

    fn slot_mut(&mut self, category: ModifierCategory) -> &mut Option<ModifierSpec> {
        match category {
            ModifierCategory::Enhancement => &mut self.enhancement,
            ModifierCategory::Edition => &mut self.edition,
            ModifierCategory::Seal => &mut self.seal,
            ModifierCategory::Debuff => &mut self.debuff,
        }
    }
}

/// Declared modifiers for one category: a source sheet, cell indices and
/// parallel parameter lists. Parameter lists shorter than `indices` fall back
/// to `overlay` / `1.0` / `normal` for the missing tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub sheet: String,
    pub indices: Vec<u32>,
    #[serde(default)]
    pub render_modes: Vec<RenderMode>,
    #[serde(default)]
    pub opacity: Vec<f32>,
    #[serde(default)]
    pub blend_modes: Vec<BlendMode>,
}

impl CategoryConfig {
    /// Materialize the declared specs, pulling sprites from the atlas.
    pub fn resolve(
        &self,
        category: ModifierCategory,
        atlas: &mut SpriteAtlas,
    ) -> Result<Vec<ModifierSpec>, SpriteError> {
        self.indices
            .iter()
            .enumerate()
            .map(|(i, &index)| {
                let sprite = atlas.get_sprite(&self.sheet, index, false)?;
                let sprite = if category == ModifierCategory::Seal {
                    Arc::new(seal_crop(&sprite))
                } else {
                    sprite
                };
                Ok(ModifierSpec {
                    category,
                    sheet: self.sheet.clone(),
                    index,
                    sprite,
                    render_mode: self.render_modes.get(i).copied().unwrap_or_default(),
                    opacity: self.opacity.get(i).copied().unwrap_or(1.0),
                    blend_mode: self.blend_modes.get(i).copied().unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// Full modifier configuration, one optional block per category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierConfig {
    pub enhancements: Option<CategoryConfig>,
    pub editions: Option<CategoryConfig>,
    pub seals: Option<CategoryConfig>,
    pub debuffs: Option<CategoryConfig>,
}

impl ModifierConfig {
    /// Materialize every declared modifier, in category order.
    pub fn resolve(&self, atlas: &mut SpriteAtlas) -> Result<Vec<ModifierSpec>, SpriteError> {
        let blocks = [
            (ModifierCategory::Enhancement, &self.enhancements),
            (ModifierCategory::Edition, &self.editions),
            (ModifierCategory::Seal, &self.seals),
            (ModifierCategory::Debuff, &self.debuffs),
        ];

        let mut specs = Vec::new();
        for (category, block) in blocks {
            let Some(block) = block else { continue };
            specs.extend(block.resolve(category, atlas)?);
        }
        Ok(specs)
    }
}

/// Crop a seal cell to the horizontal band holding the glyph.
pub fn seal_crop(sprite: &RgbaImage) -> RgbaImage {
    let w = sprite.width();
    let x1 = w * SEAL_BAND.0 / SEAL_BAND_DEN;
    let x2 = w * SEAL_BAND.1 / SEAL_BAND_DEN;
    imageops::crop_imm(sprite, x1, 0, x2 - x1, sprite.height()).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn spec(category: ModifierCategory, index: u32) -> ModifierSpec {
        ModifierSpec {
            category,
            sheet: "enhancers".to_string(),
            index,
            sprite: Arc::new(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))),
            render_mode: RenderMode::Overlay,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
        }
    }

    #[test]
    fn test_toggle_is_idempotent() {
        let mut selection = ModifierSelection::new();
        selection.toggle(spec(ModifierCategory::Seal, 20));
        assert!(selection.get(ModifierCategory::Seal).is_some());

        selection.toggle(spec(ModifierCategory::Seal, 20));
        assert!(selection.get(ModifierCategory::Seal).is_none());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_toggle_replaces_within_category() {
        let mut selection = ModifierSelection::new();
        selection.toggle(spec(ModifierCategory::Edition, 1));
        selection.toggle(spec(ModifierCategory::Edition, 2));
        assert_eq!(selection.get(ModifierCategory::Edition).unwrap().index, 2);
    }

    #[test]
    fn test_active_follows_application_order() {
        let mut selection = ModifierSelection::new();
        selection.toggle(spec(ModifierCategory::Debuff, 4));
        selection.toggle(spec(ModifierCategory::Enhancement, 0));
        selection.toggle(spec(ModifierCategory::Seal, 20));

        let categories: Vec<_> = selection.active().iter().map(|m| m.category).collect();
        assert_eq!(
            categories,
            vec![
                ModifierCategory::Enhancement,
                ModifierCategory::Seal,
                ModifierCategory::Debuff
            ]
        );
    }

    #[test]
    fn test_category_defaults_fill_short_lists() {
        let mut atlas = SpriteAtlas::new();
        let sheet = RgbaImage::from_pixel(30, 10, Rgba([9, 9, 9, 255]));
        atlas.load_sheet_from_image("editions", sheet, 3, 1).unwrap();

        let config = CategoryConfig {
            sheet: "editions".to_string(),
            indices: vec![0, 1, 2],
            render_modes: vec![RenderMode::Background],
            opacity: vec![0.5],
            blend_modes: vec![BlendMode::Multiply, BlendMode::Color],
        };
        let specs = config.resolve(ModifierCategory::Edition, &mut atlas).unwrap();

        assert_eq!(specs[0].render_mode, RenderMode::Background);
        assert_eq!(specs[1].render_mode, RenderMode::Overlay);
        assert_eq!(specs[0].opacity, 0.5);
        assert_eq!(specs[1].opacity, 1.0);
        assert_eq!(specs[2].blend_mode, BlendMode::Normal);
    }

    #[test]
    fn test_seal_crop_band() {
        let cell = RgbaImage::from_fn(69, 10, |x, _| Rgba([x as u8, 0, 0, 255]));
        let cropped = seal_crop(&cell);
        assert_eq!(cropped.width(), 27);
        assert_eq!(cropped.height(), 10);
        // Leftmost column of the crop is source column 13.
        assert_eq!(cropped.get_pixel(0, 0).0[0], 13);
    }

    #[test]
    fn test_seal_config_applies_crop() {
        let mut atlas = SpriteAtlas::new();
        let sheet = RgbaImage::from_pixel(69, 10, Rgba([9, 9, 9, 255]));
        atlas.load_sheet_from_image("enhancers", sheet, 1, 1).unwrap();

        let config = CategoryConfig {
            sheet: "enhancers".to_string(),
            indices: vec![0],
            render_modes: vec![],
            opacity: vec![],
            blend_modes: vec![],
        };
        let specs = config.resolve(ModifierCategory::Seal, &mut atlas).unwrap();
        assert_eq!(specs[0].sprite.width(), 27);
    }
}
