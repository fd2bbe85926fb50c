//! Grid-based sprite sheet loading and cached cell extraction.
//!
//! Sheets are decoded once at registration; individual cells are cropped
//! lazily on first request and cached forever (sprites are immutable).
//! Consumers get `Arc` handles and must clone the bitmap before mutating it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::error::SpriteError;

/// A registered sheet: the decoded bitmap plus its declared grid geometry.
///
/// Grid geometry is always declared by the caller, never inferred from the
/// image content.
pub struct SpriteSheet {
    name: String,
    image: RgbaImage,
    cols: u32,
    rows: u32,
    cell_w: u32,
    cell_h: u32,
}

impl SpriteSheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_count(&self) -> u32 {
        self.cols * self.rows
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_w, self.cell_h)
    }

    fn extract(&self, index: u32) -> RgbaImage {
        let col = index % self.cols;
        let row = index / self.cols;
        imageops::crop_imm(
            &self.image,
            col * self.cell_w,
            row * self.cell_h,
            self.cell_w,
            self.cell_h,
        )
        .to_image()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SpriteKey {
    sheet: String,
    index: u32,
    on_back: bool,
}

/// Owns all registered sheets and the extracted-sprite cache.
///
/// Built once at startup and kept for the life of the process. All cache
/// population goes through `&mut self`, so first-touch extraction is
/// single-writer by construction; the `Arc`s it hands out are safe to read
/// from anywhere afterwards.
#[derive(Default)]
pub struct SpriteAtlas {
    sheets: HashMap<String, SpriteSheet>,
    cache: HashMap<SpriteKey, Arc<RgbaImage>>,
    card_back: Option<RgbaImage>,
}

impl SpriteAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sheet from a file.
    ///
    /// An unreadable image is fatal here: the sheet is not registered and any
    /// later lookup against it reports `SheetNotFound`.
    pub fn load_sheet(
        &mut self,
        name: &str,
        path: &Path,
        cols: u32,
        rows: u32,
    ) -> Result<(), SpriteError> {
        let image = image::open(path)
            .map_err(|source| SpriteError::Load {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        self.load_sheet_from_image(name, image, cols, rows)
    }

    /// Register a sheet from an already-decoded bitmap.
    pub fn load_sheet_from_image(
        &mut self,
        name: &str,
        image: RgbaImage,
        cols: u32,
        rows: u32,
    ) -> Result<(), SpriteError> {
        if cols == 0 || rows == 0 {
            return Err(SpriteError::InvalidGrid {
                name: name.to_string(),
                cols,
                rows,
            });
        }

        let cell_w = image.width() / cols;
        let cell_h = image.height() / rows;
        tracing::debug!(sheet = name, cols, rows, cell_w, cell_h, "registered sprite sheet");

        self.sheets.insert(
            name.to_string(),
            SpriteSheet {
                name: name.to_string(),
                image,
                cols,
                rows,
                cell_w,
                cell_h,
            },
        );
        Ok(())
    }

    pub fn sheet(&self, name: &str) -> Option<&SpriteSheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Designate the backdrop sprite used by `on_back` compositing.
    ///
    /// By convention this is index 1 of the backs sheet. Callers treat a
    /// failure as a warning, not a fatal error: without a back, `on_back`
    /// requests degrade to the plain sprite.
    pub fn load_card_back(&mut self, sheet: &str, index: u32) -> Result<(), SpriteError> {
        let back = self.get_sprite(sheet, index, false)?;
        self.card_back = Some((*back).clone());
        // Sprites requested with `on_back` before a back existed were cached
        // bare; drop them so the next request composites.
        self.cache.retain(|key, _| !key.on_back);
        Ok(())
    }

    pub fn card_back(&self) -> Option<&RgbaImage> {
        self.card_back.as_ref()
    }

    /// Extract (or fetch from cache) one cell of a sheet.
    ///
    /// With `on_back` set, the cell is alpha-composited onto the card back
    /// before caching, so deck faces come out as complete cards.
    pub fn get_sprite(
        &mut self,
        sheet: &str,
        index: u32,
        on_back: bool,
    ) -> Result<Arc<RgbaImage>, SpriteError> {
        let key = SpriteKey {
            sheet: sheet.to_string(),
            index,
            on_back,
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit.clone());
        }

        let entry = self
            .sheets
            .get(sheet)
            .ok_or_else(|| SpriteError::SheetNotFound {
                name: sheet.to_string(),
            })?;
        if index >= entry.cell_count() {
            return Err(SpriteError::IndexOutOfRange {
                sheet: sheet.to_string(),
                index,
                cols: entry.cols,
                rows: entry.rows,
            });
        }

        let mut sprite = entry.extract(index);
        if on_back && let Some(back) = &self.card_back {
            sprite = composite_on_back(back, &sprite);
        }

        let sprite = Arc::new(sprite);
        self.cache.insert(key, sprite.clone());
        Ok(sprite)
    }

    /// Every cell of a sheet, in index order.
    pub fn get_all_sprites(
        &mut self,
        sheet: &str,
        on_back: bool,
    ) -> Result<Vec<Arc<RgbaImage>>, SpriteError> {
        let count = self
            .sheets
            .get(sheet)
            .ok_or_else(|| SpriteError::SheetNotFound {
                name: sheet.to_string(),
            })?
            .cell_count();
        (0..count)
            .map(|index| self.get_sprite(sheet, index, on_back))
            .collect()
    }
}

/// Paste a face onto the card back, resizing the back to the face first.
fn composite_on_back(back: &RgbaImage, face: &RgbaImage) -> RgbaImage {
    let mut canvas = if back.dimensions() == face.dimensions() {
        back.clone()
    } else {
        imageops::resize(back, face.width(), face.height(), FilterType::Lanczos3)
    };
    imageops::overlay(&mut canvas, face, 0, 0);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// A cols x rows sheet where every cell is filled with a unique color.
    fn checker_sheet(cols: u32, rows: u32, cell_w: u32, cell_h: u32) -> RgbaImage {
        RgbaImage::from_fn(cols * cell_w, rows * cell_h, |x, y| {
            let col = (x / cell_w) as u8;
            let row = (y / cell_h) as u8;
            Rgba([col * 16, row * 16, 255 - col * 16, 255])
        })
    }

    fn atlas_with(name: &str, cols: u32, rows: u32) -> SpriteAtlas {
        let mut atlas = SpriteAtlas::new();
        atlas
            .load_sheet_from_image(name, checker_sheet(cols, rows, 8, 12), cols, rows)
            .unwrap();
        atlas
    }

    #[test]
    fn test_grid_extraction_matches_crop() {
        let cols = 13;
        let rows = 4;
        let sheet = checker_sheet(cols, rows, 8, 12);
        let mut atlas = SpriteAtlas::new();
        atlas
            .load_sheet_from_image("deck", sheet.clone(), cols, rows)
            .unwrap();

        for index in 0..cols * rows {
            let sprite = atlas.get_sprite("deck", index, false).unwrap();
            let expected = imageops::crop_imm(
                &sheet,
                (index % cols) * 8,
                (index / cols) * 12,
                8,
                12,
            )
            .to_image();
            assert_eq!(*sprite, expected, "cell {index}");
        }
    }

    #[test]
    fn test_cache_returns_same_bitmap() {
        let mut atlas = atlas_with("deck", 13, 4);
        let first = atlas.get_sprite("deck", 7, false).unwrap();
        let second = atlas.get_sprite("deck", 7, false).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_sheet_is_hard_error() {
        let mut atlas = atlas_with("deck", 13, 4);
        assert!(matches!(
            atlas.get_sprite("jokers", 0, false),
            Err(SpriteError::SheetNotFound { .. })
        ));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut atlas = atlas_with("deck", 13, 4);
        assert!(atlas.get_sprite("deck", 51, false).is_ok());
        assert!(matches!(
            atlas.get_sprite("deck", 52, false),
            Err(SpriteError::IndexOutOfRange { index: 52, .. })
        ));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let mut atlas = SpriteAtlas::new();
        let err = atlas.load_sheet_from_image("bad", checker_sheet(1, 1, 4, 4), 0, 3);
        assert!(matches!(err, Err(SpriteError::InvalidGrid { .. })));
    }

    #[test]
    fn test_get_all_sprites_in_order() {
        let mut atlas = atlas_with("deck", 13, 4);
        let all = atlas.get_all_sprites("deck", false).unwrap();
        assert_eq!(all.len(), 52);
        for (index, sprite) in all.iter().enumerate() {
            let direct = atlas.get_sprite("deck", index as u32, false).unwrap();
            assert!(Arc::ptr_eq(sprite, &direct));
        }
    }

    #[test]
    fn test_late_card_back_refreshes_cached_sprites() {
        let mut atlas = SpriteAtlas::new();
        let backs = RgbaImage::from_pixel(16, 12, Rgba([255, 0, 0, 255]));
        atlas.load_sheet_from_image("backs", backs, 2, 1).unwrap();
        let deck = RgbaImage::from_pixel(8, 12, Rgba([0, 0, 0, 0]));
        atlas.load_sheet_from_image("deck", deck, 1, 1).unwrap();

        // Requested before any back exists: cached bare.
        let early = atlas.get_sprite("deck", 0, true).unwrap();
        assert_eq!(early.get_pixel(4, 6).0[3], 0);

        atlas.load_card_back("backs", 1).unwrap();

        let late = atlas.get_sprite("deck", 0, true).unwrap();
        assert!(!Arc::ptr_eq(&early, &late));
        assert_eq!(late.get_pixel(4, 6).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_composite_on_back_fills_transparency() {
        let mut atlas = SpriteAtlas::new();
        // Backs sheet: opaque red cells.
        let backs = RgbaImage::from_pixel(16, 12, Rgba([255, 0, 0, 255]));
        atlas.load_sheet_from_image("backs", backs, 2, 1).unwrap();
        atlas.load_card_back("backs", 1).unwrap();

        // Deck sheet: fully transparent cells.
        let deck = RgbaImage::from_pixel(8, 12, Rgba([0, 0, 0, 0]));
        atlas.load_sheet_from_image("deck", deck, 1, 1).unwrap();

        let bare = atlas.get_sprite("deck", 0, false).unwrap();
        assert_eq!(bare.get_pixel(4, 6).0[3], 0);

        let backed = atlas.get_sprite("deck", 0, true).unwrap();
        assert_eq!(backed.dimensions(), (8, 12));
        assert_eq!(backed.get_pixel(4, 6).0, [255, 0, 0, 255]);
    }
}
