//! Sprite sheet discovery and atlas construction.
//!
//! Sheets are PNG files whose grid geometry is encoded in the filename, e.g.
//! `13x4 playing_cards.png`. The assets directory is scanned for that pattern;
//! sheets declared explicitly in the config win over scanned files with the
//! same name.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use sprites::SpriteAtlas;

use crate::config::Config;

static SHEET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)x(\d+)\s+(.+)\.(?i:png)$").expect("sheet filename regex")
});

/// Parse a `<cols>x<rows> <name>.png` filename into grid geometry and name.
fn parse_sheet_name(filename: &str) -> Option<(u32, u32, String)> {
    let caps = SHEET_NAME.captures(filename)?;
    let cols: u32 = caps[1].parse().ok()?;
    let rows: u32 = caps[2].parse().ok()?;
    Some((cols, rows, caps[3].to_string()))
}

/// Build the sprite atlas: scan the assets directory, apply explicit sheet
/// declarations, then designate the card back.
pub fn load_atlas(config: &Config) -> Result<SpriteAtlas> {
    let mut atlas = SpriteAtlas::new();

    if config.assets_dir.is_dir() {
        let entries = std::fs::read_dir(&config.assets_dir)
            .with_context(|| format!("read assets dir {:?}", config.assets_dir))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("scan {:?}", config.assets_dir))?;
            let filename = entry.file_name();
            let Some(filename) = filename.to_str() else { continue };
            let Some((cols, rows, name)) = parse_sheet_name(filename) else {
                continue;
            };
            if config.sheets.contains_key(&name) {
                continue;
            }
            if let Err(err) = atlas.load_sheet(&name, &entry.path(), cols, rows) {
                tracing::warn!(sheet = %name, error = %err, "skipping unreadable sheet");
            }
        }
    } else {
        tracing::warn!(dir = ?config.assets_dir, "assets directory not found");
    }

    // Explicit declarations are user intent; failures here are fatal.
    for (name, sheet) in &config.sheets {
        let path = resolve(config, &sheet.file);
        atlas
            .load_sheet(name, &path, sheet.cols, sheet.rows)
            .with_context(|| format!("load declared sheet {name:?}"))?;
    }

    match atlas.load_card_back(&config.backs_sheet, config.card_back_index) {
        Ok(()) => {}
        Err(err) => {
            tracing::warn!(
                sheet = %config.backs_sheet,
                index = config.card_back_index,
                error = %err,
                "card back unavailable; sprites render without a back"
            );
        }
    }

    Ok(atlas)
}

fn resolve(config: &Config, file: &std::path::Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        config.assets_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetConfig;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_parse_sheet_name() {
        assert_eq!(
            parse_sheet_name("13x4 playing_cards.png"),
            Some((13, 4, "playing_cards".to_string()))
        );
        assert_eq!(
            parse_sheet_name("5x5 Enhancers.PNG"),
            Some((5, 5, "Enhancers".to_string()))
        );
        assert_eq!(parse_sheet_name("playing_cards.png"), None);
        assert_eq!(parse_sheet_name("13x4 cards.jpg"), None);
        assert_eq!(parse_sheet_name("x4 cards.png"), None);
    }

    #[test]
    fn test_scan_and_explicit_override() {
        let dir = std::env::temp_dir().join(format!("balatrack-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        RgbaImage::from_pixel(26, 8, Rgba([1, 1, 1, 255]))
            .save(dir.join("13x4 playing_cards.png"))
            .unwrap();
        RgbaImage::from_pixel(10, 4, Rgba([2, 2, 2, 255]))
            .save(dir.join("5x2 enhancers.png"))
            .unwrap();
        RgbaImage::from_pixel(21, 3, Rgba([3, 3, 3, 255]))
            .save(dir.join("override.png"))
            .unwrap();

        let mut config = Config {
            assets_dir: dir.clone(),
            ..Config::default()
        };
        // Declared sheet beats the scanned file of the same name.
        config.sheets.insert(
            "enhancers".to_string(),
            SheetConfig {
                file: PathBuf::from("override.png"),
                cols: 7,
                rows: 1,
            },
        );

        let atlas = load_atlas(&config).unwrap();
        assert_eq!(atlas.sheet("playing_cards").unwrap().cell_count(), 52);
        let enhancers = atlas.sheet("enhancers").unwrap();
        assert_eq!((enhancers.cols(), enhancers.rows()), (7, 1));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
