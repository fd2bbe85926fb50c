use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the sprite atlas.
///
/// Unknown sheets and out-of-range indices are configuration bugs and stay
/// hard errors; recoverable conditions (a missing card back, for example) are
/// logged by the callers instead of surfacing here.
#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("sprite sheet '{name}' is not registered")]
    SheetNotFound { name: String },

    #[error("sprite index {index} out of range for sheet '{sheet}' ({cols}x{rows})")]
    IndexOutOfRange {
        sheet: String,
        index: u32,
        cols: u32,
        rows: u32,
    },

    #[error("sheet '{name}' declares an empty {cols}x{rows} grid")]
    InvalidGrid { name: String, cols: u32, rows: u32 },

    #[error("failed to load sprite sheet {path:?}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
