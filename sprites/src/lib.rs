//! Sprite-sheet atlas and card modifier compositing.
//!
//! This crate owns everything that touches the game's sprite sheets: grid
//! extraction and caching ([`SpriteAtlas`]), the card identity model
//! ([`CardClass`]), the modifier model ([`ModifierSpec`],
//! [`ModifierSelection`]) and the layered compositing pipeline ([`compose`]).
//!
//! The vision engine consumes atlas output (card bitmaps) to build its
//! template bank; the application crate wires both together.

mod atlas;
pub use atlas::*;
mod cards;
pub use cards::*;
mod compose;
pub use compose::*;
mod error;
pub use error::*;
mod modifier;
pub use modifier::*;
