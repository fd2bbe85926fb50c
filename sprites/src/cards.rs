//! Card identity derived from deck sprite-sheet indices.

use serde::{Deserialize, Serialize};

/// Number of distinct card classes in a standard deck sheet (13 columns by
/// 4 rows).
pub const DECK_SIZE: usize = 52;

/// Rank names in deck-sheet column order.
pub const RANK_NAMES: [&str; 13] = [
    "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K", "A",
];

/// Suit names in deck-sheet row order.
pub const SUIT_NAMES: [&str; 4] = ["Hearts", "Clubs", "Diamonds", "Spades"];

/// A card class: an index into the deck sheet, `0..52`.
///
/// The rank is the column (`index % 13`) and the suit is the row
/// (`index / 13`). The orders themselves come from the sheet layout, not from
/// any game rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardClass(u8);

impl CardClass {
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < DECK_SIZE).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn rank(self) -> u8 {
        self.0 % 13
    }

    pub fn suit(self) -> u8 {
        self.0 / 13
    }

    /// All 52 classes in sheet order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..DECK_SIZE as u8).map(Self)
    }
}

impl std::fmt::Display for CardClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {}",
            RANK_NAMES[usize::from(self.rank())],
            SUIT_NAMES[usize::from(self.suit())]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_suit_split() {
        let card = CardClass::new(14).unwrap();
        assert_eq!(card.rank(), 1);
        assert_eq!(card.suit(), 1);
        assert_eq!(card.to_string(), "3 of Clubs");
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(CardClass::new(51).is_some());
        assert!(CardClass::new(52).is_none());
    }

    #[test]
    fn test_all_covers_deck() {
        assert_eq!(CardClass::all().count(), DECK_SIZE);
    }
}
