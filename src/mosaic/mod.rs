pub mod controller;
pub mod glyph;
pub mod state;

pub use controller::MosaicController;
pub use glyph::{layout_digits, GlyphLayout, MosaicTile};
pub use state::{
    fallback_color, MosaicMessage, MosaicPhoto, MosaicState, MosaicView, TileFill, TileView,
    FALLBACK_PALETTE,
};
