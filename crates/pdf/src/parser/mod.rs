pub mod backend;
pub mod font;
pub mod glyphs;
pub mod words;
