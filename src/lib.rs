//! fmcglyph - FMC display font capture editor
//!
//! This library decodes hex-dump captures of the display protocol into glyph
//! bitmaps, lets callers edit pixels, and writes the capture back out with
//! only the edited bytes changed. The `fmcglyph` binary is a thin CLI on top.

pub mod capture;
pub mod clipboard;
pub mod font;
pub mod glyph;

pub use capture::{CaptureProfile, PacketKind};
pub use font::{GlyphCollection, HeaderOptions, OutputFormat};
pub use glyph::{ByteOrigin, Glyph};
