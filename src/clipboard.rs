//! Clipboard delivery for exported header rows.
//!
//! The system clipboard is tried first. Over SSH or without a display server
//! the text goes to the terminal as an OSC 52 escape instead.

use std::io::{self, Write};

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard error: {0}")]
    System(#[from] arboard::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// コピー先
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTarget {
    /// OSのクリップボード
    System,
    /// 端末（OSC 52）
    Terminal,
}

/// OSのクリップボードにコピー
pub fn copy_to_system(text: &str) -> Result<(), ClipboardError> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_owned())?;
    Ok(())
}

/// OSC 52 エスケープシーケンスを作成
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// 端末へ OSC 52 で送る
pub fn copy_to_terminal(out: &mut impl Write, text: &str) -> Result<(), ClipboardError> {
    out.write_all(osc52_sequence(text).as_bytes())?;
    out.flush()?;
    Ok(())
}

/// OSのクリップボード、失敗したら端末にコピー
pub fn copy_to_all(text: &str) -> Result<ClipboardTarget, ClipboardError> {
    match copy_to_system(text) {
        Ok(()) => Ok(ClipboardTarget::System),
        Err(e) => {
            log::warn!("{}, falling back to OSC 52", e);
            copy_to_terminal(&mut io::stderr(), text)?;
            Ok(ClipboardTarget::Terminal)
        }
    }
}
