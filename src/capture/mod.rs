//! Capture decoding and packet classification.
//!
//! A capture is a text file with one protocol packet per line, written as
//! whitespace separated two-digit hex tokens.

mod scanner;

pub use scanner::{
    CONTROL_EXTRA_OFFSET, CONTROL_FIXED_LEN, CONTROL_MARKER, ControlScanner, Segment,
};

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use thiserror::Error;

/// パケットヘッダの先頭2バイト
pub const PACKET_HEADER: [u8; 2] = [0xF0, 0x00];
/// オペコードの位置
pub const OPCODE_INDEX: usize = 3;
/// データブロックの走査開始位置（ヘッダ直後）
pub const DATA_CURSOR: usize = 4;
/// 1バイト追加パケットのデータ位置
pub const APPEND_OFFSET: usize = 4;

/// 1バイト追加オペコード
pub const OPCODE_APPEND_SINGLE: u8 = 0x12;
/// データブロックオペコード
pub const OPCODE_DATA_BLOCK: u8 = 0x3C;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture is empty: {}", .0.display())]
    Empty(PathBuf),
}

/// リセット判定に使う追加条件（指定位置のバイト値）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub index: usize,
    pub value: u8,
}

/// キャプチャ形式のプロファイル
///
/// Two capture variants exist in the field and nothing in the stream tells
/// them apart, so the caller picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureProfile {
    /// リセットオペコード
    pub reset_opcode: u8,
    /// リセットのガードバイト
    pub reset_guard: Option<Guard>,
    /// ラン内最初のデータブロック行で追加スキップするバイト数
    pub header_skip: usize,
}

impl CaptureProfile {
    /// 標準形式: リセット 0x02, カーソル 4
    pub const STANDARD: Self = Self {
        reset_opcode: 0x02,
        reset_guard: None,
        header_skip: 0,
    };

    /// 拡張形式: リセット 0x2A (byte[4] == 0x01), 最初のデータ行はカーソル 4+29
    pub const EXTENDED: Self = Self {
        reset_opcode: 0x2A,
        reset_guard: Some(Guard { index: 4, value: 0x01 }),
        header_skip: 29,
    };

    /// 名前からプロファイルを取得
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" | "std" => Some(Self::STANDARD),
            "extended" | "ext" => Some(Self::EXTENDED),
            _ => None,
        }
    }

    fn is_reset(&self, packet: &[u8]) -> bool {
        packet[OPCODE_INDEX] == self.reset_opcode
            && self
                .reset_guard
                .is_none_or(|guard| packet.get(guard.index) == Some(&guard.value))
    }
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// パケット種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// 蓄積中のデータを破棄して新しいランを開始
    Reset,
    /// byte[4] を1バイトのグリフデータとして追加
    AppendSingle,
    /// グリフデータを含むデータブロック
    DataBlock,
    /// 無関係なパケット
    Other,
}

/// ヘッダとオペコードからパケットを分類
pub fn classify(packet: &[u8], profile: &CaptureProfile) -> PacketKind {
    if packet.len() <= OPCODE_INDEX || packet[..2] != PACKET_HEADER {
        return PacketKind::Other;
    }

    if profile.is_reset(packet) {
        return PacketKind::Reset;
    }

    match packet[OPCODE_INDEX] {
        OPCODE_APPEND_SINGLE => PacketKind::AppendSingle,
        OPCODE_DATA_BLOCK => PacketKind::DataBlock,
        _ => PacketKind::Other,
    }
}

/// 1行のHEXテキストをバイト列に変換
///
/// Tokens that are not hex are dropped. A token with an even number of hex
/// digits (e.g. `F000`) decodes to several bytes.
pub fn decode_line(line: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    for token in line.split_whitespace() {
        if token.len() % 2 != 0 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            log::debug!("Dropping malformed hex token {:?}", token);
            continue;
        }
        for i in (0..token.len()).step_by(2) {
            if let Ok(byte) = u8::from_str_radix(&token[i..i + 2], 16) {
                bytes.push(byte);
            }
        }
    }
    bytes
}

/// キャプチャファイルのテキストを行に分割
///
/// The BOM decides the encoding; without one the text is read as UTF-8 with
/// invalid sequences replaced.
pub fn decode_text(raw: &[u8]) -> Vec<String> {
    let (text, encoding, had_errors) = UTF_8.decode(raw);
    if had_errors {
        log::warn!("Capture is not valid {}, invalid sequences replaced", encoding.name());
    }
    text.lines().map(str::to_owned).collect()
}

/// キャプチャファイルを読み込む
pub fn load(path: impl AsRef<Path>) -> Result<Vec<String>, CaptureError> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)?;

    let lines = decode_text(&raw);
    if lines.is_empty() {
        return Err(CaptureError::Empty(path.to_path_buf()));
    }
    Ok(lines)
}
