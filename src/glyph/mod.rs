//! Glyph records and their source-byte provenance.

mod assembler;

pub use assembler::Assembler;

use std::fmt::Display;
use std::rc::Rc;

/// 1文字分のレコード長
pub const RECORD_LEN: usize = 91;
/// レコード先頭の読み飛ばすバイト数（コードポイント2バイト + 用途不明2バイト）
pub const SKIP_BYTES: usize = 4;
/// グリフデータ長
pub const DATA_LEN: usize = RECORD_LEN - SKIP_BYTES;
/// 1行あたりのバイト数
pub const BYTES_PER_ROW: usize = 3;
/// グリフの幅（ピクセル）
pub const GLYPH_WIDTH: usize = BYTES_PER_ROW * 8;
/// ビットマップの最大行数
pub const MAX_ROWS: usize = RECORD_LEN / BYTES_PER_ROW;

/// ビットマップの1行
pub type BitmapRow = [bool; GLYPH_WIDTH];

/// グリフのバイトがキャプチャのどこから来たかの記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteOrigin {
    /// 元の行のバイト列
    line: Rc<[u8]>,
    /// 行番号
    line_index: usize,
    /// グリフデータの範囲（両端を含む）。`None` はグリフデータなし
    span: Option<(usize, usize)>,
}

impl ByteOrigin {
    /// グリフデータを含む範囲を記録
    pub fn span(line: Rc<[u8]>, line_index: usize, start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self {
            line,
            line_index,
            span: Some((start, end)),
        }
    }

    /// グリフデータを含まない行を記録
    pub fn sentinel(line: Rc<[u8]>, line_index: usize) -> Self {
        Self {
            line,
            line_index,
            span: None,
        }
    }

    pub fn line(&self) -> &[u8] {
        &self.line
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn range(&self) -> Option<(usize, usize)> {
        self.span
    }

    pub fn start(&self) -> Option<usize> {
        self.span.map(|(start, _)| start)
    }

    pub fn end(&self) -> Option<usize> {
        self.span.map(|(_, end)| end)
    }

    pub fn is_sentinel(&self) -> bool {
        self.span.is_none()
    }

    /// 範囲内のバイト列（行末を超える部分は切り捨て）
    pub fn bytes(&self) -> &[u8] {
        match self.span {
            Some((start, end)) => {
                let end = (end + 1).min(self.line.len());
                self.line.get(start..end).unwrap_or_default()
            }
            None => &[],
        }
    }
}

/// provenance を順に連結し、先頭 `SKIP_BYTES` を除いたバイト列
pub fn provenance_bytes(origin: &[ByteOrigin]) -> Vec<u8> {
    origin
        .iter()
        .flat_map(|o| o.bytes().iter().copied())
        .skip(SKIP_BYTES)
        .collect()
}

/// 1文字分のグリフ
#[derive(Debug, Clone)]
pub struct Glyph {
    /// 表示用の文字
    character: char,
    /// コードポイント
    codepoint: u16,
    /// ビットマップデータ（編集対象）
    data: Vec<u8>,
    /// 作成時のデータ
    original_data: Box<[u8]>,
    /// データの出所
    origin: Vec<ByteOrigin>,
    /// コレクション内の位置
    index: usize,
    /// 変更フラグ
    modified: bool,
}

impl Glyph {
    pub fn new(codepoint: u16, data: Vec<u8>, origin: Vec<ByteOrigin>, index: usize) -> Self {
        Self {
            character: display_char(codepoint),
            codepoint,
            original_data: data.clone().into_boxed_slice(),
            data,
            origin,
            index,
            modified: false,
        }
    }

    pub fn character(&self) -> char {
        self.character
    }

    pub fn codepoint(&self) -> u16 {
        self.codepoint
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn original_data(&self) -> &[u8] {
        &self.original_data
    }

    pub fn origin(&self) -> &[ByteOrigin] {
        &self.origin
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// ビットマップ表示（3バイト = 1行、MSBが左端）
    pub fn bitmap(&self) -> Vec<BitmapRow> {
        self.data
            .chunks_exact(BYTES_PER_ROW)
            .take(MAX_ROWS)
            .map(|chunk| {
                let value = u32::from_be_bytes([0, chunk[0], chunk[1], chunk[2]]);
                let mut row = [false; GLYPH_WIDTH];
                for (x, pixel) in row.iter_mut().enumerate() {
                    *pixel = value & (1 << (GLYPH_WIDTH - 1 - x)) != 0;
                }
                row
            })
            .collect()
    }

    /// 指定ピクセルの値
    pub fn pixel(&self, x: usize, y: usize) -> Option<bool> {
        let (byte_index, bit) = pixel_position(x, y)?;
        self.data.get(byte_index).map(|byte| byte & (1 << bit) != 0)
    }

    /// ピクセルを設定
    /// 戻り値: 範囲内で書き込んだか
    pub fn set_pixel(&mut self, x: usize, y: usize, value: bool) -> bool {
        let Some((byte_index, bit)) = pixel_position(x, y) else {
            return false;
        };
        let Some(byte) = self.data.get_mut(byte_index) else {
            return false;
        };

        if value {
            *byte |= 1 << bit;
        } else {
            *byte &= !(1 << bit);
        }
        self.modified = true;
        true
    }

    /// 作成時のデータに戻す
    pub fn reset_bitmap(&mut self) {
        self.data = self.original_data.to_vec();
        self.modified = false;
    }

    /// 編集後のデータを書き戻した provenance を作成
    ///
    /// Lines are copied before writing, the stored originals are never
    /// touched. Unmodified glyphs return their provenance as is.
    pub fn rebuilt_origin(&self) -> Vec<ByteOrigin> {
        if !self.modified {
            return self.origin.clone();
        }

        let mut data = self.data.iter().copied();
        let mut skipped = 0;
        let mut rebuilt = Vec::with_capacity(self.origin.len());

        for origin in &self.origin {
            let Some((start, end)) = origin.range() else {
                rebuilt.push(origin.clone());
                continue;
            };

            let mut line = origin.line().to_vec();
            let mut pos = start;
            if skipped < SKIP_BYTES {
                let delta = (SKIP_BYTES - skipped).min(end - start + 1);
                pos += delta;
                skipped += delta;
            }

            while pos <= end {
                let Some(byte) = data.next() else {
                    break;
                };
                if let Some(slot) = line.get_mut(pos) {
                    *slot = byte;
                }
                pos += 1;
            }

            rebuilt.push(ByteOrigin::span(line.into(), origin.line_index(), start, end));
        }

        rebuilt
    }
}

impl Display for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (y, row) in self.bitmap().iter().enumerate() {
            write!(f, "{y:2} ")?;
            for &pixel in row {
                f.write_str(if pixel { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// コードポイントから表示文字を作る（サロゲートは U+FFFD）
pub fn display_char(codepoint: u16) -> char {
    char::from_u32(u32::from(codepoint)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// ピクセルのバイト位置とビット位置（桁あふれは None）
fn pixel_position(x: usize, y: usize) -> Option<(usize, u32)> {
    let byte_index = y.checked_mul(BYTES_PER_ROW)?.checked_add(x / 8)?;
    let bit = 7 - (x % 8) as u32;
    Some((byte_index, bit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_line(payload: &[u8]) -> Rc<[u8]> {
        let mut line = vec![0xF0, 0x00, 0x01, 0x3C];
        line.extend_from_slice(payload);
        line.into()
    }

    fn sample_glyph() -> Glyph {
        let mut payload = vec![0x41, 0x00, 0xAA, 0xBB];
        payload.extend((0..DATA_LEN).map(|i| i as u8));
        let line = record_line(&payload);
        let origin = vec![ByteOrigin::span(line.clone(), 0, 4, line.len() - 1)];
        Glyph::new(0x41, payload[SKIP_BYTES..].to_vec(), origin, 0)
    }

    #[test]
    fn test_display_char() {
        assert_eq!(display_char(0x41), 'A');
        assert_eq!(display_char(0x00B0), '°');
        assert_eq!(display_char(0xD800), char::REPLACEMENT_CHARACTER);
    }

    #[test]
    fn test_bitmap_rows() {
        let mut glyph = sample_glyph();
        glyph.data[0] = 0b1000_0000;
        glyph.data[1] = 0x00;
        glyph.data[2] = 0b0000_0001;

        let bitmap = glyph.bitmap();
        assert_eq!(bitmap.len(), DATA_LEN / BYTES_PER_ROW);
        assert!(bitmap[0][0]);
        assert!(!bitmap[0][1]);
        assert!(bitmap[0][23]);
        assert_eq!(bitmap[0].iter().filter(|&&p| p).count(), 2);
    }

    #[test]
    fn test_bitmap_truncates_short_data() {
        let glyph = Glyph::new(0, vec![0xFF; 7], Vec::new(), 0);
        let bitmap = glyph.bitmap();
        assert_eq!(bitmap.len(), 2);
        assert!(bitmap[1].iter().all(|&p| p));
    }

    #[test]
    fn test_set_pixel() {
        let mut glyph = sample_glyph();
        let before = glyph.data()[3];

        assert!(glyph.set_pixel(1, 1, true));
        assert_eq!(glyph.data()[3], before | 0b0100_0000);
        assert_eq!(glyph.pixel(1, 1), Some(true));
        assert!(glyph.is_modified());

        assert!(glyph.set_pixel(1, 1, false));
        assert_eq!(glyph.data()[3], before & !0b0100_0000);
    }

    #[test]
    fn test_set_pixel_out_of_range() {
        let mut glyph = sample_glyph();
        assert!(!glyph.set_pixel(0, MAX_ROWS, true));
        assert!(!glyph.set_pixel(0, 29, true));
        assert!(!glyph.is_modified());
        assert_eq!(glyph.data(), glyph.original_data());
        assert_eq!(glyph.pixel(0, 29), None);
    }

    #[test]
    fn test_set_pixel_huge_coordinates() {
        let mut glyph = sample_glyph();
        // 3倍すると桁あふれして小さな値に戻る y
        let wrapping_y = usize::MAX / BYTES_PER_ROW * 2 + 1;

        assert!(!glyph.set_pixel(0, usize::MAX, true));
        assert!(!glyph.set_pixel(0, wrapping_y, true));
        assert!(!glyph.set_pixel(usize::MAX, usize::MAX / BYTES_PER_ROW, true));
        assert!(!glyph.is_modified());
        assert_eq!(glyph.data(), glyph.original_data());
        assert_eq!(glyph.pixel(0, wrapping_y), None);
        assert_eq!(glyph.pixel(usize::MAX, usize::MAX), None);
    }

    #[test]
    fn test_set_then_clear_restores_data() {
        let mut glyph = sample_glyph();
        let was = glyph.pixel(5, 3).unwrap();
        glyph.set_pixel(5, 3, !was);
        glyph.set_pixel(5, 3, was);
        assert_eq!(glyph.data(), glyph.original_data());
        assert!(glyph.is_modified());
    }

    #[test]
    fn test_reset_bitmap() {
        let mut glyph = sample_glyph();
        for x in 0..GLYPH_WIDTH {
            glyph.set_pixel(x, 7, true);
        }
        glyph.reset_bitmap();
        assert_eq!(glyph.data(), glyph.original_data());
        assert!(!glyph.is_modified());
    }

    #[test]
    fn test_rebuilt_origin_writes_edits() {
        let mut glyph = sample_glyph();
        assert_eq!(provenance_bytes(glyph.origin()), glyph.data());

        glyph.set_pixel(0, 0, true);
        let rebuilt = glyph.rebuilt_origin();
        assert_eq!(provenance_bytes(&rebuilt), glyph.data());

        // 先頭4バイト（ヘッダ直後のコードポイント等）は変わらない
        assert_eq!(rebuilt[0].line()[..8], glyph.origin()[0].line()[..8]);
        assert_eq!(rebuilt[0].line()[8], 0x80);
        assert_eq!(glyph.origin()[0].line()[8], 0x00);
    }

    #[test]
    fn test_display() {
        let glyph = Glyph::new(0, vec![0x80, 0x00, 0x01], Vec::new(), 0);
        assert_eq!(glyph.to_string(), " 0 #......................#\n");
    }
}
