//! The glyph collection decoded from one capture.

mod export;

pub use export::{HeaderOptions, OutputFormat, PLACEHOLDER_ROW};

use std::rc::Rc;

use crate::capture::{self, CaptureProfile};
use crate::glyph::{Assembler, Glyph};

/// プレビュー倍率の初期値
pub const DEFAULT_PREVIEW_SCALE: u8 = 3;
/// プレビュー倍率の上限
pub const MAX_PREVIEW_SCALE: u8 = 20;

/// キャプチャ全体とそこから得たグリフ
#[derive(Debug)]
pub struct GlyphCollection {
    /// キャプチャ形式
    profile: CaptureProfile,
    /// デコード済みの全行
    lines: Vec<Rc<[u8]>>,
    /// グリフ一覧
    glyphs: Vec<Glyph>,
    /// 選択中のグリフ
    selected: Option<usize>,
    /// 変更カウンタ（単調増加）
    version: u64,
    /// プレビュー倍率
    preview_scale: u8,
}

impl GlyphCollection {
    pub fn new() -> Self {
        Self::with_profile(CaptureProfile::default())
    }

    pub fn with_profile(profile: CaptureProfile) -> Self {
        Self {
            profile,
            lines: Vec::new(),
            glyphs: Vec::new(),
            selected: None,
            version: 0,
            preview_scale: DEFAULT_PREVIEW_SCALE,
        }
    }

    pub fn profile(&self) -> &CaptureProfile {
        &self.profile
    }

    /// 次回の parse から使うプロファイルを設定
    pub fn set_profile(&mut self, profile: CaptureProfile) {
        self.profile = profile;
    }

    /// キャプチャを解析してコレクションを置き換える
    /// 戻り値: 入力が空なら false（現在の内容はそのまま）
    pub fn parse<S: AsRef<str>>(&mut self, lines: &[S]) -> bool {
        if lines.is_empty() {
            return false;
        }

        let lines: Vec<Rc<[u8]>> = lines
            .iter()
            .map(|line| capture::decode_line(line.as_ref()).into())
            .collect();

        let mut assembler = Assembler::new(self.profile);
        for (index, line) in lines.iter().enumerate() {
            assembler.feed(index, Rc::clone(line));
        }
        let glyphs = assembler.finish();

        log::info!("Parsed {} lines into {} glyphs", lines.len(), glyphs.len());

        self.lines = lines;
        self.glyphs = glyphs;
        self.selected = None;
        self.version += 1;
        true
    }

    /// デコード済みの行
    pub fn lines(&self) -> &[Rc<[u8]>] {
        &self.lines
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn glyph(&self, index: usize) -> Option<&Glyph> {
        self.glyphs.get(index)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// コードポイントで最初のグリフを探す
    pub fn find_codepoint(&self, codepoint: u16) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.codepoint() == codepoint)
    }

    /// 変更されたグリフの数
    pub fn modified_count(&self) -> usize {
        self.glyphs.iter().filter(|g| g.is_modified()).count()
    }

    /// 変更カウンタ
    pub fn version(&self) -> u64 {
        self.version
    }

    /// グリフを選択（範囲外なら選択は変わらない）
    pub fn select(&mut self, index: Option<usize>) -> bool {
        match index {
            Some(i) if i >= self.glyphs.len() => false,
            _ => {
                self.selected = index;
                true
            }
        }
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Glyph> {
        self.selected.and_then(|i| self.glyphs.get(i))
    }

    /// ピクセルを設定
    /// 戻り値: グリフが存在し、範囲内で書き込んだか
    pub fn set_pixel(&mut self, index: usize, x: usize, y: usize, value: bool) -> bool {
        let Some(glyph) = self.glyphs.get_mut(index) else {
            return false;
        };
        if !glyph.set_pixel(x, y, value) {
            return false;
        }
        self.version += 1;
        true
    }

    /// グリフを作成時のデータに戻す
    pub fn reset_glyph(&mut self, index: usize) -> bool {
        let Some(glyph) = self.glyphs.get_mut(index) else {
            return false;
        };
        glyph.reset_bitmap();
        self.version += 1;
        true
    }

    /// 選択中のグリフのピクセルを設定
    pub fn set_selected_pixel(&mut self, x: usize, y: usize, value: bool) -> bool {
        match self.selected {
            Some(index) => self.set_pixel(index, x, y, value),
            None => false,
        }
    }

    /// 選択中のグリフを元に戻す
    pub fn reset_selected(&mut self) -> bool {
        match self.selected {
            Some(index) => self.reset_glyph(index),
            None => false,
        }
    }

    pub fn preview_scale(&self) -> u8 {
        self.preview_scale
    }

    /// プレビュー倍率を設定（1..=20 以外は無視）
    pub fn set_preview_scale(&mut self, scale: u8) -> bool {
        if !(1..=MAX_PREVIEW_SCALE).contains(&scale) {
            return false;
        }
        self.preview_scale = scale;
        true
    }
}

impl Default for GlyphCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture_line(codepoint: u16, fill: u8) -> String {
        let mut bytes = vec![0xF0, 0x00, 0x01, 0x3C];
        bytes.extend(codepoint.to_le_bytes());
        bytes.extend([0x00, 0x00]);
        bytes.extend(std::iter::repeat_n(fill, crate::glyph::DATA_LEN));
        bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
    }

    fn parsed() -> GlyphCollection {
        let mut collection = GlyphCollection::new();
        assert!(collection.parse(&[capture_line(0x41, 0x00), capture_line(0x42, 0xFF)]));
        collection
    }

    #[test]
    fn test_parse_empty_keeps_state() {
        let mut collection = parsed();
        let version = collection.version();
        let empty: [&str; 0] = [];

        assert!(!collection.parse(&empty));
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.version(), version);
    }

    #[test]
    fn test_parse_replaces_collection() {
        let mut collection = parsed();
        collection.select(Some(1));
        collection.set_pixel(0, 0, 0, true);

        assert!(collection.parse(&[capture_line(0x43, 0x00)]));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.selected_index(), None);
        assert_eq!(collection.modified_count(), 0);
        assert_eq!(collection.glyphs()[0].codepoint(), 0x43);
    }

    #[test]
    fn test_version_counts_changes() {
        let mut collection = parsed();
        let v0 = collection.version();

        assert!(collection.set_pixel(0, 3, 3, true));
        assert!(collection.reset_glyph(0));
        assert!(!collection.set_pixel(0, 0, 100, true));
        assert!(!collection.set_pixel(9, 0, 0, true));
        assert!(!collection.reset_glyph(9));

        assert_eq!(collection.version(), v0 + 2);
    }

    #[test]
    fn test_selection() {
        let mut collection = parsed();
        assert!(!collection.set_selected_pixel(0, 0, true));
        assert!(!collection.reset_selected());

        assert!(collection.select(Some(1)));
        assert!(!collection.select(Some(2)));
        assert_eq!(collection.selected().map(Glyph::codepoint), Some(0x42));

        assert!(collection.set_selected_pixel(0, 0, false));
        assert!(collection.glyphs()[1].is_modified());
        assert!(collection.reset_selected());
        assert!(!collection.glyphs()[1].is_modified());

        assert!(collection.select(None));
        assert!(collection.selected().is_none());
    }

    #[test]
    fn test_find_codepoint() {
        let collection = parsed();
        assert_eq!(collection.find_codepoint(0x42).map(Glyph::index), Some(1));
        assert!(collection.find_codepoint(0x99).is_none());
    }

    #[test]
    fn test_set_profile_applies_on_next_parse() {
        let lines = [capture_line(0x41, 0x55), capture_line(0x42, 0x55)];
        let mut collection = GlyphCollection::new();
        assert_eq!(collection.profile(), &CaptureProfile::STANDARD);
        assert!(collection.parse(&lines));

        let shifted = CaptureProfile {
            header_skip: 2,
            ..CaptureProfile::STANDARD
        };
        collection.set_profile(shifted);
        assert_eq!(collection.profile(), &shifted);
        // 解析済みの内容はそのまま
        assert_eq!(collection.glyphs()[0].codepoint(), 0x41);

        assert!(collection.parse(&lines));
        let codepoints: Vec<u16> = collection.glyphs().iter().map(Glyph::codepoint).collect();
        assert_eq!(codepoints, vec![0x0000, 0x0000]);
        assert_eq!(collection.glyphs()[1].data().len(), 89 - 4);
    }

    #[test]
    fn test_preview_scale() {
        let mut collection = GlyphCollection::new();
        assert_eq!(collection.preview_scale(), DEFAULT_PREVIEW_SCALE);
        assert!(collection.set_preview_scale(20));
        assert!(!collection.set_preview_scale(0));
        assert!(!collection.set_preview_scale(21));
        assert_eq!(collection.preview_scale(), 20);
    }
}
