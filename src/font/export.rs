use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use super::GlyphCollection;

/// 未知の形式で各行の代わりに出力する文字列
pub const PLACEHOLDER_ROW: &str = "unknown-file-type";

/// Cヘッダ出力の名前
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderOptions {
    /// インクルードガード
    pub guard: String,
    /// テーブル名
    pub table: String,
}

impl HeaderOptions {
    fn prologue(&self) -> String {
        format!(
            "#ifndef {guard}\n#define {guard}\n#include <vector>\n\nconst std::vector<std::vector<unsigned char>> {table} = {{",
            guard = self.guard,
            table = self.table,
        )
    }

    fn epilogue(&self) -> String {
        format!("}};\n\n#endif // {}", self.guard)
    }
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            guard: "FONT_AIRBUS_VARIANT_1_H".to_string(),
            table: "fmcFontAirbusVariant1".to_string(),
        }
    }
}

/// 出力形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// 1行1パケット、大文字HEXをスペース区切り
    Plain,
    /// インクルードガード付きのCヘッダ
    Header(HeaderOptions),
    /// Cヘッダの行部分のみ（クリップボード用）
    HeaderClipboard,
    /// 未知の形式
    Unknown(String),
}

impl From<&str> for OutputFormat {
    fn from(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "plain" | "binary" | "hex" => OutputFormat::Plain,
            "header" | "c-header" => OutputFormat::Header(HeaderOptions::default()),
            "clipboard" | "c-header-clipboard" => OutputFormat::HeaderClipboard,
            _ => OutputFormat::Unknown(name.to_string()),
        }
    }
}

impl OutputFormat {
    fn row(&self, bytes: &[u8]) -> String {
        match self {
            OutputFormat::Plain => bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" "),
            OutputFormat::Header(_) | OutputFormat::HeaderClipboard => {
                let items: Vec<String> = bytes.iter().map(|b| format!("0x{:02X}", b)).collect();
                format!("  {{{}}},", items.join(","))
            }
            OutputFormat::Unknown(_) => PLACEHOLDER_ROW.to_string(),
        }
    }
}

impl GlyphCollection {
    /// 変更を反映したキャプチャを出力
    /// 戻り値: グリフがなければ None
    pub fn serialize(&self, format: &OutputFormat) -> Option<String> {
        if self.glyphs.is_empty() {
            return None;
        }
        if let OutputFormat::Unknown(name) = format {
            log::warn!("Unknown output format {:?}", name);
        }

        let edited = self.edited_lines();
        let mut output = Vec::with_capacity(self.lines.len() + 2);

        if let OutputFormat::Header(options) = format {
            output.push(options.prologue());
        }

        for (index, line) in self.lines.iter().enumerate() {
            let bytes = edited.get(&index).map_or(&line[..], Vec::as_slice);
            output.push(format.row(bytes));
        }

        if let OutputFormat::Header(options) = format {
            output.push(options.epilogue());
        }

        Some(output.join("\n"))
    }

    /// 変更されたグリフが触れた行の作業コピー（行番号順）
    ///
    /// One working copy per line; every modified glyph that touches the line
    /// writes its span into the same copy.
    pub fn edited_lines(&self) -> BTreeMap<usize, Vec<u8>> {
        let mut edited: BTreeMap<usize, Vec<u8>> = BTreeMap::new();

        for glyph in self.glyphs.iter().filter(|g| g.is_modified()) {
            for origin in glyph.rebuilt_origin() {
                let Some((start, end)) = origin.range() else {
                    continue;
                };

                let working = match edited.entry(origin.line_index()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => match self.lines.get(origin.line_index()) {
                        Some(line) => entry.insert(line.to_vec()),
                        None => {
                            log::warn!(
                                "Glyph {}: original line {} not found, skipping",
                                glyph.index(),
                                origin.line_index()
                            );
                            continue;
                        }
                    },
                };

                for pos in start..=end {
                    if let (Some(dst), Some(&src)) = (working.get_mut(pos), origin.line().get(pos)) {
                        *dst = src;
                    }
                }
            }
        }

        edited
    }
}
