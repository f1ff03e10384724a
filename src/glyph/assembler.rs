use std::rc::Rc;

use super::{ByteOrigin, Glyph, RECORD_LEN, SKIP_BYTES};
use crate::capture::{
    self, APPEND_OFFSET, CaptureProfile, ControlScanner, DATA_CURSOR, PacketKind, Segment,
};

/// 組み立て中のレコード（固定長バッファ + 書き込み位置）
struct RecordBuffer {
    bytes: [u8; RECORD_LEN],
    len: usize,
}

impl RecordBuffer {
    fn new() -> Self {
        Self {
            bytes: [0; RECORD_LEN],
            len: 0,
        }
    }

    fn remaining(&self) -> usize {
        RECORD_LEN - self.len
    }

    fn extend(&mut self, src: &[u8]) {
        self.bytes[self.len..self.len + src.len()].copy_from_slice(src);
        self.len += src.len();
    }

    fn is_full(&self) -> bool {
        self.len == RECORD_LEN
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

/// キャプチャの行を順に受け取り、グリフを組み立てる
pub struct Assembler {
    /// キャプチャ形式
    profile: CaptureProfile,
    /// 制御シーケンススキャナ
    scanner: ControlScanner,
    /// 組み立て中のレコード
    record: RecordBuffer,
    /// 組み立て中のレコードの provenance
    origin: Vec<ByteOrigin>,
    /// ラン内でまだデータブロック行を見ていないか
    header_pending: bool,
    /// 完成したグリフ
    glyphs: Vec<Glyph>,
}

impl Assembler {
    pub fn new(profile: CaptureProfile) -> Self {
        Self {
            profile,
            scanner: ControlScanner::new(),
            record: RecordBuffer::new(),
            origin: Vec::new(),
            header_pending: true,
            glyphs: Vec::new(),
        }
    }

    /// 1行分のパケットを処理
    pub fn feed(&mut self, line_index: usize, line: Rc<[u8]>) {
        match capture::classify(&line, &self.profile) {
            PacketKind::Reset => {
                if !self.record.is_empty() {
                    log::debug!(
                        "Reset at line {} discards {} pending bytes",
                        line_index,
                        self.record.len
                    );
                }
                self.start_run();
                self.origin.push(ByteOrigin::sentinel(line, line_index));
            }
            PacketKind::AppendSingle if line.len() > APPEND_OFFSET => {
                let segment = Segment {
                    start: APPEND_OFFSET,
                    end: APPEND_OFFSET,
                };
                self.append(&line, line_index, segment);
            }
            PacketKind::DataBlock => {
                let mut cursor = DATA_CURSOR;
                if self.header_pending {
                    self.header_pending = false;
                    cursor += self.profile.header_skip;
                }

                let segments = self.scanner.scan(&line, cursor);
                if segments.is_empty() {
                    self.origin.push(ByteOrigin::sentinel(line, line_index));
                } else {
                    for segment in segments {
                        self.append(&line, line_index, segment);
                    }
                }
            }
            PacketKind::AppendSingle | PacketKind::Other => {
                self.origin.push(ByteOrigin::sentinel(line, line_index));
            }
        }
    }

    /// 入力終了。残りのバイトがあれば最後のグリフとして出力
    pub fn finish(mut self) -> Vec<Glyph> {
        if !self.record.is_empty() {
            log::debug!("Flushing {} residual bytes as a final glyph", self.record.len);
            let data = self.record.as_slice().get(SKIP_BYTES..).unwrap_or_default().to_vec();
            let origin = std::mem::take(&mut self.origin);
            let index = self.glyphs.len();
            self.glyphs.push(Glyph::new(0, data, origin, index));
        }
        self.glyphs
    }

    fn start_run(&mut self) {
        self.record.clear();
        self.origin.clear();
        self.scanner.reset();
        self.header_pending = true;
    }

    /// 範囲内のバイトをレコードに追加（レコード境界で分割）
    fn append(&mut self, line: &Rc<[u8]>, line_index: usize, segment: Segment) {
        let mut start = segment.start;
        while start <= segment.end {
            let take = self.record.remaining().min(segment.end - start + 1);
            let end = start + take - 1;

            self.record.extend(&line[start..=end]);
            self.origin
                .push(ByteOrigin::span(Rc::clone(line), line_index, start, end));
            start = end + 1;

            if self.record.is_full() {
                self.emit();
            }
        }
    }

    fn emit(&mut self) {
        let record = self.record.as_slice();
        let codepoint = u16::from_le_bytes([record[0], record[1]]);
        let data = record[SKIP_BYTES..].to_vec();
        let origin = std::mem::take(&mut self.origin);
        let index = self.glyphs.len();

        log::debug!("Glyph {} complete: U+{:04X}", index, codepoint);
        self.glyphs.push(Glyph::new(codepoint, data, origin, index));
        self.record.clear();
    }
}
