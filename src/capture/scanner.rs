/// 制御シーケンスの開始マーカー
pub const CONTROL_MARKER: [u8; 4] = [0x32, 0xBB, 0x00, 0x00];
/// 制御シーケンスの固定長
pub const CONTROL_FIXED_LEN: usize = 17;
/// 可変長バイトのマーカーからの位置
pub const CONTROL_EXTRA_OFFSET: usize = 13;

/// 1行内で連続するグリフデータの範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

/// データブロック内の制御シーケンスを読み飛ばすスキャナ
///
/// The skip state lives across lines: a sequence that runs past the end of
/// one data block keeps being skipped at the start of the next.
#[derive(Debug, Default)]
pub struct ControlScanner {
    /// まだ読み飛ばすバイト数
    remaining: usize,
    /// 可変長バイトまでの残りバイト数
    extra_at: Option<usize>,
}

impl ControlScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// スキップ状態を破棄
    pub fn reset(&mut self) {
        self.remaining = 0;
        self.extra_at = None;
    }

    /// 次の行に持ち越すスキップ数（可変長バイト未読の場合は固定部分のみ）
    pub fn pending(&self) -> usize {
        self.remaining
    }

    /// `cursor` から行末まで走査し、グリフデータの範囲を返す
    pub fn scan(&mut self, line: &[u8], cursor: usize) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut run: Option<Segment> = None;

        let mut i = cursor;
        while i < line.len() {
            if self.remaining > 0 {
                self.skip_byte(line[i]);
                i += 1;
                continue;
            }

            if line[i..].starts_with(&CONTROL_MARKER) {
                log::debug!("Control sequence at offset {}", i);
                segments.extend(run.take());
                self.remaining = CONTROL_FIXED_LEN;
                self.extra_at = Some(CONTROL_EXTRA_OFFSET);
                continue;
            }

            match run.as_mut() {
                Some(segment) => segment.end = i,
                None => run = Some(Segment { start: i, end: i }),
            }
            i += 1;
        }

        segments.extend(run);
        segments
    }

    fn skip_byte(&mut self, byte: u8) {
        match self.extra_at {
            Some(0) => {
                self.remaining += usize::from(byte);
                self.extra_at = None;
            }
            Some(n) => self.extra_at = Some(n - 1),
            None => {}
        }
        self.remaining -= 1;
    }
}
