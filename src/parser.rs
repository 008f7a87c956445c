//! トークナイザ: 入力行を区切り文字で分割し、クォート区間を 1 トークンに再結合する。
//!
//! 入力行のバッファを `&mut [u8]` で借用し、ゼロコピーの `&[u8]` ビュー列（[`TokenList`]）を返す。
//! トークンは入力行のライフタイムに束縛されるため、行より長く生きることはない。
//!
//! ## 分割規則
//!
//! - 区切り文字: スペース、タブ、CR、LF、ベル（`\x07`）。連続した区切りは 1 つとして扱う
//! - `"` / `'` で始まるラン: 末尾が同じクォート文字のランが現れるまで後続ランを吸収する。
//!   吸収時、直前のランを終端した区切り 1 バイトだけをその場でスペースに書き換える
//! - クォート文字自体はトークンに含めない
//! - 閉じクォートが見つからなければ [`TokenizeError::MissingQuote`]

use std::fmt;

// ── 定数 ────────────────────────────────────────────────────────────

/// トークン区切り文字。
pub const DELIMITERS: &[u8] = b" \t\r\n\x07";

/// トークン位置バッファの初期容量。満杯になるとこの単位で拡張する。
pub const TOKEN_BUF_SIZE: usize = 64;

// ── Error ───────────────────────────────────────────────────────────

/// トークナイズ時に発生しうるエラー。
#[derive(Debug, PartialEq)]
pub enum TokenizeError {
    /// クォートが閉じられていない。引数は開始クォート文字（`'` or `"`）。
    MissingQuote(char),
    /// トークンバッファの確保・拡張に失敗した。
    Alloc,
}

impl TokenizeError {
    /// シェルを終了させるべきエラーなら `true`。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Alloc)
    }
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingQuote('\'') => write!(f, "missing closing \"'\". Input invalid."),
            Self::MissingQuote(c) => write!(f, "missing closing '{c}'. Input invalid."),
            Self::Alloc => write!(f, "token allocation error"),
        }
    }
}

// ── TokenList ───────────────────────────────────────────────────────

/// 1 行分のトークン列。各トークンは入力行の一部を指すビュー。
#[derive(Debug, PartialEq)]
pub struct TokenList<'a> {
    tokens: Vec<&'a [u8]>,
}

impl<'a> TokenList<'a> {
    /// コマンド名（先頭トークン）。空行なら `None`。
    pub fn command(&self) -> Option<&'a [u8]> {
        self.get(0)
    }

    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        self.tokens.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_slice(&self) -> &[&'a [u8]] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.tokens.iter().copied()
    }
}

// ── Tokenizer ───────────────────────────────────────────────────────

fn is_delimiter(b: u8) -> bool {
    DELIMITERS.contains(&b)
}

/// `pos` 以降で次の区切りなしランを探し、`(start, end)` を返す。`end` は排他的。
fn next_run(line: &[u8], pos: usize) -> Option<(usize, usize)> {
    let start = pos + line.get(pos..)?.iter().position(|&b| !is_delimiter(b))?;
    let end = line[start..]
        .iter()
        .position(|&b| is_delimiter(b))
        .map_or(line.len(), |i| start + i);
    Some((start, end))
}

/// 満杯ならバッファを [`TOKEN_BUF_SIZE`] 単位で拡張する。
fn grow_if_full<T>(buf: &mut Vec<T>) -> Result<(), TokenizeError> {
    if buf.len() == buf.capacity() {
        buf.try_reserve_exact(TOKEN_BUF_SIZE)
            .map_err(|_| TokenizeError::Alloc)?;
    }
    Ok(())
}

/// 入力行をトークン列に分割する。
///
/// クォート区間の再結合のために `line` を書き換える（区切り 1 バイト → スペース）。
/// 戻り値のトークンは `line` を借用するので、トークン使用中に行を解放・変更することはできない。
///
/// 空行・空白のみの行は空の [`TokenList`] を返す。
pub fn tokenize(line: &mut [u8]) -> Result<TokenList<'_>, TokenizeError> {
    let mut spans: Vec<(usize, usize)> = Vec::new();
    spans
        .try_reserve_exact(TOKEN_BUF_SIZE)
        .map_err(|_| TokenizeError::Alloc)?;

    let mut pos = 0;
    while let Some((start, end)) = next_run(line, pos) {
        let quote = line[start];
        let span = if quote == b'"' || quote == b'\'' {
            // 開きクォート自身は閉じクォートにならない
            let mut close = end;
            while !(close - 1 > start && line[close - 1] == quote) {
                let Some((_, next_end)) = next_run(line, close) else {
                    return Err(TokenizeError::MissingQuote(quote as char));
                };
                line[close] = b' ';
                close = next_end;
            }
            pos = close;
            (start + 1, close - 1)
        } else {
            pos = end;
            (start, end)
        };

        grow_if_full(&mut spans)?;
        spans.push(span);
    }

    let line: &[u8] = line;
    let mut tokens = Vec::new();
    tokens
        .try_reserve_exact(spans.len())
        .map_err(|_| TokenizeError::Alloc)?;
    tokens.extend(spans.into_iter().map(|(start, end)| &line[start..end]));
    Ok(TokenList { tokens })
}

// ── Tests ───────────────────────────────────────────────────────────
