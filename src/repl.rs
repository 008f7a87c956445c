//! REPLループ: 割り込み処理 → プロンプト表示 → 1 行読み取り → トークナイズ → ディスパッチ → ループ
//!
//! 状態は AwaitingInput（プロンプト表示と読み取り）と Dispatching（トークナイズと実行）の 2 つ。
//! [`step`] が 1 イテレーション分を実行し、[`run`] は [`Step::Continue`] 以外が返るまで繰り返す。
//! 入力行はイテレーションごとに確保され、トークンと一緒にイテレーション末尾で解放される。

use std::fmt;
use std::io::{self, Read, Write};

use crate::executor;
use crate::parser;
use crate::prompt;
use crate::reader::LineReader;
use crate::shell::{self, Flow, Shell};
use crate::signal;

// ── Error ───────────────────────────────────────────────────────────

/// シェルを終了させる致命的エラー。
#[derive(Debug)]
pub enum FatalError {
    /// カレントディレクトリを取得できない（プロンプトを表示できない）。
    Cwd(io::Error),
    /// 標準入力の読み取りに失敗した（EOF 以外）。
    Read(io::Error),
    /// 標準出力への書き込みに失敗した。
    Output(io::Error),
    /// トークンバッファの確保に失敗した。
    Alloc,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cwd(e) => write!(f, "failed to get current directory: {e}"),
            Self::Read(e) => write!(f, "error reading line: {e}"),
            Self::Output(e) => write!(f, "error writing output: {e}"),
            Self::Alloc => write!(f, "token allocation error"),
        }
    }
}

// ── ループ ──────────────────────────────────────────────────────────

/// 1 イテレーションの結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 次の行を読む。
    Continue,
    /// `exit` ビルトインが実行された。
    Exit,
    /// 入力の終端に達した。
    Eof,
}

/// REPL を 1 イテレーション進める。
pub fn step<R: Read, W: Write>(
    shell: &Shell,
    reader: &mut LineReader<R>,
    out: &mut W,
) -> Result<Step, FatalError> {
    let state = shell.state;

    // ディスパッチ中に届いた割り込みはここで処理する
    signal::poll(state, out)?;
    prompt::print_prompt(state, out)?;

    let Some(mut line) = reader.read_line(|| signal::poll(state, out))? else {
        return Ok(Step::Eof);
    };
    // 行を受け取ったら次のイテレーションでプロンプトを表示し直す
    state.set_prompt_printed(false);

    let tokens = match parser::tokenize(&mut line) {
        Ok(tokens) => tokens,
        Err(e) if e.is_fatal() => return Err(FatalError::Alloc),
        Err(e) => {
            eprintln!("{}: {}", shell::NAME, e);
            return Ok(Step::Continue);
        }
    };

    match executor::execute(shell, &tokens, out)? {
        Flow::Continue => Ok(Step::Continue),
        Flow::Exit => Ok(Step::Exit),
    }
}

/// `exit` か入力終端までループする。致命的エラーは呼び出し元に返す。
pub fn run<R: Read, W: Write>(
    shell: &Shell,
    reader: &mut LineReader<R>,
    out: &mut W,
) -> Result<(), FatalError> {
    loop {
        match step(shell, reader, out)? {
            Step::Continue => continue,
            Step::Exit | Step::Eof => return Ok(()),
        }
    }
}
