//! コマンド実行: ビルトイン判定と外部コマンドの起動・待機。
//!
//! - [`execute`]: 1 行分のトークン列をディスパッチする。空行は何もしない
//! - ビルトイン: [`builtins::try_exec`] でプロセス内実行
//! - それ以外: [`run_external`] で fork + exec し、子プロセスの終了までブロックする

use std::fmt;
use std::io::Write;

use crate::builtins;
use crate::parser::TokenList;
use crate::repl::FatalError;
use crate::shell::{Flow, Shell};
use crate::signal;
use crate::spawn::{self, SpawnError};

/// 外部コマンド実行の失敗。
#[derive(Debug)]
pub enum ExternalError {
    /// 起動・待機の失敗。報告してループを続ける。
    Spawn(SpawnError),
    /// 標準出力への書き込み失敗。シェルを終了させる。
    Fatal(FatalError),
}

impl From<SpawnError> for ExternalError {
    fn from(e: SpawnError) -> Self {
        Self::Spawn(e)
    }
}

impl fmt::Display for ExternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "{e}"),
            Self::Fatal(e) => write!(f, "{e}"),
        }
    }
}

/// トークン列を実行し、REPL ループを続けるかどうかを返す。
///
/// 外部コマンドの起動失敗・待機失敗は stderr に報告するだけで [`Flow::Continue`]。
/// 標準出力への書き込み失敗は [`FatalError::Output`] として返す。
pub fn execute(shell: &Shell, args: &TokenList<'_>, out: &mut dyn Write) -> Result<Flow, FatalError> {
    if args.is_empty() {
        return Ok(Flow::Continue);
    }
    if let Some(result) = builtins::try_exec(args, out) {
        return result.map_err(FatalError::Output);
    }
    // 終了ステータスは捨てる
    match run_external(shell, args, out) {
        Ok(_) => {}
        Err(ExternalError::Spawn(e)) => eprintln!("{}", e),
        Err(ExternalError::Fatal(e)) => return Err(e),
    }
    Ok(Flow::Continue)
}

/// 外部コマンドを子プロセスとして実行し、終了ステータスを返す。
///
/// 待機中は `child_running` を立てる。待機中の SIGINT は空行の出力のみで処理する。
pub fn run_external(
    shell: &Shell,
    args: &TokenList<'_>,
    out: &mut dyn Write,
) -> Result<i32, ExternalError> {
    // 子プロセスに未出力のバッファを複製させない
    out.flush()
        .map_err(|e| ExternalError::Fatal(FatalError::Output(e)))?;

    let pid = spawn::fork_exec(args.as_slice())?;

    let state = shell.state;
    state.set_child_running(true);
    let mut output_err = None;
    let status = spawn::wait(pid, || {
        if output_err.is_none() {
            output_err = signal::poll(state, out).err();
        }
    });
    // waitpid が EINTR を返す前に子が終了した場合も、実行中に届いた割り込みとして扱う
    let late = signal::poll(state, out);
    state.set_child_running(false);

    if let Some(e) = output_err {
        return Err(ExternalError::Fatal(e));
    }
    late.map_err(ExternalError::Fatal)?;
    Ok(status?)
}
