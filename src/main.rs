//! tush — 小さな対話型コマンドインタプリタ
//!
//! 起動時にヘルプを表示し、REPLループ（プロンプト表示 → 1 行読み取り → トークナイズ → 実行）に入る。
//! `exit` または入力終端で終了ステータス 0、致命的エラーで 1 を返す。

use std::io;

use tush::builtins;
use tush::reader::{FdReader, LineReader};
use tush::repl;
use tush::shell::{self, Shell};
use tush::signal;

fn main() {
    // シグナル設定: SIGINT はハンドラで受けてプロンプトを出し直す。
    // 子プロセスでは exec 時にデフォルト動作に戻る。
    if let Err(e) = signal::install() {
        eprintln!("{}: failed to install SIGINT handler: {}", shell::NAME, e);
        std::process::exit(1);
    }

    let shell = Shell::new();
    let mut out = io::stdout();

    if let Err(e) = builtins::print_help(&mut out) {
        eprintln!("{}: {}", shell::NAME, repl::FatalError::Output(e));
        std::process::exit(1);
    }

    let mut reader = LineReader::new(FdReader::stdin());
    match repl::run(&shell, &mut reader, &mut out) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{}: {}", shell::NAME, e);
            std::process::exit(1);
        }
    }
}
