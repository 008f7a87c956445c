//! tush ライブラリ — テスト・ベンチマーク用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs`。
//! この `lib.rs` は `benches/bench_main.rs` や `tests/` から
//! トークナイザ・ビルトイン・spawn・REPL に直接アクセスするために存在する。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`parser`] | トークナイザ（区切り文字分割、クォート区間の再結合、ゼロコピーのトークンビュー） |
//! | [`builtins`] | ビルトイン（`exit`, `cd`, `help`）の順序付きテーブル |
//! | [`executor`] | ディスパッチ（ビルトイン判定 → 外部コマンド起動・待機） |
//! | [`spawn`] | `fork` + `execvp` / `waitpid` ラッパー |
//! | [`reader`] | `read(2)` ベースの行リーダー（割り込み後に再開） |
//! | [`prompt`] | `[user@host:cwd]> ` プロンプト |
//! | [`signal`] | SIGINT インターポーザ（ヒント表示・プロンプト再表示） |
//! | [`repl`] | REPL ループと致命的エラー |
//! | [`shell`] | シェルの状態（プロンプト表示済み・子プロセス実行中・割り込み保留フラグ） |

pub mod builtins;
pub mod executor;
pub mod parser;
pub mod prompt;
pub mod reader;
pub mod repl;
pub mod shell;
pub mod signal;
pub mod spawn;
