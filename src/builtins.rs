//! ビルトインコマンドの実装。
//!
//! ビルトインはfork/execを経由せずプロセス内で直接実行される。
//! [`BUILTINS`] は名前とハンドラの順序付きテーブルで、先頭から完全一致で検索する（最初の一致が勝つ）。
//! `try_exec()` が `Some(result)` を返せばビルトインとして処理済み、
//! `None` なら外部コマンドとしてexecutorに委ねる。

use std::ffi::OsStr;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;

use crate::parser::TokenList;
use crate::shell::{self, Flow};

/// ビルトインの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd,
    Help,
}

/// 登録済みビルトイン。検索・ヘルプ表示ともにこの順序を使う。
pub const BUILTINS: [(&str, Builtin); 3] = [
    ("exit", Builtin::Exit),
    ("cd", Builtin::Cd),
    ("help", Builtin::Help),
];

const LOGO_ART: &str = "\
Welcome to
  _             _
 | |_ _   _ ___| |__
 | __| | | / __| '_ \\
 | |_| |_| \\__ \\ | | |
  \\__|\\__,_|___/_| |_|

The tiny unix shell
";

const USAGE: &str = "\
Type the program name and arguments and hit enter to start a program.
The usage of single-quotes and double-quotes (e.g. cd 'some dir') is supported.
";

impl Builtin {
    /// 名前からビルトインを引く。
    pub fn lookup(name: &[u8]) -> Option<Self> {
        BUILTINS
            .iter()
            .find(|(n, _)| n.as_bytes() == name)
            .map(|&(_, b)| b)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Cd => "cd",
            Self::Help => "help",
        }
    }

    /// ビルトインを実行する。`args[0]` はコマンド名自身。
    ///
    /// `Err` は標準出力への書き込み失敗のみ。
    pub fn run(self, args: &TokenList<'_>, out: &mut dyn Write) -> io::Result<Flow> {
        match self {
            Self::Exit => Ok(Flow::Exit),
            Self::Cd => {
                builtin_cd(args);
                Ok(Flow::Continue)
            }
            Self::Help => {
                print_help(out)?;
                Ok(Flow::Continue)
            }
        }
    }
}

/// ビルトインコマンドの実行を試みる。
///
/// 戻り値:
/// - `Some(Ok(flow))` — ビルトインとして実行済み
/// - `Some(Err(e))` — 実行したが出力に失敗した
/// - `None` — 該当するビルトインなし（空行を含む）
pub fn try_exec(args: &TokenList<'_>, out: &mut dyn Write) -> Option<io::Result<Flow>> {
    let builtin = Builtin::lookup(args.command()?)?;
    Some(builtin.run(args, out))
}

/// `cd <dir>` — カレントディレクトリを変更する。`args[1]` のみ使い、残りは無視する。
fn builtin_cd(args: &TokenList<'_>) {
    let Some(target) = args.get(1) else {
        eprintln!("{}: cd: expected argument", shell::NAME);
        return;
    };
    if let Err(e) = std::env::set_current_dir(OsStr::from_bytes(target)) {
        eprintln!(
            "{}: cd: {}: {}",
            shell::NAME,
            String::from_utf8_lossy(target),
            e
        );
    }
}

/// バナー、使い方、ビルトイン一覧を出力する。起動時と `help` で使う。
pub fn print_help(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", LOGO_ART)?;
    writeln!(out, "{}", USAGE)?;
    writeln!(out, "The following built-in commands are supported:")?;
    for (name, _) in BUILTINS.iter() {
        writeln!(out, "- {}", name)?;
    }
    writeln!(out)?;
    out.flush()
}
