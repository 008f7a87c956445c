//! `fork` + `execvp` による外部コマンド起動と `waitpid` による待機。
//!
//! ## 構成
//!
//! | 型・関数 | 役割 |
//! |-----|------|
//! | [`SpawnError`] | fork / exec / wait の失敗（errno とコマンド名） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`fork_exec`] | 子プロセスを起動して PID を返す |
//! | [`wait`] | 特定の子プロセスの終了を待ち、終了ステータスを返す |

use std::ffi::CString;
use std::fmt;
use std::io;

use crate::shell;

// ── エラー型 ──────────────────────────────────────────────────────

/// 失敗した操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOp {
    /// 引数の C 文字列変換（NUL バイトを含む）。
    Argv,
    Fork,
    Exec,
    Wait,
}

/// 外部コマンド起動の失敗を表すエラー。
#[derive(Debug)]
pub struct SpawnError {
    pub op: SpawnOp,
    /// errno 値。
    pub errno: i32,
    /// コマンド名（エラーメッセージ用）。
    pub command: String,
}

impl SpawnError {
    fn last_os_error(op: SpawnOp, command: &[u8]) -> Self {
        Self {
            op,
            errno: io::Error::last_os_error().raw_os_error().unwrap_or(0),
            command: String::from_utf8_lossy(command).into_owned(),
        }
    }

    /// exec 失敗時に子プロセスが使う終了ステータス。
    /// 127 = command not found, 126 = permission denied, 1 = その他。
    pub fn exit_status(&self) -> i32 {
        match self.errno {
            libc::ENOENT => 127,
            libc::EACCES => 126,
            _ => 1,
        }
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = io::Error::from_raw_os_error(self.errno);
        match self.op {
            SpawnOp::Argv => write!(f, "{}: {}: argument contains NUL byte", shell::NAME, self.command),
            SpawnOp::Fork => write!(f, "{}: fork: {}", shell::NAME, os),
            SpawnOp::Wait => write!(f, "{}: wait: {}", shell::NAME, os),
            SpawnOp::Exec => match self.errno {
                libc::ENOENT => write!(f, "{}: {}: command not found", shell::NAME, self.command),
                libc::EACCES => write!(f, "{}: {}: permission denied", shell::NAME, self.command),
                _ => write!(f, "{}: {}: {}", shell::NAME, self.command, os),
            },
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// argv 用の CString ベクタ。NULL 終端のポインタ配列を構築する。
pub struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CStringVec {
    /// 引数リストから構築する。NUL バイトを含む引数があれば `None`。
    pub fn from_args(args: &[&[u8]]) -> Option<Self> {
        let strings = args
            .iter()
            .map(|a| CString::new(*a).ok())
            .collect::<Option<Vec<CString>>>()?;
        let mut ptrs: Vec<*const libc::c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(std::ptr::null()); // NULL 終端
        Some(Self { strings, ptrs })
    }

    /// プログラム名（`argv[0]`）。
    fn program(&self) -> *const libc::c_char {
        self.ptrs[0]
    }

    /// NULL 終端ポインタ配列を返す。
    fn as_ptr(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// ── fork / exec / wait ────────────────────────────────────────────

/// 子プロセスを fork し、`args[0]` を `PATH` 検索付きで exec する。成功時は子 PID を返す。
///
/// exec に失敗した子プロセスはエラーを stderr に出して [`SpawnError::exit_status`] で終了する。
/// 親の制御フローに戻ることはない。
pub fn fork_exec(args: &[&[u8]]) -> Result<libc::pid_t, SpawnError> {
    let command = args.first().copied().unwrap_or_default();
    let argv = match CStringVec::from_args(args) {
        Some(argv) if !argv.is_empty() => argv,
        _ => {
            return Err(SpawnError {
                op: SpawnOp::Argv,
                errno: libc::EINVAL,
                command: String::from_utf8_lossy(command).into_owned(),
            })
        }
    };

    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(SpawnError::last_os_error(SpawnOp::Fork, command));
    }

    if pid == 0 {
        // 子プロセス: Rust ランタイムが無視に設定した SIGPIPE を戻してから exec する。
        // execvp は失敗時のみ戻る
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            libc::execvp(argv.program(), argv.as_ptr());
        }
        // stderr はバッファされないので、_exit 前に書き出し済み
        let err = SpawnError::last_os_error(SpawnOp::Exec, command);
        eprintln!("{}", err);
        unsafe { libc::_exit(err.exit_status()) }
    }

    Ok(pid)
}

/// `waitpid` の raw status を終了ステータスに変換する。
pub fn decode_status(raw_status: i32) -> i32 {
    if libc::WIFEXITED(raw_status) {
        libc::WEXITSTATUS(raw_status)
    } else if libc::WIFSIGNALED(raw_status) {
        128 + libc::WTERMSIG(raw_status)
    } else {
        1
    }
}

/// 子プロセス `pid` の終了を待ち、終了ステータスを返す。
///
/// `waitpid` がシグナルで中断されるたびに `on_interrupt` を呼んでから待機を再開する。
pub fn wait<F: FnMut()>(pid: libc::pid_t, mut on_interrupt: F) -> Result<i32, SpawnError> {
    loop {
        let mut raw_status: i32 = 0;
        let ret = unsafe { libc::waitpid(pid, &mut raw_status, 0) };
        if ret == pid {
            return Ok(decode_status(raw_status));
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            on_interrupt();
            continue;
        }
        return Err(SpawnError {
            op: SpawnOp::Wait,
            errno: err.raw_os_error().unwrap_or(0),
            command: pid.to_string(),
        });
    }
}
