//! プロンプト `[<user>@<host>:<cwd>]> ` の構築と表示。
//!
//! ユーザー名は `getpwuid(geteuid())`、ホスト名は `gethostname` で取得し、
//! 失敗時は [`UNKNOWN`] を使う。カレントディレクトリの取得失敗は致命的エラー。

use std::ffi::CStr;
use std::io::Write;
use std::path::Path;

use crate::repl::FatalError;
use crate::shell::ProcessState;

/// ユーザー名・ホスト名の取得に失敗したときの代替表示。
pub const UNKNOWN: &str = "UNKNOWN";

/// 実効ユーザー ID のユーザー名。
pub fn username() -> String {
    let pw = unsafe { libc::getpwuid(libc::geteuid()) };
    if pw.is_null() {
        return UNKNOWN.to_string();
    }
    let name = unsafe { CStr::from_ptr((*pw).pw_name) };
    name.to_string_lossy().into_owned()
}

/// ホスト名。
pub fn hostname() -> String {
    let mut buf = [0u8; 256];
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if ret != 0 {
        return UNKNOWN.to_string();
    }
    match CStr::from_bytes_until_nul(&buf) {
        Ok(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        _ => UNKNOWN.to_string(),
    }
}

/// プロンプト文字列を組み立てる。
pub fn render(user: &str, host: &str, cwd: &Path) -> String {
    format!("[{}@{}:{}]> ", user, host, cwd.display())
}

/// このイテレーションでまだ表示していなければプロンプトを表示し、flush する。
///
/// 表示後は `prompt_printed` を立てる。既に立っていれば何もしない。
pub fn print_prompt(state: &ProcessState, out: &mut dyn Write) -> Result<(), FatalError> {
    if state.prompt_printed() {
        return Ok(());
    }
    let cwd = std::env::current_dir().map_err(FatalError::Cwd)?;
    let prompt = render(&username(), &hostname(), &cwd);
    out.write_all(prompt.as_bytes())
        .and_then(|_| out.flush())
        .map_err(FatalError::Output)?;
    state.set_prompt_printed(true);
    Ok(())
}
