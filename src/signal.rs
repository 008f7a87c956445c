//! SIGINT のインターポーザ。
//!
//! ハンドラは [`STATE`](crate::shell::STATE) に割り込みを保留し、起床用パイプに 1 バイト書くだけ（async-signal-safe）。
//! `SA_RESTART` を付けずに登録するため、ブロッキング中の `read(2)` / `waitpid(2)` は `EINTR` で戻る。
//! `read(2)` を始める前に届いた割り込みは起床用パイプに残るので、
//! [`FdReader`](crate::reader::FdReader) は標準入力と一緒にパイプを `poll(2)` して取りこぼさない。
//! どちらの経路でも呼び出し側が [`handle_interrupt`] で表示処理を行ってから再試行する。

use std::io::{self, Write};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::prompt;
use crate::repl::FatalError;
use crate::shell::{self, ProcessState};

/// 起床用パイプ（読み取り側・書き込み側）。未作成なら -1。
static WAKE_READ: AtomicI32 = AtomicI32::new(-1);
static WAKE_WRITE: AtomicI32 = AtomicI32::new(-1);

/// SIGINT を使うテストの直列化用（ハンドラと [`STATE`](crate::shell::STATE) はプロセスで 1 つ）。
#[cfg(test)]
pub(crate) static TEST_SIGINT_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(target_os = "linux")]
fn errno_location() -> *mut libc::c_int {
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
fn errno_location() -> *mut libc::c_int {
    unsafe { libc::__error() }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd"
)))]
fn errno_location() -> *mut libc::c_int {
    std::ptr::null_mut()
}

extern "C" fn on_sigint(_signum: libc::c_int) {
    // 割り込まれた側の errno を壊さない
    let errno = errno_location();
    let saved = if errno.is_null() { 0 } else { unsafe { *errno } };

    shell::STATE.raise_interrupt();
    let fd = WAKE_WRITE.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte = 1u8;
        // パイプが満杯なら書けなくてよい（未処理のバイトが残っている）
        unsafe {
            libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
        }
    }

    if !errno.is_null() {
        unsafe { *errno = saved };
    }
}

/// 起床用パイプを作る。両端とも非ブロッキングかつ close-on-exec。
fn open_wake_pipe() -> io::Result<()> {
    if WAKE_READ.load(Ordering::SeqCst) >= 0 {
        return Ok(());
    }
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    for &fd in &fds {
        let ok = unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL);
            flags >= 0
                && libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == 0
                && libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) == 0
        };
        if !ok {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fds[0]);
                libc::close(fds[1]);
            }
            return Err(err);
        }
    }
    WAKE_READ.store(fds[0], Ordering::SeqCst);
    WAKE_WRITE.store(fds[1], Ordering::SeqCst);
    Ok(())
}

/// SIGINT ハンドラをプロセスの生存期間中有効にする。2 回目以降の呼び出しは起床用パイプを再利用する。
pub fn install() -> io::Result<()> {
    open_wake_pipe()?;
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0; // SA_RESTART なし
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// 起床用パイプの読み取り側。[`install`] 前は `None`。
pub fn wake_fd() -> Option<RawFd> {
    let fd = WAKE_READ.load(Ordering::SeqCst);
    (fd >= 0).then_some(fd)
}

/// 起床用パイプに溜まったバイトを読み捨てる。
pub fn drain_wake() {
    let Some(fd) = wake_fd() else { return };
    let mut buf = [0u8; 64];
    while unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) } > 0 {}
}

/// 保留中の割り込みを処理する。保留がなければ何もしない。
///
/// - 子プロセス実行中: 空行のみ出力
/// - それ以外: 終了方法のヒントを出し、`prompt_printed` を下ろしてプロンプトを再表示する
pub fn poll(state: &ProcessState, out: &mut dyn Write) -> Result<(), FatalError> {
    if state.take_interrupt() {
        handle_interrupt(state, out)?;
    }
    Ok(())
}

/// 割り込み 1 回分の表示処理。
pub fn handle_interrupt(state: &ProcessState, out: &mut dyn Write) -> Result<(), FatalError> {
    if state.child_running() {
        return writeln!(out)
            .and_then(|_| out.flush())
            .map_err(FatalError::Output);
    }
    writeln!(out, "\nTo exit {} type 'exit'.", shell::NAME).map_err(FatalError::Output)?;
    state.set_prompt_printed(false);
    prompt::print_prompt(state, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_running_prints_blank_line_only() {
        let state = ProcessState::new();
        state.set_child_running(true);
        let mut out = Vec::new();
        handle_interrupt(&state, &mut out).unwrap();
        assert_eq!(out, b"\n");
        assert!(!state.prompt_printed());
    }

    #[test]
    fn idle_prints_hint_and_forces_prompt() {
        let state = ProcessState::new();
        state.set_prompt_printed(true);
        let mut out = Vec::new();
        handle_interrupt(&state, &mut out).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("\nTo exit tush type 'exit'.\n["));
        assert!(text.ends_with("]> "));
        assert!(state.prompt_printed());

        // 同じイテレーションの通常表示は no-op になる
        prompt::print_prompt(&state, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn poll_without_pending_interrupt_is_noop() {
        let state = ProcessState::new();
        let mut out = Vec::new();
        poll(&state, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn poll_consumes_pending_interrupt() {
        let state = ProcessState::new();
        state.set_child_running(true);
        state.raise_interrupt();
        let mut out = Vec::new();
        poll(&state, &mut out).unwrap();
        poll(&state, &mut out).unwrap();
        assert_eq!(out, b"\n");
    }

    #[test]
    fn installed_handler_marks_interrupt_and_wakes() {
        let _guard = TEST_SIGINT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        install().unwrap();
        drain_wake();
        unsafe {
            libc::raise(libc::SIGINT);
        }
        assert!(shell::STATE.take_interrupt());

        let fd = wake_fd().unwrap();
        let mut byte = [0u8; 1];
        let n = unsafe { libc::read(fd, byte.as_mut_ptr() as *mut libc::c_void, 1) };
        assert_eq!(n, 1);
        drain_wake();
    }

    #[test]
    fn install_is_idempotent() {
        let _guard = TEST_SIGINT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        install().unwrap();
        let fd = wake_fd();
        install().unwrap();
        assert_eq!(wake_fd(), fd);
    }
}
