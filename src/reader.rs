//! 標準入力からの行読み取り。
//!
//! [`FdReader`] は `read(2)` の薄いラッパーで、`EINTR` を [`io::ErrorKind::Interrupted`] としてそのまま返す。
//! SIGINT ハンドラが導入済みなら、読み取り前に入力と起床用パイプを `poll(2)` で待ち、
//! `read(2)` 開始前に届いた割り込みも `Interrupted` として返す。
//! [`LineReader`] はチャンク単位で読み取ってバッファし、改行ごとに 1 行を切り出す。
//! 割り込みで読み取りが中断されてもバッファ済みのバイトは保持され、コールバック実行後に再開する。

use std::io::{self, Read};
use std::os::unix::io::RawFd;

use crate::repl::FatalError;
use crate::signal;

/// 1 回の `read` で読み取る最大バイト数。
pub const READ_CHUNK: usize = 4096;

/// ファイルディスクリプタから直接読み取る [`Read`] 実装。
pub struct FdReader(RawFd);

impl FdReader {
    pub fn new(fd: RawFd) -> Self {
        Self(fd)
    }

    pub fn stdin() -> Self {
        Self(libc::STDIN_FILENO)
    }
}

/// `fd` が読み取り可能になるまで待つ。起床用パイプが先に鳴れば `Interrupted`。
fn wait_readable(fd: RawFd, wake: RawFd) -> io::Result<()> {
    let mut fds = [
        libc::pollfd { fd, events: libc::POLLIN, revents: 0 },
        libc::pollfd { fd: wake, events: libc::POLLIN, revents: 0 },
    ];
    loop {
        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                // ハンドラが書いたバイトはこの割り込みの分
                signal::drain_wake();
            }
            return Err(err);
        }
        if fds[1].revents & libc::POLLIN != 0 {
            signal::drain_wake();
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        // POLLHUP / POLLERR も read(2) に結果を任せる
        if fds[0].revents != 0 {
            return Ok(());
        }
    }
}

impl Read for FdReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(wake) = signal::wake_fd() {
            wait_readable(self.0, wake)?;
        }
        let n = unsafe { libc::read(self.0, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

/// 行単位のリーダー。
pub struct LineReader<R> {
    inner: R,
    /// まだ行として返していないバイト。
    buf: Vec<u8>,
    /// 入力の終端に達したら `true`。
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// 1 行（末尾の改行を含む）を読み取る。
    ///
    /// - 入力終端で残りバイトがなければ `Ok(None)`
    /// - 改行なしで終端に達した最終行はそのまま返す
    /// - 読み取りが割り込まれるたびに `on_interrupt` を呼び、読み取りを再開する
    pub fn read_line<F>(&mut self, mut on_interrupt: F) -> Result<Option<Vec<u8>>, FatalError>
    where
        F: FnMut() -> Result<(), FatalError>,
    {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(i) = self.buf.iter().position(|&b| b == b'\n') {
                let rest = self.buf.split_off(i + 1);
                return Ok(Some(std::mem::replace(&mut self.buf, rest)));
            }
            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buf)));
            }
            match self.inner.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => on_interrupt()?,
                Err(e) => return Err(FatalError::Read(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn no_interrupt() -> Result<(), FatalError> {
        Ok(())
    }

    /// 指定した読み取り結果を順に返すテスト用リーダー。
    struct Scripted(Vec<io::Result<Vec<u8>>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Ok(0);
            }
            let bytes = self.0.remove(0)?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }
    }

    #[test]
    fn splits_lines() {
        let mut r = LineReader::new(Cursor::new(b"ls\ncd /\n".to_vec()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), Some(b"ls\n".to_vec()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), Some(b"cd /\n".to_vec()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), None);
    }

    #[test]
    fn final_line_without_newline() {
        let mut r = LineReader::new(Cursor::new(b"exit".to_vec()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), Some(b"exit".to_vec()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), None);
    }

    #[test]
    fn empty_input_is_eof() {
        let mut r = LineReader::new(Cursor::new(Vec::new()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), None);
    }

    #[test]
    fn interrupt_keeps_partial_line() {
        let script = vec![
            Ok(b"ec".to_vec()),
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"ho hi\n".to_vec()),
        ];
        let mut r = LineReader::new(Scripted(script));
        let mut interrupts = 0;
        let line = r
            .read_line(|| {
                interrupts += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(line, Some(b"echo hi\n".to_vec()));
        assert_eq!(interrupts, 1);
    }

    #[test]
    fn other_errors_are_fatal() {
        let script = vec![Err(io::Error::from(io::ErrorKind::InvalidData))];
        let mut r = LineReader::new(Scripted(script));
        assert!(matches!(r.read_line(no_interrupt), Err(FatalError::Read(_))));
    }

    #[test]
    fn fd_reader_reads_pipe() {
        let _guard = signal::TEST_SIGINT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let msg = b"help\n";
        unsafe {
            libc::write(fds[1], msg.as_ptr() as *const libc::c_void, msg.len());
            libc::close(fds[1]);
        }
        let mut r = LineReader::new(FdReader::new(fds[0]));
        assert_eq!(r.read_line(no_interrupt).unwrap(), Some(b"help\n".to_vec()));
        assert_eq!(r.read_line(no_interrupt).unwrap(), None);
        unsafe {
            libc::close(fds[0]);
        }
    }

    #[test]
    fn interrupt_before_read_wakes_fd_reader() {
        let _guard = signal::TEST_SIGINT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        signal::install().unwrap();
        let mut fds = [0i32; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let msg = b"help\n";
        unsafe {
            libc::write(fds[1], msg.as_ptr() as *const libc::c_void, msg.len());
            libc::close(fds[1]);
            // read(2) より前に届いた SIGINT
            libc::raise(libc::SIGINT);
        }

        let mut r = LineReader::new(FdReader::new(fds[0]));
        let mut interrupts = 0;
        let line = r
            .read_line(|| {
                if crate::shell::STATE.take_interrupt() {
                    interrupts += 1;
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(line, Some(b"help\n".to_vec()));
        assert_eq!(interrupts, 1);
        unsafe {
            libc::close(fds[0]);
        }
    }
}
