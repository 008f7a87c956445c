//! シェルの実行状態を保持するモジュール。
//!
//! [`ProcessState`] は REPL ループ・行読み取り・子プロセス待機・SIGINT ハンドラの間で共有されるフラグ群。
//! シグナルハンドラから触れるのは [`ProcessState::raise_interrupt`]（アトミックな 1 ストア）のみで、
//! それ以外の更新はすべてメインの制御フローで行う。

use std::sync::atomic::{AtomicBool, Ordering};

/// シェル名。エラーメッセージの接頭辞やヘルプ表示に使う。
pub const NAME: &str = "tush";

/// プロセス全体で 1 つの状態。SIGINT ハンドラはこのインスタンスに書き込む。
pub static STATE: ProcessState = ProcessState::new();

/// ビルトイン・ディスパッチの結果。REPL ループを続けるか終了するか。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// REPL ループとシグナルハンドラが共有するフラグ。
#[derive(Debug)]
pub struct ProcessState {
    /// 現在のイテレーションでプロンプトを表示済みなら `true`。
    prompt_printed: AtomicBool,
    /// フォアグラウンドの子プロセスが実行中なら `true`。
    child_running: AtomicBool,
    /// SIGINT を受信し、まだ処理していなければ `true`。
    interrupted: AtomicBool,
}

impl ProcessState {
    pub const fn new() -> Self {
        Self {
            prompt_printed: AtomicBool::new(false),
            child_running: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
        }
    }

    pub fn prompt_printed(&self) -> bool {
        self.prompt_printed.load(Ordering::SeqCst)
    }

    pub fn set_prompt_printed(&self, printed: bool) {
        self.prompt_printed.store(printed, Ordering::SeqCst);
    }

    pub fn child_running(&self) -> bool {
        self.child_running.load(Ordering::SeqCst)
    }

    pub fn set_child_running(&self, running: bool) {
        self.child_running.store(running, Ordering::SeqCst);
    }

    /// 割り込みを保留状態にする。シグナルハンドラから呼ばれる。
    pub fn raise_interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// 保留中の割り込みを取り出す。保留があれば `true` を返し、フラグを下ろす。
    pub fn take_interrupt(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

/// シェルの実行コンテキスト。REPL ループ全体で共有される。
pub struct Shell {
    /// プロセス状態。通常は [`STATE`] を指す。
    pub state: &'static ProcessState,
}

impl Shell {
    /// プロセス全体の [`STATE`] を使うシェルを作る。
    pub fn new() -> Self {
        Self::with_state(&STATE)
    }

    /// 任意の状態インスタンスを使うシェルを作る（テスト用に分離した状態を渡せる）。
    pub fn with_state(state: &'static ProcessState) -> Self {
        Self { state }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}
