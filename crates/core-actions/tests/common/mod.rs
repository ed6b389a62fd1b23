#![allow(dead_code)] // Shared across many integration tests; each test binary uses a subset of helpers.

use core_actions::{Interpreter, KeyOutcome, RunReport};
use core_events::parse_notation;
use core_model::MemoryHost;
use core_state::{BufferId, Mode, SettingValue};
use core_text::Position;

pub const BUFFER: BufferId = BufferId(1);

/// One buffer driven by one interpreter.
pub struct Editor {
    pub interp: Interpreter,
    pub host: MemoryHost,
}

impl Editor {
    pub fn new(text: &str) -> Self {
        Self::with_host(MemoryHost::new(BUFFER, "test", text).expect("in-memory buffer"))
    }

    pub fn with_settings(text: &str, settings: Vec<(&'static str, SettingValue)>) -> Self {
        let host = MemoryHost::new(BUFFER, "test", text)
            .expect("in-memory buffer")
            .with_settings(settings);
        Self::with_host(host)
    }

    pub fn with_host(host: MemoryHost) -> Self {
        Self {
            interp: Interpreter::new(),
            host,
        }
    }

    /// Replay `keys` as one non-interactive run.
    pub fn run(&mut self, keys: &str) -> RunReport {
        self.interp
            .run_notation(&mut self.host, keys, None)
            .expect("valid notation")
    }

    /// Press each key separately, as a user would. Returns the last outcome.
    pub fn press(&mut self, keys: &str) -> KeyOutcome {
        let mut last = KeyOutcome::Pending;
        for key in parse_notation(keys).expect("valid notation") {
            last = self.interp.press_key(&mut self.host, key);
        }
        last
    }

    pub fn text(&self) -> String {
        self.host.contents()
    }

    pub fn caret(&self) -> (usize, usize) {
        let Position { line, byte } = self.host.caret_position();
        (line, byte)
    }

    pub fn mode(&self) -> Mode {
        self.interp.mode(BUFFER)
    }

    pub fn bells(&self) -> usize {
        self.host.ui.bells
    }

    pub fn last_message(&self) -> Option<&str> {
        self.host.ui.messages.last().map(String::as_str)
    }

    pub fn register(&self, reg: char) -> Option<String> {
        self.interp
            .registers()
            .read(reg)
            .ok()
            .flatten()
            .map(|v| v.text)
    }
}

/// Run `keys` over `text` and return the resulting text and caret.
pub fn run(text: &str, keys: &str) -> (String, (usize, usize)) {
    let mut ed = Editor::new(text);
    ed.run(keys);
    (ed.text(), ed.caret())
}

mod log_writer {
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub struct BufferWriter {
        pub inner: Arc<Mutex<Vec<u8>>>,
    }

    pub struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl Write for LockedWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }
}

/// Run `f` under a WARN-level subscriber and return what it logged.
pub fn capture_warnings(f: impl FnOnce()) -> String {
    let writer = log_writer::BufferWriter::default();
    let buffer = writer.inner.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.lock().expect("log buffer poisoned").clone();
    String::from_utf8(bytes).expect("utf8 log")
}
