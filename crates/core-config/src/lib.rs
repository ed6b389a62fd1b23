//! Configuration loading: the `oxvi.toml` settings file and the `.oxvirc`
//! remap/init file.
//!
//! The settings file seeds every buffer's option store. Unknown fields are
//! ignored so older binaries accept newer files; a file that fails to parse
//! falls back to defaults with a warning rather than aborting startup.

use anyhow::Result;
use core_state::SettingValue;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub mod init;

pub use init::{
    InitCommand, InitError, InitScript, is_init_command, load_init_file, parse_init, parse_line,
};

pub const CONFIG_FILE: &str = "oxvi.toml";
pub const INIT_FILE: &str = ".oxvirc";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    #[serde(default = "EditorConfig::default_true")]
    pub use_ctrl_keys: bool,
    #[serde(default = "EditorConfig::default_true")]
    pub enable_surround: bool,
    #[serde(default = "EditorConfig::default_shiftwidth")]
    pub shiftwidth: u32,
    #[serde(default = "EditorConfig::default_true")]
    pub expandtab: bool,
    #[serde(default)]
    pub ignorecase: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            use_ctrl_keys: true,
            enable_surround: true,
            shiftwidth: Self::default_shiftwidth(),
            expandtab: true,
            ignorecase: false,
        }
    }
}

impl EditorConfig {
    const fn default_true() -> bool {
        true
    }
    const fn default_shiftwidth() -> u32 {
        4
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct InputConfig {
    #[serde(default = "InputConfig::default_check_user_mappings")]
    pub check_user_mappings: bool,
    #[serde(default = "InputConfig::default_max_count")]
    pub max_count: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            check_user_mappings: Self::default_check_user_mappings(),
            max_count: Self::default_max_count(),
        }
    }
}

impl InputConfig {
    const fn default_check_user_mappings() -> bool {
        true
    }
    const fn default_max_count() -> usize {
        core_state::MAX_COUNT
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct InitConfig {
    /// Explicit init file; discovered when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub init: InitConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,
}

impl Config {
    /// Initial per-buffer option values.
    pub fn settings(&self) -> Vec<(&'static str, SettingValue)> {
        let e = &self.file.editor;
        vec![
            ("use_ctrl_keys", SettingValue::Bool(e.use_ctrl_keys)),
            ("enable_surround", SettingValue::Bool(e.enable_surround)),
            ("shiftwidth", SettingValue::Int(i64::from(e.shiftwidth))),
            ("expandtab", SettingValue::Bool(e.expandtab)),
            ("ignorecase", SettingValue::Bool(e.ignorecase)),
        ]
    }

    /// Init file to load: the configured path, else a discovered one.
    pub fn init_path(&self) -> Option<PathBuf> {
        self.file.init.path.clone().or_else(discover_init)
    }
}

/// Best-effort config path: working directory first, then the platform
/// config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("oxvi").join(CONFIG_FILE);
    }
    PathBuf::from(CONFIG_FILE)
}

/// Existing init file in the working directory or `<config dir>/oxvi/oxvirc`.
pub fn discover_init() -> Option<PathBuf> {
    let local = PathBuf::from(INIT_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|d| d.join("oxvi").join("oxvirc"))
        .filter(|p| p.exists())
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config loaded");
            Ok(Config {
                raw: Some(content),
                file,
            })
        }
        Err(error) => {
            warn!(target: "config", path = %path.display(), %error, "config parse failed; using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
pub(crate) mod test_log {
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    pub struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        pub fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    pub struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
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

    /// Run `f` with a WARN-level subscriber and return what it logged.
    pub fn capture(f: impl FnOnce()) -> String {
        let (writer, buffer) = BufferWriter::new();
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
}
