//! State construction options.

use crate::fatal::FatalHook;
use crate::module::StdLib;
use std::fmt;

/// Options for [`State::with_config`](crate::State::with_config).
#[derive(Clone)]
pub struct Config {
    /// Open every standard library at construction.
    pub open_std_libs: bool,
    /// Libraries to open when `open_std_libs` is false.
    pub libs: Vec<StdLib>,
    /// Name given to chunks compiled by `load`.
    pub chunk_name: String,
    /// Process-wide fatal-error hook to install at construction.
    pub fatal_hook: Option<FatalHook>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            open_std_libs: true,
            libs: Vec::new(),
            chunk_name: "=chunk".to_string(),
            fatal_hook: None,
        }
    }
}

impl Config {
    pub fn open_std_libs(mut self, open: bool) -> Self {
        self.open_std_libs = open;
        self
    }

    /// Open only `libs`. Turns off `open_std_libs`.
    pub fn libs(mut self, libs: impl IntoIterator<Item = StdLib>) -> Self {
        self.open_std_libs = false;
        self.libs = libs.into_iter().collect();
        self
    }

    pub fn chunk_name(mut self, name: impl Into<String>) -> Self {
        self.chunk_name = name.into();
        self
    }

    pub fn fatal_hook(mut self, hook: FatalHook) -> Self {
        self.fatal_hook = Some(hook);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("open_std_libs", &self.open_std_libs)
            .field("libs", &self.libs)
            .field("chunk_name", &self.chunk_name)
            .field("fatal_hook", &self.fatal_hook.is_some())
            .finish()
    }
}
