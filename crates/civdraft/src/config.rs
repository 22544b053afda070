//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::CivdraftError;

/// Everything the server needs to start.
///
/// Built with `Default` plus the `with_*` methods, or from the
/// environment with [`from_env`](Self::from_env).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: String,
    /// Root of the file store; drafts live in `<data_dir>/drafts`, build
    /// output in `<data_dir>/builds`.
    pub data_dir: PathBuf,
    /// Card catalog JSON file.
    pub catalog: PathBuf,
    /// External build program and its leading arguments. `None` exports
    /// the build request as JSON and stops there.
    pub build_command: Option<Vec<String>>,
    /// Timer sweep period per room. Zero disables the sweep.
    pub sweep_interval: Duration,
    /// Command channel size per room.
    pub mailbox: usize,
    /// How long an unwatched room with no activity lives. Zero keeps
    /// rooms until their draft completes.
    pub room_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("./data"),
            catalog: PathBuf::from("./data/catalog.json"),
            build_command: None,
            sweep_interval: Duration::from_secs(1),
            mailbox: 64,
            room_idle: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    pub fn with_bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = addr.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog = path.into();
        self
    }

    pub fn with_build_command(mut self, argv: Vec<String>) -> Self {
        self.build_command = (!argv.is_empty()).then_some(argv);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_mailbox(mut self, size: usize) -> Self {
        self.mailbox = size;
        self
    }

    pub fn with_room_idle(mut self, idle: Duration) -> Self {
        self.room_idle = idle;
        self
    }

    /// Defaults overridden by `CIVDRAFT_BIND`, `CIVDRAFT_DATA_DIR`,
    /// `CIVDRAFT_CATALOG`, `CIVDRAFT_BUILD_CMD` (whitespace-separated
    /// argv), `CIVDRAFT_SWEEP_MS` and `CIVDRAFT_ROOM_IDLE_SECS`.
    pub fn from_env() -> Result<Self, CivdraftError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CivdraftError> {
        let mut config = Self::default();
        if let Some(bind) = lookup("CIVDRAFT_BIND") {
            config.bind = bind;
        }
        if let Some(dir) = lookup("CIVDRAFT_DATA_DIR") {
            config.catalog = PathBuf::from(&dir).join("catalog.json");
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(catalog) = lookup("CIVDRAFT_CATALOG") {
            config.catalog = PathBuf::from(catalog);
        }
        if let Some(cmd) = lookup("CIVDRAFT_BUILD_CMD") {
            config = config.with_build_command(cmd.split_whitespace().map(str::to_owned).collect());
        }
        if let Some(ms) = lookup("CIVDRAFT_SWEEP_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| CivdraftError::Config(format!("CIVDRAFT_SWEEP_MS must be milliseconds, got {ms:?}")))?;
            config.sweep_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = lookup("CIVDRAFT_ROOM_IDLE_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CivdraftError::Config(format!("CIVDRAFT_ROOM_IDLE_SECS must be seconds, got {secs:?}"))
            })?;
            config.room_idle = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
