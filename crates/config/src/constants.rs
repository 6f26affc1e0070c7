//! Fixed names and defaults shared by every pinst crate

/// Directory name used under the platform config/data/state directories
pub const APP_DIR: &str = "pinst";

pub const CONFIG_FILE: &str = "config.toml";
pub const FORMULA_DIR: &str = "formulas";
pub const LOGS_DIR: &str = "logs";

/// Extension of formula files looked up by identifier
pub const FORMULA_EXTENSION: &str = "toml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 30;
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024 * 1024; // 512MB
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = pinst_types::DEFAULT_MAX_ENTRY_SIZE;
pub const DEFAULT_SMOKE_TEST_TIMEOUT_SECS: u64 = 10;
