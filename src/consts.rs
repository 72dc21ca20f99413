//! Общие константы (HTTP-эндпоинты, дефолты конфигурации, пути таблиц монтирования).

// -------- HTTP --------
/// Prefix under which every volume route lives: `/filesystem/{id}/...`.
pub const ENDPOINT_FILESYSTEM: &str = "/filesystem";
pub const ENDPOINT_PARTS: &str = "/parts";
pub const ENDPOINT_HEALTH: &str = "/health";
pub const ENDPOINT_METRICS: &str = "/metrics";

pub const INDEX_FILE: &str = "index.html";

// -------- No-cache headers --------
pub const NOCACHE_HEADERS: [(&str, &str); 4] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
    ("Surrogate-Control", "no-cache"),
];

// -------- Config defaults --------
pub const DEFAULT_SALT: &str = "BUZZINGA";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:9080";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
// Нижняя граница: 0 превратил бы опрос /proc в busy loop.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_HTTP_WORKERS: usize = 4;

// -------- Identifiers --------
// HMAC-SHA256 -> 32 байта -> 64 hex-символа.
pub const ID_HEX_LEN: usize = 64;

// -------- Mount tables (Linux) --------
pub const PROC_MOUNTS: &str = "/proc/self/mounts";
pub const PROC_FILESYSTEMS: &str = "/proc/filesystems";
