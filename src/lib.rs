// Базовые модули
pub mod consts;
pub mod config;
pub mod metrics;

// Идентификаторы томов (HMAC-SHA256 + соль)
pub mod ident;

// Тома: дескриптор, источник (ОС), diff снапшотов
pub mod volume; // src/volume/{mod,mounts,diff}.rs

// HTTP: модель запроса/ответа, no-cache, файловый сервер, страницы
pub mod http; // src/http/{mod,nocache,fileserver,pages}.rs

// Таблица маршрутов + текущий снапшот
pub mod router;

// Периодический опрос томов
pub mod discovery;

// tiny_http + пул воркеров
pub mod server;

// Удобные реэкспорты
pub use config::ServeConfig;
pub use discovery::{Discovery, PollReport};
pub use ident::{derive_id, Salt};
pub use router::Router;
pub use server::{HttpService, Site};
pub use volume::{diff, ProcMounts, Volume, VolumeSource};
