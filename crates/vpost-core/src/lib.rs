pub mod config;
pub mod control;
pub mod credentials;
pub(crate) mod http;
pub mod logging;
pub mod media;
pub mod retry;
pub mod upload;
