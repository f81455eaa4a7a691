// Library crate - exposes modules for the server and the CLI binaries

pub mod admin;
pub mod cache;
pub mod config;
pub mod db;
pub mod formats;
pub mod i18n;
pub mod provider;
pub mod resource;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod store;
pub mod sync;
