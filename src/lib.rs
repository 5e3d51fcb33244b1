//! kaiwa: a terminal English-conversation tutor.
//!
//! The binary in `main.rs` draws the screens; everything it drives lives
//! here so the integration tests and benchmarks can reach it too.

rust_i18n::i18n!("locales", fallback = "en");

pub mod app;
pub mod audio;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod service;
pub mod store;
pub mod tutor;
pub mod ui;
