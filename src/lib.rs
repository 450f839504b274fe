//! Stock Researcher - a terminal stock research client and the mock REST backend it talks to.

pub mod api;
pub mod app;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod normalize;
pub mod recent;
pub mod search;
pub mod server;
pub mod store;
pub mod ui;
pub mod view;
