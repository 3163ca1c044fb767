pub mod api;
pub mod app;
pub mod error;
pub mod logs;
pub mod session;
pub mod state;
pub mod types;
pub mod ui;
