pub mod client;
pub mod error;
pub mod live_ui;
pub mod process_tree;
pub mod render;
pub mod session;
pub mod unicode_utils;
