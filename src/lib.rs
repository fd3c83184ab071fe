pub mod config;
pub mod layout;
pub mod manifest;
pub mod split_log;
pub mod splitter;
