pub mod add;
pub mod common;
pub mod config;
pub mod delete;
pub mod edit;
pub mod export;
pub mod list;
pub mod retry;
pub mod show;
pub mod status;
pub mod sync;
pub mod watch;
