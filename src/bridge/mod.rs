pub mod app_info;
pub mod commands;

pub use app_info::AppInfoSource;
