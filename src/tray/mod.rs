pub mod controller;
pub mod hotkeys;
pub mod menu;

pub use controller::TrayController;
