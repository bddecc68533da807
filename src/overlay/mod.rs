pub mod content;
pub mod profile;
pub mod window;

pub use content::ContentServer;
pub use profile::DebugWindowProfile;
pub use window::OverlayWindow;
