pub mod model;
pub mod reader;

pub use reader::ReportSource;
