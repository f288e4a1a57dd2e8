pub mod cli;
pub mod scan;

pub use cli::*;
pub use scan::*;
