mod archive;
mod content;

pub use archive::*;
pub use content::*;
