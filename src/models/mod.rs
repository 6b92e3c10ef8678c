mod archive;
mod disposition;
mod item;

pub use archive::*;
pub use disposition::*;
pub use item::*;
