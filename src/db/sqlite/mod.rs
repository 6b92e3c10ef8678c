mod archive;
mod common;
mod content;

pub use archive::SqliteArchiveRepo;
pub use content::SqliteContentRepo;
