pub mod filesystem;
pub mod workspace;

pub use filesystem::{slugify, FileStorage};
pub use workspace::JobWorkspace;
