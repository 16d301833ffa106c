pub mod engine;
pub mod glyphs;
pub mod mode;

pub use engine::{load_image, save_image, RedactionEngine};
pub use mode::RedactionMode;
