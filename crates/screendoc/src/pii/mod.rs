pub mod categories;
pub mod detector;
pub mod luhn;
pub mod names;

pub use categories::{ConfidenceTier, PERSON_NAME};
pub use detector::{CategoryInfo, EnabledCategories, PiiDetector, PiiMatch};
pub use luhn::luhn_check;
pub use names::{load_recognizer, LexiconNameRecognizer, NameRecognitionError, NameRecognizer};
