use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Job-wide visual treatment for accepted PII regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionMode {
    #[default]
    Blur,
    Black,
    Pixelate,
}

impl RedactionMode {
    pub const ALL: [RedactionMode; 3] = [RedactionMode::Blur, RedactionMode::Black, RedactionMode::Pixelate];

    pub fn as_str(&self) -> &'static str {
        match self {
            RedactionMode::Blur => "blur",
            RedactionMode::Black => "black",
            RedactionMode::Pixelate => "pixelate",
        }
    }
}

impl fmt::Display for RedactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedactionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Ok(RedactionMode::Blur),
            "black" => Ok(RedactionMode::Black),
            "pixelate" => Ok(RedactionMode::Pixelate),
            other => Err(format!(
                "unknown redaction mode '{}', expected blur, black or pixelate",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("blur".parse::<RedactionMode>().unwrap(), RedactionMode::Blur);
        assert_eq!(" BLACK ".parse::<RedactionMode>().unwrap(), RedactionMode::Black);
        assert_eq!("Pixelate".parse::<RedactionMode>().unwrap(), RedactionMode::Pixelate);
        assert!("smudge".parse::<RedactionMode>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for mode in RedactionMode::ALL {
            assert_eq!(mode.to_string().parse::<RedactionMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&RedactionMode::Pixelate).unwrap(), "\"pixelate\"");
        let mode: RedactionMode = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(mode, RedactionMode::Black);
    }
}
