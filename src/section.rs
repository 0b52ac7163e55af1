//! Section code formatting.
//!
//! The section printed on every certificate is a region letter followed by the
//! section number exactly as entered, e.g. `E9`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::generation::GenerationError;

/// Region of the seminar section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Eastern,
    Gateway,
}

impl Region {
    pub fn letter(&self) -> char {
        match self {
            Self::Eastern => 'E',
            Self::Gateway => 'G',
        }
    }
}

impl FromStr for Region {
    type Err = GenerationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "eastern" => Ok(Self::Eastern),
            "gateway" => Ok(Self::Gateway),
            _ => Err(GenerationError::Configuration(format!(
                "unrecognized region '{}' (expected 'Eastern' or 'Gateway')",
                value
            ))),
        }
    }
}

/// Canonical section identifier, `<RegionLetter><Number>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionCode(String);

impl SectionCode {
    pub fn new(region: Region, number: &str) -> Result<Self, GenerationError> {
        let number = number.trim();
        if number.is_empty() {
            return Err(GenerationError::Configuration(
                "section number is required".to_string(),
            ));
        }
        Ok(Self(format!("{}{}", region.letter(), number)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combine the raw region selector and section number from a request.
pub fn format_section(region: &str, number: &str) -> Result<SectionCode, GenerationError> {
    let region: Region = region.parse()?;
    SectionCode::new(region, number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_letters() {
        assert_eq!(format_section("Eastern", "9").unwrap().as_str(), "E9");
        assert_eq!(format_section("Gateway", "12").unwrap().as_str(), "G12");
    }

    #[test]
    fn test_number_kept_verbatim() {
        assert_eq!(format_section("Eastern", "09").unwrap().as_str(), "E09");
        assert_eq!(format_section("Gateway", "4B").unwrap().as_str(), "G4B");
        assert_eq!(format_section("Gateway", " 7 ").unwrap().as_str(), "G7");
    }

    #[test]
    fn test_region_selector_ignores_case() {
        assert_eq!(format_section(" eastern ", "1").unwrap().as_str(), "E1");
        assert_eq!(format_section("GATEWAY", "1").unwrap().as_str(), "G1");
    }

    #[test]
    fn test_unknown_region_is_configuration_error() {
        let err = format_section("Midwest", "9").unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
        assert!(err.to_string().contains("Midwest"));
    }

    #[test]
    fn test_blank_number_is_configuration_error() {
        let err = format_section("Eastern", "  ").unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let first = format_section("Eastern", "9").unwrap();
        let second = format_section("Eastern", "9").unwrap();
        assert_eq!(first, second);
    }
}
