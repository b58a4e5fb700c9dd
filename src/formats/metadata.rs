// JSON trailer of a .img file: which radio the image belongs to
// Reference: chirp/chirp_common.py (FileBackedRadio metadata)

use crate::drivers::DriverInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Metadata {
    /// Driver class that wrote the image, e.g. `BaofengUV5R`
    pub rclass: String,
    pub vendor: String,
    pub model: String,
    pub variant: String,
    pub chirp_version: String,

    /// Keys this crate does not interpret, written back unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn new(vendor: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            model: model.into(),
            chirp_version: crate::VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Metadata for an image produced by a registered driver
    pub fn for_driver(info: &DriverInfo) -> Self {
        let rclass = format!("{}{}", info.vendor, info.model)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        Self {
            rclass,
            ..Self::new(info.vendor, info.model)
        }
    }

    /// Vendor and model, when the file names both
    pub fn radio(&self) -> Option<(&str, &str)> {
        if self.vendor.is_empty() || self.model.is_empty() {
            None
        } else {
            Some((&self.vendor, &self.model))
        }
    }

    pub(crate) fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub(crate) fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::get_driver;

    #[test]
    fn test_for_driver() {
        let info = get_driver("Baofeng", "UV-5R").unwrap();
        let meta = Metadata::for_driver(info);
        assert_eq!(meta.rclass, "BaofengUV5R");
        assert_eq!(meta.radio(), Some(("Baofeng", "UV-5R")));
        assert!(!meta.chirp_version.is_empty());
        assert_eq!(Metadata::default().radio(), None);
        assert_eq!(Metadata::new("Icom", "").radio(), None);
    }

    #[test]
    fn test_unknown_keys_kept() {
        let json = r#"{"vendor":"Icom","model":"IC-T7H","mem_extra":{"1":"x"},"banks":3}"#;
        let meta = Metadata::from_json(json).unwrap();
        assert_eq!(meta.radio(), Some(("Icom", "IC-T7H")));
        assert_eq!(meta.extra.len(), 2);

        let again = Metadata::from_json(&meta.to_json().unwrap()).unwrap();
        assert_eq!(again, meta);
        assert_eq!(again.extra["banks"], serde_json::json!(3));
    }
}
