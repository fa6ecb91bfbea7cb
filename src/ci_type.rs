//! CI types - reference entities that declare mandatory attributes
//!
//! Types are maintained administratively; the CI rules only read them.

use crate::item::{CiAttributes, CiField};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A CI type and the attributes every CI of that type must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiType {
    pub type_id: i64,
    pub name: Option<String>,
    /// Attribute names, in declaration order
    pub mandatory_fields: Vec<String>,
}

impl CiType {
    /// Mandatory fields that `attrs` leaves absent, null or blank.
    ///
    /// Names that do not match a settable CI column can never be satisfied
    /// and are always reported.
    pub fn missing_fields(&self, attrs: &CiAttributes) -> Vec<String> {
        self.mandatory_fields
            .iter()
            .filter(|name| match name.parse::<CiField>() {
                Ok(field) if field.is_settable() => attrs.is_blank(field),
                _ => true,
            })
            .cloned()
            .collect()
    }

    /// Fail with `ValidationFailed` listing every missing mandatory field
    pub fn ensure_complete(&self, attrs: &CiAttributes) -> Result<()> {
        let missing = self.missing_fields(attrs);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed {
                type_id: self.type_id,
                missing,
            })
        }
    }
}

/// Input for registering a new type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCiType {
    pub name: Option<String>,
    #[serde(default)]
    pub mandatory_fields: Vec<String>,
}

impl NewCiType {
    pub fn new(name: Option<&str>, mandatory_fields: &[&str]) -> Self {
        Self {
            name: name.map(str::to_string),
            mandatory_fields: mandatory_fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}
