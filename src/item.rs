//! Configuration items - the tracked assets of the CMDB
//!
//! A CI has a fixed set of attribute columns, every one optional at the
//! storage layer. Which of them are actually required depends on the CI's
//! declared type (see [`crate::ci_type`]).
//!
//! Inputs come in two shapes:
//! - [`CiAttributes`]: used for creation and for equality filters
//! - [`CiPatch`]: used for partial updates, where nullable columns can be
//!   explicitly cleared

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Deployment environment of a CI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Dev,
    Qa,
    Prod,
}

impl Environment {
    /// Get the string representation of the environment
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Qa => "QA",
            Environment::Prod => "PROD",
        }
    }

    /// Get all environments
    pub fn all() -> &'static [Environment] {
        &[Environment::Dev, Environment::Qa, Environment::Prod]
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Environment::all()
            .iter()
            .copied()
            .find(|env| env.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Unknown environment: {} (expected DEV, QA or PROD)",
                    s
                ))
            })
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for Environment {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Environment {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
    }
}

/// Columns of the `cis` table.
///
/// `CiId` is generated by the store and can only be filtered on; every other
/// variant is an attribute callers may set. Column names in generated SQL
/// only ever come from this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CiField {
    CiId,
    TypeId,
    Name,
    Description,
    SerialNumber,
    Version,
    AcquisitionDate,
    Status,
    PhysicalLocation,
    Owner,
    Environment,
    SecurityLevel,
    LicenseNumber,
    LicenseExpiration,
}

impl CiField {
    /// Column name in the `cis` table
    pub fn as_str(&self) -> &'static str {
        match self {
            CiField::CiId => "ci_id",
            CiField::TypeId => "type_id",
            CiField::Name => "name",
            CiField::Description => "description",
            CiField::SerialNumber => "serial_number",
            CiField::Version => "version",
            CiField::AcquisitionDate => "acquisition_date",
            CiField::Status => "status",
            CiField::PhysicalLocation => "physical_location",
            CiField::Owner => "owner",
            CiField::Environment => "environment",
            CiField::SecurityLevel => "security_level",
            CiField::LicenseNumber => "license_number",
            CiField::LicenseExpiration => "license_expiration",
        }
    }

    /// Settable attribute fields, in column order
    pub fn all() -> &'static [CiField] {
        &[
            CiField::TypeId,
            CiField::Name,
            CiField::Description,
            CiField::SerialNumber,
            CiField::Version,
            CiField::AcquisitionDate,
            CiField::Status,
            CiField::PhysicalLocation,
            CiField::Owner,
            CiField::Environment,
            CiField::SecurityLevel,
            CiField::LicenseNumber,
            CiField::LicenseExpiration,
        ]
    }

    /// Every column an equality filter may name, in column order
    pub fn filterable() -> &'static [CiField] {
        &[
            CiField::CiId,
            CiField::TypeId,
            CiField::Name,
            CiField::Description,
            CiField::SerialNumber,
            CiField::Version,
            CiField::AcquisitionDate,
            CiField::Status,
            CiField::PhysicalLocation,
            CiField::Owner,
            CiField::Environment,
            CiField::SecurityLevel,
            CiField::LicenseNumber,
            CiField::LicenseExpiration,
        ]
    }

    pub fn is_settable(&self) -> bool {
        !matches!(self, CiField::CiId)
    }

    /// Whether values of this column are integers
    pub fn is_integer(&self) -> bool {
        matches!(self, CiField::CiId | CiField::TypeId)
    }
}

impl FromStr for CiField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CiField::filterable()
            .iter()
            .copied()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown CI field: {}", s)))
    }
}

impl std::fmt::Display for CiField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored configuration item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub ci_id: i64,
    pub type_id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub version: Option<String>,
    pub acquisition_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub physical_location: Option<String>,
    pub owner: Option<String>,
    pub environment: Option<Environment>,
    pub security_level: Option<String>,
    pub license_number: Option<String>,
    pub license_expiration: Option<NaiveDate>,
}

/// Attribute set for creating a CI, or an equality filter over CIs.
///
/// Absent fields are neither inserted nor filtered on. `ci_id` is only
/// meaningful as a filter; creation rejects it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CiAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub physical_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub security_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub license_number: Option<String>,
    #[serde(default, deserialize_with = "iso_date", skip_serializing_if = "Option::is_none")]
    pub license_expiration: Option<NaiveDate>,
}

impl CiAttributes {
    /// Storage value of a field, `None` when the field was not supplied
    pub fn value_of(&self, field: CiField) -> Option<Value> {
        match field {
            CiField::CiId => self.ci_id.map(Value::Integer),
            CiField::TypeId => self.type_id.map(Value::Integer),
            CiField::Name => text(&self.name),
            CiField::Description => text(&self.description),
            CiField::SerialNumber => text(&self.serial_number),
            CiField::Version => text(&self.version),
            CiField::AcquisitionDate => self.acquisition_date.map(date),
            CiField::Status => text(&self.status),
            CiField::PhysicalLocation => text(&self.physical_location),
            CiField::Owner => text(&self.owner),
            CiField::Environment => self.environment.map(|e| Value::Text(e.as_str().to_string())),
            CiField::SecurityLevel => text(&self.security_level),
            CiField::LicenseNumber => text(&self.license_number),
            CiField::LicenseExpiration => self.license_expiration.map(date),
        }
    }

    /// Supplied fields with their storage values, in column order
    pub fn columns(&self) -> Vec<(CiField, Value)> {
        CiField::filterable()
            .iter()
            .filter_map(|field| self.value_of(*field).map(|value| (*field, value)))
            .collect()
    }

    /// Whether a field counts as missing for mandatory-field purposes:
    /// absent, null, or text that is empty after trimming.
    pub fn is_blank(&self, field: CiField) -> bool {
        match self.value_of(field) {
            None | Some(Value::Null) => true,
            Some(Value::Text(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }

    /// Check the request shape required for creation: `type_id` and
    /// `environment` present, string lengths within bounds.
    pub fn validate_for_create(&self) -> Result<()> {
        self.validate()?;
        if self.ci_id.is_some() {
            return Err(Error::InvalidInput(
                "ci_id is generated and cannot be supplied".to_string(),
            ));
        }
        let mut missing = Vec::new();
        if self.type_id.is_none() {
            missing.push(CiField::TypeId.as_str());
        }
        if self.environment.is_none() {
            missing.push(CiField::Environment.as_str());
        }
        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "required: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Partial update of a CI.
///
/// Outer `None` leaves a column untouched. For nullable columns,
/// `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CiPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub serial_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub version: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable_iso_date", skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub physical_location: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub owner: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 50))]
    pub security_level: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub license_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable_iso_date", skip_serializing_if = "Option::is_none")]
    pub license_expiration: Option<Option<NaiveDate>>,
}

impl CiPatch {
    /// Storage value to write for a field, `None` when the field is untouched
    pub fn value_of(&self, field: CiField) -> Option<Value> {
        match field {
            CiField::CiId => None,
            CiField::TypeId => self.type_id.map(Value::Integer),
            CiField::Name => text(&self.name),
            CiField::Description => text(&self.description),
            CiField::SerialNumber => self.serial_number.as_ref().map(nullable_text),
            CiField::Version => self.version.as_ref().map(nullable_text),
            CiField::AcquisitionDate => self.acquisition_date.map(|d| d.map(date).unwrap_or(Value::Null)),
            CiField::Status => self.status.as_ref().map(nullable_text),
            CiField::PhysicalLocation => self.physical_location.as_ref().map(nullable_text),
            CiField::Owner => self.owner.as_ref().map(nullable_text),
            CiField::Environment => self.environment.map(|e| Value::Text(e.as_str().to_string())),
            CiField::SecurityLevel => self.security_level.as_ref().map(nullable_text),
            CiField::LicenseNumber => self.license_number.as_ref().map(nullable_text),
            CiField::LicenseExpiration => self.license_expiration.map(|d| d.map(date).unwrap_or(Value::Null)),
        }
    }

    /// Fields to write with their storage values, in column order
    pub fn columns(&self) -> Vec<(CiField, Value)> {
        CiField::all()
            .iter()
            .filter_map(|field| self.value_of(*field).map(|value| (*field, value)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }

    /// Check the request shape: at least one field, lengths within bounds.
    pub fn validate_for_update(&self) -> Result<()> {
        self.validate()?;
        if self.is_empty() {
            return Err(Error::InvalidInput(
                "update must set at least one field".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keeps an explicit JSON `null` distinct from an absent key.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Accepts `YYYY-MM-DD` or a full ISO 8601 timestamp, keeping the date part.
pub fn parse_iso_date(value: &str) -> std::result::Result<NaiveDate, String> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .map_err(|_| {
            format!(
                "invalid date '{}', expected YYYY-MM-DD or an ISO 8601 timestamp",
                value
            )
        })
}

fn iso_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| parse_iso_date(&s).map_err(de::Error::custom))
        .transpose()
}

fn nullable_iso_date<'de, D>(deserializer: D) -> std::result::Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    iso_date(deserializer).map(Some)
}

fn text(value: &Option<String>) -> Option<Value> {
    value.as_ref().map(|s| Value::Text(s.clone()))
}

fn nullable_text(value: &Option<String>) -> Value {
    value.as_ref().map(|s| Value::Text(s.clone())).unwrap_or(Value::Null)
}

fn date(value: NaiveDate) -> Value {
    Value::Text(value.format("%Y-%m-%d").to_string())
}
