//! Build database model and its JSON encoding.
//!
//! A build database maps branch names to per-branch build records. The
//! only field interpreted here is the build date; every other field is kept
//! as raw JSON text, in its original order, so that decode followed by encode
//! reproduces each field value byte-for-byte. Producers may add fields
//! without this crate having to know about them.
//!
//! # Encoding
//!
//! ```json
//! {
//!   "master": { "buildDate": 1000, "tag": "v1.2.0" },
//!   "dev":    { "buildDate": "2015-06-01T12:00:00Z" }
//! }
//! ```
//!
//! The build date field is matched case-insensitively (`buildDate`,
//! `BuildDate`, `builddate`) and may be integer Unix seconds or an RFC 3339
//! string. When the field appears more than once, the last occurrence wins.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::DecodeError;

/// Name of the build date field, compared case-insensitively.
pub const BUILD_DATE_FIELD: &str = "buildDate";

// ============================================================================
// BUILD DATE
// ============================================================================

/// Point in time a branch was last built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildDate(DateTime<Utc>);

impl BuildDate {
    /// Create a build date from Unix seconds. Returns `None` when out of range.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(Self)
    }

    /// Parse an RFC 3339 timestamp.
    pub fn parse_rfc3339(value: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(value).map(|dt| Self(dt.with_timezone(&Utc)))
    }

    /// Unix seconds of this build date.
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Interpret a raw JSON value as a build date.
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        let value: serde_json::Value =
            serde_json::from_str(raw.get()).map_err(|e| e.to_string())?;
        match value {
            serde_json::Value::Number(number) => {
                let seconds = number
                    .as_i64()
                    .ok_or_else(|| format!("{} is not an integer number of seconds", number))?;
                Self::from_unix_seconds(seconds)
                    .ok_or_else(|| format!("{} seconds is out of range", seconds))
            }
            serde_json::Value::String(text) => {
                Self::parse_rfc3339(&text).map_err(|e| format!("{:?}: {}", text, e))
            }
            other => Err(format!(
                "expected integer seconds or an RFC 3339 string, got {}",
                other
            )),
        }
    }
}

impl From<DateTime<Utc>> for BuildDate {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for BuildDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// BRANCH BUILD RECORD
// ============================================================================

/// Build metadata of a single branch.
///
/// Fields are stored as raw JSON in document order. The build date is
/// extracted once at decode time.
#[derive(Debug, Clone)]
pub struct BranchBuildRecord {
    build_date: BuildDate,
    fields: Vec<(String, Box<RawValue>)>,
}

impl BranchBuildRecord {
    /// Build a record from raw fields, locating and parsing the build date.
    ///
    /// `branch` is only used for error reporting.
    pub fn from_fields(
        branch: &str,
        fields: Vec<(String, Box<RawValue>)>,
    ) -> Result<Self, DecodeError> {
        let raw_date = fields
            .iter()
            .rev()
            .find(|(name, _)| name.eq_ignore_ascii_case(BUILD_DATE_FIELD))
            .map(|(_, raw)| raw.as_ref())
            .ok_or_else(|| DecodeError::MissingBuildDate {
                branch: branch.to_string(),
            })?;

        let build_date =
            BuildDate::from_raw(raw_date).map_err(|reason| DecodeError::InvalidBuildDate {
                branch: branch.to_string(),
                reason,
            })?;

        Ok(Self { build_date, fields })
    }

    /// Decode a single record from a JSON object.
    pub fn from_json(branch: &str, json: &str) -> Result<Self, DecodeError> {
        let raw: RawFields = serde_json::from_str(json).map_err(malformed)?;
        Self::from_fields(branch, raw.0)
    }

    pub fn build_date(&self) -> BuildDate {
        self.build_date
    }

    /// Raw JSON of a field, exact name match. Last occurrence wins.
    pub fn field(&self, name: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, raw)| raw.as_ref())
    }

    /// Deserialize a field into a concrete type.
    pub fn field_as<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> Option<Result<T, serde_json::Error>> {
        self.field(name).map(|raw| serde_json::from_str(raw.get()))
    }

    /// All fields in document order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields
            .iter()
            .map(|(name, raw)| (name.as_str(), raw.as_ref()))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl PartialEq for BranchBuildRecord {
    fn eq(&self, other: &Self) -> bool {
        self.build_date == other.build_date
            && self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((a_name, a_raw), (b_name, b_raw))| {
                    a_name == b_name && a_raw.get() == b_raw.get()
                })
    }
}

impl Eq for BranchBuildRecord {}

impl Serialize for BranchBuildRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, raw) in &self.fields {
            map.serialize_entry(name, raw)?;
        }
        map.end()
    }
}

// ============================================================================
// BUILD DATABASE
// ============================================================================

/// All known build history of one repository, keyed by branch name.
///
/// A decoded database is an immutable snapshot: there is no API to mutate
/// it after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildDatabase {
    branches: BTreeMap<String, BranchBuildRecord>,
}

impl BuildDatabase {
    /// Decode a build database from its stored bytes.
    ///
    /// Fails with `DecodeError` for anything that is not a JSON object of
    /// branch objects, for a branch listed twice, and for a branch with a
    /// missing or unparseable build date.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawDatabase = serde_json::from_slice(bytes).map_err(malformed)?;

        let mut seen = HashSet::with_capacity(raw.0.len());
        for (branch, _) in &raw.0 {
            if !seen.insert(branch.as_str()) {
                return Err(DecodeError::DuplicateBranch {
                    branch: branch.clone(),
                });
            }
        }

        let mut branches = BTreeMap::new();
        for (branch, fields) in raw.0 {
            let record = BranchBuildRecord::from_fields(&branch, fields.0)?;
            branches.insert(branch, record);
        }

        Ok(Self { branches })
    }

    /// Assemble a database from already-built records.
    pub fn from_records<I>(records: I) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = (String, BranchBuildRecord)>,
    {
        let mut branches = BTreeMap::new();
        for (branch, record) in records {
            if branches.contains_key(&branch) {
                return Err(DecodeError::DuplicateBranch { branch });
            }
            branches.insert(branch, record);
        }
        Ok(Self { branches })
    }

    /// Encode the database back to JSON. Branches are written in name order.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn get(&self, branch: &str) -> Option<&BranchBuildRecord> {
        self.branches.get(branch)
    }

    pub fn contains_branch(&self, branch: &str) -> bool {
        self.branches.contains_key(branch)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BranchBuildRecord> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl<'a> IntoIterator for &'a BuildDatabase {
    type Item = (&'a String, &'a BranchBuildRecord);
    type IntoIter = btree_map::Iter<'a, String, BranchBuildRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for BuildDatabase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.branches.len()))?;
        for (branch, record) in &self.branches {
            map.serialize_entry(branch, record)?;
        }
        map.end()
    }
}

fn malformed(e: serde_json::Error) -> DecodeError {
    DecodeError::Malformed {
        reason: e.to_string(),
    }
}

// ============================================================================
// RAW WIRE SHAPES
// ============================================================================

/// Fields of one record, in document order, values untouched.
struct RawFields(Vec<(String, Box<RawValue>)>);

impl<'de> Deserialize<'de> for RawFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = RawFields;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a build record object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, raw)) = map.next_entry::<String, Box<RawValue>>()? {
                    fields.push((name, raw));
                }
                Ok(RawFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Branches of a database, in document order, duplicates retained so they
/// can be reported.
struct RawDatabase(Vec<(String, RawFields)>);

impl<'de> Deserialize<'de> for RawDatabase {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DatabaseVisitor;

        impl<'de> Visitor<'de> for DatabaseVisitor {
            type Value = RawDatabase;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping branch names to build records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut branches = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(branch) = map.next_key::<String>()? {
                    let fields = map.next_value::<RawFields>().map_err(|e| {
                        de::Error::custom(format!("branch {:?}: {}", branch, e))
                    })?;
                    branches.push((branch, fields));
                }
                Ok(RawDatabase(branches))
            }
        }

        deserializer.deserialize_map(DatabaseVisitor)
    }
}
