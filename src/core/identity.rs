//! Document identity: office codes, group keys and sequential document IDs
//!
//! Three record kinds carry a human-readable sequential identifier:
//!
//! | Kind        | Group key       | Identifier        |
//! |-------------|-----------------|-------------------|
//! | Asset       | `258-2026-04`   | `258-2026-04-02`  |
//! | Permit      | `258/2026/`     | `258/2026/01`     |
//! | Requisition | `RF258/2026/`   | `RF258/2026/07`   |
//!
//! Service requests use a prefixed ULID (`SR-01J...`) instead.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Marker that starts every requisition form identifier
pub const REQUISITION_MARKER: &str = "RF";

/// Sequences are zero-padded to this many digits (wider values are kept as-is)
pub const SEQUENCE_WIDTH: usize = 2;

/// Record kinds that receive a sequential document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Fixed-asset register entry
    Asset,
    /// Garage permit
    GaragePermit,
    /// Requisition form
    Requisition,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Asset => "asset",
            DocumentKind::GaragePermit => "permit",
            DocumentKind::Requisition => "requisition",
        }
    }

    pub fn all() -> &'static [DocumentKind] {
        &[
            DocumentKind::Asset,
            DocumentKind::GaragePermit,
            DocumentKind::Requisition,
        ]
    }

    /// Whether the group key includes a category class code
    pub fn uses_class_code(&self) -> bool {
        matches!(self, DocumentKind::Asset)
    }

    /// Build the group key under which sequences are counted.
    ///
    /// Kinds without a class code ignore `class`; assets fall back to
    /// [`ClassCode::fallback`] when none is given.
    pub fn group_key(&self, office: &OfficeCode, period: Period, class: Option<&ClassCode>) -> GroupKey {
        let key = match self {
            DocumentKind::Asset => {
                let fallback = ClassCode::fallback();
                let class = class.unwrap_or(&fallback);
                format!("{}-{}-{}", office, period, class)
            }
            DocumentKind::GaragePermit => format!("{}/{}/", office, period),
            DocumentKind::Requisition => {
                format!("{}{}/{}/", REQUISITION_MARKER, office, period)
            }
        };
        GroupKey(key)
    }

    /// Join a group key and a sequence into the final identifier text
    pub fn format_id(&self, key: &GroupKey, sequence: u32) -> String {
        match self {
            DocumentKind::Asset => {
                format!("{}-{:0width$}", key, sequence, width = SEQUENCE_WIDTH)
            }
            DocumentKind::GaragePermit | DocumentKind::Requisition => {
                format!("{}{:0width$}", key, sequence, width = SEQUENCE_WIDTH)
            }
        }
    }

    /// Infer the kind from the shape of an identifier string
    pub fn from_id_shape(s: &str) -> Option<Self> {
        if s.contains('/') {
            if s.starts_with(REQUISITION_MARKER) {
                Some(DocumentKind::Requisition)
            } else {
                Some(DocumentKind::GaragePermit)
            }
        } else if s.contains('-') {
            Some(DocumentKind::Asset)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" | "assets" => Ok(DocumentKind::Asset),
            "permit" | "permits" | "garage_permit" | "garage-permit" => {
                Ok(DocumentKind::GaragePermit)
            }
            "requisition" | "requisitions" | "reqf" => Ok(DocumentKind::Requisition),
            _ => Err(IdParseError::InvalidKind(s.to_string())),
        }
    }
}

/// Short code identifying the issuing office, embedded in every identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OfficeCode(String);

impl OfficeCode {
    pub fn new(code: impl Into<String>) -> Result<Self, IdParseError> {
        let code = code.into();
        let valid = !code.is_empty()
            && code.len() <= 8
            && code.chars().all(|c| c.is_ascii_alphanumeric())
            && !code.to_uppercase().starts_with(REQUISITION_MARKER);
        if valid {
            Ok(Self(code))
        } else {
            Err(IdParseError::InvalidOfficeCode(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfficeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OfficeCode {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OfficeCode> for String {
    fn from(value: OfficeCode) -> Self {
        value.0
    }
}

/// Two-digit category class code
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClassCode(String);

impl ClassCode {
    /// Reserved code for categories missing from the registry
    pub const FALLBACK: &'static str = "99";

    pub fn new(code: impl Into<String>) -> Result<Self, IdParseError> {
        let code = code.into();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(code))
        } else {
            Err(IdParseError::InvalidClassCode(code))
        }
    }

    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_string())
    }

    pub fn is_fallback(&self) -> bool {
        self.0 == Self::FALLBACK
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClassCode {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClassCode> for String {
    fn from(value: ClassCode) -> Self {
        value.0
    }
}

/// Fiscal period (calendar year of the effective date)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(i32);

impl Period {
    /// Latest year that still formats as four digits
    pub const MAX_YEAR: i32 = 9999;

    /// Period of an effective date. Years outside `0000..=9999` cannot be
    /// written into an identifier and are rejected.
    pub fn from_date(date: NaiveDate) -> Result<Self, IdParseError> {
        let year = date.year();
        if !(0..=Self::MAX_YEAR).contains(&year) {
            return Err(IdParseError::PeriodOutOfRange(year));
        }
        Ok(Self(year))
    }

    pub fn year(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Prefix under which a sequence counter is scoped
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Rebuild a key read back from the allocation store
    pub(crate) fn from_stored(key: String) -> Self {
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an identifier string belongs to this group (literal prefix match)
    pub fn is_prefix_of(&self, id: &str) -> bool {
        id.starts_with(&self.0)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed sequential document identifier
///
/// Ordering compares the sequence numerically, so `...-100` sorts after `...-99`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId {
    kind: DocumentKind,
    office: OfficeCode,
    period: Period,
    class: Option<ClassCode>,
    sequence: u32,
}

impl DocumentId {
    pub fn new(
        kind: DocumentKind,
        office: OfficeCode,
        period: Period,
        class: Option<ClassCode>,
        sequence: u32,
    ) -> Self {
        let class = if kind.uses_class_code() {
            Some(class.unwrap_or_else(ClassCode::fallback))
        } else {
            None
        };
        Self {
            kind,
            office,
            period,
            class,
            sequence,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn office(&self) -> &OfficeCode {
        &self.office
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn class(&self) -> Option<&ClassCode> {
        self.class.as_ref()
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn group_key(&self) -> GroupKey {
        self.kind
            .group_key(&self.office, self.period, self.class.as_ref())
    }

    /// Parse an identifier, requiring a specific kind
    pub fn parse_kind(kind: DocumentKind, s: &str) -> Result<Self, IdParseError> {
        let id: DocumentId = s.parse()?;
        if id.kind != kind {
            return Err(IdParseError::WrongKind {
                expected: kind,
                found: id.kind,
            });
        }
        Ok(id)
    }

    /// Safe filename stem for this identifier (`/` is not allowed in filenames)
    pub fn file_stem(&self) -> String {
        self.to_string().replace('/', "_")
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.format_id(&self.group_key(), self.sequence))
    }
}

fn parse_sequence(s: &str, whole: &str) -> Result<u32, IdParseError> {
    if s.len() < SEQUENCE_WIDTH || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdParseError::InvalidSequence(whole.to_string()));
    }
    match s.parse::<u32>() {
        Ok(0) | Err(_) => Err(IdParseError::InvalidSequence(whole.to_string())),
        Ok(n) => Ok(n),
    }
}

fn parse_period(s: &str, whole: &str) -> Result<Period, IdParseError> {
    if s.len() != 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdParseError::InvalidPeriod(whole.to_string()));
    }
    s.parse::<i32>()
        .map(Period)
        .map_err(|_| IdParseError::InvalidPeriod(whole.to_string()))
}

impl FromStr for DocumentId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = DocumentKind::from_id_shape(s)
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        match kind {
            DocumentKind::Asset => {
                let parts: Vec<&str> = s.split('-').collect();
                let [office, period, class, sequence] = parts.as_slice() else {
                    return Err(IdParseError::WrongPartCount(s.to_string()));
                };
                Ok(Self {
                    kind,
                    office: OfficeCode::new(*office)?,
                    period: parse_period(period, s)?,
                    class: Some(ClassCode::new(*class)?),
                    sequence: parse_sequence(sequence, s)?,
                })
            }
            DocumentKind::GaragePermit | DocumentKind::Requisition => {
                let body = if kind == DocumentKind::Requisition {
                    &s[REQUISITION_MARKER.len()..]
                } else {
                    s
                };
                let parts: Vec<&str> = body.split('/').collect();
                let [office, period, sequence] = parts.as_slice() else {
                    return Err(IdParseError::WrongPartCount(s.to_string()));
                };
                Ok(Self {
                    kind,
                    office: OfficeCode::new(*office)?,
                    period: parse_period(period, s)?,
                    class: None,
                    sequence: parse_sequence(sequence, s)?,
                })
            }
        }
    }
}

impl Serialize for DocumentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Prefix used for service request identifiers
pub const SERVICE_REQUEST_PREFIX: &str = "SR";

/// Identifier for records without sequential numbering (type prefix + ULID)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    ulid: Ulid,
}

impl RecordId {
    pub fn new() -> Self {
        Self { ulid: Ulid::new() }
    }

    pub fn ulid(&self) -> Ulid {
        self.ulid
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", SERVICE_REQUEST_PREFIX, self.ulid)
    }
}

impl FromStr for RecordId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;
        if !prefix.eq_ignore_ascii_case(SERVICE_REQUEST_PREFIX) {
            return Err(IdParseError::InvalidPrefix(prefix.to_string()));
        }
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;
        Ok(Self { ulid })
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("unknown document kind: {0}")]
    InvalidKind(String),

    #[error("invalid office code '{0}' (1-8 alphanumeric characters, not starting with 'RF')")]
    InvalidOfficeCode(String),

    #[error("invalid class code '{0}' (expected two digits)")]
    InvalidClassCode(String),

    #[error("invalid period in '{0}' (expected a 4-digit year)")]
    InvalidPeriod(String),

    #[error("year {0} is out of range (expected 0000-9999)")]
    PeriodOutOfRange(i32),

    #[error("invalid sequence in '{0}' (expected a positive number of at least two digits)")]
    InvalidSequence(String),

    #[error("identifier '{0}' has the wrong number of parts")]
    WrongPartCount(String),

    #[error("missing delimiter in identifier: {0}")]
    MissingDelimiter(String),

    #[error("expected a {expected} identifier, found a {found} identifier")]
    WrongKind {
        expected: DocumentKind,
        found: DocumentKind,
    },

    #[error("invalid record prefix: {0}")]
    InvalidPrefix(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}
