//! Request vocabulary for the fixed API contract

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric list-type category accepted by `GetLists`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListType(pub u32);

impl ListType {
    pub const DATABASES: ListType = ListType(0);
    pub const QUERIES: ListType = ListType(1);
    pub const SUPPRESSION_LISTS: ListType = ListType(13);
    pub const RELATIONAL_TABLES: ListType = ListType(15);
    pub const CONTACT_LISTS: ListType = ListType(18);
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which contacts an `ExportList` job extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportKind {
    All,
    OptIn,
    OptOut,
    Undeliverable,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportKind::All => "ALL",
            ExportKind::OptIn => "OPT_IN",
            ExportKind::OptOut => "OPT_OUT",
            ExportKind::Undeliverable => "UNDELIVERABLE",
        }
    }
}

/// File format of an `ExportList` result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tab,
    Pipe,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Tab => "TAB",
            ExportFormat::Pipe => "PIPE",
        }
    }
}

/// Scope of a raw recipient-event export
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawExportTarget {
    List(String),
    Mailing(String),
}

impl RawExportTarget {
    /// Parameter name and value identifying the target
    pub(crate) fn param(&self) -> (&'static str, &str) {
        match self {
            RawExportTarget::List(id) => ("LIST_ID", id),
            RawExportTarget::Mailing(id) => ("MAILING_ID", id),
        }
    }
}
