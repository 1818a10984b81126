//! Strongly-typed table name wrapper.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Name of a table held by the tabular store (optionally schema-qualified,
/// e.g. `staging.erp_clean`).
///
/// Every segment must be a plain identifier: ASCII letters, digits and
/// underscores, not starting with a digit. Table names end up in generated
/// SQL and in file names (`<outputs>/<table>.csv`), so anything else is
/// rejected up front.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Create a `TableName` from a name known to be valid at compile time.
    ///
    /// Panics in debug builds when the name is not a valid identifier; use
    /// [`parse`](Self::parse) for anything read at runtime.
    pub fn new(name: impl Into<String>) -> Self {
        let s = name.into();
        debug_assert!(
            validate(&s).is_ok(),
            "TableName must be a valid identifier: {s}"
        );
        Self(s)
    }

    /// Validate and wrap a table name.
    pub fn parse(name: impl Into<String>) -> CoreResult<Self> {
        let s = name.into();
        validate(&s)?;
        Ok(Self(s))
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The unqualified part of the name (`erp_clean` for `staging.erp_clean`).
    pub fn table(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// File name used when the table is exported as CSV.
    pub fn csv_file_name(&self) -> String {
        format!("{}.csv", self.table())
    }
}

fn validate(name: &str) -> CoreResult<()> {
    let invalid = |reason: &str| CoreError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    for segment in name.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            None => return Err(invalid("empty segment")),
            Some(c) if c.is_ascii_digit() => return Err(invalid("starts with a digit")),
            Some(_) => {}
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid("only ASCII letters, digits and '_' are allowed"));
        }
    }
    Ok(())
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for TableName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TableName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TableName {
    type Error = CoreError;

    fn try_from(s: String) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

impl PartialEq<str> for TableName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TableName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let name = TableName::parse("erp_clean").unwrap();
        assert_eq!(name, "erp_clean");
        assert_eq!(name.table(), "erp_clean");
        assert_eq!(name.csv_file_name(), "erp_clean.csv");
    }

    #[test]
    fn test_parse_qualified() {
        let name = TableName::parse("staging.fusion").unwrap();
        assert_eq!(name.table(), "fusion");
        assert_eq!(name.csv_file_name(), "fusion.csv");
    }

    #[test]
    fn test_rejects_empty_and_bad_segments() {
        assert!(TableName::parse("").is_err());
        assert!(TableName::parse("staging.").is_err());
        assert!(TableName::parse("1table").is_err());
        assert!(TableName::parse("erp; DROP TABLE x").is_err());
        assert!(TableName::parse("web-clean").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: TableName = serde_json::from_str("\"web_dedup\"").unwrap();
        assert_eq!(ok, "web_dedup");
        assert!(serde_json::from_str::<TableName>("\"bad name\"").is_err());
    }
}
