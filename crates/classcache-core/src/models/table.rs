use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The record tables cached locally and mirrored to the remote sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum TableName {
    Users,
    Students,
    Materials,
    Submissions,
    Settings,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::Users,
        TableName::Students,
        TableName::Materials,
        TableName::Submissions,
        TableName::Settings,
    ];

    /// Name used both as the local storage key and the remote `table` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Users => "users",
            TableName::Students => "students",
            TableName::Materials => "materials",
            TableName::Submissions => "submissions",
            TableName::Settings => "settings",
        }
    }

    /// Prefix for ids generated in this table.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            TableName::Users => "usr",
            TableName::Students => "std",
            TableName::Materials => "mat",
            TableName::Submissions => "sub",
            TableName::Settings => "set",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown table: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_names() {
        assert_eq!("students".parse::<TableName>(), Ok(TableName::Students));
        assert_eq!(" Users ".parse::<TableName>(), Ok(TableName::Users));
        assert!("grades".parse::<TableName>().is_err());
    }

    #[test]
    fn test_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = TableName::ALL.iter().map(|t| t.id_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), TableName::ALL.len());
    }
}
