use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

/// Read-state of an entry, as tracked by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Entry has not been read yet.
    Unread,
    /// Entry has been read.
    Read,
    /// Entry was dismissed without reading; servers hide these by default.
    Removed,
}

impl EntryStatus {
    /// Returns the wire string for the status, as the server spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Unread => "unread",
            EntryStatus::Read => "read",
            EntryStatus::Removed => "removed",
        }
    }
}

impl TryFrom<String> for EntryStatus {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}

impl FromStr for EntryStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "unread" => Self::Unread,
            "read" => Self::Read,
            "removed" => Self::Removed,
            _ => exn::bail!(ErrorKind::InvalidStatus(s.to_string())),
        })
    }
}

impl Display for EntryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("unread", EntryStatus::Unread)]
    #[case("READ", EntryStatus::Read)]
    #[case(" removed ", EntryStatus::Removed)]
    fn test_from_str(#[case] input: &str, #[case] expected: EntryStatus) {
        assert_eq!(input.parse::<EntryStatus>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "starred".parse::<EntryStatus>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidStatus(_)));
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&EntryStatus::Read).unwrap(), r#""read""#);
        let status: EntryStatus = serde_json::from_str(r#""unread""#).unwrap();
        assert_eq!(status, EntryStatus::Unread);
    }
}
