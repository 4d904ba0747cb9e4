use chrono::NaiveDate;
use std::fmt;

/// Dated name of a release branch, e.g. `release/7Mar24`.
///
/// Day without zero padding, English three-letter month, two-digit year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseBranchName(String);

impl ReleaseBranchName {
    /// Derive the branch name for `date` using the default `release` prefix.
    pub fn for_date(date: NaiveDate) -> Self {
        Self::with_prefix("release", date)
    }

    /// Derive the branch name for `date` under a custom prefix.
    pub fn with_prefix(prefix: &str, date: NaiveDate) -> Self {
        let prefix = prefix.trim_end_matches('/');
        ReleaseBranchName(format!("{}/{}", prefix, date.format("%-d%b%y")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseBranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReleaseBranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
