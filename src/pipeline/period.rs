use std::{cmp::Ordering, fmt, sync::LazyLock};

use regex::Regex;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").expect("valid regex"));

/// A multi-year averaging window such as `2005-2008`.
///
/// Periods order by their first year, then their last year, then by label; labels
/// without any four-digit year sort after all dated ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Period {
    label: String,
    years: Option<(u32, u32)>, // Derived from label
}

impl Period {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let years = {
            let mut found = YEAR.find_iter(&label).filter_map(|m| m.as_str().parse::<u32>().ok());
            found.next().map(|first| (first, found.last().unwrap_or(first)))
        };
        Self { label, years }
    }

    #[inline] pub fn label(&self) -> &str { &self.label }

    /// First and last year named in the label, if any.
    #[inline] pub fn years(&self) -> Option<(u32, u32)> { self.years }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.years, other.years) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.label.cmp(&other.label)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.label.cmp(&other.label),
        }
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
