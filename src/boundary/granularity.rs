use std::fmt;

/// Administrative level a boundary layer (and its panel) describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Province,   // First-level division
    City,       // Prefecture -> Province
}

impl Granularity {
    pub fn to_str(&self) -> &'static str {
        match self {
            Granularity::Province => "province",
            Granularity::City => "city",
        }
    }

    /// Capitalized form used in figure titles.
    pub fn title(&self) -> &'static str {
        match self {
            Granularity::Province => "Province",
            Granularity::City => "City",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}
