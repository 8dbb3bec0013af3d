use std::fmt::{Display, Formatter};

/// Provenance tag written into the `source` column of every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Daily bars from the Yahoo chart API.
    YahooChart,
    /// Live Fear & Greed reading.
    CnnCurrent,
    /// Fear & Greed history from the graphdata endpoint.
    CnnGraphdata,
}

impl Provenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YahooChart => "yahoo-chart",
            Self::CnnCurrent => "cnn-fear-greed-current",
            Self::CnnGraphdata => "cnn-graphdata",
        }
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
