// Blue/green color tags
//
// Each alias rotates between two index slots. At any instant one color is
// active (receiving queries) and the opposite is the staging target for the
// next deployment. An alias with no active index stages into blue.

use serde::{Deserialize, Serialize};

/// One of the two rotating index slots for an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Green,
}

impl Color {
    /// The staging color when an alias has no active index.
    pub const DEFAULT: Color = Color::Blue;

    pub fn opposite(self) -> Color {
        match self {
            Color::Blue => Color::Green,
            Color::Green => Color::Blue,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }

    /// Extract the color tag from an index name.
    ///
    /// System-generated names embed the tag as `_blue_` / `_green_`; anything
    /// else (including legacy dash-separated names) has no recognizable color.
    pub fn from_index_name(name: &str) -> Option<Color> {
        if name.contains("_blue_") {
            Some(Color::Blue)
        } else if name.contains("_green_") {
            Some(Color::Green)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(Color::Blue),
            "green" => Ok(Color::Green),
            other => Err(format!("unknown color '{}'", other)),
        }
    }
}
