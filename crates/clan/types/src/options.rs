//! Named clan options and their validation rules

use crate::ClanName;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum length of a clan prefix
pub const MAX_PREFIX_LEN: usize = 5;

/// Number of name characters used for the default prefix
pub const DEFAULT_PREFIX_LEN: usize = 3;

/// A settable clan option
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClanOption {
    /// Short tag shown in front of clanmates' names
    Prefix,
    /// Display color of the clan
    Color,
}

impl ClanOption {
    pub const ALL: [ClanOption; 2] = [ClanOption::Prefix, ClanOption::Color];

    /// Check a candidate value against this option's predicate
    pub fn validate(self, value: &str) -> bool {
        self.normalize(value).is_some()
    }

    /// The form a valid value is stored in, or `None` if it is invalid.
    /// Colors are stored by their canonical name; prefixes as given.
    pub fn normalize(self, value: &str) -> Option<String> {
        match self {
            ClanOption::Prefix => {
                let len = value.chars().count();
                ((1..=MAX_PREFIX_LEN).contains(&len) && ClanName::is_valid(value))
                    .then(|| value.to_string())
            }
            ClanOption::Color => value
                .parse::<ClanColor>()
                .ok()
                .map(|color| color.name().to_string()),
        }
    }

    /// Value used when the option was never set
    pub fn default_for(self, name: &ClanName) -> String {
        match self {
            ClanOption::Prefix => name
                .as_str()
                .chars()
                .take(DEFAULT_PREFIX_LEN)
                .collect::<String>()
                .to_uppercase(),
            ClanOption::Color => ClanColor::default().to_string(),
        }
    }
}

impl std::fmt::Display for ClanOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClanOption::Prefix => f.write_str("prefix"),
            ClanOption::Color => f.write_str("color"),
        }
    }
}

/// Colors a clan may display in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClanColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    #[default]
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

impl ClanColor {
    pub const ALL: [ClanColor; 16] = [
        ClanColor::Black,
        ClanColor::DarkBlue,
        ClanColor::DarkGreen,
        ClanColor::DarkAqua,
        ClanColor::DarkRed,
        ClanColor::DarkPurple,
        ClanColor::Gold,
        ClanColor::Gray,
        ClanColor::DarkGray,
        ClanColor::Blue,
        ClanColor::Green,
        ClanColor::Aqua,
        ClanColor::Red,
        ClanColor::LightPurple,
        ClanColor::Yellow,
        ClanColor::White,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClanColor::Black => "black",
            ClanColor::DarkBlue => "dark_blue",
            ClanColor::DarkGreen => "dark_green",
            ClanColor::DarkAqua => "dark_aqua",
            ClanColor::DarkRed => "dark_red",
            ClanColor::DarkPurple => "dark_purple",
            ClanColor::Gold => "gold",
            ClanColor::Gray => "gray",
            ClanColor::DarkGray => "dark_gray",
            ClanColor::Blue => "blue",
            ClanColor::Green => "green",
            ClanColor::Aqua => "aqua",
            ClanColor::Red => "red",
            ClanColor::LightPurple => "light_purple",
            ClanColor::Yellow => "yellow",
            ClanColor::White => "white",
        }
    }
}

impl FromStr for ClanColor {
    type Err = ();

    /// Case-insensitive lookup by color name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClanColor::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

impl std::fmt::Display for ClanColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
