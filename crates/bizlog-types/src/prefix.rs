//! Delimiters wrapped around a record's final message.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Prefix/suffix pair applied to the rendered field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrefixStyle {
    /// No delimiters.
    None,
    /// `【` and `】`.
    FullwidthBrackets,
    /// `[` and `]`.
    SquareBrackets,
    /// `(` and `)`.
    Parens,
    /// `<` and `>`.
    AngleBrackets,
}

impl PrefixStyle {
    /// The literal `(prefix, suffix)` pair for this style.
    pub fn delimiters(&self) -> (&'static str, &'static str) {
        match self {
            Self::None => ("", ""),
            Self::FullwidthBrackets => ("【", "】"),
            Self::SquareBrackets => ("[", "]"),
            Self::Parens => ("(", ")"),
            Self::AngleBrackets => ("<", ">"),
        }
    }

    /// Resolve a legacy numeric style code (0 through 4).
    ///
    /// Unknown codes resolve to [`PrefixStyle::None`].
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::FullwidthBrackets,
            2 => Self::SquareBrackets,
            3 => Self::Parens,
            4 => Self::AngleBrackets,
            _ => Self::None,
        }
    }

    /// Wrap `body` in this style's delimiters.
    pub fn wrap(&self, body: &str) -> String {
        let (prefix, suffix) = self.delimiters();
        let mut out = String::with_capacity(prefix.len() + body.len() + suffix.len());
        out.push_str(prefix);
        out.push_str(body);
        out.push_str(suffix);
        out
    }
}

impl Default for PrefixStyle {
    fn default() -> Self {
        Self::FullwidthBrackets
    }
}
