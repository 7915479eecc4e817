//! SQL identifiers and dialect-specific identifier processing.
//!
//! A [`SqlIdentifier`] names a table or column. Unquoted identifiers render
//! verbatim and compare ASCII case-insensitively; quoted identifiers are
//! case-folded and quoted by the dialect's [`IdentifierProcessing`] and
//! compare case-sensitively.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A table or column name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlIdentifier {
    name: String,
    quoted: bool,
}

impl SqlIdentifier {
    /// An identifier that renders exactly as written.
    pub fn unquoted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: false,
        }
    }

    /// An identifier that is quoted (and case-folded) on rendering.
    pub fn quoted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: true,
        }
    }

    /// The raw name, without quotes or case folding.
    pub fn reference(&self) -> &str {
        &self.name
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Render this identifier for a statement.
    pub fn to_sql(&self, processing: &IdentifierProcessing) -> String {
        if self.quoted {
            processing.apply(&self.name)
        } else {
            self.name.clone()
        }
    }

    /// Whether this identifier matches a column label reported by a driver.
    ///
    /// Driver labels are compared ASCII case-insensitively regardless of the
    /// quoting flag.
    pub fn matches_label(&self, label: &str) -> bool {
        self.name.eq_ignore_ascii_case(label)
    }
}

impl PartialEq for SqlIdentifier {
    fn eq(&self, other: &Self) -> bool {
        if self.quoted != other.quoted {
            return false;
        }
        if self.quoted {
            self.name == other.name
        } else {
            self.name.eq_ignore_ascii_case(&other.name)
        }
    }
}

impl Eq for SqlIdentifier {}

impl Hash for SqlIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.quoted.hash(state);
        if self.quoted {
            self.name.hash(state);
        } else {
            for b in self.name.bytes() {
                state.write_u8(b.to_ascii_lowercase());
            }
            state.write_u8(0xff);
        }
    }
}

impl fmt::Display for SqlIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for SqlIdentifier {
    fn from(name: &str) -> Self {
        SqlIdentifier::unquoted(name)
    }
}

impl From<String> for SqlIdentifier {
    fn from(name: String) -> Self {
        SqlIdentifier::unquoted(name)
    }
}

/// How a dialect folds the letter case of quoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterCasing {
    UpperCase,
    LowerCase,
    AsIs,
}

impl LetterCasing {
    pub fn apply(self, name: &str) -> String {
        match self {
            LetterCasing::UpperCase => name.to_uppercase(),
            LetterCasing::LowerCase => name.to_lowercase(),
            LetterCasing::AsIs => name.to_string(),
        }
    }
}

/// Quote characters used around identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quoting {
    pub prefix: char,
    pub suffix: char,
}

impl Quoting {
    /// ANSI double quotes.
    pub const ANSI: Quoting = Quoting::symmetric('"');
    /// MySQL backticks.
    pub const BACKTICK: Quoting = Quoting::symmetric('`');
    /// SQL Server square brackets.
    pub const BRACKETS: Quoting = Quoting {
        prefix: '[',
        suffix: ']',
    };

    pub const fn symmetric(quote: char) -> Self {
        Self {
            prefix: quote,
            suffix: quote,
        }
    }

    /// Wrap `name` in quotes, doubling any embedded closing quote.
    pub fn apply(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        out.push(self.prefix);
        for c in name.chars() {
            if c == self.suffix {
                out.push(c);
            }
            out.push(c);
        }
        out.push(self.suffix);
        out
    }
}

/// Quoting and case-folding rules for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierProcessing {
    pub quoting: Quoting,
    pub letter_casing: LetterCasing,
}

impl IdentifierProcessing {
    /// ANSI quoting with upper-case folding.
    pub const ANSI: IdentifierProcessing =
        IdentifierProcessing::new(Quoting::ANSI, LetterCasing::UpperCase);

    pub const fn new(quoting: Quoting, letter_casing: LetterCasing) -> Self {
        Self {
            quoting,
            letter_casing,
        }
    }

    /// Fold case and quote.
    pub fn apply(&self, name: &str) -> String {
        self.quoting.apply(&self.letter_casing.apply(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unquoted_identifiers_compare_case_insensitively() {
        let a = SqlIdentifier::unquoted("Name");
        let b = SqlIdentifier::unquoted("NAME");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn quoted_identifiers_compare_case_sensitively() {
        assert_ne!(SqlIdentifier::quoted("Name"), SqlIdentifier::quoted("NAME"));
        assert_eq!(SqlIdentifier::quoted("Name"), SqlIdentifier::quoted("Name"));
        assert_ne!(SqlIdentifier::quoted("name"), SqlIdentifier::unquoted("name"));
    }

    #[test]
    fn rendering_applies_processing_to_quoted_only() {
        let lower = IdentifierProcessing::new(Quoting::ANSI, LetterCasing::LowerCase);
        assert_eq!(SqlIdentifier::quoted("MyTable").to_sql(&lower), "\"mytable\"");
        assert_eq!(SqlIdentifier::unquoted("MyTable").to_sql(&lower), "MyTable");
        assert_eq!(
            SqlIdentifier::quoted("MyTable").to_sql(&IdentifierProcessing::ANSI),
            "\"MYTABLE\""
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(Quoting::ANSI.apply("a\"b"), "\"a\"\"b\"");
        assert_eq!(Quoting::BACKTICK.apply("a`b"), "`a``b`");
        assert_eq!(Quoting::BRACKETS.apply("a]b"), "[a]]b]");
    }

    #[test]
    fn label_matching_ignores_case() {
        assert!(SqlIdentifier::quoted("first_name").matches_label("FIRST_NAME"));
        assert!(!SqlIdentifier::unquoted("first_name").matches_label("last_name"));
    }
}
