//! SQL identifier quoting.
//!
//! Quoting is driven by a single option, [`SqlOptions::wrap_identifier`]. When it is set every
//! identifier is wrapped in that character (embedded occurrences are doubled); when it is unset
//! identifiers are emitted bare.
//!
//! # Example
//! ```ignore
//! use pgdsl::SqlOptions;
//!
//! let opts = SqlOptions::quoted();
//! assert_eq!(opts.ident("userName"), "\"userName\"");
//! assert_eq!(opts.qualified("public.users"), "\"public\".\"users\"");
//! ```

/// Options controlling SQL text generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlOptions {
    /// Character wrapped around identifiers, e.g. `"` for Postgres.
    pub wrap_identifier: Option<char>,
}

impl SqlOptions {
    /// Emit identifiers bare.
    pub fn bare() -> Self {
        Self {
            wrap_identifier: None,
        }
    }

    /// Wrap identifiers in double quotes.
    pub fn quoted() -> Self {
        Self {
            wrap_identifier: Some('"'),
        }
    }

    /// Use a custom identifier wrapping character.
    pub fn wrap_with(mut self, ch: char) -> Self {
        self.wrap_identifier = Some(ch);
        self
    }

    /// Render a single identifier.
    pub fn ident(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 2);
        self.write_ident(&mut out, name);
        out
    }

    /// Render a possibly schema-qualified name, quoting each dotted part.
    pub fn qualified(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len() + 4);
        for (i, part) in name.split('.').enumerate() {
            if i > 0 {
                out.push('.');
            }
            self.write_ident(&mut out, part);
        }
        out
    }

    pub(crate) fn write_ident(&self, out: &mut String, name: &str) {
        match self.wrap_identifier {
            None => out.push_str(name),
            Some(q) => {
                out.push(q);
                for ch in name.chars() {
                    if ch == q {
                        out.push(q);
                    }
                    out.push(ch);
                }
                out.push(q);
            }
        }
    }
}
