//! Engine configuration flags.
//!
//! Each [`crate::Engine`] owns one [`Flags`] value; two engines never share
//! flag state. The flags mirror the standard Prolog flag names
//! (`unknown`, `double_quotes`, `occurs_check`) as typed enums instead of a
//! stringly-typed map, so invalid values are unrepresentable.

/// Reaction to a call of an undefined procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unknown {
    /// Raise `existence_error(procedure, F/N)`.
    #[default]
    Error,
    /// Fail silently.
    Fail,
    /// Log a warning, then fail.
    Warning,
}

/// Interpretation of `"..."` literals in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoubleQuotes {
    /// A list of character codes: `"ab"` reads as `[97, 98]`.
    #[default]
    Codes,
    /// A list of one-character atoms: `"ab"` reads as `[a, b]`.
    Chars,
    /// A single atom: `"ab"` reads as `ab`.
    Atom,
}

/// Whether `=/2` performs the occurs check.
///
/// `unify_with_occurs_check/2` always checks, regardless of this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccursCheck {
    #[default]
    Off,
    On,
}

/// Per-engine flag set.
///
/// # Example
///
/// ```
/// use hornlog::config::{DoubleQuotes, Flags};
///
/// let mut flags = Flags::default();
/// flags.double_quotes = DoubleQuotes::Atom;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub unknown: Unknown,
    pub double_quotes: DoubleQuotes,
    pub occurs_check: OccursCheck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags() {
        let flags = Flags::default();
        assert_eq!(flags.unknown, Unknown::Error);
        assert_eq!(flags.double_quotes, DoubleQuotes::Codes);
        assert_eq!(flags.occurs_check, OccursCheck::Off);
    }

    #[test]
    fn test_flags_are_copy() {
        let a = Flags::default();
        let mut b = a;
        b.unknown = Unknown::Fail;
        assert_eq!(a.unknown, Unknown::Error);
        assert_eq!(b.unknown, Unknown::Fail);
    }
}
