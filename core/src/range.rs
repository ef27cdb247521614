//! Child-index and word-index ranges used by path segments.

use crate::{Fragment, RuleError, MAX_CHILD_INDEX};
use std::fmt;
use std::ops::RangeInclusive;

/// Inclusive range of 0-based same-kind child indices.
///
/// A descent over a range fans out in the path index: `(2-4)` registers three
/// sibling paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumberRange {
    first: usize,
    last: usize,
}

impl NumberRange {
    /// A range over exactly one index.
    #[must_use]
    pub fn single(index: usize) -> Self {
        Self {
            first: index,
            last: index,
        }
    }

    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRange`] if `first > last` or `last` reaches
    /// [`MAX_CHILD_INDEX`].
    pub fn new(first: usize, last: usize) -> Result<Self, RuleError> {
        let text = format!("{first}-{last}");
        Self::checked(first, last, &text)
    }

    /// The default range of a fragment: every sibling it may have.
    #[must_use]
    pub fn full(fragment: Fragment) -> Self {
        Self {
            first: 0,
            last: fragment.max_range() - 1,
        }
    }

    /// Parse `"2"`, `"2-4"`, `"2-"` (up to the fragment maximum) or `"*"`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRange`] on malformed or inverted ranges.
    pub fn parse(text: &str, fragment: Fragment) -> Result<Self, RuleError> {
        let trimmed = text.trim();
        if trimmed == "*" {
            return Ok(Self::full(fragment));
        }
        let (first, last) = match trimmed.split_once('-') {
            None => {
                let n = parse_index(trimmed, text, "number")?;
                (n, n)
            }
            Some((a, "")) => {
                let first = parse_index(a, text, "number")?;
                if first >= MAX_CHILD_INDEX {
                    return Err(invalid(
                        "number",
                        text,
                        &format!("index {first} exceeds maximum {}", MAX_CHILD_INDEX - 1),
                    ));
                }
                (first, fragment.max_range().max(first + 1) - 1)
            }
            Some((a, b)) => (
                parse_index(a, text, "number")?,
                parse_index(b, text, "number")?,
            ),
        };
        Self::checked(first, last, text)
    }

    fn checked(first: usize, last: usize, text: &str) -> Result<Self, RuleError> {
        if first > last {
            return Err(invalid("number", text, "start is after end"));
        }
        if last >= MAX_CHILD_INDEX {
            return Err(invalid(
                "number",
                text,
                &format!("index {last} exceeds maximum {}", MAX_CHILD_INDEX - 1),
            ));
        }
        Ok(Self { first, last })
    }

    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of indices covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Always `false`: a range covers at least one index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn iter(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

impl fmt::Display for NumberRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

/// Range of whitespace-separated words within a value.
///
/// Indices are 0-based; negative indices count from the end (`-1` is the last
/// word). `last == None` means "through the last word".
///
/// ```
/// use agentwalk::WordRange;
///
/// let value = "Mozilla 5.0 Windows NT";
/// assert_eq!(WordRange::parse("2-").unwrap().extract(value).as_deref(), Some("Windows NT"));
/// assert_eq!(WordRange::parse("-1").unwrap().extract(value).as_deref(), Some("NT"));
/// assert_eq!(WordRange::parse("1-1").unwrap().extract(value).as_deref(), Some("5.0"));
/// assert_eq!(WordRange::parse("7").unwrap().extract(value), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WordRange {
    first: isize,
    last: Option<isize>,
}

impl WordRange {
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRange`] when both ends are non-negative and
    /// `first > last`.
    pub fn new(first: isize, last: Option<isize>) -> Result<Self, RuleError> {
        if let Some(last) = last {
            if first >= 0 && last >= 0 && first > last {
                return Err(invalid(
                    "word",
                    &format!("{first}-{last}"),
                    "start is after end",
                ));
            }
        }
        Ok(Self { first, last })
    }

    /// Parse `"N"`, `"-N"`, `"A-B"` or `"A-"`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidRange`] on malformed or inverted ranges.
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        let trimmed = text.trim();
        if let Some(from_end) = trimmed.strip_prefix('-') {
            let n = parse_index(from_end, text, "word")?;
            if n == 0 {
                return Err(invalid("word", text, "words from the end count from -1"));
            }
            let n = -as_signed(n);
            return Ok(Self {
                first: n,
                last: Some(n),
            });
        }
        match trimmed.split_once('-') {
            None => {
                let n = as_signed(parse_index(trimmed, text, "word")?);
                Ok(Self {
                    first: n,
                    last: Some(n),
                })
            }
            Some((a, "")) => Ok(Self {
                first: as_signed(parse_index(a, text, "word")?),
                last: None,
            }),
            Some((a, b)) => {
                let first = as_signed(parse_index(a, text, "word")?);
                let last = as_signed(parse_index(b, text, "word")?);
                if first > last {
                    return Err(invalid("word", text, "start is after end"));
                }
                Ok(Self {
                    first,
                    last: Some(last),
                })
            }
        }
    }

    /// Extract the covered words from `value`, joined by single spaces.
    ///
    /// Returns `None` when the range falls outside the value.
    #[must_use]
    pub fn extract(&self, value: &str) -> Option<String> {
        let words: Vec<&str> = value.split_whitespace().collect();
        let len = words.len();
        let first = resolve(self.first, len)?;
        let last = match self.last {
            Some(last) => resolve(last, len)?,
            None => len.checked_sub(1)?,
        };
        if first > last {
            return None;
        }
        Some(words[first..=last].join(" "))
    }
}

impl fmt::Display for WordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            Some(last) if last == self.first => write!(f, "{}", self.first),
            Some(last) => write!(f, "{}-{}", self.first, last),
            None => write!(f, "{}-", self.first),
        }
    }
}

fn resolve(index: isize, len: usize) -> Option<usize> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())?
    } else {
        index.unsigned_abs()
    };
    (resolved < len).then_some(resolved)
}

fn as_signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

fn parse_index(part: &str, text: &str, kind: &'static str) -> Result<usize, RuleError> {
    let part = part.trim();
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(kind, text, "expected a non-negative number"));
    }
    part.parse::<usize>()
        .map_err(|e| invalid(kind, text, &e.to_string()))
}

fn invalid(kind: &'static str, text: &str, reason: &str) -> RuleError {
    RuleError::InvalidRange {
        kind,
        text: text.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_range_forms() {
        let r = NumberRange::parse("2-4", Fragment::Product).unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(r.len(), 3);

        let r = NumberRange::parse("3", Fragment::Product).unwrap();
        assert_eq!((r.first(), r.last()), (3, 3));

        let r = NumberRange::parse("*", Fragment::Version).unwrap();
        assert_eq!((r.first(), r.last()), (0, 4));

        let r = NumberRange::parse("1-", Fragment::Comments).unwrap();
        assert_eq!((r.first(), r.last()), (1, 1));
    }

    #[test]
    fn number_range_open_end_past_default_keeps_start() {
        let r = NumberRange::parse("6-", Fragment::Version).unwrap();
        assert_eq!((r.first(), r.last()), (6, 6));
    }

    #[test]
    fn number_range_errors() {
        for bad in ["", "a", "4-2", "-3", "1-x", "200", "64-", "18446744073709551615-"] {
            let err = NumberRange::parse(bad, Fragment::Product).unwrap_err();
            assert!(
                matches!(err, RuleError::InvalidRange { kind: "number", .. }),
                "{bad}: {err}"
            );
        }
        assert!(NumberRange::new(3, 1).is_err());
        assert!(NumberRange::new(0, MAX_CHILD_INDEX).is_err());
    }

    #[test]
    fn word_range_extracts() {
        let value = "Mozilla 5.0 Windows NT";
        let words = |text: &str| WordRange::parse(text).unwrap().extract(value);

        assert_eq!(words("0").as_deref(), Some("Mozilla"));
        assert_eq!(words("2-").as_deref(), Some("Windows NT"));
        assert_eq!(words("-1").as_deref(), Some("NT"));
        assert_eq!(words("-2").as_deref(), Some("Windows"));
        assert_eq!(words("1-1").as_deref(), Some("5.0"));
        assert_eq!(words("0-2").as_deref(), Some("Mozilla 5.0 Windows"));
        assert_eq!(words("3-9"), None);
        assert_eq!(words("-5"), None);
        assert_eq!(words("4-"), None);
    }

    #[test]
    fn word_range_on_empty_value() {
        assert_eq!(WordRange::parse("0-").unwrap().extract("   "), None);
        assert_eq!(WordRange::parse("-1").unwrap().extract(""), None);
    }

    #[test]
    fn word_range_collapses_whitespace() {
        let r = WordRange::parse("0-1").unwrap();
        assert_eq!(r.extract("  Linux \t x86_64 ").as_deref(), Some("Linux x86_64"));
    }

    #[test]
    fn word_range_errors() {
        for bad in ["", "-0", "x", "3-1", "-", "1--2"] {
            let err = WordRange::parse(bad).unwrap_err();
            assert!(matches!(err, RuleError::InvalidRange { kind: "word", .. }), "{bad}");
        }
    }

    #[test]
    fn display_round_trips() {
        for text in ["2", "-1", "1-3", "2-"] {
            assert_eq!(WordRange::parse(text).unwrap().to_string(), text);
        }
        assert_eq!(
            NumberRange::parse("2-4", Fragment::Entry).unwrap().to_string(),
            "2-4"
        );
    }
}
