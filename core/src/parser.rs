//! Rule expression parser.
//!
//! Hand-written recursive descent over the expression text. Literal tokens are
//! kept verbatim (quotes and escapes included) while parsing and are unquoted
//! in a single pass once the tree is complete.
//!
//! ```text
//! agent.(0)product.(0)name="Chrome"
//! Concat["v";agent.(0-3)product.(0)version]
//! LookUp[OperatingSystems;agent.(0)product.(0)comments.entry[0];"Unknown"]
//! IsNull[agent.product.name="Edge"]
//! @Browser.(0)version[0]
//! ```

use crate::expr::{Expression, Matcher, Path, PathStep};
use crate::{Fragment, NumberRange, RuleError, WordRange, MAX_EXPRESSION_LENGTH, MAX_NESTING};
use std::str::FromStr;

const FUNCTIONS: &[&str] = &[
    "IsNull",
    "Concat",
    "NormalizeBrand",
    "CleanVersion",
    "LookUp",
    "LookUpPrefix",
    "IsInLookUpPrefix",
];

impl Expression {
    /// Parse rule expression text.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Syntax`] carrying the full expression text and a
    /// positioned message when the text is not a valid expression (including
    /// malformed ranges and unknown fragment or function names).
    ///
    /// # Example
    ///
    /// ```
    /// use agentwalk::Expression;
    ///
    /// let expr = Expression::parse(r#"agent.(0)product.(0)name="Chrome""#).unwrap();
    /// assert_eq!(expr.text(), r#"agent.(0)product.(0)name="Chrome""#);
    ///
    /// let err = Expression::parse("agent.(0)browser").unwrap_err();
    /// assert!(err.to_string().contains("agent.(0)browser"));
    /// ```
    pub fn parse(text: &str) -> Result<Self, RuleError> {
        if text.len() > MAX_EXPRESSION_LENGTH {
            return Err(RuleError::Syntax {
                expression: text.to_owned(),
                message: format!(
                    "expression is {} bytes, maximum is {MAX_EXPRESSION_LENGTH}",
                    text.len()
                ),
            });
        }

        let mut root = Parser::new(text)
            .expression()
            .map_err(|e| RuleError::Syntax {
                expression: text.to_owned(),
                message: format!("{} at offset {}", e.message, e.at),
            })?;
        root.unquote();
        Ok(Expression::new(text, root))
    }
}

impl FromStr for Expression {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug)]
struct ParseError {
    at: usize,
    message: String,
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            depth: 0,
        }
    }

    fn expression(&mut self) -> Result<Matcher, ParseError> {
        let matcher = self.matcher(true)?;
        self.skip_ws();
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(matcher)
    }

    fn matcher(&mut self, top: bool) -> Result<Matcher, ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error(format!("nesting exceeds {MAX_NESTING} levels")));
        }

        self.skip_ws();
        let matcher = match self.peek() {
            Some('"') => Matcher::Path(Path::Fixed(self.literal()?)),
            Some('@') => {
                self.bump();
                let name = self.ident()?;
                let next = self.steps()?;
                Matcher::Path(Path::Variable { name, next })
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let name = self.ident()?;
                if name == Fragment::Agent.as_str() {
                    let next = self.steps()?;
                    Matcher::Path(Path::Walk(PathStep::Down {
                        fragment: Fragment::Agent,
                        range: NumberRange::single(0),
                        next,
                    }))
                } else {
                    self.function(&name, start, top)?
                }
            }
            _ => return Err(self.error("expected a literal, a path or a function")),
        };

        self.depth -= 1;
        Ok(matcher)
    }

    fn function(&mut self, name: &str, start: usize, top: bool) -> Result<Matcher, ParseError> {
        if !FUNCTIONS.contains(&name) {
            return Err(ParseError {
                at: start,
                message: format!("unknown function or path root \"{name}\""),
            });
        }
        if name == "IsNull" && !top {
            return Err(ParseError {
                at: start,
                message: "IsNull is only allowed at the top of an expression".into(),
            });
        }

        self.skip_ws();
        self.expect('[')?;
        let matcher = match name {
            "IsNull" => Matcher::IsNull(Box::new(self.matcher(false)?)),
            "Concat" => self.concat()?,
            "NormalizeBrand" => Matcher::NormalizeBrand(Box::new(self.matcher(false)?)),
            "CleanVersion" => Matcher::CleanVersion(Box::new(self.matcher(false)?)),
            "LookUp" => {
                let (table, inner, default) = self.lookup_args(true)?;
                Matcher::Lookup {
                    table,
                    inner,
                    default,
                }
            }
            "LookUpPrefix" => {
                let (table, inner, default) = self.lookup_args(true)?;
                Matcher::LookupPrefix {
                    table,
                    inner,
                    default,
                }
            }
            _ => {
                let (table, inner, _) = self.lookup_args(false)?;
                Matcher::IsInLookupPrefix { table, inner }
            }
        };
        self.skip_ws();
        self.expect(']')?;

        if name != "IsNull" {
            self.skip_ws();
            if self.eat('[') {
                let range = self.word_range()?;
                return Ok(Matcher::WordRange {
                    inner: Box::new(matcher),
                    range,
                });
            }
        }
        Ok(matcher)
    }

    fn concat(&mut self) -> Result<Matcher, ParseError> {
        self.skip_ws();
        if self.peek() == Some('"') {
            let prefix = self.literal()?;
            self.skip_ws();
            self.expect(';')?;
            let inner = self.matcher(false)?;
            self.skip_ws();
            let postfix = if self.eat(';') {
                self.skip_ws();
                Some(self.literal()?)
            } else {
                None
            };
            Ok(Matcher::Concat {
                prefix: Some(prefix),
                inner: Box::new(inner),
                postfix,
            })
        } else {
            let inner = self.matcher(false)?;
            self.skip_ws();
            self.expect(';')?;
            self.skip_ws();
            let postfix = self.literal()?;
            Ok(Matcher::Concat {
                prefix: None,
                inner: Box::new(inner),
                postfix: Some(postfix),
            })
        }
    }

    fn lookup_args(
        &mut self,
        allow_default: bool,
    ) -> Result<(String, Box<Matcher>, Option<String>), ParseError> {
        self.skip_ws();
        let table = self.ident()?;
        self.skip_ws();
        self.expect(';')?;
        let inner = self.matcher(false)?;
        self.skip_ws();
        let default = if allow_default && self.eat(';') {
            self.skip_ws();
            Some(self.literal()?)
        } else {
            None
        };
        Ok((table, Box::new(inner), default))
    }

    fn steps(&mut self) -> Result<Option<Box<PathStep>>, ParseError> {
        let mut steps = Vec::new();
        loop {
            self.skip_ws();
            let step = match self.peek() {
                Some('.') => {
                    self.bump();
                    self.down()?
                }
                Some('=') => {
                    self.bump();
                    PathStep::Equals {
                        value: self.operand()?,
                        next: None,
                    }
                }
                Some('!') => {
                    self.bump();
                    self.expect('=')?;
                    PathStep::NotEquals {
                        value: self.operand()?,
                        next: None,
                    }
                }
                Some('{') => {
                    self.bump();
                    PathStep::StartsWith {
                        value: self.operand()?,
                        next: None,
                    }
                }
                Some('}') => {
                    self.bump();
                    PathStep::EndsWith {
                        value: self.operand()?,
                        next: None,
                    }
                }
                Some('~') => {
                    self.bump();
                    PathStep::Contains {
                        value: self.operand()?,
                        next: None,
                    }
                }
                Some('[') => {
                    self.bump();
                    PathStep::WordRange {
                        range: self.word_range()?,
                        next: None,
                    }
                }
                _ => break,
            };
            steps.push(step);
        }

        Ok(steps.into_iter().rev().fold(None, |next, mut step| {
            *step.next_mut() = next;
            Some(Box::new(step))
        }))
    }

    fn down(&mut self) -> Result<PathStep, ParseError> {
        self.skip_ws();
        let range_text = if self.eat('(') {
            Some(self.until(')')?)
        } else {
            None
        };
        self.skip_ws();
        let start = self.pos;
        let name = self.ident()?;
        let fragment = Fragment::from_name(&name)
            .filter(|f| *f != Fragment::Agent)
            .ok_or_else(|| ParseError {
                at: start,
                message: format!("\"{name}\" is not a fragment that can be descended into"),
            })?;
        let range = match range_text {
            Some((text, at)) => NumberRange::parse(text, fragment).map_err(|e| ParseError {
                at,
                message: e.to_string(),
            })?,
            None => NumberRange::full(fragment),
        };
        Ok(PathStep::Down {
            fragment,
            range,
            next: None,
        })
    }

    fn word_range(&mut self) -> Result<WordRange, ParseError> {
        let (text, at) = self.until(']')?;
        WordRange::parse(text).map_err(|e| ParseError {
            at,
            message: e.to_string(),
        })
    }

    fn operand(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        self.literal()
    }

    /// A quoted literal, returned exactly as written.
    fn literal(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect('"')?;
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError {
                        at: start,
                        message: "unterminated literal".into(),
                    })
                }
                Some('\\') => {
                    self.bump();
                }
                Some('"') => break,
                Some(_) => {}
            }
        }
        Ok(self.text[start..self.pos].to_owned())
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.text[start..self.pos].to_owned())
    }

    /// Text up to (not including) `close`, consuming `close`.
    fn until(&mut self, close: char) -> Result<(&'a str, usize), ParseError> {
        let start = self.pos;
        let Some(len) = self.text[start..].find(close) else {
            return Err(ParseError {
                at: start,
                message: format!("missing '{close}'"),
            });
        };
        self.pos = start + len + close.len_utf8();
        Ok((&self.text[start..start + len], start))
    }

    fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            at: self.pos,
            message: message.into(),
        }
    }
}
