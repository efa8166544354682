//! Parser for the locator dialect understood by [`super::DomSnapshot`]

use crate::error::{HealError, Result};
use crate::locator::split_nth;

/// A parsed locator expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLocator {
    pub query: Query,
    /// `>> nth=N` suffix
    pub nth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// CSS selector list
    Css(Vec<ComplexSelector>),
    XPath(XPath),
    /// `text="exact"` or `text=substring`
    Text { value: String, exact: bool },
    /// `role=name` with optional accessible name
    Role { role: String, name: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Compound selectors joined by combinators; the combinator of the first
/// part is unused
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSelector {
    pub parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Compound {
    /// `None` matches any tag
    pub tag: Option<String>,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Id(String),
    Class(String),
    Attr { name: String, op: AttrOp, value: String },
    FirstOfType,
    LastOfType,
    FirstChild,
    LastChild,
    NthChild(usize),
    NthOfType(usize),
    Not(Vec<Compound>),
    Checked,
    Visible,
    HasText(String),
}

/// `(path)[index]` or a bare path
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    pub steps: Vec<Step>,
    /// 1-based index applied to the whole result
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// `//` rather than `/`
    pub descendant: bool,
    /// `None` for `*`
    pub name: Option<String>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// 1-based position among matching siblings
    Position(usize),
    HasAttr(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    TextEquals(String),
    TextContains(String),
}

/// Parse a locator expression
pub fn parse(expression: &str) -> Result<ParsedLocator> {
    let (body, nth) = split_nth(expression.trim());
    let body = body.trim();
    if body.is_empty() {
        return Err(invalid(expression, "empty expression"));
    }

    let query = if let Some(rest) = body.strip_prefix("text=") {
        parse_text(rest).map_err(|reason| invalid(expression, &reason))?
    } else if let Some(rest) = body.strip_prefix("role=") {
        parse_role(rest).map_err(|reason| invalid(expression, &reason))?
    } else if let Some(rest) = body.strip_prefix("xpath=") {
        Query::XPath(parse_xpath(rest).map_err(|reason| invalid(expression, &reason))?)
    } else if body.starts_with('/') || body.starts_with('(') {
        Query::XPath(parse_xpath(body).map_err(|reason| invalid(expression, &reason))?)
    } else {
        Query::Css(parse_css(body).map_err(|reason| invalid(expression, &reason))?)
    };

    Ok(ParsedLocator { query, nth })
}

fn invalid(expression: &str, reason: &str) -> HealError {
    HealError::InvalidSelector(format!("{}: {}", expression, reason))
}

type ParseResult<T> = std::result::Result<T, String>;

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Self { chars: input.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let len = expected.chars().count();
        if self.pos + len > self.chars.len() {
            return false;
        }
        if self.chars[self.pos..self.pos + len].iter().copied().eq(expected.chars()) {
            self.pos += len;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(format!("expected '{}' at offset {}", expected, self.pos))
        }
    }

    /// Skip whitespace, reporting whether any was skipped
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn ident(&mut self) -> ParseResult<String> {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                ident.push(c);
                self.pos += 1;
            } else if c == '\\' {
                self.pos += 1;
                let escaped = self.bump().ok_or("dangling escape")?;
                ident.push(escaped);
            } else {
                break;
            }
        }
        if ident.is_empty() {
            Err(format!("expected identifier at offset {}", self.pos))
        } else {
            Ok(ident)
        }
    }

    fn quoted(&mut self) -> ParseResult<String> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(format!("expected quoted string at offset {}", self.pos)),
        };
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') => value.push(self.bump().ok_or("dangling escape")?),
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn number(&mut self) -> ParseResult<usize> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .map_err(|_| format!("expected number at offset {}", start))
    }
}

fn parse_text(rest: &str) -> ParseResult<Query> {
    let trimmed = rest.trim();
    if trimmed.starts_with('"') || trimmed.starts_with('\'') {
        let mut cursor = Cursor::new(trimmed);
        let value = cursor.quoted()?;
        if !cursor.at_end() {
            return Err("trailing input after quoted text".to_string());
        }
        Ok(Query::Text { value, exact: true })
    } else if trimmed.is_empty() {
        Err("empty text query".to_string())
    } else {
        Ok(Query::Text { value: trimmed.to_string(), exact: false })
    }
}

fn parse_role(rest: &str) -> ParseResult<Query> {
    let mut cursor = Cursor::new(rest.trim());
    let role = cursor.ident()?.to_ascii_lowercase();
    let mut name = None;
    if cursor.eat('[') {
        cursor.skip_ws();
        if !cursor.eat_str("name") {
            return Err("only [name=...] is supported on role queries".to_string());
        }
        cursor.skip_ws();
        cursor.expect('=')?;
        cursor.skip_ws();
        name = Some(cursor.quoted()?);
        cursor.skip_ws();
        cursor.expect(']')?;
    }
    if !cursor.at_end() {
        return Err("trailing input after role query".to_string());
    }
    Ok(Query::Role { role, name })
}

fn parse_css(input: &str) -> ParseResult<Vec<ComplexSelector>> {
    let mut cursor = Cursor::new(input);
    let mut list = Vec::new();
    loop {
        cursor.skip_ws();
        list.push(complex_selector(&mut cursor)?);
        cursor.skip_ws();
        if !cursor.eat(',') {
            break;
        }
    }
    if !cursor.at_end() {
        return Err(format!("unexpected '{}' at offset {}", cursor.peek().unwrap_or(' '), cursor.pos));
    }
    Ok(list)
}

fn starts_compound(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '*' | '#' | '.' | '[' | ':' | '_' | '-')
}

fn complex_selector(cursor: &mut Cursor) -> ParseResult<ComplexSelector> {
    let mut parts = vec![(Combinator::Descendant, compound(cursor)?)];
    loop {
        let had_ws = cursor.skip_ws();
        if cursor.eat('>') {
            cursor.skip_ws();
            parts.push((Combinator::Child, compound(cursor)?));
        } else if had_ws && cursor.peek().is_some_and(starts_compound) {
            parts.push((Combinator::Descendant, compound(cursor)?));
        } else {
            break;
        }
    }
    Ok(ComplexSelector { parts })
}

fn compound(cursor: &mut Cursor) -> ParseResult<Compound> {
    let start = cursor.pos;
    let mut compound = Compound::default();

    if cursor.eat('*') {
        compound.tag = None;
    } else if cursor.peek().is_some_and(|c| c.is_alphabetic()) {
        compound.tag = Some(cursor.ident()?.to_ascii_lowercase());
    }

    loop {
        match cursor.peek() {
            Some('#') => {
                cursor.bump();
                compound.filters.push(Filter::Id(cursor.ident()?));
            }
            Some('.') => {
                cursor.bump();
                compound.filters.push(Filter::Class(cursor.ident()?));
            }
            Some('[') => {
                cursor.bump();
                compound.filters.push(attribute_filter(cursor)?);
            }
            Some(':') => {
                cursor.bump();
                compound.filters.push(pseudo_filter(cursor)?);
            }
            _ => break,
        }
    }

    if cursor.pos == start {
        return Err(format!("expected selector at offset {}", start));
    }
    Ok(compound)
}

fn attribute_filter(cursor: &mut Cursor) -> ParseResult<Filter> {
    cursor.skip_ws();
    let name = cursor.ident()?.to_ascii_lowercase();
    cursor.skip_ws();
    if cursor.eat(']') {
        return Ok(Filter::Attr { name, op: AttrOp::Exists, value: String::new() });
    }
    let op = if cursor.eat('=') {
        AttrOp::Equals
    } else if cursor.eat_str("*=") {
        AttrOp::Contains
    } else if cursor.eat_str("^=") {
        AttrOp::Prefix
    } else if cursor.eat_str("$=") {
        AttrOp::Suffix
    } else if cursor.eat_str("~=") {
        AttrOp::Word
    } else {
        return Err(format!("unsupported attribute operator at offset {}", cursor.pos));
    };
    cursor.skip_ws();
    let value = if matches!(cursor.peek(), Some('"' | '\'')) { cursor.quoted()? } else { cursor.ident()? };
    cursor.skip_ws();
    cursor.expect(']')?;
    Ok(Filter::Attr { name, op, value })
}

fn parenthesised_number(cursor: &mut Cursor) -> ParseResult<usize> {
    cursor.expect('(')?;
    cursor.skip_ws();
    let n = cursor.number()?;
    cursor.skip_ws();
    cursor.expect(')')?;
    if n == 0 {
        return Err("positions are 1-based".to_string());
    }
    Ok(n)
}

fn pseudo_filter(cursor: &mut Cursor) -> ParseResult<Filter> {
    let name = cursor.ident()?.to_ascii_lowercase();
    let filter = match name.as_str() {
        "first-of-type" => Filter::FirstOfType,
        "last-of-type" => Filter::LastOfType,
        "first-child" => Filter::FirstChild,
        "last-child" => Filter::LastChild,
        "checked" => Filter::Checked,
        "visible" => Filter::Visible,
        "nth-child" => Filter::NthChild(parenthesised_number(cursor)?),
        "nth-of-type" => Filter::NthOfType(parenthesised_number(cursor)?),
        "has-text" => {
            cursor.expect('(')?;
            cursor.skip_ws();
            let text = cursor.quoted()?;
            cursor.skip_ws();
            cursor.expect(')')?;
            Filter::HasText(text)
        }
        "not" => {
            cursor.expect('(')?;
            let mut inner = Vec::new();
            loop {
                cursor.skip_ws();
                inner.push(compound(cursor)?);
                cursor.skip_ws();
                if !cursor.eat(',') {
                    break;
                }
            }
            cursor.expect(')')?;
            Filter::Not(inner)
        }
        other => return Err(format!("unsupported pseudo-class :{}", other)),
    };
    Ok(filter)
}

fn parse_xpath(input: &str) -> ParseResult<XPath> {
    let mut cursor = Cursor::new(input.trim());
    let xpath = if cursor.eat('(') {
        let steps = xpath_steps(&mut cursor)?;
        cursor.expect(')')?;
        let index = if cursor.eat('[') {
            let n = cursor.number()?;
            cursor.expect(']')?;
            if n == 0 {
                return Err("positions are 1-based".to_string());
            }
            Some(n)
        } else {
            None
        };
        XPath { steps, index }
    } else {
        XPath { steps: xpath_steps(&mut cursor)?, index: None }
    };
    if !cursor.at_end() {
        return Err(format!("unexpected input at offset {}", cursor.pos));
    }
    Ok(xpath)
}

fn xpath_steps(cursor: &mut Cursor) -> ParseResult<Vec<Step>> {
    let mut steps = Vec::new();
    loop {
        let descendant = if cursor.eat_str("//") {
            true
        } else if cursor.eat('/') {
            false
        } else {
            break;
        };
        let name = if cursor.eat('*') { None } else { Some(cursor.ident()?.to_ascii_lowercase()) };
        let mut predicates = Vec::new();
        while cursor.eat('[') {
            cursor.skip_ws();
            predicates.push(xpath_predicate(cursor)?);
            cursor.skip_ws();
            cursor.expect(']')?;
        }
        steps.push(Step { descendant, name, predicates });
    }
    if steps.is_empty() {
        return Err("expected '/' or '//'".to_string());
    }
    Ok(steps)
}

fn xpath_predicate(cursor: &mut Cursor) -> ParseResult<Predicate> {
    if cursor.peek().is_some_and(|c| c.is_ascii_digit()) {
        let n = cursor.number()?;
        if n == 0 {
            return Err("positions are 1-based".to_string());
        }
        return Ok(Predicate::Position(n));
    }
    if cursor.eat('@') {
        let name = cursor.ident()?.to_ascii_lowercase();
        cursor.skip_ws();
        if cursor.eat('=') {
            cursor.skip_ws();
            return Ok(Predicate::AttrEquals(name, cursor.quoted()?));
        }
        return Ok(Predicate::HasAttr(name));
    }
    if cursor.eat_str("text()") {
        cursor.skip_ws();
        cursor.expect('=')?;
        cursor.skip_ws();
        return Ok(Predicate::TextEquals(cursor.quoted()?));
    }
    if cursor.eat_str("contains(") {
        cursor.skip_ws();
        let attribute = if cursor.eat('@') {
            Some(cursor.ident()?.to_ascii_lowercase())
        } else if cursor.eat_str("text()") {
            None
        } else {
            return Err("contains() takes @attr or text()".to_string());
        };
        cursor.skip_ws();
        cursor.expect(',')?;
        cursor.skip_ws();
        let needle = cursor.quoted()?;
        cursor.skip_ws();
        cursor.expect(')')?;
        return Ok(match attribute {
            Some(name) => Predicate::AttrContains(name, needle),
            None => Predicate::TextContains(needle),
        });
    }
    Err(format!("unsupported predicate at offset {}", cursor.pos))
}
