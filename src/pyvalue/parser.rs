//! Recursive-descent parser over the tokenizer, producing a [`PyValue`]
//! tree. Grounded on the original `pyparser`: every production captures
//! a restore point up front and rewinds on failure, so a failed
//! alternative never consumes input.

use super::token::{Mark, Token, TokenKind, Tokenizer};

/// A parsed Python literal. Corresponds to the grammar's `value`
/// production plus the container forms, folded into one tagged variant
/// per the "parse-result tree" design note: numbers, strings, and
/// booleans are leaves; everything else carries a `Vec` of children of
/// the same type.
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<PyValue>),
    List(Vec<PyValue>),
    Set(Vec<PyValue>),
    /// Order is preserved as parsed; numpy headers only ever use string
    /// keys but the grammar (and the original) allow number/tuple keys
    /// too, so no key-type restriction is imposed here.
    Dict(Vec<(PyValue, PyValue)>),
}

impl PyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[PyValue]> {
        match self {
            PyValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PyValue]> {
        match self {
            PyValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(PyValue, PyValue)]> {
        match self {
            PyValue::Dict(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string key in a `Dict` value. `None` if this isn't a
    /// dict or the key is absent.
    pub fn get(&self, key: &str) -> Option<&PyValue> {
        self.as_dict()?.iter().find(|(k, _)| k.as_str() == Some(key)).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken,
    UnexpectedEof,
    /// The top-level input did not consist of dict/list/tuple/set forms.
    NotAContainer,
    TrailingInput,
}

pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Parser { tokenizer: Tokenizer::new(data) }
    }

    /// Parses a single top-level expression (tuple, list, set, or dict)
    /// and requires that no non-whitespace input remains other than
    /// what the tokenizer already treats as trivia.
    pub fn parse(mut self) -> Result<PyValue, ParseError> {
        let value = self.parse_expression()?;
        if !self.tokenizer.eof() {
            return Err(ParseError::TrailingInput);
        }
        Ok(value)
    }

    fn mark(&self) -> Mark {
        self.tokenizer.mark()
    }

    fn restore(&mut self, mark: Mark) {
        self.tokenizer.restore(mark);
    }

    fn next(&mut self) -> Option<Token> {
        self.tokenizer.next()
    }

    /// `expression := tuple | list | set | dict`. Tries each alternative
    /// in turn; a dict is only matched if every element parses as a
    /// key-value pair, which is how set/dict get disambiguated
    /// structurally rather than by lookahead.
    fn parse_expression(&mut self) -> Result<PyValue, ParseError> {
        let m = self.mark();
        if let Ok(v) = self.parse_dict() {
            return Ok(v);
        }
        self.restore(m);
        if let Ok(v) = self.parse_tuple() {
            return Ok(v);
        }
        self.restore(m);
        if let Ok(v) = self.parse_list() {
            return Ok(v);
        }
        self.restore(m);
        if let Ok(v) = self.parse_set() {
            return Ok(v);
        }
        self.restore(m);
        Err(ParseError::NotAContainer)
    }

    fn parse_value(&mut self) -> Result<PyValue, ParseError> {
        let m = self.mark();
        match self.next() {
            Some(Token { kind: TokenKind::NoneLiteral, .. }) => return Ok(PyValue::None),
            Some(Token { kind: TokenKind::BoolLiteral(b), .. }) => return Ok(PyValue::Bool(b)),
            Some(Token { kind: TokenKind::IntegerLiteral(i), .. }) => return Ok(PyValue::Int(i)),
            Some(Token { kind: TokenKind::FloatLiteral(f), .. }) => return Ok(PyValue::Float(f)),
            Some(Token { kind: TokenKind::StringLiteral(s), .. }) => return Ok(PyValue::Str(s)),
            _ => {}
        }
        self.restore(m);
        self.parse_expression()
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        match self.next() {
            Some(tok) if &tok.kind == kind => Ok(()),
            Some(_) => Err(ParseError::UnexpectedToken),
            None => Err(ParseError::UnexpectedEof),
        }
    }

    fn peek_is(&mut self, kind: &TokenKind) -> bool {
        let m = self.mark();
        let matched = matches!(self.next(), Some(tok) if &tok.kind == kind);
        self.restore(m);
        matched
    }

    /// Parses a comma-separated, optionally-trailing-comma sequence of
    /// `parse_item` between the given open/close punctuation.
    fn parse_seq<T>(
        &mut self,
        open: TokenKind,
        close: TokenKind,
        mut parse_item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let m = self.mark();
        if self.expect(&open).is_err() {
            self.restore(m);
            return Err(ParseError::UnexpectedToken);
        }
        let mut items = Vec::new();
        if self.peek_is(&close) {
            self.next();
            return Ok(items);
        }
        loop {
            match parse_item(self) {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.restore(m);
                    return Err(e);
                }
            }
            if self.peek_is(&TokenKind::Comma) {
                self.next();
                if self.peek_is(&close) {
                    self.next();
                    return Ok(items);
                }
                continue;
            }
            if self.expect(&close).is_ok() {
                return Ok(items);
            }
            self.restore(m);
            return Err(ParseError::UnexpectedToken);
        }
    }

    fn parse_tuple(&mut self) -> Result<PyValue, ParseError> {
        let items = self.parse_seq(TokenKind::LeftParen, TokenKind::RightParen, Self::parse_value)?;
        Ok(PyValue::Tuple(items))
    }

    fn parse_list(&mut self) -> Result<PyValue, ParseError> {
        let items = self.parse_seq(TokenKind::LeftBracket, TokenKind::RightBracket, Self::parse_value)?;
        Ok(PyValue::List(items))
    }

    fn parse_set(&mut self) -> Result<PyValue, ParseError> {
        let items = self.parse_seq(TokenKind::LeftBrace, TokenKind::RightBrace, Self::parse_value)?;
        Ok(PyValue::Set(items))
    }

    fn parse_dict(&mut self) -> Result<PyValue, ParseError> {
        let items = self.parse_seq(TokenKind::LeftBrace, TokenKind::RightBrace, Self::parse_kv)?;
        Ok(PyValue::Dict(items))
    }

    /// `kv := (string | number | tuple) ':' value`
    fn parse_kv(&mut self) -> Result<(PyValue, PyValue), ParseError> {
        let m = self.mark();
        let key = match self.parse_key() {
            Ok(k) => k,
            Err(e) => {
                self.restore(m);
                return Err(e);
            }
        };
        if self.expect(&TokenKind::Colon).is_err() {
            self.restore(m);
            return Err(ParseError::UnexpectedToken);
        }
        let value = match self.parse_value() {
            Ok(v) => v,
            Err(e) => {
                self.restore(m);
                return Err(e);
            }
        };
        Ok((key, value))
    }

    fn parse_key(&mut self) -> Result<PyValue, ParseError> {
        let m = self.mark();
        match self.next() {
            Some(Token { kind: TokenKind::StringLiteral(s), .. }) => return Ok(PyValue::Str(s)),
            Some(Token { kind: TokenKind::IntegerLiteral(i), .. }) => return Ok(PyValue::Int(i)),
            Some(Token { kind: TokenKind::FloatLiteral(f), .. }) => return Ok(PyValue::Float(f)),
            _ => {}
        }
        self.restore(m);
        self.parse_tuple()
    }
}

/// Parses a standalone value (not necessarily a container) — used for
/// nested `descr` entries inside a dict, which may themselves be a bare
/// string rather than one of the four container forms.
pub fn parse_value(data: &[u8]) -> Result<PyValue, ParseError> {
    let mut parser = Parser::new(data);
    let value = parser.parse_value()?;
    if !parser.tokenizer.eof() {
        return Err(ParseError::TrailingInput);
    }
    Ok(value)
}

pub fn parse(data: &[u8]) -> Result<PyValue, ParseError> {
    Parser::new(data).parse()
}
