use std::fmt;

use log::debug;

use crate::token::{OperatorSymbol, Token};

type Result<A> = std::result::Result<A, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub column: usize,
    pub line: usize,
}

impl Position {
    pub fn start() -> Self {
        Self {
            offset: 0,
            column: 1,
            line: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedToken<'a> {
    pub token: Token,
    pub position: Position,
    // The matched substring; empty for `Token::End`.
    pub raw: &'a str,
}

impl<'a> LocatedToken<'a> {
    pub fn new(token: Token, position: Position, raw: &'a str) -> Self {
        Self {
            token,
            position,
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnexpectedChar { found: char, position: Position },
    IntLiteralTooBig { position: Position },
    NothingToPushBack,
}

impl Error {
    pub fn position(&self) -> Option<Position> {
        use Error::*;
        match self {
            UnexpectedChar { position, .. } | IntLiteralTooBig { position } => Some(*position),
            NothingToPushBack => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            UnexpectedChar { found, position } => {
                write!(f, "unrecognized character {:?} at {}", found, position)
            }
            IntLiteralTooBig { position } => {
                write!(f, "integer literal at {} does not fit in 64 bits", position)
            }
            NothingToPushBack => write!(f, "pushback without a preceding read"),
        }
    }
}

impl std::error::Error for Error {}

// ===Scanner===
#[derive(Debug)]
struct State<'a> {
    source: &'a str,
    rest: &'a str,
    position: Position,
}

impl<'state> State<'state> {
    // 'a lives atleast as long as 'state ('a contains 'state)
    fn new<'a: 'state>(str: &'a str) -> Self {
        Self {
            source: str,
            rest: str,
            position: Position::start(),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.rest.is_empty()
    }

    fn consume_char(&mut self, c: char) {
        if c == '\n' {
            self.position.column = 1;
            self.position.line += 1;
        } else {
            self.position.column += 1;
        }
        self.position.offset += c.len_utf8();
        self.rest = &self.rest[c.len_utf8()..];
    }

    fn consume_whitespace(&mut self) {
        while let Some(c) = self.rest.chars().next() {
            if !c.is_whitespace() {
                return;
            }
            self.consume_char(c);
        }
    }

    fn raw_since(&self, start: Position) -> &'state str {
        let source = self.source;
        &source[start.offset..self.position.offset]
    }

    // Rules are tried in a fixed order: digits, operators, `(`, `)`.
    fn scan_token(&mut self) -> Result<LocatedToken<'state>> {
        let start = self.position;
        let Some(c) = self.rest.chars().next() else {
            return Ok(LocatedToken::new(Token::End, start, ""));
        };

        if c.is_ascii_digit() {
            return self.int(start);
        }

        let token = if let Some(op) = OperatorSymbol::from_glyph(c) {
            Token::Operator(op)
        } else if c == Token::OPEN_PAREN {
            Token::OpenParen
        } else if c == Token::CLOSE_PAREN {
            Token::CloseParen
        } else {
            return Err(Error::UnexpectedChar {
                found: c,
                position: start,
            });
        };
        self.consume_char(c);
        Ok(LocatedToken::new(token, start, self.raw_since(start)))
    }

    fn int(&mut self, start: Position) -> Result<LocatedToken<'state>> {
        let mut sum: i64 = 0;
        while let Some(c) = self.rest.chars().next() {
            let Some(d) = c.to_digit(10) else {
                break;
            };
            self.consume_char(c);

            // Watch out for 64 bit overflow.
            sum = sum
                .checked_mul(10)
                .and_then(|s| s.checked_add(d as i64))
                .ok_or(Error::IntLiteralTooBig { position: start })?;
        }
        Ok(LocatedToken::new(
            Token::Int(sum),
            start,
            self.raw_since(start),
        ))
    }
}

/// Scans the whole source into tokens. The result always ends with exactly
/// one `Token::End`.
pub fn tokenize(str: &str) -> Result<Vec<LocatedToken<'_>>> {
    let mut state = State::new(str);
    let mut tokens = vec![];

    loop {
        state.consume_whitespace();
        if state.is_exhausted() {
            tokens.push(LocatedToken::new(Token::End, state.position, ""));
            break;
        }
        tokens.push(state.scan_token()?);
    }

    debug!("scanned {} tokens from {:?}", tokens.len(), str);
    Ok(tokens)
}

// ===Tokenizer===
/// A fixed token sequence with a read cursor.
///
/// The grammar reads through `peek`/`advance`. `next`/`pushback` give the
/// older read-then-unread protocol: at most one token can be pushed back
/// between two reads.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    tokens: Vec<LocatedToken<'a>>,
    cursor: usize,
    last_read: Option<usize>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(str: &'a str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(str)?,
            cursor: 0,
            last_read: None,
        })
    }

    #[inline]
    pub fn tokens(&self) -> &[LocatedToken<'a>] {
        &self.tokens
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn count(&self, predicate: impl Fn(&Token) -> bool) -> usize {
        self.tokens.iter().filter(|t| predicate(&t.token)).count()
    }

    pub fn peek(&self) -> &LocatedToken<'a> {
        // `tokenize` guarantees a trailing `End`, and the cursor never moves past it.
        &self.tokens[self.cursor]
    }

    fn step(&mut self) {
        if !self.peek().token.is_end() {
            self.cursor += 1;
        }
    }

    // Commits to the peeked token. Anything read before it can no longer be pushed back.
    pub fn advance(&mut self) {
        self.last_read = None;
        self.step();
    }

    pub fn next(&mut self) -> &LocatedToken<'a> {
        let index = self.cursor;
        self.step();
        self.last_read = Some(index);
        &self.tokens[index]
    }

    pub fn pushback(&mut self) -> Result<()> {
        let index = self.last_read.take().ok_or(Error::NothingToPushBack)?;
        self.cursor = index;
        Ok(())
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().token.is_end()
    }
}
