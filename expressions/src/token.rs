use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Int(i64),
    OpenParen,
    CloseParen,
    Operator(OperatorSymbol),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSymbol {
    Add,
    Sub,
    Mul,
    Div,
}

// `expression` folds over additive operators, `factor` over multiplicative ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Additive,
    Multiplicative,
}

/// The decoded value of a token: integer literals carry their number,
/// operators and parentheses their glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValue {
    Integer(i64),
    Symbol(char),
}

impl OperatorSymbol {
    pub const ADD: char = '+';
    pub const SUB: char = '-';
    pub const MUL: char = 'x';
    pub const DIV: char = '÷';

    pub const ALL: [OperatorSymbol; 4] = [
        OperatorSymbol::Add,
        OperatorSymbol::Sub,
        OperatorSymbol::Mul,
        OperatorSymbol::Div,
    ];

    pub fn glyph(&self) -> char {
        use OperatorSymbol::*;
        match self {
            Add => Self::ADD,
            Sub => Self::SUB,
            Mul => Self::MUL,
            Div => Self::DIV,
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.glyph() == c)
    }

    pub fn tier(&self) -> Tier {
        use OperatorSymbol::*;
        match self {
            Add | Sub => Tier::Additive,
            Mul | Div => Tier::Multiplicative,
        }
    }

    // Native f64 arithmetic; dividing by zero yields an infinity or NaN.
    pub fn apply(&self, left: f64, right: f64) -> f64 {
        use OperatorSymbol::*;
        match self {
            Add => left + right,
            Sub => left - right,
            Mul => left * right,
            Div => left / right,
        }
    }
}

impl fmt::Display for OperatorSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

impl Token {
    pub const OPEN_PAREN: char = '(';
    pub const CLOSE_PAREN: char = ')';

    /// `None` only for the synthetic `End` token.
    pub fn value(&self) -> Option<TokenValue> {
        use Token::*;
        match self {
            Int(x) => Some(TokenValue::Integer(*x)),
            OpenParen => Some(TokenValue::Symbol(Self::OPEN_PAREN)),
            CloseParen => Some(TokenValue::Symbol(Self::CLOSE_PAREN)),
            Operator(op) => Some(TokenValue::Symbol(op.glyph())),
            End => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Token::End)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;
        match self {
            Int(x) => write!(f, "{}", x),
            OpenParen => write!(f, "{}", Self::OPEN_PAREN),
            CloseParen => write!(f, "{}", Self::CLOSE_PAREN),
            Operator(op) => write!(f, "{}", op),
            End => write!(f, "end of input"),
        }
    }
}
