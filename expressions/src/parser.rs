use std::fmt;

use log::{debug, trace};

use crate::expr::{self, Node};
use crate::lexer::{self, LocatedToken, Position, Tokenizer};
use crate::token::{OperatorSymbol, Tier, Token};

type Result<A> = std::result::Result<A, Error>;

// Note that this is not a closure type. It's simply a function pointer.
type Rule<A> = fn(&mut State) -> Result<A>;

/// How many parentheses may be open at once. Each level costs several
/// grammar frames on the call stack.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(lexer::Error),
    UnmatchedParentheses { open: usize, close: usize },
    UnbalancedParenthesis { open: Position, found: Token, position: Position },
    NotANumber { found: Token, position: Position },
    TrailingInput { found: Token, position: Position },
    NestingTooDeep { limit: usize, position: Position },
}

impl Error {
    pub fn position(&self) -> Option<Position> {
        use Error::*;
        match self {
            Lex(e) => e.position(),
            UnmatchedParentheses { .. } => None,
            UnbalancedParenthesis { position, .. }
            | NotANumber { position, .. }
            | TrailingInput { position, .. }
            | NestingTooDeep { position, .. } => Some(*position),
        }
    }
}

impl From<lexer::Error> for Error {
    fn from(e: lexer::Error) -> Self {
        Error::Lex(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            Lex(e) => write!(f, "{}", e),
            UnmatchedParentheses { open, close } => write!(
                f,
                "unmatched parentheses: {} opening but {} closing",
                open, close
            ),
            UnbalancedParenthesis {
                open,
                found,
                position,
            } => write!(
                f,
                "unbalanced parenthesis: `(` at {} expects `)`, found {} at {}",
                open, found, position
            ),
            NotANumber { found, position } => {
                write!(f, "expected a number or `(`, found {} at {}", found, position)
            }
            TrailingInput { found, position } => {
                write!(f, "trailing input: {} at {}", found, position)
            }
            NestingTooDeep { limit, position } => write!(
                f,
                "parentheses nested more than {} deep at {}",
                limit, position
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Lex(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct State<'a> {
    tokenizer: Tokenizer<'a>,
    depth: usize,
}

impl<'state> State<'state> {
    pub fn new<'a: 'state>(str: &'a str) -> Result<Self> {
        Ok(Self {
            tokenizer: Tokenizer::new(str)?,
            depth: 0,
        })
    }

    fn peek(&self) -> &LocatedToken<'state> {
        self.tokenizer.peek()
    }

    // Consumes the next token when it is an operator of the given tier.
    fn operator(&mut self, tier: Tier) -> Option<OperatorSymbol> {
        match self.peek().token {
            Token::Operator(op) if op.tier() == tier => {
                self.tokenizer.advance();
                Some(op)
            }
            _ => None,
        }
    }
}

/// Folds one precedence tier over the values the grammar produces: plain
/// numbers when evaluating directly, trees when building a `Node`.
pub trait Fold: Sized {
    fn literal(x: i64) -> Self;
    fn combine(left: Self, op: OperatorSymbol, right: Self) -> Self;
}

/// Literals are `i64` but values are `f64`: integers beyond 2^53 in
/// magnitude round to the nearest representable float, so
/// `9007199254740993` evaluates to `9007199254740992`.
impl Fold for f64 {
    fn literal(x: i64) -> Self {
        x as f64
    }

    fn combine(left: Self, op: OperatorSymbol, right: Self) -> Self {
        let result = op.apply(left, right);
        trace!("{} {} {} = {}", left, op, right, result);
        result
    }
}

impl Fold for Node {
    fn literal(x: i64) -> Self {
        expr::val(x as f64)
    }

    fn combine(left: Self, op: OperatorSymbol, right: Self) -> Self {
        expr::binary(op, left, right)
    }
}

// ===Grammar===
// left associative fold
//   p op p op ... op p
fn left_fold_sequence<A: Fold>(state: &mut State, p: Rule<A>, tier: Tier) -> Result<A> {
    let mut root_a = p(state)?;
    while let Some(op) = state.operator(tier) {
        let a = p(state)?;
        root_a = A::combine(root_a, op, a);
    }
    Ok(root_a)
}

// Counts `(` and `)` over the whole input, then parses an expression and
// checks that we have eof.
fn start<A: Fold>(state: &mut State) -> Result<A> {
    let open = state.tokenizer.count(|t| *t == Token::OpenParen);
    let close = state.tokenizer.count(|t| *t == Token::CloseParen);
    if open != close {
        return Err(Error::UnmatchedParentheses { open, close });
    }

    let root = expression(state)?;
    let LocatedToken {
        token, position, ..
    } = *state.peek();
    if !token.is_end() {
        return Err(Error::TrailingInput {
            found: token,
            position,
        });
    }
    Ok(root)
}

// expression := factor (("+" | "-") factor)*
fn expression<A: Fold>(state: &mut State) -> Result<A> {
    left_fold_sequence(state, factor, Tier::Additive)
}

// factor := number (("x" | "÷") number)*
fn factor<A: Fold>(state: &mut State) -> Result<A> {
    left_fold_sequence(state, number, Tier::Multiplicative)
}

// number := INTEGER | "(" expression ")"
fn number<A: Fold>(state: &mut State) -> Result<A> {
    let LocatedToken {
        token, position, ..
    } = *state.peek();
    match token {
        Token::Int(x) => {
            state.tokenizer.advance();
            Ok(A::literal(x))
        }
        Token::OpenParen => {
            if state.depth == MAX_NESTING {
                return Err(Error::NestingTooDeep {
                    limit: MAX_NESTING,
                    position,
                });
            }
            state.tokenizer.advance();
            state.depth += 1;
            let a = expression(state)?;
            state.depth -= 1;
            let close = *state.peek();
            match close.token {
                Token::CloseParen => {
                    state.tokenizer.advance();
                    Ok(a)
                }
                found => Err(Error::UnbalancedParenthesis {
                    open: position,
                    found,
                    position: close.position,
                }),
            }
        }
        found => Err(Error::NotANumber { found, position }),
    }
}

// ===Parser===
/// Evaluates expressions and remembers the text of the last successful one.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    source: String,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// The exact text of the last expression parsed successfully.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parse(&mut self, str: &str) -> Result<f64> {
        self.run(str)
    }

    /// Same grammar as `parse`, but keeps the tree instead of its value.
    pub fn parse_tree(&mut self, str: &str) -> Result<Node> {
        self.run(str)
    }

    fn run<A: Fold>(&mut self, str: &str) -> Result<A> {
        let mut state = State::new(str)?;
        match start(&mut state) {
            Ok(a) => {
                debug!("parsed {:?}", str);
                self.source = str.to_string();
                Ok(a)
            }
            Err(e) => {
                debug!("failed to parse {:?}: {}", str, e);
                Err(e)
            }
        }
    }
}

impl fmt::Display for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

pub fn parse(str: &str) -> Result<f64> {
    Parser::new().parse(str)
}

pub fn parse_tree(str: &str) -> Result<Node> {
    Parser::new().parse_tree(str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{div, mul, sub, sum, val};

    #[test]
    fn left_associative() {
        assert_eq!(parse("3 x 10 ÷ 5"), Ok(6.0));
        assert_eq!(parse("10 - 4 - 3"), Ok(3.0));
        assert_eq!(parse("64 ÷ 4 ÷ 2"), Ok(8.0));
    }

    #[test]
    fn precedence() {
        assert_eq!(parse("1 + 2 x 3"), Ok(7.0));
        assert_eq!(parse("2 x 3 + 1"), Ok(7.0));
        assert_eq!(parse("8 - 6 ÷ 2"), Ok(5.0));
    }

    #[test]
    fn grouping() {
        assert_eq!(parse("(1 + 2) x 3"), Ok(9.0));
        assert_eq!(parse("((((3))))"), Ok(3.0));
    }

    #[test]
    fn whitespace() {
        assert_eq!(parse("1+2"), Ok(3.0));
        assert_eq!(parse("1 + 2"), Ok(3.0));
        assert_eq!(parse("  1   +   2  "), Ok(3.0));
    }

    #[test]
    fn change_calculator() {
        let s = "((7 + ((3 - 2) x 5)) ÷ 6)";
        let mut parser = Parser::new();
        assert_eq!(parser.parse(s), Ok(2.0));
        assert_eq!(parser.source(), s);
        assert_eq!(parser.to_string(), s);
    }

    #[test]
    fn source_is_verbatim() {
        let s = "  1+2   x 3 ";
        let mut parser = Parser::new();
        parser.parse(s).unwrap();
        assert_eq!(parser.source(), s);
    }

    #[test]
    fn failed_parse_keeps_previous_source() {
        let mut parser = Parser::new();
        parser.parse("1 + 1").unwrap();
        assert!(parser.parse("1 +").is_err());
        assert_eq!(parser.source(), "1 + 1");
    }

    #[test]
    fn unmatched_parentheses() {
        assert_eq!(
            parse("((7 + ((3 - 2) x 5)) ÷ 6"),
            Err(Error::UnmatchedParentheses { open: 4, close: 3 })
        );
        // Counted before descent: the trailing `)` would otherwise be trailing input.
        assert_eq!(
            parse("1 + 2)"),
            Err(Error::UnmatchedParentheses { open: 0, close: 1 })
        );
    }

    #[test]
    fn close_before_open() {
        // Counts match, so the failure comes from the grammar.
        assert!(matches!(
            parse(")("),
            Err(Error::NotANumber {
                found: Token::CloseParen,
                ..
            })
        ));
        assert!(matches!(
            parse("(1 + 2))("),
            Err(Error::TrailingInput {
                found: Token::CloseParen,
                ..
            })
        ));
    }

    #[test]
    fn unbalanced_parenthesis() {
        let err = parse("(1 2)").unwrap_err();
        assert!(matches!(
            err,
            Error::UnbalancedParenthesis {
                found: Token::Int(2),
                ..
            }
        ));
        assert_eq!(err.position().map(|p| p.offset), Some(3));
    }

    #[test]
    fn not_a_number() {
        assert!(matches!(
            parse("1 + x 2"),
            Err(Error::NotANumber {
                found: Token::Operator(OperatorSymbol::Mul),
                ..
            })
        ));
        assert!(matches!(
            parse(""),
            Err(Error::NotANumber {
                found: Token::End,
                ..
            })
        ));
        assert!(matches!(
            parse("2 x"),
            Err(Error::NotANumber {
                found: Token::End,
                ..
            })
        ));
    }

    #[test]
    fn trailing_input() {
        assert!(matches!(
            parse("1 2"),
            Err(Error::TrailingInput {
                found: Token::Int(2),
                ..
            })
        ));
        assert!(matches!(
            parse("(1)(2)"),
            Err(Error::TrailingInput {
                found: Token::OpenParen,
                ..
            })
        ));
    }

    #[test]
    fn nesting_limit() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&nested(MAX_NESTING)), Ok(1.0));
        assert_eq!(parse_tree(&nested(MAX_NESTING)).unwrap().result(), 1.0);

        let err = parse(&nested(MAX_NESTING + 1)).unwrap_err();
        assert!(matches!(err, Error::NestingTooDeep { limit: MAX_NESTING, .. }));
        assert_eq!(err.position().map(|p| p.offset), Some(MAX_NESTING));

        // Far past the limit still fails cleanly instead of exhausting the stack.
        assert!(matches!(
            parse(&nested(100_000)),
            Err(Error::NestingTooDeep { .. })
        ));
        assert!(matches!(
            parse_tree(&nested(100_000)),
            Err(Error::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn sibling_groups_do_not_add_up() {
        let group = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        let s = vec![group; 4].join(" + ");
        assert_eq!(parse(&s), Ok(4.0));
    }

    #[test]
    fn long_chain_tree() {
        let s = vec!["1"; 20_000].join(" + ");
        assert_eq!(parse(&s), Ok(20_000.0));
        let tree = parse_tree(&s).unwrap();
        assert_eq!(tree.result(), 20_000.0);
        assert_eq!(tree.to_string().matches('(').count(), 19_999);
    }

    #[test]
    fn large_literals_round() {
        assert_eq!(parse("9007199254740992"), Ok(9007199254740992.0));
        assert_eq!(parse("9007199254740993"), Ok(9007199254740992.0));
    }

    #[test]
    fn lex_errors_propagate() {
        assert!(matches!(
            parse("1 * 2"),
            Err(Error::Lex(lexer::Error::UnexpectedChar { found: '*', .. }))
        ));
    }

    #[test]
    fn division_is_native() {
        assert_eq!(parse("7 ÷ 2"), Ok(3.5));
        assert!(parse("1 ÷ 0").unwrap().is_infinite());
        assert!(parse("0 ÷ 0").unwrap().is_nan());
    }

    #[test]
    fn idempotent() {
        let s = "2 x (3 + 4) - 10 ÷ 5";
        let first = parse(s).unwrap();
        for _ in 0..5 {
            assert_eq!(parse(s), Ok(first));
        }

        let mut parser = Parser::new();
        assert_eq!(parser.parse(s), Ok(12.0));
        assert_eq!(parser.parse(s), Ok(12.0));
    }

    #[test]
    fn tree0() {
        let tree = parse_tree("((7 + ((3 - 2) x 5)) ÷ 6)").unwrap();
        assert_eq!(
            tree,
            div(sum(val(7), mul(sub(val(3), val(2)), val(5))), val(6))
        );
        assert_eq!(tree.result(), 2.0);
    }

    #[test]
    fn tree_shape() {
        assert_eq!(parse_tree("1 + 2 x 3").unwrap().to_string(), "(1 + (2 x 3))");
        assert_eq!(parse_tree("3 x 10 ÷ 5").unwrap().to_string(), "((3 x 10) ÷ 5)");
        assert_eq!(parse_tree("42").unwrap().to_string(), "42");
    }

    #[test]
    fn tree_agrees_with_parse() {
        for s in ["1 + 2 x 3", "(1 + 2) x 3", "100 ÷ 8 - 3 x 2", "9 - (4 - (2 - 1))"] {
            assert_eq!(parse_tree(s).unwrap().result(), parse(s).unwrap());
        }
    }
}
