use std::fmt;
use std::mem;

use crate::token::OperatorSymbol;

/// An arithmetic tree. Leaves hold a literal, internal nodes an operator and
/// exactly two owned children.
///
/// Walking, comparing and dropping use explicit work stacks, so a tree as
/// deep as a long `1 + 1 + ... + 1` chain never exhausts the call stack.
#[derive(Debug)]
pub enum Node {
    Val(f64),
    Binary(OperatorSymbol, Box<Node>, Box<Node>),
}

// ===Combinators===
pub fn val(x: impl Into<f64>) -> Node {
    Node::Val(x.into())
}

pub fn binary(op: OperatorSymbol, left: Node, right: Node) -> Node {
    Node::Binary(op, Box::new(left), Box::new(right))
}

pub fn sum(left: Node, right: Node) -> Node {
    binary(OperatorSymbol::Add, left, right)
}

pub fn sub(left: Node, right: Node) -> Node {
    binary(OperatorSymbol::Sub, left, right)
}

pub fn mul(left: Node, right: Node) -> Node {
    binary(OperatorSymbol::Mul, left, right)
}

pub fn div(left: Node, right: Node) -> Node {
    binary(OperatorSymbol::Div, left, right)
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Val(_))
    }

    /// `None` for leaves.
    pub fn operator(&self) -> Option<OperatorSymbol> {
        match self {
            Node::Val(_) => None,
            Node::Binary(op, _, _) => Some(*op),
        }
    }

    /// `None` for internal nodes.
    pub fn value(&self) -> Option<f64> {
        match self {
            Node::Val(x) => Some(*x),
            Node::Binary(..) => None,
        }
    }

    pub fn children(&self) -> Option<(&Node, &Node)> {
        match self {
            Node::Val(_) => None,
            Node::Binary(_, left, right) => Some((left, right)),
        }
    }

    pub fn result(&self) -> f64 {
        enum Step<'a> {
            Visit(&'a Node),
            Apply(OperatorSymbol),
        }

        let mut work = vec![Step::Visit(self)];
        let mut values: Vec<f64> = vec![];
        while let Some(step) = work.pop() {
            match step {
                Step::Visit(Node::Val(x)) => values.push(*x),
                Step::Visit(Node::Binary(op, left, right)) => {
                    work.push(Step::Apply(*op));
                    work.push(Step::Visit(right));
                    work.push(Step::Visit(left));
                }
                Step::Apply(op) => {
                    let (Some(right), Some(left)) = (values.pop(), values.pop()) else {
                        unreachable!()
                    };
                    values.push(op.apply(left, right));
                }
            }
        }
        // Exactly one value is left for the root.
        values.pop().unwrap_or(f64::NAN)
    }
}

// Every internal node is parenthesized, whatever the precedence.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Step<'a> {
            Visit(&'a Node),
            Operator(OperatorSymbol),
            Close,
        }

        let mut work = vec![Step::Visit(self)];
        while let Some(step) = work.pop() {
            match step {
                Step::Visit(Node::Val(x)) => write!(f, "{}", x)?,
                Step::Visit(Node::Binary(op, left, right)) => {
                    write!(f, "(")?;
                    work.push(Step::Close);
                    work.push(Step::Visit(right));
                    work.push(Step::Operator(*op));
                    work.push(Step::Visit(left));
                }
                Step::Operator(op) => write!(f, " {} ", op)?,
                Step::Close => write!(f, ")")?,
            }
        }
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let mut pairs = vec![(self, other)];
        while let Some(pair) = pairs.pop() {
            match pair {
                (Node::Val(x), Node::Val(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (Node::Binary(op0, l0, r0), Node::Binary(op1, l1, r1)) => {
                    if op0 != op1 {
                        return false;
                    }
                    pairs.push((&**r0, &**r1));
                    pairs.push((&**l0, &**l1));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        fn detach(node: &mut Node, out: &mut Vec<Node>) {
            if let Node::Binary(_, left, right) = node {
                out.push(mem::replace(&mut **left, Node::Val(0.0)));
                out.push(mem::replace(&mut **right, Node::Val(0.0)));
            }
        }

        let mut orphans = vec![];
        detach(self, &mut orphans);
        // Each popped node only has leaf children left when it goes out of scope.
        while let Some(mut node) = orphans.pop() {
            detach(&mut node, &mut orphans);
        }
    }
}
