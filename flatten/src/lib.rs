/// An arbitrarily nested sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Item(T),
    List(Vec<Nested<T>>),
}

pub use Nested::{Item, List};

impl<T> Nested<T> {
    pub fn into_flat(self) -> Vec<T> {
        let mut out = vec![];
        self.drain_into(&mut out);
        out
    }

    fn drain_into(self, out: &mut Vec<T>) {
        match self {
            Item(x) => out.push(x),
            List(xs) => {
                for x in xs {
                    x.drain_into(out);
                }
            }
        }
    }
}

impl<T: Clone> Nested<T> {
    fn collect_into(&self, out: &mut Vec<T>) {
        match self {
            Item(x) => out.push(x.clone()),
            List(xs) => {
                for x in xs {
                    x.collect_into(out);
                }
            }
        }
    }
}

impl<T> From<T> for Nested<T> {
    fn from(x: T) -> Self {
        Item(x)
    }
}

/// The items of `xs` in left-to-right, depth-first order. Every call builds
/// its own output.
pub fn flatten<T: Clone>(xs: &[Nested<T>]) -> Vec<T> {
    let mut out = vec![];
    for x in xs {
        x.collect_into(&mut out);
    }
    out
}
