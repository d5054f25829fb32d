use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;
use std::sync::Arc;

use crate::{NodeEdgeError, NodeEdgeResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operand {
    And,
    Or,
}

impl Operand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operand {
    type Err = NodeEdgeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "and" | "AND" => Ok(Self::And),
            "or" | "OR" => Ok(Self::Or),
            other => Err(NodeEdgeError::Type(format!(
                "operand must be 'and' or 'or', got '{}'",
                other
            ))),
        }
    }
}

/// Position of a node relative to its parent composition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Root,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// A leaf type that may take part in boolean compositions.
pub trait CompositableItem: Clone + fmt::Debug + Send + Sync + 'static {}

/// A leaf or a binary boolean composition of leaves.
#[derive(Clone, Debug, PartialEq)]
pub enum Compositable<T> {
    Item(T),
    Composition(Composition<T>),
}

/// Logical conjunction or disjunction of two compositables.
///
/// To compose more than two, nest it: `a & (b | c)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Composition<T> {
    left: Arc<Compositable<T>>,
    right: Arc<Compositable<T>>,
    operand: Operand,
}

impl<T: CompositableItem> Composition<T> {
    pub fn create_composition(
        left: impl Into<Compositable<T>>,
        operand: Operand,
        right: impl Into<Compositable<T>>,
    ) -> Self {
        Self {
            left: Arc::new(left.into()),
            right: Arc::new(right.into()),
            operand,
        }
    }

    /// Like [`Composition::create_composition`], with the operand given by name.
    pub fn create_composition_from(
        left: impl Into<Compositable<T>>,
        operand: &str,
        right: impl Into<Compositable<T>>,
    ) -> NodeEdgeResult<Self> {
        Ok(Self::create_composition(left, operand.parse()?, right))
    }

    pub fn left(&self) -> &Compositable<T> {
        &self.left
    }

    pub fn right(&self) -> &Compositable<T> {
        &self.right
    }

    pub fn operand(&self) -> Operand {
        self.operand
    }

    pub fn and_(self, other: impl Into<Compositable<T>>) -> Compositable<T> {
        Compositable::from(self).and_(other)
    }

    pub fn or_(self, other: impl Into<Compositable<T>>) -> Compositable<T> {
        Compositable::from(self).or_(other)
    }

    pub fn map_composition(&self, listener: Option<&mut dyn CompositionListener<T>>) {
        let mut noop = NoopListener;
        let listener = listener.unwrap_or(&mut noop);
        let mut stack = vec![];
        push_composition(&mut stack, listener, self, 0);
        drain(stack, listener);
    }
}

impl<T: CompositableItem> Compositable<T> {
    pub fn combine(self, operand: Operand, other: impl Into<Compositable<T>>) -> Self {
        Self::Composition(Composition::create_composition(self, operand, other))
    }

    pub fn and_(self, other: impl Into<Compositable<T>>) -> Self {
        self.combine(Operand::And, other)
    }

    pub fn or_(self, other: impl Into<Compositable<T>>) -> Self {
        self.combine(Operand::Or, other)
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            Self::Item(item) => Some(item),
            Self::Composition(_) => None,
        }
    }

    pub fn as_composition(&self) -> Option<&Composition<T>> {
        match self {
            Self::Item(_) => None,
            Self::Composition(composition) => Some(composition),
        }
    }

    pub fn is_composition(&self) -> bool {
        matches!(self, Self::Composition(_))
    }

    /// Leaves from left to right.
    pub fn items(&self) -> Vec<&T> {
        let mut items = vec![];
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Item(item) => items.push(item),
                Self::Composition(composition) => {
                    stack.push(&composition.right);
                    stack.push(&composition.left);
                }
            }
        }
        items
    }

    pub fn map_composition(&self, listener: Option<&mut dyn CompositionListener<T>>) {
        traverse(Some(self), listener)
    }
}

impl<T: CompositableItem> From<T> for Compositable<T> {
    fn from(item: T) -> Self {
        Self::Item(item)
    }
}

impl<T: CompositableItem> From<Composition<T>> for Compositable<T> {
    fn from(composition: Composition<T>) -> Self {
        Self::Composition(composition)
    }
}

impl<T: CompositableItem, R: Into<Compositable<T>>> BitAnd<R> for Compositable<T> {
    type Output = Compositable<T>;

    fn bitand(self, rhs: R) -> Self::Output {
        self.and_(rhs)
    }
}

impl<T: CompositableItem, R: Into<Compositable<T>>> BitOr<R> for Compositable<T> {
    type Output = Compositable<T>;

    fn bitor(self, rhs: R) -> Self::Output {
        self.or_(rhs)
    }
}

impl<T: CompositableItem, R: Into<Compositable<T>>> BitAnd<R> for Composition<T> {
    type Output = Compositable<T>;

    fn bitand(self, rhs: R) -> Self::Output {
        self.and_(rhs)
    }
}

impl<T: CompositableItem, R: Into<Compositable<T>>> BitOr<R> for Composition<T> {
    type Output = Compositable<T>;

    fn bitor(self, rhs: R) -> Self::Output {
        self.or_(rhs)
    }
}

/// Receives traversal events from [`traverse`].
///
/// Depth counts composition nesting: children of a composition at depth `d`
/// are at `d + 1` when they are compositions themselves, leaves stay at `d`.
pub trait CompositionListener<T> {
    /// A leaf (`item` is set) or the operator token between two children
    /// (`operand` is set, `direction` is [`Direction::Right`]).
    fn on_composite(
        &mut self,
        _item: Option<&T>,
        _operand: Option<Operand>,
        _direction: Direction,
        _depth: usize,
    ) {
    }

    fn on_begin_wrap(&mut self, _depth: usize, _composition: &Composition<T>) {}

    fn on_finish_wrap(&mut self, _depth: usize, _composition: &Composition<T>) {}
}

/// Listener used when none is supplied.
pub struct NoopListener;

impl<T> CompositionListener<T> for NoopListener {}

enum Frame<'a, T> {
    Visit {
        node: &'a Compositable<T>,
        direction: Direction,
        operand: Option<Operand>,
        depth: usize,
    },
    Finish {
        composition: &'a Composition<T>,
        depth: usize,
    },
}

/// Depth-first, left to right walk emitting
/// begin, left, operator, right, finish for every composition.
pub fn traverse<T>(root: Option<&Compositable<T>>, listener: Option<&mut dyn CompositionListener<T>>) {
    let root = match root {
        Some(root) => root,
        None => return,
    };
    let mut noop = NoopListener;
    let listener = listener.unwrap_or(&mut noop);
    let stack = vec![Frame::Visit {
        node: root,
        direction: Direction::Root,
        operand: None,
        depth: 0,
    }];
    drain(stack, listener);
}

fn drain<'a, T>(mut stack: Vec<Frame<'a, T>>, listener: &mut dyn CompositionListener<T>) {
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Finish { composition, depth } => listener.on_finish_wrap(depth, composition),
            Frame::Visit {
                node,
                direction,
                operand,
                depth,
            } => {
                if direction == Direction::Right {
                    listener.on_composite(None, operand, direction, depth);
                }
                match node {
                    Compositable::Item(item) => {
                        listener.on_composite(Some(item), None, direction, depth)
                    }
                    Compositable::Composition(composition) => {
                        push_composition(&mut stack, listener, composition, depth)
                    }
                }
            }
        }
    }
}

fn push_composition<'a, T>(
    stack: &mut Vec<Frame<'a, T>>,
    listener: &mut dyn CompositionListener<T>,
    composition: &'a Composition<T>,
    depth: usize,
) {
    listener.on_begin_wrap(depth, composition);
    stack.push(Frame::Finish { composition, depth });
    stack.push(Frame::Visit {
        node: &composition.right,
        direction: Direction::Right,
        operand: Some(composition.operand),
        depth: child_depth(&composition.right, depth),
    });
    stack.push(Frame::Visit {
        node: &composition.left,
        direction: Direction::Left,
        operand: Some(composition.operand),
        depth: child_depth(&composition.left, depth),
    });
}

fn child_depth<T>(child: &Compositable<T>, depth: usize) -> usize {
    match child {
        Compositable::Item(_) => depth,
        Compositable::Composition(_) => depth + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item(&'static str);

    impl CompositableItem for Item {}

    fn item(name: &'static str) -> Compositable<Item> {
        Compositable::Item(Item(name))
    }

    #[derive(Default)]
    struct Tokens {
        tokens: Vec<String>,
        depths: Vec<usize>,
    }

    impl CompositionListener<Item> for Tokens {
        fn on_composite(
            &mut self,
            item: Option<&Item>,
            operand: Option<Operand>,
            _direction: Direction,
            depth: usize,
        ) {
            match (item, operand) {
                (Some(item), _) => self.tokens.push(item.0.to_string()),
                (None, Some(operand)) => self.tokens.push(operand.as_str().to_uppercase()),
                (None, None) => {}
            }
            self.depths.push(depth);
        }

        fn on_begin_wrap(&mut self, _depth: usize, _composition: &Composition<Item>) {
            self.tokens.push("(".into());
        }

        fn on_finish_wrap(&mut self, _depth: usize, _composition: &Composition<Item>) {
            self.tokens.push(")".into());
        }
    }

    #[test]
    fn precedence_follows_rust_operators() {
        let composite = item("item1") | item("item2") & (item("item3") | item("item4"));

        let composition = composite.as_composition().unwrap();
        assert_eq!(composition.operand(), Operand::Or);
        assert_eq!(composition.left(), &item("item1"));

        let right = composition.right().as_composition().unwrap();
        assert_eq!(right.operand(), Operand::And);
        assert_eq!(right.left(), &item("item2"));
        assert_eq!(
            right.right(),
            &Compositable::Composition(Composition::create_composition(
                Item("item3"),
                Operand::Or,
                Item("item4")
            ))
        );
    }

    #[test]
    fn traversal_tokens() {
        let composite = item("item1") | item("item2") & (item("item3") | item("item4"));
        let mut tokens = Tokens::default();
        composite.map_composition(Some(&mut tokens));

        assert_eq!(
            tokens.tokens,
            vec![
                "(", "item1", "OR", "(", "item2", "AND", "(", "item3", "OR", "item4", ")", ")",
                ")"
            ]
        );
        assert_eq!(tokens.depths, vec![0, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn single_leaf_and_empty_root() {
        let mut tokens = Tokens::default();
        item("alone").map_composition(Some(&mut tokens));
        assert_eq!(tokens.tokens, vec!["alone"]);

        let mut tokens = Tokens::default();
        traverse(None, Some(&mut tokens));
        assert!(tokens.tokens.is_empty());
    }

    #[test]
    fn composition_without_listener() {
        let composite = item("a") & item("b");
        composite.map_composition(None);
        assert_eq!(composite.items(), vec![&Item("a"), &Item("b")]);
    }

    #[test]
    fn operands_by_name() {
        assert_eq!("and".parse::<Operand>().unwrap(), Operand::And);
        assert_eq!("OR".parse::<Operand>().unwrap(), Operand::Or);
        assert!(matches!(
            Composition::create_composition_from(Item("a"), "xor", Item("b")),
            Err(NodeEdgeError::Type(_))
        ));
    }
}
