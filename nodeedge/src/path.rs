//!
//! Traversal paths through linked models.
//!
//! `a >> b >> c` produces a [`PathNode`] whose `current` is `b`, whose
//! `forward` is `c` and whose `backward` node holds `a`.
//!

use std::fmt;
use std::sync::Arc;

use crate::clone::{downcast, AttrValue, Cloneable, CloningAttrs, InitArgs, Overrides, Param};
use crate::{NodeEdgeError, NodeEdgeResult};

const CURRENT_ATTR: &str = "current";
const BACKWARD_ATTR: &str = "backward";
const FORWARD_ATTR: &str = "forward";

/// Carry-over attributes of every path node.
pub const PATHABLE_CLONING_ATTRS: CloningAttrs =
    CloningAttrs::Sequence(&[CURRENT_ATTR, BACKWARD_ATTR, FORWARD_ATTR]);

/// A type that can be a path segment.
pub trait Pathable: Clone + fmt::Debug + Send + Sync + 'static {}

/// Conversion of a right-hand path operand into a segment.
///
/// Types that cannot be segments implement this by failing with the
/// matching domain error.
pub trait IntoPathSegment<P: Pathable> {
    fn into_path_segment(self) -> NodeEdgeResult<P>;
}

impl<P: Pathable> IntoPathSegment<P> for P {
    fn into_path_segment(self) -> NodeEdgeResult<P> {
        Ok(self)
    }
}

pub fn check_pathable<P: Pathable>(other: impl IntoPathSegment<P>) -> NodeEdgeResult<P> {
    other.into_path_segment()
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathNode<P: Pathable> {
    current: P,
    backward: Option<Arc<PathNode<P>>>,
    forward: Option<P>,
}

impl<P: Pathable> PathNode<P> {
    pub fn new(current: P) -> Self {
        Self {
            current,
            backward: None,
            forward: None,
        }
    }

    pub fn create_path(current: P, forward: Option<P>, backward: Option<PathNode<P>>) -> Self {
        Self {
            current,
            backward: backward.map(Arc::new),
            forward,
        }
    }

    /// Whether this node has a segment on either side of `current`.
    pub fn has_path(&self) -> bool {
        self.forward.is_some() || self.backward.is_some()
    }

    pub fn current_path(&self) -> &P {
        &self.current
    }

    pub fn forward_path(&self) -> Option<&P> {
        self.forward.as_ref()
    }

    /// The segment before `current`.
    pub fn backward_path(&self) -> Option<&P> {
        self.backward.as_deref().map(PathNode::current_path)
    }

    pub fn backward(&self) -> Option<&PathNode<P>> {
        self.backward.as_deref()
    }

    /// All segments from the first to the last.
    pub fn segments(&self) -> Vec<&P> {
        let mut segments = vec![];
        let mut node = self.backward.as_deref();
        while let Some(previous) = node {
            segments.push(&previous.current);
            node = previous.backward.as_deref();
        }
        segments.reverse();
        segments.push(&self.current);
        segments.extend(self.forward.as_ref());
        segments
    }

    pub fn step_forward(&self, other: impl IntoPathSegment<P>) -> NodeEdgeResult<Self> {
        let other = check_pathable(other)?;
        let overrides = match &self.forward {
            Some(forward) => Overrides::new()
                .attr(BACKWARD_ATTR, Some(Arc::new(self.clone())))
                .attr(CURRENT_ATTR, forward.clone())
                .attr(FORWARD_ATTR, Some(other)),
            None => Overrides::new().attr(FORWARD_ATTR, Some(other)),
        };
        self.clone_with(overrides)
    }

    pub fn step_backward(&self, _other: impl IntoPathSegment<P>) -> NodeEdgeResult<Self> {
        Err(NodeEdgeError::NotImplemented("backward path steps"))
    }
}

impl<P: Pathable> Cloneable for PathNode<P> {
    fn signature() -> &'static [Param] {
        const SIGNATURE: &[Param] = &[Param::positional(CURRENT_ATTR)];
        SIGNATURE
    }

    fn inherited_cloning_attrs() -> Vec<CloningAttrs> {
        vec![PATHABLE_CLONING_ATTRS]
    }

    fn get_attr(&self, name: &str) -> Option<AttrValue> {
        match name {
            CURRENT_ATTR => Some(Box::new(self.current.clone())),
            BACKWARD_ATTR => Some(Box::new(self.backward.clone())),
            FORWARD_ATTR => Some(Box::new(self.forward.clone())),
            _ => None,
        }
    }

    fn set_attr(&mut self, name: &str, value: AttrValue) -> NodeEdgeResult<()> {
        match name {
            CURRENT_ATTR => self.current = downcast(name, value)?,
            BACKWARD_ATTR => self.backward = downcast(name, value)?,
            FORWARD_ATTR => self.forward = downcast(name, value)?,
            _ => {
                return Err(NodeEdgeError::Type(format!(
                    "PathNode has no attribute '{}'",
                    name
                )))
            }
        }
        Ok(())
    }

    fn construct(mut args: InitArgs) -> NodeEdgeResult<Self> {
        Ok(Self::new(args.take(CURRENT_ATTR)?))
    }
}

impl<P: Pathable> fmt::Display for PathNode<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments = self.segments();
        for (index, segment) in segments.iter().enumerate() {
            if index > 0 {
                f.write_str(" >> ")?;
            }
            write!(f, "{:?}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;

    #[derive(Clone, Debug, PartialEq)]
    struct Segment(&'static str);

    impl Pathable for Segment {}

    struct NotASegment;

    impl IntoPathSegment<Segment> for NotASegment {
        fn into_path_segment(self) -> NodeEdgeResult<Segment> {
            Err(DomainError::InvalidPath("not a segment".into()).into())
        }
    }

    #[test]
    fn single_step() {
        let path = PathNode::new(Segment("a")).step_forward(Segment("b")).unwrap();
        assert!(path.has_path());
        assert_eq!(path.current_path(), &Segment("a"));
        assert_eq!(path.forward_path(), Some(&Segment("b")));
        assert_eq!(path.backward_path(), None);
    }

    #[test]
    fn chained_steps_move_the_window() {
        let path = PathNode::new(Segment("path_to"))
            .step_forward(Segment("link_to"))
            .and_then(|path| path.step_forward(Segment("name")))
            .unwrap();

        assert_eq!(path.backward_path(), Some(&Segment("path_to")));
        assert_eq!(path.current_path(), &Segment("link_to"));
        assert_eq!(path.forward_path(), Some(&Segment("name")));
        assert_eq!(
            path.segments(),
            vec![&Segment("path_to"), &Segment("link_to"), &Segment("name")]
        );
    }

    #[test]
    fn long_chain_keeps_every_segment() {
        let path = ["b", "c", "d"]
            .iter()
            .try_fold(PathNode::new(Segment("a")), |path, name| {
                path.step_forward(Segment(*name))
            })
            .unwrap();
        assert_eq!(
            path.to_string(),
            "Segment(\"a\") >> Segment(\"b\") >> Segment(\"c\") >> Segment(\"d\")"
        );
    }

    #[test]
    fn non_segments_are_rejected() {
        let error = PathNode::new(Segment("a")).step_forward(NotASegment).unwrap_err();
        assert!(matches!(error, NodeEdgeError::Domain(DomainError::InvalidPath(_))));
    }

    #[test]
    fn backward_steps_are_not_implemented() {
        let error = PathNode::new(Segment("a"))
            .step_backward(Segment("b"))
            .unwrap_err();
        assert!(matches!(error, NodeEdgeError::NotImplemented(_)));
    }
}
