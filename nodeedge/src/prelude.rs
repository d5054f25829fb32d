pub use crate::clone::Cloneable;
pub use crate::field::{Field, FieldType};
pub use crate::filter::{Filter, Filterable, IntoFilterComposition};
pub use crate::logic::{Compositable, CompositableItem, CompositionListener};
pub use crate::lookup::Lookup;
pub use crate::model::{Model, ModelField, ModelInstance};
pub use crate::path::{PathNode, Pathable};
pub use crate::value::{Value, Valueable};
pub use crate::{NodeEdgeError, NodeEdgeResult};
