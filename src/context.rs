//! Per-request context.
//!
//! A [`Context`] is an immutable chain of typed values. Attaching a value never
//! touches the existing chain: it allocates one node that points back at its
//! parent, so every stage of a pipeline can hand a richer context downstream
//! while upstream stages keep the one they had.
//!
//! ```text
//! background ← params ← user ← tenant        ← ctx seen by the handler
//!                      ↑
//!                      └── ctx seen by the filter that attached `user`
//! ```
//!
//! Lookup walks from the newest node towards the root, so a later attachment
//! under the same key shadows an earlier one.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// A typed context key.
///
/// The key is the implementing type itself, so nothing outside the module
/// that declares it can read or overwrite its slot:
///
/// ```rust
/// use strata::{Context, Key};
///
/// struct UserId;
/// impl Key for UserId {
///     type Value = u64;
/// }
///
/// let ctx = Context::background().with_value::<UserId>(42);
/// assert_eq!(ctx.value::<UserId>(), Some(&42));
/// ```
pub trait Key: 'static {
    type Value: Send + Sync + 'static;
}

struct Node {
    key: TypeId,
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Node>>,
}

/// Immutable, append-only request context. Cloning is one atomic increment.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Node>>,
}

impl Context {
    /// The empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a child context holding `value` under `K`. `self` is unchanged.
    #[must_use]
    pub fn with_value<K: Key>(&self, value: K::Value) -> Self {
        Self {
            head: Some(Arc::new(Node {
                key: TypeId::of::<K>(),
                name: type_name::<K>(),
                value: Box::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// The value most recently attached under `K`, if any.
    pub fn value<K: Key>(&self) -> Option<&K::Value> {
        let key = TypeId::of::<K>();
        self.nodes()
            .find(|node| node.key == key)
            .and_then(|node| node.value.downcast_ref::<K::Value>())
    }

    pub fn contains<K: Key>(&self) -> bool {
        self.value::<K>().is_some()
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.head.as_deref(), |node| node.parent.as_deref())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes().map(|node| node.name)).finish()
    }
}
