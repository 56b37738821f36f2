//! Folding wrap layers, filters and a handler into one callable.
//!
//! A [`Chain`] is the composed form of every wrap layer a builder has seen:
//! given the innermost continuation it returns the outermost one. Extending a
//! chain never changes it; the new chain captures the old one and calls it.
//!
//! For a builder made as `new().with(f1).wrap(w).with(f2)` and a handler `h`,
//! registration produces
//!
//! ```text
//! identity( filters[f1]( w( filters[f2]( h ) ) ) )
//! ```
//!
//! so on each request `f1` runs, then `w`'s "before" logic, then `f2`, then
//! `h`, and the response travels back out through `w`.

use std::sync::Arc;

use tracing::trace;

use crate::context::Context;
use crate::filter::{BoxedFilter, Flow};
use crate::handler::Next;
use crate::request::Request;
use crate::wrap::Wrap;

/// A composed transform from the innermost continuation to the outermost.
#[derive(Clone)]
pub(crate) struct Chain(Arc<dyn Fn(Next) -> Next + Send + Sync>);

impl Chain {
    /// The empty chain: hands back whatever it is given.
    pub(crate) fn identity() -> Self {
        Self(Arc::new(|next: Next| next))
    }

    /// Returns a chain with `layer` nested inside `self`.
    ///
    /// `filters` are the ones accumulated before `layer` was added. They run
    /// between `self` and `layer`, so a cancellation there stops before
    /// `layer` is ever entered while every outer layer sees a normal return.
    pub(crate) fn nest(&self, filters: Arc<[BoxedFilter]>, layer: impl Wrap) -> Self {
        let outer = self.clone();
        Self(Arc::new(move |next: Next| {
            outer.apply(run_filters(Arc::clone(&filters), layer.wrap(next)))
        }))
    }

    pub(crate) fn apply(&self, next: Next) -> Next {
        (self.0)(next)
    }
}

/// Runs `filters` in order, then `next`.
///
/// On [`Flow::Cancel`] the remaining filters and `next` are skipped and the
/// cancelling response is returned as is.
pub(crate) fn run_filters(filters: Arc<[BoxedFilter]>, next: Next) -> Next {
    if filters.is_empty() {
        return next;
    }

    Next::new(move |ctx: Context, req: Request| {
        let filters = Arc::clone(&filters);
        let next = next.clone();
        async move {
            let mut ctx = ctx;
            for (index, filter) in filters.iter().enumerate() {
                match filter.call(ctx, req.clone()).await {
                    Flow::Continue(updated) => ctx = updated,
                    Flow::Cancel(res) => {
                        trace!(
                            filter = index,
                            status = res.status_code(),
                            path = req.path(),
                            "pipeline cancelled"
                        );
                        return res;
                    }
                }
            }
            next.run(ctx, req).await
        }
    })
}

/// Folds `chain` and `filters` around the terminal handler.
pub(crate) fn endpoint(chain: &Chain, filters: Arc<[BoxedFilter]>, handler: Next) -> Next {
    chain.apply(run_filters(filters, handler))
}
