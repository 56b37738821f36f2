//! Path parameters captured by the router.
//!
//! The route callable attaches the matched [`Params`] to the context under a
//! key private to this module before the pipeline starts. Handlers, filters
//! and wrap layers read them back with [`param`].

use crate::context::{Context, Key};

/// Ordered `(name, value)` pairs captured from the matched path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// The value captured for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().map(|(n, v)| (n.into(), v.into())).collect(),
        }
    }
}

struct PathParams;

impl Key for PathParams {
    type Value = Params;
}

pub(crate) fn attach(ctx: &Context, params: Params) -> Context {
    ctx.with_value::<PathParams>(params)
}

/// All path parameters of the current request, or `None` when `ctx` did not
/// come from a dispatched request.
pub fn params(ctx: &Context) -> Option<&Params> {
    ctx.value::<PathParams>()
}

/// Returns the path parameter `name`, or `""` when the matched pattern does not
/// capture it.
///
/// ```rust,no_run
/// use strata::{Builder, Context, Request, Response, param};
///
/// Builder::new().get("/users/:id", |ctx: Context, _req: Request| async move {
///     Response::text(format!("user {}", param(&ctx, "id")))
/// });
/// ```
///
/// # Panics
///
/// Panics when `ctx` was not produced by the router's dispatch path. That is a
/// wiring bug, not a runtime condition.
pub fn param<'a>(ctx: &'a Context, name: &str) -> &'a str {
    match params(ctx) {
        Some(params) => params.get(name).unwrap_or(""),
        None => panic!("strata: path parameters are not available in this context"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_reads_attached_values() {
        let params: Params = [("key", "value"), ("id", "42")].into_iter().collect();
        let ctx = attach(&Context::background(), params);

        assert_eq!(param(&ctx, "key"), "value");
        assert_eq!(param(&ctx, "id"), "42");
        assert_eq!(param(&ctx, "missing"), "");
    }

    #[test]
    fn params_survive_later_attachments() {
        struct Other;
        impl Key for Other {
            type Value = bool;
        }

        let ctx = attach(&Context::background(), [("a", "1")].into_iter().collect())
            .with_value::<Other>(true);
        assert_eq!(params(&ctx).map(Params::len), Some(1));
    }

    #[test]
    #[should_panic(expected = "path parameters are not available")]
    fn param_outside_dispatch_panics() {
        param(&Context::background(), "key");
    }

    #[test]
    fn iter_preserves_capture_order() {
        let mut params = Params::new();
        params.push("first", "1");
        params.push("second", "2");
        let names: Vec<_> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["first", "second"]);
    }
}
