// path.rs - Path-based field lookup into nested context structures.
//
// `resolve("meta.user.permissions", &ctx, None)` walks `ctx` one field at a
// time. Any missing key, null, or non-indexable value ends the walk with
// `None`. The resolver never panics and never returns an error.

use serde_json::Value;

/// Separator used when no custom path separator is configured.
pub const DEFAULT_PATH_SEPARATOR: &str = ".";

/// A structure that can be descended into by string keys.
pub trait PathIndex {
    /// Return the child stored under `key`, or `None` if there is no such
    /// child or `self` cannot be indexed.
    fn child(&self, key: &str) -> Option<&Self>;
}

impl PathIndex for Value {
    fn child(&self, key: &str) -> Option<&Self> {
        let next = match self {
            Value::Object(map) => map.get(key),
            // Array positions are addressable by their decimal index.
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        next.filter(|v| !v.is_null())
    }
}

/// Resolve `path` inside `root`.
///
/// `path` is split on `separator` (or `"."` when `None`). An empty path
/// resolves to `root` itself.
pub fn resolve<'a, T: PathIndex + ?Sized>(
    path: &str,
    root: &'a T,
    separator: Option<&str>,
) -> Option<&'a T> {
    if path.is_empty() {
        return Some(root);
    }
    let sep = match separator {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_PATH_SEPARATOR,
    };
    path.split(sep)
        .try_fold(root, |current, field| current.child(field))
}
