//! Include paths: parsing, allow-list filtering and the traversal tree.
//!
//! Dotted paths (`job_skills.skill`) are opaque strings for allow-list
//! matching. Anything not explicitly allowed is dropped without error.

#![forbid(unsafe_code)]

use japi_core::KeyCase;
use rustc_hash::FxHashSet;

/// Split a raw `include` value on commas, trimming and dropping empty tokens.
pub fn parse(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else { return Vec::new() };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Subset of `requested` present in `allowed`, in request order, each once.
pub fn permit<I, S>(requested: &[String], allowed: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let allowed: FxHashSet<String> = allowed.into_iter().map(|s| s.as_ref().to_string()).collect();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    requested
        .iter()
        .filter(|p| allowed.contains(p.as_str()) && seen.insert(p.as_str()))
        .cloned()
        .collect()
}

/// Normalise every segment of every path from wire casing.
pub fn normalize(paths: Vec<String>, case: KeyCase) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.split('.').map(|seg| case.from_wire(seg).into_owned()).collect::<Vec<_>>().join("."))
        .collect()
}

/// A multi-segment path also asks for each of its prefixes:
/// `a.b.c` expands to `a`, `a.b`, `a.b.c`.
pub fn expand_prefixes(paths: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(paths.len());
    for p in paths {
        let mut end = 0;
        for seg in p.split('.') {
            end += seg.len();
            out.push(p[..end].to_string());
            end += 1;
        }
    }
    out
}

/// Full pipeline used per request: parse, normalise, expand and permit.
pub fn resolve<I, S>(raw: Option<&str>, allowed: I, case: KeyCase) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let requested = expand_prefixes(&normalize(parse(raw), case));
    permit(&requested, allowed)
}

/// Relationship names to walk, nested by path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeTree {
    children: Vec<(String, IncludeTree)>,
}

impl IncludeTree {
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut root = IncludeTree::default();
        for path in paths {
            let mut node = &mut root;
            for seg in path.as_ref().split('.').filter(|s| !s.is_empty()) {
                node = node.child_mut(seg);
            }
        }
        root
    }

    fn child_mut(&mut self, name: &str) -> &mut IncludeTree {
        let idx = match self.children.iter().position(|(n, _)| n == name) {
            Some(i) => i,
            None => {
                self.children.push((name.to_string(), IncludeTree::default()));
                self.children.len() - 1
            }
        };
        &mut self.children[idx].1
    }

    pub fn is_empty(&self) -> bool { self.children.is_empty() }

    pub fn children(&self) -> impl Iterator<Item = (&str, &IncludeTree)> {
        self.children.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn child(&self, name: &str) -> Option<&IncludeTree> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}
