use crate::helpers::{self, PathSegment};
use crate::types::RouteParams;
use crate::Error;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies a registered route pattern inside one [`RouteGroup`](./struct.RouteGroup.html).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub(crate) usize);

impl RouteId {
    /// The position of the route in its group, in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A successful [`PathTree::get`] lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    pub route: RouteId,
    pub params: RouteParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'p> {
    Literal(&'p str),
    Param(&'p str),
    Wildcard(&'p str),
}

fn parse_pattern(pattern: &str) -> crate::Result<Vec<Segment<'_>>> {
    let raw: Vec<&str> = helpers::pattern_segments(pattern).collect();
    let mut segments = Vec::with_capacity(raw.len());
    let mut names = HashSet::new();

    for (idx, seg) in raw.iter().enumerate() {
        if let Some(name) = seg.strip_prefix(':') {
            if name.is_empty() {
                return Err(Error::InvalidPattern {
                    pattern: pattern.to_owned(),
                    reason: "parameter name must not be empty",
                });
            }
            if !names.insert(name) {
                return Err(Error::InvalidPattern {
                    pattern: pattern.to_owned(),
                    reason: "duplicate parameter name",
                });
            }
            segments.push(Segment::Param(name));
        } else if let Some(name) = seg.strip_prefix('*') {
            if idx + 1 != raw.len() {
                return Err(Error::WildcardNotLast(pattern.to_owned()));
            }
            let name = if name.is_empty() { "*" } else { name };
            if !names.insert(name) {
                return Err(Error::InvalidPattern {
                    pattern: pattern.to_owned(),
                    reason: "duplicate parameter name",
                });
            }
            segments.push(Segment::Wildcard(name));
        } else {
            segments.push(Segment::Literal(seg));
        }
    }

    Ok(segments)
}

#[derive(Debug, Default)]
struct Node {
    statics: HashMap<String, Node>,
    param: Option<ParamChild>,
    wildcard: Option<WildcardLeaf>,
    route: Option<RouteId>,
}

#[derive(Debug)]
struct ParamChild {
    name: String,
    node: Box<Node>,
}

#[derive(Debug)]
struct WildcardLeaf {
    name: String,
    route: RouteId,
}

impl WildcardLeaf {
    fn display(&self) -> String {
        if self.name == "*" {
            String::from("*")
        } else {
            format!("*{}", self.name)
        }
    }
}

/// A prefix tree over path segments that maps route patterns to [`RouteId`]s.
///
/// Pattern segments are literals (`users`), named parameters (`:id`) or a trailing wildcard (`*` or `*rest`).
/// Lookups cost one step per path segment for non-overlapping patterns. Where patterns overlap, a literal
/// beats a parameter, which beats a wildcard, regardless of registration order. When the preferred branch
/// dead-ends deeper down, the next alternative at that level is tried.
///
/// # Examples
///
/// ```
/// use grove::PathTree;
///
/// let mut tree = PathTree::new();
/// let show = tree.insert("/users/:id", grove::RouteId::default()).unwrap();
///
/// let found = tree.get("/users/42").unwrap();
/// assert_eq!(found.route, show);
/// assert_eq!(found.params.get("id"), Some("42"));
/// ```
#[derive(Debug, Default)]
pub struct PathTree {
    root: Node,
    len: usize,
}

impl PathTree {
    pub fn new() -> PathTree {
        PathTree::default()
    }

    /// Inserts `pattern` with the identifier `route`.
    ///
    /// Returns the identifier stored for the pattern: `route` when the pattern is new, or the identifier of the
    /// earlier registration of the same pattern. Fails when a wildcard is not the last segment, a parameter name
    /// is empty or repeated, or a parameter/wildcard would sit next to a differently-named one at the same position.
    pub fn insert(&mut self, pattern: &str, route: RouteId) -> crate::Result<RouteId> {
        let segments = parse_pattern(pattern)?;
        let mut node = &mut self.root;

        for seg in segments {
            match seg {
                Segment::Literal(lit) => {
                    node = node.statics.entry(lit.to_owned()).or_default();
                }
                Segment::Param(name) => {
                    let child = node.param.get_or_insert_with(|| ParamChild {
                        name: name.to_owned(),
                        node: Box::default(),
                    });
                    if child.name != name {
                        return Err(Error::AmbiguousPattern {
                            pattern: pattern.to_owned(),
                            existing: format!(":{}", child.name),
                        });
                    }
                    node = &mut *child.node;
                }
                Segment::Wildcard(name) => {
                    if let Some(leaf) = &node.wildcard {
                        if leaf.name != name {
                            return Err(Error::AmbiguousPattern {
                                pattern: pattern.to_owned(),
                                existing: leaf.display(),
                            });
                        }
                        return Ok(leaf.route);
                    }

                    node.wildcard = Some(WildcardLeaf {
                        name: name.to_owned(),
                        route,
                    });
                    self.len += 1;
                    return Ok(route);
                }
            }
        }

        match node.route {
            Some(existing) => Ok(existing),
            None => {
                node.route = Some(route);
                self.len += 1;
                Ok(route)
            }
        }
    }

    /// Resolves a request path. Segments are percent-decoded before matching and trailing slashes are ignored.
    ///
    /// A wildcard binds the rest of the path as sent, starting at its first non-empty segment and decoded once:
    /// repeated and trailing slashes are kept, and an encoded `%2F` reads as `/`.
    pub fn get(&self, path: &str) -> Option<PathMatch> {
        let segments = helpers::decoded_segments(path);
        let mut params = RouteParams::new();

        lookup(&self.root, path, &segments, &mut params).map(|route| PathMatch { route, params })
    }

    /// The number of distinct patterns in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn lookup(node: &Node, path: &str, segments: &[PathSegment<'_>], params: &mut RouteParams) -> Option<RouteId> {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            if node.route.is_some() {
                return node.route;
            }
            return node.wildcard.as_ref().map(|leaf| {
                params.push(&leaf.name, String::new());
                leaf.route
            });
        }
    };

    if let Some(child) = node.statics.get(first.value.as_ref()) {
        if let Some(route) = lookup(child, path, rest, params) {
            return Some(route);
        }
    }

    if let Some(child) = &node.param {
        let mark = params.len();
        params.push(&child.name, first.value.clone().into_owned());
        if let Some(route) = lookup(&child.node, path, rest, params) {
            return Some(route);
        }
        params.truncate(mark);
    }

    node.wildcard.as_ref().map(|leaf| {
        params.push(&leaf.name, helpers::decode(&path[first.start..]).into_owned());
        leaf.route
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(patterns: &[&str]) -> PathTree {
        let mut tree = PathTree::new();
        for (idx, pattern) in patterns.iter().enumerate() {
            tree.insert(pattern, RouteId(idx)).unwrap();
        }
        tree
    }

    #[test]
    fn resolves_static_and_param_routes() {
        let tree = tree_with(&["/", "/users", "/users/:id", "/users/:id/books/:book"]);

        assert_eq!(tree.get("/").unwrap().route, RouteId(0));
        assert_eq!(tree.get("/users").unwrap().route, RouteId(1));

        let found = tree.get("/users/alice/books/dune").unwrap();
        assert_eq!(found.route, RouteId(3));
        assert_eq!(
            found.params.iter().collect::<Vec<_>>(),
            vec![("id", "alice"), ("book", "dune")]
        );

        assert!(tree.get("/users/alice/books").is_none());
        assert!(tree.get("/books").is_none());
    }

    #[test]
    fn trailing_slash_and_encoding_are_normalized() {
        let tree = tree_with(&["/files/:name"]);

        let found = tree.get("/files/my%20notes.txt/").unwrap();
        assert_eq!(found.params.get("name"), Some("my notes.txt"));
    }

    #[test]
    fn precedence_is_independent_of_registration_order() {
        let orders: [[&str; 3]; 3] = [
            ["/files/readme", "/files/:name", "/files/*"],
            ["/files/*", "/files/:name", "/files/readme"],
            ["/files/:name", "/files/*", "/files/readme"],
        ];

        for order in orders.iter() {
            let tree = tree_with(order);
            let id_of = |pattern: &str| RouteId(order.iter().position(|p| *p == pattern).unwrap());

            assert_eq!(tree.get("/files/readme").unwrap().route, id_of("/files/readme"));

            let param = tree.get("/files/license").unwrap();
            assert_eq!(param.route, id_of("/files/:name"));
            assert_eq!(param.params.get("name"), Some("license"));

            let wildcard = tree.get("/files/a/b/c").unwrap();
            assert_eq!(wildcard.route, id_of("/files/*"));
            assert_eq!(wildcard.params.get("*"), Some("a/b/c"));
        }
    }

    #[test]
    fn backtracks_from_literal_to_param() {
        let tree = tree_with(&["/users/new/edit", "/users/:id/view"]);

        let found = tree.get("/users/new/view").unwrap();
        assert_eq!(found.route, RouteId(1));
        assert_eq!(found.params.get("id"), Some("new"));
        assert_eq!(found.params.len(), 1);
    }

    #[test]
    fn param_bindings_are_dropped_when_backtracking_to_wildcard() {
        let tree = tree_with(&["/assets/:kind/icon", "/assets/*path"]);

        let found = tree.get("/assets/img/logo.png").unwrap();
        assert_eq!(found.route, RouteId(1));
        assert_eq!(found.params.iter().collect::<Vec<_>>(), vec![("path", "img/logo.png")]);
    }

    #[test]
    fn wildcard_matches_empty_remainder() {
        let tree = tree_with(&["/static/*"]);

        let found = tree.get("/static/").unwrap();
        assert_eq!(found.params.get("*"), Some(""));
    }

    #[test]
    fn same_pattern_keeps_first_identifier() {
        let mut tree = PathTree::new();
        assert_eq!(tree.insert("/users/:id", RouteId(0)).unwrap(), RouteId(0));
        assert_eq!(tree.insert("/users/:id/", RouteId(1)).unwrap(), RouteId(0));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn rejects_wildcard_before_last_segment() {
        let mut tree = PathTree::new();
        let err = tree.insert("/files/*/raw", RouteId(0)).unwrap_err();
        assert!(matches!(err, Error::WildcardNotLast(_)));
    }

    #[test]
    fn rejects_conflicting_param_names() {
        let mut tree = PathTree::new();
        tree.insert("/users/:id", RouteId(0)).unwrap();

        let err = tree.insert("/users/:name/posts", RouteId(1)).unwrap_err();
        match err {
            Error::AmbiguousPattern { existing, .. } => assert_eq!(existing, ":id"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn rejects_conflicting_wildcard_names() {
        let mut tree = PathTree::new();
        tree.insert("/files/*rest", RouteId(0)).unwrap();

        assert!(matches!(
            tree.insert("/files/*", RouteId(1)),
            Err(Error::AmbiguousPattern { .. })
        ));
    }

    #[test]
    fn rejects_repeated_param_names() {
        let mut tree = PathTree::new();

        for pattern in ["/a/:id/b/:id", "/files/:path/*path"] {
            match tree.insert(pattern, RouteId(0)) {
                Err(Error::InvalidPattern { reason, .. }) => assert_eq!(reason, "duplicate parameter name"),
                other => panic!("expected an invalid pattern error for {}, got {:?}", pattern, other),
            }
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn wildcard_binds_raw_remainder_decoded_once() {
        let tree = tree_with(&["/files/*path"]);

        assert_eq!(tree.get("/files/a//b/").unwrap().params.get("path"), Some("a//b/"));
        assert_eq!(tree.get("/files/a%2Fb/c%20d").unwrap().params.get("path"), Some("a/b/c d"));
        assert_eq!(tree.get("/files//a").unwrap().params.get("path"), Some("a"));
    }

    #[test]
    fn rejects_empty_param_name() {
        let mut tree = PathTree::new();
        assert!(matches!(
            tree.insert("/users/:", RouteId(0)),
            Err(Error::InvalidPattern { .. })
        ));
    }
}
