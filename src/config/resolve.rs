//! Substitution resolution.
//!
//! Resolution turns a [`MergedTree`] into a tree with no substitutions,
//! concatenations or delayed merges left in it.
//!
//! Lookups are memoised per *view* and location. View `k` is the merge of
//! the lowest `k` layers; the full document is view `depth()`. A location is
//! `Resolving` while its value is being computed, and meeting it again means
//! the substitutions form a cycle.
//!
//! Self-references (`path = "${path}:/extra"`, or a substitution naming one of
//! its own ancestors) take the raw node from the view strictly below the layer
//! the substitution came from, so they see the value being overridden instead
//! of themselves. References inside that node still resolve against the full
//! document.

use super::merge::{MergedTree, Layer, deep_merge, merge_layers};
use super::path::render_location;
use super::value::{Node, NodeKind, Object, Substitution};
use crate::error::{ConfigError, Result};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Resolve every substitution in a merged tree.
///
/// Fails on the first cyclic or unresolvable substitution.
pub fn resolve(merged: &MergedTree) -> Result<Node> {
    let mut resolver = Resolver::new(merged);
    let depth = merged.depth();
    let root = resolver.view_root(depth);
    let resolved = resolver
        .resolve_value(depth, &[], &root, true)?
        .unwrap_or_else(Node::object);
    debug!(
        layers = depth,
        lookups = resolver.memo.len(),
        "Resolved configuration tree"
    );
    Ok(resolved)
}

/// Resolve a single standalone tree, as if it were the only layer.
pub fn resolve_tree(root: Node) -> Result<Node> {
    resolve(&merge_layers(vec![Layer::new("tree", root)]))
}

enum Slot {
    Resolving,
    Done(Option<Node>),
}

struct Resolver<'a> {
    merged: &'a MergedTree,
    views: HashMap<usize, Rc<Node>>,
    memo: HashMap<(usize, Vec<String>), Slot>,
    /// Locations currently being resolved through lookups, outermost first.
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(merged: &'a MergedTree) -> Self {
        Self {
            merged,
            views: HashMap::new(),
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn view_root(&mut self, view: usize) -> Rc<Node> {
        let merged = self.merged;
        let root = self.views.entry(view).or_insert_with(|| {
            if view == merged.depth() {
                Rc::new(merged.root.clone())
            } else {
                Rc::new(merged.view(view))
            }
        });
        Rc::clone(root)
    }

    /// Fully resolved value at `location` in `view`, memoised.
    fn resolve_at(&mut self, view: usize, location: &[String]) -> Result<Option<Node>> {
        let key = (view, location.to_vec());
        match self.memo.get(&key) {
            Some(Slot::Done(value)) => return Ok(value.clone()),
            Some(Slot::Resolving) => return Err(self.cycle(location)),
            None => {}
        }

        self.memo.insert(key.clone(), Slot::Resolving);
        self.stack.push(render_location(location));

        let raw = self.raw_at(view, location);
        let value = match raw {
            Ok(Some(node)) => self.resolve_value(view, location, &node, true),
            Ok(None) => Ok(None),
            Err(err) => Err(err),
        };

        self.stack.pop();
        let value = value?;
        self.memo.insert(key, Slot::Done(value.clone()));
        Ok(value)
    }

    /// Walk the raw view tree towards `location`. Unresolved nodes met on the
    /// way are resolved first so that paths can reach into them.
    fn raw_at(&mut self, view: usize, location: &[String]) -> Result<Option<Node>> {
        let root = self.view_root(view);
        let mut current: &Node = &root;

        for (depth, segment) in location.iter().enumerate() {
            if current.is_unresolved() {
                let prefix = &location[..depth];
                // A field of a concatenation or merge still being built is
                // read from its parts instead.
                if self.is_resolving(view, prefix) {
                    if let Node::Concat(parts) | Node::Merge(parts) = current {
                        return self.lookup_in_parts(view, prefix, parts, &location[depth..]);
                    }
                }
                let resolved = self.resolve_at(view, prefix)?;
                return Ok(resolved.and_then(|node| node.get_segments(&location[depth..]).cloned()));
            }
            match current.as_object().and_then(|object| object.get(segment)) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }

        Ok(Some(current.clone()))
    }

    fn is_resolving(&self, view: usize, location: &[String]) -> bool {
        matches!(self.memo.get(&(view, location.to_vec())), Some(Slot::Resolving))
    }

    /// Look `rest` up below the concatenation or merge at `location`, from
    /// the highest part down. Lower parts are only consulted while the
    /// values found so far are objects.
    fn lookup_in_parts(
        &mut self,
        view: usize,
        location: &[String],
        parts: &[Node],
        rest: &[String],
    ) -> Result<Option<Node>> {
        let mut target = location.to_vec();
        target.extend_from_slice(rest);

        let mut found = Vec::new();
        for part in parts.iter().rev() {
            let Some(candidate) = self.lookup_in_node(view, location, part, rest)? else {
                continue;
            };
            let Some(candidate) = self.resolve_value(view, &target, &candidate, false)? else {
                continue;
            };
            let is_object = matches!(candidate, Node::Object(_));
            found.push(candidate);
            if !is_object {
                break;
            }
        }

        Ok(found.into_iter().rev().reduce(deep_merge))
    }

    /// Walk `rest` down from `node`, which sits at `location` inside a part.
    fn lookup_in_node(
        &mut self,
        view: usize,
        location: &[String],
        node: &Node,
        rest: &[String],
    ) -> Result<Option<Node>> {
        let mut current = node;
        let mut here = location.to_vec();

        for (depth, segment) in rest.iter().enumerate() {
            match current {
                Node::Concat(parts) | Node::Merge(parts) => {
                    return self.lookup_in_parts(view, &here, parts, &rest[depth..]);
                }
                Node::Substitution(subst) => {
                    let rest = &rest[depth..];
                    let mut target = subst.path.segments().to_vec();
                    target.extend_from_slice(rest);
                    if subst.path.is_prefix_of(&here) {
                        return self.raw_at(subst.layer.min(view), &target);
                    }
                    if !subst.optional {
                        return self.resolve_at(view, &target);
                    }
                    let resolved = self.resolve_value(view, &here, current, false)?;
                    return Ok(resolved.and_then(|node| node.get_segments(rest).cloned()));
                }
                _ => {}
            }
            match current.as_object().and_then(|object| object.get(segment)) {
                Some(next) => {
                    current = next;
                    here.push(segment.clone());
                }
                None => return Ok(None),
            }
        }

        Ok(Some(current.clone()))
    }

    /// Resolve `node`, found at `location`. `addressable` means the node sits
    /// at that location in the raw view, so its unresolved children can be
    /// resolved through the memo.
    fn resolve_value(
        &mut self,
        view: usize,
        location: &[String],
        node: &Node,
        addressable: bool,
    ) -> Result<Option<Node>> {
        if node.is_resolved() {
            return Ok(Some(node.clone()));
        }

        match node {
            Node::Object(object) => {
                let mut resolved = Object::new();
                for (key, child) in object.iter() {
                    let mut child_location = location.to_vec();
                    child_location.push(key.to_string());
                    let value = match child {
                        Node::Object(_) => {
                            self.resolve_value(view, &child_location, child, addressable)?
                        }
                        _ if child.is_unresolved() && addressable => {
                            self.resolve_at(view, &child_location)?
                        }
                        _ => self.resolve_value(view, &child_location, child, false)?,
                    };
                    if let Some(value) = value {
                        resolved.insert(key, value);
                    }
                }
                Ok(Some(Node::Object(resolved)))
            }
            Node::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let mut item_location = location.to_vec();
                    item_location.push(index.to_string());
                    if let Some(value) = self.resolve_value(view, &item_location, item, false)? {
                        resolved.push(value);
                    }
                }
                Ok(Some(Node::List(resolved)))
            }
            Node::Substitution(subst) => self.resolve_substitution(view, location, subst),
            Node::Concat(parts) => self.resolve_concat(view, location, parts),
            Node::Merge(parts) => self.resolve_merge(view, location, parts),
            scalar => Ok(Some(scalar.clone())),
        }
    }

    fn resolve_substitution(
        &mut self,
        view: usize,
        location: &[String],
        subst: &Substitution,
    ) -> Result<Option<Node>> {
        let self_reference = subst.path.is_prefix_of(location);
        let target_view = if self_reference {
            subst.layer.min(view)
        } else {
            view
        };
        trace!(
            substitution = %subst,
            location = %render_location(location),
            view = target_view,
            self_reference,
            "Resolving substitution"
        );

        let mut value = if self_reference {
            self.resolve_below(view, target_view, subst)?
        } else {
            self.resolve_at(view, subst.path.segments())?
        };

        // Optional substitutions may still find a value hidden by a higher
        // layer's null or omission.
        if subst.optional && value.as_ref().is_none_or(Node::is_null) {
            for lower in (0..target_view).rev() {
                let candidate = self.resolve_below(view, lower, subst)?;
                if candidate.as_ref().is_some_and(|node| !node.is_null()) {
                    value = candidate;
                    break;
                }
            }
        }

        match value {
            Some(node) => Ok(Some(node)),
            None if subst.optional => Ok(None),
            None => Err(ConfigError::UnresolvedReference {
                path: subst.path.to_string(),
                location: render_location(location),
            }),
        }
    }

    /// Take the raw node at the substitution's path from view `below` and
    /// resolve its own references against `view`.
    fn resolve_below(&mut self, view: usize, below: usize, subst: &Substitution) -> Result<Option<Node>> {
        match self.raw_at(below, subst.path.segments())? {
            Some(raw) => self.resolve_value(view, subst.path.segments(), &raw, false),
            None => Ok(None),
        }
    }

    fn resolve_concat(
        &mut self,
        view: usize,
        location: &[String],
        parts: &[Node],
    ) -> Result<Option<Node>> {
        let mut values = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(value) = self.resolve_value(view, location, part, false)? {
                values.push(value);
            }
        }

        if values.len() <= 1 {
            return Ok(values.pop());
        }

        let first = values[0].kind();
        let joinable = |kind: NodeKind| matches!(kind, NodeKind::String | NodeKind::Number | NodeKind::Bool);
        if let Some(mismatch) = values.iter().find(|value| {
            let kind = value.kind();
            !(kind == first || (joinable(kind) && joinable(first)))
        }) {
            return Err(ConfigError::wrong_type(
                render_location(location),
                format!("values of one kind to concatenate ({})", first),
                mismatch.kind(),
            ));
        }

        let joined = match first {
            NodeKind::List => Node::List(
                values
                    .into_iter()
                    .flat_map(|value| match value {
                        Node::List(items) => items,
                        other => vec![other],
                    })
                    .collect(),
            ),
            NodeKind::Object => values
                .into_iter()
                .reduce(deep_merge)
                .unwrap_or_else(Node::object),
            _ if joinable(first) => {
                let mut text = String::new();
                for value in &values {
                    text.push_str(&value.scalar_text().unwrap_or_default());
                }
                Node::String(text)
            }
            other => {
                return Err(ConfigError::wrong_type(
                    render_location(location),
                    "string, list or object to concatenate",
                    other,
                ));
            }
        };
        Ok(Some(joined))
    }

    /// Finish a delayed merge. The stack is resolved from the top down and
    /// stops at the first value that cannot be merged under an object.
    fn resolve_merge(
        &mut self,
        view: usize,
        location: &[String],
        parts: &[Node],
    ) -> Result<Option<Node>> {
        let mut merged: Option<Node> = None;

        for part in parts.iter().rev() {
            let Some(value) = self.resolve_value(view, location, part, false)? else {
                continue;
            };
            match merged {
                None if !matches!(value, Node::Object(_)) => return Ok(Some(value)),
                None => merged = Some(value),
                Some(above) => match value {
                    Node::Object(_) => merged = Some(deep_merge(value, above)),
                    _ => return Ok(Some(above)),
                },
            }
        }

        Ok(merged)
    }

    fn cycle(&self, location: &[String]) -> ConfigError {
        let name = render_location(location);
        let start = self
            .stack
            .iter()
            .position(|entry| *entry == name)
            .unwrap_or(0);
        let mut chain: Vec<String> = self.stack[start..].to_vec();
        chain.push(name);
        ConfigError::CyclicReference { chain }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::path::Path;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn obj<const N: usize>(entries: [(&str, Node); N]) -> Node {
        Node::object_from(entries)
    }

    fn at<'n>(root: &'n Node, path: &str) -> Option<&'n Node> {
        root.get(&Path::parse(path).unwrap())
    }

    fn resolve_layers(layers: Vec<Node>) -> Result<Node> {
        let layers = layers
            .into_iter()
            .enumerate()
            .map(|(i, root)| Layer::new(format!("layer{}", i), root))
            .collect();
        resolve(&merge_layers(layers))
    }

    #[test]
    fn test_direct_reference() {
        let root = obj([
            ("predefined", obj([("version", "1.0-SNAPSHOT".into())])),
            ("conf", obj([("project_version", Node::subst("predefined.version"))])),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(at(&resolved, "conf.project_version"), Some(&Node::from("1.0-SNAPSHOT")));
    }

    #[test]
    fn test_forward_and_chained_references() {
        let root = obj([
            ("a", Node::subst("b")),
            ("b", Node::subst("c")),
            ("c", Node::int(7)),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(resolved, obj([("a", Node::int(7)), ("b", Node::int(7)), ("c", Node::int(7))]));
    }

    #[test]
    fn test_reference_to_object_copies_subtree() {
        let root = obj([
            ("base", obj([("host", "db".into()), ("port", Node::subst("defaults.port"))])),
            ("defaults", obj([("port", Node::int(5432))])),
            ("copy", Node::subst("base")),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(
            at(&resolved, "copy"),
            Some(&obj([("host", "db".into()), ("port", Node::int(5432))]))
        );
    }

    #[test]
    fn test_reference_through_substituted_object() {
        let root = obj([
            ("alias", Node::subst("real")),
            ("real", obj([("name", "x".into())])),
            ("name", Node::subst("alias.name")),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(at(&resolved, "name"), Some(&Node::from("x")));
    }

    #[test]
    fn test_cycle_is_detected() {
        let root = obj([("a", Node::subst("b")), ("b", Node::subst("a"))]);
        let err = resolve_tree(root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicReference);
        match err {
            ConfigError::CyclicReference { chain } => assert_eq!(chain, ["a", "b", "a"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_cycle_through_containing_object() {
        let root = obj([("a", obj([("b", Node::subst("c"))])), ("c", Node::subst("a"))]);
        let err = resolve_tree(root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicReference);
    }

    #[test]
    fn test_missing_required_reference() {
        let root = obj([("conf", obj([("ref", Node::subst("nowhere.key"))]))]);
        let err = resolve_tree(root).unwrap_err();
        match err {
            ConfigError::UnresolvedReference { path, location } => {
                assert_eq!(path, "nowhere.key");
                assert_eq!(location, "conf.ref");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_optional_reference_is_omitted() {
        let root = obj([
            ("a", Node::optional_subst("nowhere")),
            ("list", Node::list([Node::int(1), Node::optional_subst("nowhere"), Node::int(2)])),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(resolved, obj([("list", Node::list([Node::int(1), Node::int(2)]))]));
    }

    #[test]
    fn test_string_concatenation() {
        let root = obj([
            ("version", Node::int(2)),
            ("name", Node::concat([Node::from("app-v"), Node::subst("version"), Node::from(".jar")])),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(at(&resolved, "name"), Some(&Node::from("app-v2.jar")));
    }

    #[test]
    fn test_object_concatenation_inherits_fields() {
        let root = obj([
            ("company", obj([("name", "mtumilowicz holding".into()), ("branch_name", "hq".into())])),
            (
                "branch_east",
                Node::concat([Node::subst("company"), obj([("branch_name", "east".into())])]),
            ),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(
            at(&resolved, "branch_east"),
            Some(&obj([("name", "mtumilowicz holding".into()), ("branch_name", "east".into())]))
        );
    }

    #[test]
    fn test_list_concatenation() {
        let root = obj([
            ("base", Node::list([Node::from("english")])),
            ("all", Node::concat([Node::subst("base"), Node::list([Node::from("polish")])])),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(
            at(&resolved, "all"),
            Some(&Node::list([Node::from("english"), Node::from("polish")]))
        );
    }

    #[test]
    fn test_mixed_concatenation_is_wrong_type() {
        let root = obj([
            ("o", obj([("x", Node::int(1))])),
            ("bad", Node::concat([Node::subst("o"), Node::from("text")])),
        ]);
        let err = resolve_tree(root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongType);
    }

    #[test]
    fn test_self_reference_uses_lower_layer() {
        let top = obj([("path", Node::concat([Node::subst("path"), Node::from(":/opt/bin")]))]);
        let bottom = obj([("path", "/usr/bin".into())]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(at(&resolved, "path"), Some(&Node::from("/usr/bin:/opt/bin")));
    }

    #[test]
    fn test_self_reference_to_ancestor_object() {
        let top = obj([(
            "server",
            Node::concat([Node::subst("server"), obj([("port", Node::int(9000))])]),
        )]);
        let bottom = obj([("server", obj([("host", "localhost".into()), ("port", Node::int(80))]))]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(
            at(&resolved, "server"),
            Some(&obj([("host", "localhost".into()), ("port", Node::int(9000))]))
        );
    }

    #[test]
    fn test_concatenated_object_refers_to_own_field() {
        let root = obj([
            ("company", obj([("name", "acme".into())])),
            (
                "branch",
                Node::concat([
                    Node::subst("company"),
                    obj([
                        ("branch_name", "east".into()),
                        ("label", Node::subst("branch.branch_name")),
                        ("owner", Node::subst("branch.name")),
                    ]),
                ]),
            ),
        ]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(at(&resolved, "branch.label"), Some(&Node::from("east")));
        assert_eq!(at(&resolved, "branch.owner"), Some(&Node::from("acme")));
    }

    #[test]
    fn test_delayed_merge_refers_to_own_field() {
        let top = obj([(
            "branch",
            obj([("branch_name", "east".into()), ("label", Node::subst("branch.name"))]),
        )]);
        let bottom = obj([
            ("company", obj([("name", "acme".into())])),
            ("branch", Node::subst("company")),
        ]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(
            at(&resolved, "branch"),
            Some(&obj([
                ("name", "acme".into()),
                ("branch_name", "east".into()),
                ("label", "acme".into()),
            ]))
        );
    }

    #[test]
    fn test_self_extended_object_keeps_inner_references() {
        let top = obj([("a", Node::concat([Node::subst("a"), obj([("d", Node::int(2))])]))]);
        let bottom = obj([("a", obj([("b", Node::subst("a.c")), ("c", Node::int(1))]))]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(
            at(&resolved, "a"),
            Some(&obj([("b", Node::int(1)), ("c", Node::int(1)), ("d", Node::int(2))]))
        );
    }

    #[test]
    fn test_cycle_inside_concatenated_object() {
        let root = obj([
            ("base", obj([("k", Node::int(0))])),
            (
                "a",
                Node::concat([
                    Node::subst("base"),
                    obj([("x", Node::subst("a.y")), ("y", Node::subst("a.x"))]),
                ]),
            ),
        ]);
        let err = resolve_tree(root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicReference);
    }

    #[test]
    fn test_self_reference_lower_value_sees_full_tree() {
        let top = obj([
            ("x", Node::int(2)),
            ("path", Node::concat([Node::subst("path"), Node::from("-a")])),
        ]);
        let bottom = obj([("x", Node::int(1)), ("path", Node::subst("x"))]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(at(&resolved, "path"), Some(&Node::from("2-a")));
    }

    #[test]
    fn test_self_reference_without_lower_value_fails() {
        let root = obj([("a", Node::subst("a"))]);
        let err = resolve_tree(root).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn test_optional_self_reference_without_lower_value_is_omitted() {
        let root = obj([("a", Node::optional_subst("a")), ("b", Node::int(1))]);
        let resolved = resolve_tree(root).unwrap();
        assert_eq!(resolved, obj([("b", Node::int(1))]));
    }

    #[test]
    fn test_optional_reference_falls_back_below_null_override() {
        let top = obj([("timeout", Node::Null), ("effective", Node::optional_subst("timeout"))]);
        let bottom = obj([("timeout", Node::int(30))]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(at(&resolved, "timeout"), Some(&Node::Null));
        assert_eq!(at(&resolved, "effective"), Some(&Node::int(30)));
    }

    #[test]
    fn test_object_layer_over_substitution_merges() {
        let top = obj([("branch", obj([("branch_name", "east".into())]))]);
        let bottom = obj([
            ("company", obj([("name", "acme".into())])),
            ("branch", Node::subst("company")),
        ]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(
            at(&resolved, "branch"),
            Some(&obj([("name", "acme".into()), ("branch_name", "east".into())]))
        );
    }

    #[test]
    fn test_substitution_layer_over_object_replaces_with_scalar() {
        let top = obj([("a", Node::subst("b")), ("b", Node::int(3))]);
        let bottom = obj([("a", obj([("x", Node::int(1))]))]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(at(&resolved, "a"), Some(&Node::int(3)));
    }

    #[test]
    fn test_higher_layer_value_is_seen_by_lower_reference() {
        let top = obj([("predefined", obj([("version", "2.0".into())]))]);
        let bottom = obj([
            ("predefined", obj([("version", "1.0".into())])),
            ("artifact", Node::subst("predefined.version")),
        ]);
        let resolved = resolve_layers(vec![top, bottom]).unwrap();
        assert_eq!(at(&resolved, "artifact"), Some(&Node::from("2.0")));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let root = obj([
            ("a", Node::subst("b.c")),
            ("b", obj([("c", Node::list([Node::from("x"), Node::Null]))])),
        ]);
        let once = resolve_tree(root).unwrap();
        let twice = resolve_tree(once.clone()).unwrap();
        assert!(once.is_resolved());
        assert_eq!(once, twice);
    }
}
