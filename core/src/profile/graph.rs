//! Arena-backed profile graph and its reconstruction from stored blobs.
//!
//! Reading a token loads its blob, then its parent (which is itself read in
//! full, children included), then every child recursively with the current
//! node passed down as the known parent. The same token may therefore
//! appear in more than one node: a profile read by token shows up again
//! under its parent's children when the parent lists it.

use std::collections::HashSet;

use crate::error::StoreError;

use super::Profile;

/// Handle to a node inside one `ProfileGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    profile: Profile,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// ---------------------------------------------------------------------------
// ProfileGraph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProfileGraph {
    nodes: Vec<Node>,
    root: NodeId,
}

impl ProfileGraph {
    /// A graph holding a single, unlinked profile.
    pub fn new(root: Profile) -> Self {
        let mut graph = ProfileGraph {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        graph.root = graph.insert(root);
        graph
    }

    /// The node that was asked for.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_profile(&self) -> &Profile {
        self.profile(self.root)
    }

    pub fn profile(&self, id: NodeId) -> &Profile {
        &self.nodes[id.0].profile
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn parent_profile(&self, id: NodeId) -> Option<&Profile> {
        self.parent(id).map(|p| self.profile(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if chain.contains(&p) {
                break;
            }
            chain.push(p);
            cursor = self.parent(p);
        }
        chain
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Profile)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i), &n.profile))
    }

    /// Add a detached node.
    pub fn insert(&mut self, profile: Profile) -> NodeId {
        self.nodes.push(Node {
            profile,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Link `child` to `parent` without registering it among the parent's children.
    pub fn attach_parent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child.0].parent = Some(parent);
    }

    /// Append `child` to `parent`'s children and point it back at `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Materialize `token` and everything reachable from it.
    ///
    /// `loader` returns the stored record for a token, or `None` when no
    /// blob exists. An empty token, or a token the loader does not know,
    /// yields `Ok(None)`.
    pub fn load<F>(token: &str, mut loader: F) -> Result<Option<ProfileGraph>, StoreError>
    where
        F: FnMut(&str) -> Result<Option<Profile>, StoreError>,
    {
        if token.is_empty() {
            return Ok(None);
        }
        let profile = match loader(token)? {
            Some(p) => p,
            None => return Ok(None),
        };

        let mut builder = Builder {
            loader: &mut loader,
            graph: ProfileGraph {
                nodes: Vec::new(),
                root: NodeId(0),
            },
            ancestors: HashSet::new(),
        };
        let root = builder.read(profile)?;
        let mut graph = builder.graph;
        graph.root = root;
        Ok(Some(graph))
    }
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

struct Builder<'a, F> {
    loader: &'a mut F,
    graph: ProfileGraph,
    /// Tokens on the upward chain of parent reads.
    ancestors: HashSet<String>,
}

impl<F> Builder<'_, F>
where
    F: FnMut(&str) -> Result<Option<Profile>, StoreError>,
{
    /// A top-level read: no known parent, fresh descent path.
    fn read(&mut self, profile: Profile) -> Result<NodeId, StoreError> {
        self.ancestors.insert(profile.token().to_string());
        let mut descent = Vec::new();
        self.build(profile, None, &mut descent)
    }

    fn build(
        &mut self,
        profile: Profile,
        known_parent: Option<NodeId>,
        descent: &mut Vec<String>,
    ) -> Result<NodeId, StoreError> {
        let token = profile.token().to_string();
        let parent_token = profile.parent_token().map(str::to_string);
        let child_tokens = profile.child_tokens().to_vec();
        let id = self.graph.insert(profile);

        let mut parent = known_parent;
        if parent.is_none() {
            if let Some(pt) = parent_token {
                if self.ancestors.contains(&pt) {
                    log::warn!("profile {} names ancestor {} as its parent, not following", token, pt);
                } else if let Some(pp) = (self.loader)(&pt)? {
                    parent = Some(self.read(pp)?);
                }
            }
        }
        if let Some(p) = parent {
            self.graph.attach_parent(id, p);
        }

        descent.push(token);
        for child in child_tokens {
            if child.is_empty() {
                continue;
            }
            if descent.contains(&child) {
                log::warn!("profile {} lists ancestor {} as a child, not following", descent[descent.len() - 1], child);
                continue;
            }
            let Some(cp) = (self.loader)(&child)? else {
                continue;
            };
            let cid = self.build(cp, Some(id), descent)?;
            self.graph.add_child(id, cid);
        }
        descent.pop();

        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn profile(token: &str, parent: Option<&str>, children: &[&str]) -> Profile {
        let mut p = Profile::new(token);
        p.set_parent_token(parent.map(String::from));
        for c in children {
            p.add_child_token(*c);
        }
        p.set_ip("127.0.0.1");
        p
    }

    fn store(profiles: Vec<Profile>) -> HashMap<String, Profile> {
        profiles
            .into_iter()
            .map(|p| (p.token().to_string(), p))
            .collect()
    }

    fn load(map: &HashMap<String, Profile>, token: &str) -> Option<ProfileGraph> {
        ProfileGraph::load(token, |t| Ok(map.get(t).cloned())).unwrap()
    }

    fn tokens(graph: &ProfileGraph, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| graph.profile(*id).token().to_string())
            .collect()
    }

    #[test]
    fn empty_token_is_absent() {
        let map = store(vec![profile("", None, &[])]);
        assert!(load(&map, "").is_none());
    }

    #[test]
    fn unknown_token_is_absent() {
        let map = store(vec![profile("a", None, &[])]);
        assert!(load(&map, "zz").is_none());
    }

    #[test]
    fn single_profile() {
        let map = store(vec![profile("a", None, &[])]);
        let g = load(&map, "a").unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g.root_profile().token(), "a");
        assert!(g.parent(g.root()).is_none());
        assert!(g.children(g.root()).is_empty());
    }

    #[test]
    fn parent_without_registered_child_has_no_children() {
        let map = store(vec![profile("t1", None, &[]), profile("t2", Some("t1"), &[])]);
        let g = load(&map, "t2").unwrap();
        let parent = g.parent(g.root()).unwrap();
        assert_eq!(g.profile(parent).token(), "t1");
        assert!(g.children(parent).is_empty());
    }

    #[test]
    fn parent_with_registered_child_lists_it() {
        let map = store(vec![
            profile("t1", None, &["t2"]),
            profile("t2", Some("t1"), &[]),
        ]);
        let g = load(&map, "t2").unwrap();
        let parent = g.parent(g.root()).unwrap();
        assert_eq!(tokens(&g, g.children(parent)), ["t2"]);
        // The child under the parent is a separate node from the root.
        assert_ne!(g.children(parent)[0], g.root());
        assert_eq!(g.parent(g.children(parent)[0]), Some(parent));
    }

    #[test]
    fn children_expand_recursively_in_order() {
        let map = store(vec![
            profile("r", None, &["a", "b"]),
            profile("a", Some("r"), &["a1"]),
            profile("b", Some("r"), &[]),
            profile("a1", Some("a"), &[]),
        ]);
        let g = load(&map, "r").unwrap();
        assert_eq!(tokens(&g, g.children(g.root())), ["a", "b"]);
        let a = g.children(g.root())[0];
        assert_eq!(tokens(&g, g.children(a)), ["a1"]);
        assert_eq!(g.parent(a), Some(g.root()));
        assert_eq!(g.len(), 4);
    }

    #[test]
    fn children_do_not_reread_their_parent() {
        let map = store(vec![
            profile("r", None, &["a", "b"]),
            profile("a", Some("r"), &[]),
            profile("b", Some("r"), &[]),
        ]);
        let calls = Cell::new(0);
        let g = ProfileGraph::load("r", |t| {
            calls.set(calls.get() + 1);
            Ok(map.get(t).cloned())
        })
        .unwrap()
        .unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(g.len(), 3);
    }

    #[test]
    fn missing_and_empty_children_are_skipped() {
        let map = store(vec![
            profile("r", None, &["", "gone", "here"]),
            profile("here", Some("r"), &[]),
        ]);
        let g = load(&map, "r").unwrap();
        assert_eq!(tokens(&g, g.children(g.root())), ["here"]);
    }

    #[test]
    fn missing_parent_leaves_node_detached() {
        let map = store(vec![profile("orphan", Some("gone"), &[])]);
        let g = load(&map, "orphan").unwrap();
        assert!(g.parent(g.root()).is_none());
        assert_eq!(g.root_profile().parent_token(), Some("gone"));
    }

    #[test]
    fn grandparent_chain_is_materialized() {
        let map = store(vec![
            profile("g", None, &[]),
            profile("p", Some("g"), &[]),
            profile("c", Some("p"), &[]),
        ]);
        let g = load(&map, "c").unwrap();
        assert_eq!(tokens(&g, &g.ancestors(g.root())), ["p", "g"]);
    }

    #[test]
    fn parent_cycle_terminates() {
        let map = store(vec![profile("x", Some("y"), &[]), profile("y", Some("x"), &[])]);
        let g = load(&map, "x").unwrap();
        let parent = g.parent(g.root()).unwrap();
        assert_eq!(g.profile(parent).token(), "y");
        assert!(g.parent(parent).is_none());
    }

    #[test]
    fn child_cycle_terminates() {
        let map = store(vec![profile("x", None, &["y"]), profile("y", None, &["x"])]);
        let g = load(&map, "x").unwrap();
        assert_eq!(g.len(), 2);
        let y = g.children(g.root())[0];
        assert!(g.children(y).is_empty());
    }

    #[test]
    fn self_child_terminates() {
        let map = store(vec![profile("x", None, &["x"])]);
        let g = load(&map, "x").unwrap();
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn loader_error_propagates() {
        let result = ProfileGraph::load("a", |t| {
            if t == "a" {
                Ok(Some(profile("a", None, &["b"])))
            } else {
                Err(StoreError::InvalidToken(t.to_string()))
            }
        });
        assert!(matches!(result, Err(StoreError::InvalidToken(_))));
    }

    #[test]
    fn manual_linking() {
        let mut g = ProfileGraph::new(Profile::new("root"));
        let kid = g.insert(Profile::new("kid"));
        g.add_child(g.root(), kid);
        assert_eq!(g.parent_profile(kid).map(|p| p.token()), Some("root"));
        let other = g.insert(Profile::new("other"));
        g.attach_parent(other, kid);
        assert_eq!(g.parent(other), Some(kid));
        assert!(g.children(kid).is_empty());
        assert_eq!(g.iter().count(), 3);
    }
}
