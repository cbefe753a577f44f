//! Object arena and parent/child links
//!
//! All scene nodes live in one [`OrderedSlotMap`]. Nodes refer to each other
//! only through [`ObjectHandle`]s, so growing the arena never invalidates a
//! link and a removed node's handle is recognised as stale instead of
//! dangling.

use slotmap::new_key_type;

use super::error::{SceneError, SceneResult};
use super::render_object::RenderObject;
use crate::foundation::collections::OrderedSlotMap;

new_key_type! {
    /// Stable, generation-checked reference to a scene node
    pub struct ObjectHandle;
}

/// Arena of scene nodes rooted at a single node
#[derive(Debug, Clone)]
pub struct ObjectGraph {
    objects: OrderedSlotMap<ObjectHandle, RenderObject>,
    root: ObjectHandle,
}

impl ObjectGraph {
    /// Create a graph holding only `root`
    pub fn new(mut root: RenderObject) -> Self {
        root.set_parent(None);
        let mut objects = OrderedSlotMap::new();
        let root = objects.insert(root);
        Self { objects, root }
    }

    /// The root node
    pub fn root(&self) -> ObjectHandle {
        self.root
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Always false; the root is never removed
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether `handle` names a live node
    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(handle)
    }

    /// Look up a node
    pub fn get(&self, handle: ObjectHandle) -> Option<&RenderObject> {
        self.objects.get(handle)
    }

    /// Look up a node for editing
    ///
    /// Links cannot be changed through the returned reference; use
    /// [`Self::reparent`].
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut RenderObject> {
        self.objects.get_mut(handle)
    }

    /// Nodes in insertion order, root first
    pub fn iter(&self) -> impl Iterator<Item = (ObjectHandle, &RenderObject)> + '_ {
        self.objects.iter()
    }

    /// Add `object` as the last child of `parent`
    pub fn insert(&mut self, parent: ObjectHandle, mut object: RenderObject) -> SceneResult<ObjectHandle> {
        if !self.contains(parent) {
            return Err(SceneError::ParentNotFound(parent));
        }
        // Inserted nodes start as leaves
        object.clear_children();
        object.set_parent(Some(parent));
        let handle = self.objects.insert(object);
        if let Some(parent) = self.objects.get_mut(parent) {
            parent.add_child(handle);
        }
        Ok(handle)
    }

    /// Parent of a node
    pub fn parent(&self, handle: ObjectHandle) -> Option<ObjectHandle> {
        self.get(handle).and_then(RenderObject::parent)
    }

    /// Children of a node, empty for stale handles
    pub fn children(&self, handle: ObjectHandle) -> &[ObjectHandle] {
        match self.get(handle) {
            Some(object) => object.children(),
            None => &[],
        }
    }

    /// Walk from the parent of `handle` up to the root
    pub fn ancestors(&self, handle: ObjectHandle) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.parent(handle),
        }
    }

    /// Number of links between `handle` and the root
    pub fn depth(&self, handle: ObjectHandle) -> Option<usize> {
        self.contains(handle).then(|| self.ancestors(handle).count())
    }

    /// `handle` and everything below it, parents before children
    pub fn subtree(&self, handle: ObjectHandle) -> Vec<ObjectHandle> {
        let mut out = Vec::new();
        if !self.contains(handle) {
            return out;
        }
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` lies on the path from `handle` to the root
    pub fn is_ancestor(&self, ancestor: ObjectHandle, handle: ObjectHandle) -> bool {
        self.ancestors(handle).any(|h| h == ancestor)
    }

    /// Check that `child` may be moved under `new_parent`
    pub fn check_reparent(&self, child: ObjectHandle, new_parent: ObjectHandle) -> SceneResult<()> {
        if !self.contains(child) {
            return Err(SceneError::InvalidHandle(child));
        }
        if !self.contains(new_parent) {
            return Err(SceneError::ParentNotFound(new_parent));
        }
        if child == new_parent || self.is_ancestor(child, new_parent) {
            return Err(SceneError::CyclicParent {
                child,
                parent: new_parent,
            });
        }
        Ok(())
    }

    /// Detach `child` from its parent and append it to `new_parent`'s children
    pub fn reparent(&mut self, child: ObjectHandle, new_parent: ObjectHandle) -> SceneResult<()> {
        self.check_reparent(child, new_parent)?;

        if let Some(old_parent) = self.parent(child) {
            if let Some(old) = self.objects.get_mut(old_parent) {
                old.remove_child(child);
            }
        }
        if let Some(node) = self.objects.get_mut(child) {
            node.set_parent(Some(new_parent));
        }
        if let Some(parent) = self.objects.get_mut(new_parent) {
            parent.add_child(child);
        }
        Ok(())
    }

    /// Remove a node and all of its descendants
    ///
    /// Returns the removed nodes, parents before children.
    pub fn remove_subtree(&mut self, handle: ObjectHandle) -> SceneResult<Vec<RenderObject>> {
        if handle == self.root {
            return Err(SceneError::RootRemoval);
        }
        if !self.contains(handle) {
            return Err(SceneError::InvalidHandle(handle));
        }

        if let Some(parent) = self.parent(handle) {
            if let Some(parent) = self.objects.get_mut(parent) {
                parent.remove_child(handle);
            }
        }
        Ok(self
            .subtree(handle)
            .into_iter()
            .filter_map(|h| self.objects.remove(h))
            .collect())
    }

    /// Drop every node except the root
    pub fn clear(&mut self) {
        let root = self.root;
        let others: Vec<_> = self.objects.keys().filter(|h| *h != root).collect();
        for handle in others {
            self.objects.remove(handle);
        }
        if let Some(root) = self.objects.get_mut(root) {
            for child in root.children().to_vec() {
                root.remove_child(child);
            }
        }
    }
}

/// Iterator over the ancestors of a node, nearest first
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    graph: &'a ObjectGraph,
    next: Option<ObjectHandle>,
}

impl Iterator for Ancestors<'_> {
    type Item = ObjectHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.graph.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::headless::{new_command_log, HeadlessModel, HeadlessShader};
    use crate::render::{Model, Shader, ShaderPaths};
    use std::rc::Rc;
    use std::sync::Arc;

    fn mesh(name: &str) -> RenderObject {
        let log = new_command_log();
        let model: Arc<dyn Model> = Arc::new(HeadlessModel::new("cube.obj", 1, Rc::clone(&log)));
        let shader: Arc<dyn Shader> = Arc::new(HeadlessShader::new(ShaderPaths::new("a.vs", "a.fs"), log));
        RenderObject::polygon_mesh(name, model, shader)
    }

    fn graph() -> ObjectGraph {
        ObjectGraph::new(RenderObject::null("root"))
    }

    #[test]
    fn test_insert_links_both_ways() {
        let mut graph = graph();
        let root = graph.root();
        let a = graph.insert(root, mesh("a")).unwrap();
        let b = graph.insert(root, mesh("b")).unwrap();

        assert_eq!(graph.children(root), &[a, b]);
        assert_eq!(graph.parent(a), Some(root));
        assert_eq!(graph.parent(root), None);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_insert_clone_starts_as_leaf() {
        let mut graph = graph();
        let root = graph.root();
        let a = graph.insert(root, mesh("a")).unwrap();
        let b = graph.insert(a, mesh("b")).unwrap();

        let copy = graph.get(a).cloned().unwrap();
        assert_eq!(copy.children(), &[b]);
        let c = graph.insert(root, copy).unwrap();

        assert!(graph.children(c).is_empty());
        assert_eq!(graph.parent(b), Some(a));
        assert_eq!(graph.subtree(c), vec![c]);
    }

    #[test]
    fn test_depth_matches_ancestor_walk() {
        let mut graph = graph();
        let root = graph.root();
        let a = graph.insert(root, mesh("a")).unwrap();
        let b = graph.insert(a, mesh("b")).unwrap();
        let c = graph.insert(b, mesh("c")).unwrap();

        assert_eq!(graph.depth(root), Some(0));
        assert_eq!(graph.depth(c), Some(3));
        let chain: Vec<_> = graph.ancestors(c).collect();
        assert_eq!(chain, vec![b, a, root]);
        assert_eq!(chain.last(), Some(&root));
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut graph = graph();
        let root = graph.root();
        let x = graph.insert(root, mesh("x")).unwrap();
        let y = graph.insert(root, mesh("y")).unwrap();

        graph.reparent(x, y).unwrap();

        assert_eq!(graph.children(y), &[x]);
        assert!(!graph.children(root).contains(&x));
        assert_eq!(graph.parent(x), Some(y));
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = graph();
        let root = graph.root();
        let a = graph.insert(root, mesh("a")).unwrap();
        let b = graph.insert(a, mesh("b")).unwrap();

        assert!(matches!(graph.reparent(a, a), Err(SceneError::CyclicParent { .. })));
        assert!(matches!(graph.reparent(a, b), Err(SceneError::CyclicParent { .. })));
        assert!(matches!(graph.reparent(root, b), Err(SceneError::CyclicParent { .. })));
        assert_eq!(graph.parent(a), Some(root));
        assert_eq!(graph.children(a), &[b]);
    }

    #[test]
    fn test_remove_subtree() {
        let mut graph = graph();
        let root = graph.root();
        let a = graph.insert(root, mesh("a")).unwrap();
        let b = graph.insert(a, mesh("b")).unwrap();
        let keep = graph.insert(root, mesh("keep")).unwrap();

        let removed = graph.remove_subtree(a).unwrap();
        let names: Vec<_> = removed.iter().map(RenderObject::name).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert!(!graph.contains(a));
        assert!(!graph.contains(b));
        assert_eq!(graph.children(root), &[keep]);
        assert!(matches!(graph.remove_subtree(a), Err(SceneError::InvalidHandle(_))));
        assert!(matches!(graph.remove_subtree(root), Err(SceneError::RootRemoval)));
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut graph = graph();
        let root = graph.root();
        let a = graph.insert(root, mesh("a")).unwrap();
        graph.remove_subtree(a).unwrap();
        let b = graph.insert(root, mesh("b")).unwrap();

        assert_ne!(a, b);
        assert!(graph.get(a).is_none());
        assert_eq!(graph.get(b).map(RenderObject::name), Some("b"));
    }

    #[test]
    fn test_clear_keeps_root() {
        let mut graph = graph();
        let root = graph.root();
        graph.insert(root, mesh("a")).unwrap();
        graph.clear();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.root(), root);
        assert!(graph.children(root).is_empty());
        assert_eq!(graph.get(graph.root()).map(RenderObject::name), Some("root"));
    }
}
