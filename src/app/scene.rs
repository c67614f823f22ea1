use anyhow::{anyhow, Result};

/// Handle to a node of a [`SceneGraph`]. Stale once the node is removed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<T> {
    payload: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A forest of payloads stored in a flat arena. Freed slots are reused.
#[derive(Debug)]
pub struct SceneGraph<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<usize>,
}

impl<T> Default for SceneGraph<T> {
    fn default() -> Self {
        Self { nodes: Vec::new(), free: Vec::new() }
    }
}

impl<T> SceneGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, payload: T) -> NodeId {
        self.insert(Node { payload, parent: None, children: Vec::new() })
    }

    pub fn add_child(&mut self, parent: NodeId, payload: T) -> Result<NodeId> {
        if self.node(parent).is_none() {
            return Err(anyhow!("Scene node {:?} does not exist.", parent));
        }

        let child = self.insert(Node { payload, parent: Some(parent), children: Vec::new() });
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(child);
        }

        Ok(child)
    }

    /// Detaches `node` and returns the removed payloads, children first.
    /// Without `recursive` the children stay in the graph as new roots.
    pub fn remove(&mut self, node: NodeId, recursive: bool) -> Vec<T> {
        let parent = match self.node(node) {
            Some(n) => n.parent,
            None => return Vec::new(),
        };

        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|c| *c != node);
        }

        let mut removed = Vec::new();
        if recursive {
            for id in self.post_order(node) {
                removed.extend(self.take(id));
            }
        } else {
            let children = self.node(node).map(|n| n.children.clone()).unwrap_or_default();
            for child in children {
                if let Some(child) = self.node_mut(child) {
                    child.parent = None;
                }
            }
            removed.extend(self.take(node));
        }

        removed
    }

    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.node(node).map(|n| &n.payload)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.node_mut(node).map(|n| &mut n.payload)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().filter(|n| n.parent.is_none()).map(|_| NodeId(i)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits the subtree under `root`, every child before its parent and
    /// siblings in insertion order.
    pub fn traverse_post_order(&self, root: NodeId, mut visit: impl FnMut(NodeId, &T)) {
        for id in self.post_order(root) {
            if let Some(node) = self.node(id) {
                visit(id, &node.payload);
            }
        }
    }

    /// Hands every payload under `root` to `enqueue` in post-order. Stops at
    /// the first payload `enqueue` rejects and returns `false`.
    pub fn enqueue_all(&self, root: NodeId, mut enqueue: impl FnMut(&T) -> bool) -> bool {
        self.post_order(root)
            .into_iter()
            .filter_map(|id| self.get(id))
            .all(|payload| enqueue(payload))
    }

    fn post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.node(root).is_none() {
            return order;
        }

        // (node, children already pushed)
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }

            stack.push((id, true));
            for child in self.children(id).iter().rev() {
                stack.push((*child, false));
            }
        }

        order
    }

    fn insert(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn take(&mut self, node: NodeId) -> Option<T> {
        let taken = self.nodes.get_mut(node.0)?.take()?;
        self.free.push(node.0);
        Some(taken.payload)
    }

    fn node(&self, node: NodeId) -> Option<&Node<T>> {
        self.nodes.get(node.0)?.as_ref()
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(node.0)?.as_mut()
    }
}
