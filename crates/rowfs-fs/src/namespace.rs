//! Arena of namespace nodes.
//!
//! The protocol layer refers to entries it has looked up until it forgets
//! them. Those entries live here, addressed by stable [`NodeId`] indices,
//! each carrying the [`Address`] it was classified as and the inode it was
//! reported under. Freed slots are reused.

use std::collections::{BTreeMap, HashMap};

use rowfs_types::{Address, Ino};

use crate::error::{FsError, FsResult};

/// Index of a node in the [`Namespace`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The mount root. Always present.
    pub const ROOT: Self = Self(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One known namespace entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    parent: Option<NodeId>,
    name: String,
    address: Address,
    ino: Ino,
    children: BTreeMap<String, NodeId>,
}

impl Node {
    /// `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn ino(&self) -> Ino {
        self.ino
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

/// The arena itself.
#[derive(Debug)]
pub struct Namespace {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    by_ino: HashMap<Ino, NodeId>,
}

impl Namespace {
    /// A namespace holding only the root.
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            name: String::new(),
            address: Address::Root,
            ino: Ino::ROOT,
            children: BTreeMap::new(),
        };
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            by_ino: HashMap::from([(Ino::ROOT, NodeId::ROOT)]),
        }
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Always `false`: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Like [`get`](Self::get), failing with `NotFound` for stale ids.
    pub fn node(&self, id: NodeId) -> FsResult<&Node> {
        self.get(id)
            .ok_or_else(|| FsError::NotFound(format!("node {}", id.0)))
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent)?.children.get(name).copied()
    }

    /// The node last reported under `ino`.
    pub fn by_ino(&self, ino: Ino) -> Option<NodeId> {
        self.by_ino.get(&ino).copied()
    }

    /// Record `name` under `parent`.
    ///
    /// If the child already exists its address and inode are refreshed and
    /// its id is returned unchanged, so repeated lookups of one name always
    /// yield one node.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        name: &str,
        address: Address,
        ino: Ino,
    ) -> FsResult<NodeId> {
        self.node(parent)?;

        if let Some(existing) = self.child(parent, name) {
            if let Some(node) = self.nodes[existing.0].as_mut() {
                let old = std::mem::replace(&mut node.ino, ino);
                node.address = address;
                if old != ino && self.by_ino.get(&old) == Some(&existing) {
                    self.by_ino.remove(&old);
                }
            }
            self.by_ino.insert(ino, existing);
            return Ok(existing);
        }

        let node = Node {
            parent: Some(parent),
            name: name.to_string(),
            address,
            ino,
            children: BTreeMap::new(),
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };

        if let Some(p) = self.nodes[parent.0].as_mut() {
            p.children.insert(name.to_string(), id);
        }
        self.by_ino.insert(ino, id);
        Ok(id)
    }

    /// Drop a leaf node. The root and nodes with children are kept.
    /// Returns `true` if the node was removed.
    pub fn forget(&mut self, id: NodeId) -> bool {
        let Some(node) = self.get(id) else {
            return false;
        };
        let Some(parent) = node.parent else {
            return false;
        };
        if !node.children.is_empty() {
            return false;
        }

        let name = node.name.clone();
        let ino = node.ino;
        if let Some(p) = self.nodes[parent.0].as_mut() {
            p.children.remove(&name);
        }
        if self.by_ino.get(&ino) == Some(&id) {
            self.by_ino.remove(&ino);
        }
        self.nodes[id.0] = None;
        self.free.push(id.0);
        true
    }

    /// Slash-joined path of a node, for logging.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = self.get(id);
        while let Some(node) = cur {
            match node.parent {
                Some(p) => {
                    parts.push(node.name.as_str());
                    cur = self.get(p);
                }
                None => break,
            }
        }
        parts.reverse();
        format!("/{}", parts.join("/"))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowfs_types::{FieldCatalog, RowId};

    fn catalog() -> FieldCatalog {
        FieldCatalog::with_default_base(["hoge", "fuga"]).unwrap()
    }

    fn group_ino(row: u64) -> Ino {
        catalog()
            .allocator()
            .group_ino(RowId::new(row).unwrap())
            .unwrap()
    }

    #[test]
    fn starts_with_root() {
        let ns = Namespace::new();
        let root = ns.get(NodeId::ROOT).unwrap();
        assert_eq!(root.address(), &Address::Root);
        assert_eq!(root.ino(), Ino::ROOT);
        assert!(root.parent().is_none());
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.by_ino(Ino::ROOT), Some(NodeId::ROOT));
    }

    #[test]
    fn insert_and_find_child() {
        let mut ns = Namespace::new();
        let id = ns
            .insert_child(NodeId::ROOT, "alpha", Address::group("alpha"), group_ino(3))
            .unwrap();

        assert_eq!(ns.child(NodeId::ROOT, "alpha"), Some(id));
        assert_eq!(ns.by_ino(group_ino(3)), Some(id));
        assert_eq!(ns.get(id).unwrap().parent(), Some(NodeId::ROOT));
        assert_eq!(ns.path(id), "/alpha");
    }

    #[test]
    fn insert_is_idempotent_and_refreshes_inode() {
        let mut ns = Namespace::new();
        let a = ns
            .insert_child(NodeId::ROOT, "alpha", Address::group("alpha"), group_ino(3))
            .unwrap();
        let b = ns
            .insert_child(NodeId::ROOT, "alpha", Address::group("alpha"), group_ino(5))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.get(a).unwrap().ino(), group_ino(5));
        assert_eq!(ns.by_ino(group_ino(3)), None);
        assert_eq!(ns.by_ino(group_ino(5)), Some(a));
    }

    #[test]
    fn insert_under_stale_parent_fails() {
        let mut ns = Namespace::new();
        let err = ns
            .insert_child(NodeId(42), "x", Address::group("x"), group_ino(1))
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[test]
    fn forget_leaf_and_reuse_slot() {
        let c = catalog();
        let mut ns = Namespace::new();
        let g = ns
            .insert_child(NodeId::ROOT, "alpha", Address::group("alpha"), group_ino(3))
            .unwrap();
        let hoge = c.lookup("hoge").unwrap();
        let data_ino = c.allocator().data_ino(RowId::new(3).unwrap(), hoge).unwrap();
        let d = ns
            .insert_child(g, "hoge", Address::data("alpha", hoge), data_ino)
            .unwrap();
        assert_eq!(ns.path(d), "/alpha/hoge");

        // Parent with a live child stays.
        assert!(!ns.forget(g));
        assert!(ns.forget(d));
        assert!(!ns.forget(d));
        assert!(ns.get(d).is_none());
        assert_eq!(ns.child(g, "hoge"), None);
        assert_eq!(ns.by_ino(data_ino), None);

        let again = ns
            .insert_child(g, "fuga", Address::data("alpha", c.lookup("fuga").unwrap()), group_ino(9))
            .unwrap();
        assert_eq!(again, d, "freed slot is reused");
    }

    #[test]
    fn root_cannot_be_forgotten() {
        let mut ns = Namespace::new();
        assert!(!ns.forget(NodeId::ROOT));
        assert!(!ns.is_empty());
    }
}
