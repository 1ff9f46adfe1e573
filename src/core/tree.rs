//! core::tree
//!
//! The command resolution tree.
//!
//! # Architecture
//!
//! A [`CommandTree`] is an arena of nodes addressed by [`NodeId`]. Node 0 is
//! the namespace root. Every other node holds one path segment, an ordered
//! list of children (insertion order) and a back-reference to its parent.
//! All traversals are iterative, so deep trees cannot exhaust the stack.
//!
//! # Invariants
//!
//! - Siblings have pairwise-distinct content
//! - A node with no children is a leaf (an invokable operation); a node with
//!   children is a namespace
//! - Parent links are only used for diagnostics, never to decide resolution
//!
//! # Example
//!
//! ```
//! use translator_module::core::tree::CommandTree;
//!
//! let mut tree = CommandTree::new("translator");
//! tree.insert(["mosfire", "expose"]);
//! tree.insert(["mosfire", "status", "read"]);
//!
//! let res = tree.resolve(&["mosfire", "expose", "--exptime", "10"]);
//! assert!(res.is_leaf);
//! assert_eq!(res.prefix(), "mosfire.expose");
//! assert_eq!(res.remaining, ["--exptime", "10"]);
//! ```

/// Index of a node inside a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    content: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Result of resolving a token list against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Consumed tokens, not including a leading root label.
    pub matched: Vec<String>,
    /// Tokens after the split point.
    pub remaining: Vec<String>,
    /// Whether the node reached is invokable.
    pub is_leaf: bool,
}

impl Resolution {
    /// The matched tokens joined with `.`.
    pub fn prefix(&self) -> String {
        self.matched.join(".")
    }
}

/// One entry of a pre-order walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkEntry {
    pub id: NodeId,
    /// Distance from the root (the root itself is depth 0).
    pub depth: usize,
}

/// Ordered tree of operation path segments.
#[derive(Debug, Clone)]
pub struct CommandTree {
    nodes: Vec<Node>,
}

impl CommandTree {
    /// Create a tree whose root carries `root` as its label.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node {
                content: root.into(),
                children: Vec::new(),
                parent: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_label(&self) -> &str {
        &self.nodes[0].content
    }

    pub fn content(&self, id: NodeId) -> &str {
        &self.nodes[id.0].content
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn find_child(&self, id: NodeId, content: &str) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].content == content)
    }

    fn add_child(&mut self, parent: NodeId, content: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            content: content.to_string(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Insert a full path, creating nodes as needed.
    ///
    /// A leading segment equal to the root label is consumed without
    /// descending. Inserting an existing path is a no-op.
    pub fn insert<I, S>(&mut self, path: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut node = self.root();
        let mut first = true;
        for segment in path {
            let segment = segment.as_ref();
            if first && segment == self.root_label() {
                first = false;
                continue;
            }
            first = false;
            node = match self.find_child(node, segment) {
                Some(child) => child,
                None => self.add_child(node, segment),
            };
        }
    }

    /// Find where `tokens` stop naming a path and start being arguments.
    ///
    /// Tokens are consumed while a child with the same content exists. A
    /// leading root label is consumed first. Zero tokens resolve to an empty,
    /// non-leaf result.
    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Resolution {
        if tokens.is_empty() {
            return Resolution {
                matched: Vec::new(),
                remaining: Vec::new(),
                is_leaf: false,
            };
        }

        let mut node = self.root();
        let mut idx = 0;
        if tokens[0].as_ref() == self.root_label() {
            idx = 1;
        }

        let mut matched = Vec::new();
        while idx < tokens.len() {
            let token = tokens[idx].as_ref();
            match self.find_child(node, token) {
                Some(child) => {
                    node = child;
                    matched.push(token.to_string());
                    idx += 1;
                }
                None => break,
            }
        }

        Resolution {
            matched,
            remaining: tokens[idx..].iter().map(|t| t.as_ref().to_string()).collect(),
            is_leaf: self.is_leaf(node),
        }
    }

    /// Segments from the root down to `id`, root label excluded.
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                break;
            }
            segments.push(self.nodes[node.0].content.clone());
            current = self.nodes[node.0].parent;
        }
        segments.reverse();
        segments
    }

    /// Pre-order walk from the root, children in insertion order.
    pub fn walk(&self) -> Vec<WalkEntry> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![WalkEntry {
            id: self.root(),
            depth: 0,
        }];
        while let Some(entry) = stack.pop() {
            out.push(entry);
            for child in self.children(entry.id).iter().rev() {
                stack.push(WalkEntry {
                    id: *child,
                    depth: entry.depth + 1,
                });
            }
        }
        out
    }

    /// Paths of every leaf, in walk order.
    pub fn leaves(&self) -> Vec<Vec<String>> {
        self.walk()
            .into_iter()
            .filter(|e| e.id != self.root() && self.is_leaf(e.id))
            .map(|e| self.path_of(e.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> CommandTree {
        let mut tree = CommandTree::new("translator");
        tree.insert(["mosfire", "expose"]);
        tree.insert(["mosfire", "status", "read"]);
        tree
    }

    mod insert {
        use super::*;

        #[test]
        fn shares_common_prefixes() {
            let tree = scenario();
            // root, mosfire, expose, status, read
            assert_eq!(tree.len(), 5);
            let root_children = tree.children(tree.root());
            assert_eq!(root_children.len(), 1);
            assert_eq!(tree.content(root_children[0]), "mosfire");
        }

        #[test]
        fn is_idempotent() {
            let mut tree = scenario();
            tree.insert(["mosfire", "expose"]);
            tree.insert(["mosfire", "status", "read"]);
            assert_eq!(tree.len(), 5);
        }

        #[test]
        fn consumes_leading_root_label() {
            let mut tree = scenario();
            tree.insert(["translator", "mosfire", "expose"]);
            tree.insert(["translator", "kpf", "go"]);
            assert_eq!(tree.len(), 7);
            assert_eq!(tree.leaves()[2], ["kpf", "go"]);
        }

        #[test]
        fn empty_path_is_noop() {
            let mut tree = CommandTree::new("translator");
            tree.insert(Vec::<String>::new());
            assert!(tree.is_empty());
        }

        #[test]
        fn children_keep_insertion_order() {
            let mut tree = CommandTree::new("root");
            tree.insert(["zeta"]);
            tree.insert(["alpha"]);
            tree.insert(["mid"]);
            let names: Vec<_> = tree
                .children(tree.root())
                .iter()
                .map(|c| tree.content(*c))
                .collect();
            assert_eq!(names, ["zeta", "alpha", "mid"]);
        }
    }

    mod resolve {
        use super::*;

        #[test]
        fn full_path_is_leaf() {
            let res = scenario().resolve(&["mosfire", "expose"]);
            assert!(res.is_leaf);
            assert!(res.remaining.is_empty());
            assert_eq!(res.prefix(), "mosfire.expose");
        }

        #[test]
        fn namespace_is_not_leaf() {
            let res = scenario().resolve(&["mosfire", "status"]);
            assert!(!res.is_leaf);
            assert!(res.remaining.is_empty());
            assert_eq!(res.prefix(), "mosfire.status");
        }

        #[test]
        fn unknown_child_splits() {
            let res = scenario().resolve(&["mosfire", "missing", "x"]);
            assert!(!res.is_leaf);
            assert_eq!(res.remaining, ["missing", "x"]);
            assert_eq!(res.matched, ["mosfire"]);
        }

        #[test]
        fn leaf_with_arguments() {
            let res = scenario().resolve(&["mosfire", "status", "read", "ITIME", "-v"]);
            assert!(res.is_leaf);
            assert_eq!(res.remaining, ["ITIME", "-v"]);
        }

        #[test]
        fn root_label_is_consumed() {
            let res = scenario().resolve(&["translator", "mosfire", "expose"]);
            assert!(res.is_leaf);
            assert_eq!(res.matched, ["mosfire", "expose"]);
        }

        #[test]
        fn no_common_prefix() {
            let res = scenario().resolve(&["kpf", "go"]);
            assert!(res.matched.is_empty());
            assert_eq!(res.remaining, ["kpf", "go"]);
            assert!(!res.is_leaf);
        }

        #[test]
        fn no_common_prefix_on_bare_root() {
            let tree = CommandTree::new("translator");
            let res = tree.resolve(&["anything"]);
            assert_eq!(res.remaining, ["anything"]);
            assert!(res.is_leaf);
        }

        #[test]
        fn zero_tokens() {
            let res = scenario().resolve::<&str>(&[]);
            assert!(res.matched.is_empty());
            assert!(res.remaining.is_empty());
            assert!(!res.is_leaf);
            assert_eq!(res.prefix(), "");
        }

        #[test]
        fn argument_named_like_a_sibling_is_not_consumed_past_a_leaf() {
            let res = scenario().resolve(&["mosfire", "expose", "status"]);
            assert!(res.is_leaf);
            assert_eq!(res.remaining, ["status"]);
        }
    }

    mod traversal {
        use super::*;

        #[test]
        fn walk_is_preorder() {
            let tree = scenario();
            let names: Vec<_> = tree
                .walk()
                .iter()
                .map(|e| (tree.content(e.id).to_string(), e.depth))
                .collect();
            assert_eq!(
                names,
                [
                    ("translator".to_string(), 0),
                    ("mosfire".to_string(), 1),
                    ("expose".to_string(), 2),
                    ("status".to_string(), 2),
                    ("read".to_string(), 3),
                ]
            );
        }

        #[test]
        fn leaves_and_paths() {
            let tree = scenario();
            assert_eq!(
                tree.leaves(),
                vec![
                    vec!["mosfire".to_string(), "expose".to_string()],
                    vec![
                        "mosfire".to_string(),
                        "status".to_string(),
                        "read".to_string()
                    ],
                ]
            );
        }

        #[test]
        fn deep_tree_does_not_recurse() {
            let mut tree = CommandTree::new("root");
            let path: Vec<String> = (0..10_000).map(|i| format!("n{}", i)).collect();
            tree.insert(&path);
            let res = tree.resolve(&path);
            assert!(res.is_leaf);
            assert_eq!(tree.walk().len(), 10_001);
        }
    }
}
