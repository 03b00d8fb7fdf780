//! Variable Scoping Tree
//!
//! Bindings live in two tries: `global`, shared by handle across every
//! context spawned from the same root, and `local`, owned per scope.
//! Copying a tree shares the globals and shallow-copies the local root;
//! inserting a local rebuilds the key path with fresh nodes while sharing
//! untouched sibling subtrees, so a child scope never mutates its parent.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::expression::ExprRef;
use super::types::{CompleteOption, Completion, Level};
use super::value::Value;

/// A variable payload: either a plain value or a callable whose value is
/// computed on lookup.
#[derive(Clone)]
pub enum Binding {
    Value(Value),
    Callable(ExprRef),
}

impl From<Value> for Binding {
    fn from(v: Value) -> Binding {
        Binding::Value(v)
    }
}

pub struct VariableBinding {
    pub name: String,
    pub payload: Binding,
}

#[derive(Clone, Default)]
pub struct VariableNode {
    children: HashMap<char, Rc<VariableNode>>,
    binding: Option<Rc<VariableBinding>>,
}

impl VariableNode {
    /// Path-reconstruction insert: every node along the key is freshly
    /// allocated, siblings are shared with the source tree unchanged.
    pub fn insert(&mut self, key: &str, payload: Binding) {
        let chars: Vec<char> = key.chars().collect();
        let (first, rest) = match chars.split_first() {
            Some(split) => split,
            None => return,
        };
        let child = Self::rebuilt(self.children.get(first), rest, key, payload);
        self.children.insert(*first, Rc::new(child));
    }

    fn rebuilt(
        node: Option<&Rc<VariableNode>>,
        rest: &[char],
        key: &str,
        payload: Binding,
    ) -> VariableNode {
        let mut fresh = match node {
            Some(n) => VariableNode {
                children: n.children.clone(),
                binding: n.binding.clone(),
            },
            None => VariableNode::default(),
        };
        match rest.split_first() {
            None => {
                fresh.binding = Some(Rc::new(VariableBinding {
                    name: key.to_string(),
                    payload,
                }));
            }
            Some((c, tail)) => {
                let child = Self::rebuilt(fresh.children.get(c), tail, key, payload);
                fresh.children.insert(*c, Rc::new(child));
            }
        }
        fresh
    }

    pub fn get(&self, key: &str) -> Option<Rc<VariableBinding>> {
        let mut chars = key.chars();
        let first = chars.next()?;
        let mut node = Rc::clone(self.children.get(&first)?);
        for c in chars {
            let next = Rc::clone(node.children.get(&c)?);
            node = next;
        }
        node.binding.clone()
    }

    /// Completion sweep: collects the bindings strictly below the node
    /// and the longest unambiguous suffix. Merging stops at a node that
    /// carries a binding, so the merge stays a prefix of every option.
    fn collect(&self) -> (String, Vec<CompleteOption>) {
        let mut options = Vec::new();
        let mut chars: Vec<char> = self.children.keys().copied().collect();
        chars.sort_unstable();

        let mut last_char = '\0';
        let mut last_merged = String::new();
        let mut last_bound = false;
        for c in &chars {
            let child = &self.children[c];
            if let Some(b) = &child.binding {
                options.push(CompleteOption {
                    level: Level::Variable,
                    name: b.name.clone(),
                });
            }
            let (merged, opts) = child.collect();
            options.extend(opts);
            last_char = *c;
            last_merged = merged;
            last_bound = child.binding.is_some();
        }

        if chars.len() == 1 {
            if last_bound {
                return (last_char.to_string(), options);
            }
            return (format!("{}{}", last_char, last_merged), options);
        }
        (String::new(), options)
    }
}

pub struct VariableTree {
    global: Rc<RefCell<VariableNode>>,
    local: VariableNode,
}

impl VariableTree {
    pub fn new() -> VariableTree {
        VariableTree {
            global: Rc::new(RefCell::new(VariableNode::default())),
            local: VariableNode::default(),
        }
    }

    /// Shares the globals, shallow-copies the local root.
    pub fn copy(&self) -> VariableTree {
        VariableTree {
            global: Rc::clone(&self.global),
            local: self.local.clone(),
        }
    }

    pub fn add_global(&self, name: &str, payload: Binding) {
        self.global.borrow_mut().insert(name, payload);
    }

    pub fn add_local(&mut self, name: &str, payload: Binding) {
        self.local.insert(name, payload);
    }

    /// Local bindings shadow globals.
    pub fn get(&self, name: &str) -> Option<Binding> {
        if let Some(b) = self.local.get(name) {
            return Some(b.payload.clone());
        }
        self.global.borrow().get(name).map(|b| b.payload.clone())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.local.get(name).is_some() || self.global.borrow().get(name).is_some()
    }
}

impl Default for VariableTree {
    fn default() -> Self {
        Self::new()
    }
}

enum VarCursor {
    Root,
    Node(Rc<VariableNode>),
}

/// Walks the global and local tries in parallel. Unlike the command
/// iterator there is no used overlay: a variable may be referenced any
/// number of times in a clause.
pub struct VariableIterator {
    tree: Rc<RefCell<VariableTree>>,
    global: Option<VarCursor>,
    local: Option<VarCursor>,
}

impl VariableIterator {
    pub fn new(tree: Rc<RefCell<VariableTree>>) -> VariableIterator {
        VariableIterator {
            tree,
            global: Some(VarCursor::Root),
            local: Some(VarCursor::Root),
        }
    }

    pub fn next(&mut self, c: char) -> bool {
        let tree = self.tree.borrow();
        self.global = match self.global.take() {
            Some(VarCursor::Root) => tree
                .global
                .borrow()
                .children
                .get(&c)
                .cloned()
                .map(VarCursor::Node),
            Some(VarCursor::Node(n)) => n.children.get(&c).cloned().map(VarCursor::Node),
            None => None,
        };
        self.local = match self.local.take() {
            Some(VarCursor::Root) => tree.local.children.get(&c).cloned().map(VarCursor::Node),
            Some(VarCursor::Node(n)) => n.children.get(&c).cloned().map(VarCursor::Node),
            None => None,
        };
        self.global.is_some() || self.local.is_some()
    }

    /// The binding under the cursor, locals first.
    pub fn payload(&self) -> Option<Binding> {
        if let Some(VarCursor::Node(n)) = &self.local {
            if let Some(b) = &n.binding {
                return Some(b.payload.clone());
            }
        }
        if let Some(VarCursor::Node(n)) = &self.global {
            if let Some(b) = &n.binding {
                return Some(b.payload.clone());
            }
        }
        None
    }

    /// Union of the options on both sides; the merged prefix is the
    /// character-wise common prefix of the two merges, with an empty side
    /// deferring to the other.
    pub fn next_options(&self) -> Completion {
        let tree = self.tree.borrow();
        let (global_merged, global_options) = match &self.global {
            Some(VarCursor::Root) => tree.global.borrow().collect(),
            Some(VarCursor::Node(n)) => n.collect(),
            None => (String::new(), Vec::new()),
        };
        let (local_merged, local_options) = match &self.local {
            Some(VarCursor::Root) => tree.local.collect(),
            Some(VarCursor::Node(n)) => n.collect(),
            None => (String::new(), Vec::new()),
        };

        let merged = if !global_merged.is_empty() && !local_merged.is_empty() {
            global_merged
                .chars()
                .zip(local_merged.chars())
                .take_while(|(g, l)| g == l)
                .map(|(g, _)| g)
                .collect()
        } else if global_merged.is_empty() {
            local_merged
        } else {
            global_merged
        };

        let mut options = global_options;
        options.extend(local_options);
        options.sort_by(|a, b| a.name.cmp(&b.name));

        Completion { options, merged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(n: i64) -> Binding {
        Binding::Value(Value::Number(n))
    }

    fn number_of(b: Binding) -> i64 {
        match b {
            Binding::Value(v) => v.as_number(),
            Binding::Callable(_) => panic!("expected a value binding"),
        }
    }

    #[test]
    fn test_copy_on_write_insert() {
        let mut original = VariableNode::default();
        original.insert("a", value(1));
        original.insert("abc", value(123));

        assert_eq!(number_of(original.get("a").unwrap().payload.clone()), 1);
        assert_eq!(number_of(original.get("abc").unwrap().payload.clone()), 123);

        let mut copied = original.clone();
        copied.insert("a", value(5));
        copied.insert("abcd", value(10));

        // the parent tree is untouched
        assert_eq!(number_of(original.get("a").unwrap().payload.clone()), 1);
        assert_eq!(number_of(original.get("abc").unwrap().payload.clone()), 123);
        assert!(original.get("abcd").is_none());

        assert_eq!(number_of(copied.get("a").unwrap().payload.clone()), 5);
        assert_eq!(number_of(copied.get("abc").unwrap().payload.clone()), 123);
        assert_eq!(number_of(copied.get("abcd").unwrap().payload.clone()), 10);

        let mut copied2 = copied.clone();
        copied2.insert("abcdf", value(20));
        assert_eq!(number_of(copied2.get("abcdf").unwrap().payload.clone()), 20);
        assert!(copied.get("abcdf").is_none());
    }

    #[test]
    fn test_local_shadows_global() {
        let mut tree = VariableTree::new();
        tree.add_global("abc", value(122));
        tree.add_local("ab", value(144));

        assert_eq!(number_of(tree.get("ab").unwrap()), 144);
        assert_eq!(number_of(tree.get("abc").unwrap()), 122);
        assert!(tree.get("missing").is_none());
    }

    #[test]
    fn test_copy_shares_globals() {
        let tree = VariableTree::new();
        let copied = tree.copy();
        tree.add_global("x", value(1));
        assert!(copied.exists("x"));
    }

    #[test]
    fn test_copy_isolates_locals() {
        let mut tree = VariableTree::new();
        tree.add_local("y", value(1));
        let mut copied = tree.copy();
        copied.add_local("y", value(2));
        copied.add_local("z", value(3));

        assert_eq!(number_of(tree.get("y").unwrap()), 1);
        assert!(!tree.exists("z"));
        assert_eq!(number_of(copied.get("y").unwrap()), 2);
    }

    #[test]
    fn test_iterator_walks_both_trees() {
        let mut tree = VariableTree::new();
        tree.add_global("abc", value(122));
        tree.add_local("ab", value(144));
        let tree = Rc::new(RefCell::new(tree));

        let mut it = VariableIterator::new(Rc::clone(&tree));
        assert!(it.next('a'));
        assert!(it.next('b'));
        assert_eq!(number_of(it.payload().unwrap()), 144);
        assert!(it.next('c'));
        assert_eq!(number_of(it.payload().unwrap()), 122);
        assert!(!it.next('d'));
    }

    #[test]
    fn test_iterator_next_options() {
        let tree = VariableTree::new();
        tree.add_global("abc", value(1));
        tree.add_global("afg", value(2));
        let tree = Rc::new(RefCell::new(tree));

        let it = VariableIterator::new(Rc::clone(&tree));
        let opts = it.next_options();
        assert_eq!(opts.merged, "a");
        assert_eq!(opts.options.len(), 2);
        assert_eq!(opts.options[0].name, "abc");
        assert_eq!(opts.options[1].name, "afg");

        tree.borrow().add_global("a", value(3));
        let mut it = VariableIterator::new(Rc::clone(&tree));
        let opts = it.next_options();
        assert_eq!(opts.merged, "a");
        assert_eq!(opts.options.len(), 3);
        assert_eq!(opts.options[0].name, "a");

        assert!(it.next('a'));
        let opts = it.next_options();
        assert_eq!(opts.merged, "");
        assert_eq!(opts.options.len(), 2);

        assert!(it.next('f'));
        let opts = it.next_options();
        assert_eq!(opts.merged, "g");
        assert_eq!(opts.options.len(), 1);
        assert_eq!(opts.options[0].name, "afg");
    }

    #[test]
    fn test_iterator_merges_local_and_global() {
        let mut tree = VariableTree::new();
        tree.add_global("var", value(1));
        tree.add_local("val", value(2));
        let tree = Rc::new(RefCell::new(tree));

        let it = VariableIterator::new(Rc::clone(&tree));
        let opts = it.next_options();
        // common prefix of "var" and "val"
        assert_eq!(opts.merged, "va");
        assert_eq!(opts.options.len(), 2);
        assert_eq!(opts.options[0].name, "val");
        assert_eq!(opts.options[1].name, "var");
    }
}
