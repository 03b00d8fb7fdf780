//! Trie Iterator
//!
//! Walks the catalog trie with a parallel cursor into the per-clause
//! "used" overlay. A transition is refused when every registered key
//! beneath it has already been consumed in the current clause, which is
//! what keeps completion from re-suggesting spelled-out flags.

use std::rc::Rc;

use super::trie::{CommandTree, NodeRef, Payload, TrieNode, UsedOverlay};
use super::types::{CompleteOption, Level};

pub struct TrieIterator {
    overlay: Rc<UsedOverlay>,
    current: NodeRef,
    used: Option<NodeRef>,
}

/// Result of `next_options`: the reachable unconsumed payloads sorted by
/// name, their uniform level (None when mixed) and the merged prefix.
pub struct NextOptions {
    pub level: Option<Level>,
    pub options: Vec<CompleteOption>,
    pub merged: String,
}

impl CommandTree {
    pub fn iterator(&self) -> TrieIterator {
        TrieIterator::new(self)
    }
}

impl TrieIterator {
    pub(crate) fn new(tree: &CommandTree) -> TrieIterator {
        TrieIterator {
            overlay: Rc::clone(&tree.used),
            current: Rc::clone(&tree.root),
            used: Some(Rc::clone(&tree.used.root)),
        }
    }

    /// Advances both cursors by one character. Refused when the child is
    /// absent or fully consumed by the overlay.
    pub fn go_next(&mut self, c: char) -> bool {
        let next = match TrieNode::next(&self.current, c) {
            Some(n) => n,
            None => return false,
        };
        let next_used = self.used.as_ref().and_then(|u| TrieNode::next(u, c));
        if let Some(u) = &next_used {
            if TrieNode::count(&next) <= TrieNode::count(u) {
                return false;
            }
        }
        self.current = next;
        self.used = next_used;
        true
    }

    /// Collapses through nodes that have exactly one unconsumed outgoing
    /// byte, stopping at the first unconsumed payload. Fails on a branch
    /// with more than one live child, or on a dead end without a payload.
    pub fn go_to_end(&mut self) -> bool {
        let mut current = Rc::clone(&self.current);
        let mut used = self.used.clone();

        loop {
            let stop = {
                let n = current.borrow();
                if n.children.is_empty() {
                    if n.payload.is_none() {
                        return false;
                    }
                    true
                } else {
                    match &n.payload {
                        Some(p) => !self.overlay.contains(&p.key),
                        None => false,
                    }
                }
            };
            if stop {
                break;
            }

            let mut paths = 0;
            let mut next_current = None;
            let mut next_used = None;
            {
                let n = current.borrow();
                for (&c, child) in &n.children {
                    let u = used.as_ref().and_then(|u| TrieNode::next(u, c));
                    if let Some(un) = &u {
                        if TrieNode::count(child) <= TrieNode::count(un) {
                            continue;
                        }
                    }
                    paths += 1;
                    if paths > 1 {
                        return false;
                    }
                    next_current = Some(Rc::clone(child));
                    next_used = u;
                }
            }
            let next = match next_current {
                Some(n) if paths == 1 => n,
                _ => return false,
            };
            current = next;
            used = next_used;
        }

        self.current = current;
        self.used = used;
        true
    }

    pub fn level(&self) -> Option<Level> {
        self.current.borrow().payload.as_ref().map(|p| p.level)
    }

    /// The key of the payload under the cursor, or an empty string.
    pub fn key(&self) -> String {
        self.current
            .borrow()
            .payload
            .as_ref()
            .map(|p| p.key.clone())
            .unwrap_or_default()
    }

    pub fn payload(&self) -> Option<Payload> {
        self.current.borrow().payload.clone()
    }

    pub fn next_tree(&self) -> Option<Rc<CommandTree>> {
        self.current
            .borrow()
            .payload
            .as_ref()
            .and_then(|p| p.subtree.clone())
    }

    /// Enumerates every unconsumed payload reachable from the cursor,
    /// sorted by name, together with the merged prefix. A fully merged
    /// single option gains a trailing delimiter: `=` for a flag, a space
    /// otherwise.
    pub fn next_options(&self) -> NextOptions {
        let (mut merged, mut options) = self.collect(&self.current);
        options.sort_by(|a, b| a.name.cmp(&b.name));

        let mut level = None;
        for (i, o) in options.iter().enumerate() {
            if i == 0 {
                level = Some(o.level);
            } else if level != Some(o.level) {
                level = None;
                break;
            }
        }

        if options.len() == 1 {
            merged.push(if level == Some(Level::Flag) { '=' } else { ' ' });
        }

        NextOptions { level, options, merged }
    }

    /// Merging stops at a node that itself carries an unconsumed payload,
    /// so the merged prefix stays a prefix of every returned option.
    fn collect(&self, node: &NodeRef) -> (String, Vec<CompleteOption>) {
        let n = node.borrow();
        let mut options = Vec::new();
        let mut self_open = false;

        if let Some(p) = &n.payload {
            if !self.overlay.contains(&p.key) {
                options.push(CompleteOption {
                    level: p.level,
                    name: p.key.clone(),
                });
                self_open = true;
            }
        }

        let mut chars: Vec<char> = n.children.keys().copied().collect();
        chars.sort_unstable();

        let mut live = 0;
        let mut last_char = '\0';
        let mut last_merged = String::new();
        for c in chars {
            let (merged, opts) = self.collect(&n.children[&c]);
            if opts.is_empty() {
                continue;
            }
            options.extend(opts);
            last_char = c;
            last_merged = merged;
            live += 1;
        }

        if live == 1 && !self_open {
            return (format!("{}{}", last_char, last_merged), options);
        }
        (String::new(), options)
    }
}
