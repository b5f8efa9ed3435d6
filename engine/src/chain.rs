//! Subcommand chain resolution.
//!
//! Walks the command tree following successive tokens that exactly match a
//! child's name. Resolution stops at the first token that does not; that
//! node parses the rest. There is no backtracking.

use tracing::debug;

use crate::node::CommandNode;

/// Outcome of walking the tree for one token sequence.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    /// Visited nodes, root first, final node last
    pub path: Vec<&'a CommandNode>,
    /// Matched subcommand names (the root is not included)
    pub chain: Vec<String>,
    /// Number of leading tokens consumed as command names
    pub consumed: usize,
}

impl<'a> Resolution<'a> {
    /// The node that parses the remaining tokens.
    pub fn target(&self) -> &'a CommandNode {
        // `path` always starts with the root.
        self.path[self.path.len() - 1]
    }

    /// Every node above the target, root first.
    pub fn ancestors(&self) -> &[&'a CommandNode] {
        &self.path[..self.path.len() - 1]
    }

    /// Tokens left for the target node.
    pub fn remaining<'t>(&self, tokens: &'t [String]) -> &'t [String] {
        tokens.get(self.consumed..).unwrap_or_default()
    }
}

/// Resolves which command handles `tokens`.
///
/// # Examples
///
/// ```
/// use flagtree_engine::{CommandNode, resolve_chain};
///
/// let mut root = CommandNode::new("git");
/// root.attach(CommandNode::new("remote")).attach(CommandNode::new("add"));
///
/// let tokens: Vec<String> = ["remote", "add", "origin"].into_iter().map(String::from).collect();
/// let resolution = resolve_chain(&root, &tokens);
///
/// assert_eq!(resolution.chain, vec!["remote", "add"]);
/// assert_eq!(resolution.target().name(), "add");
/// assert_eq!(resolution.remaining(&tokens), ["origin".to_string()]);
/// ```
pub fn resolve_chain<'a>(root: &'a CommandNode, tokens: &[String]) -> Resolution<'a> {
    let mut node = root;
    let mut path = vec![root];
    let mut chain = Vec::new();

    while let Some(child) = tokens.get(chain.len()).and_then(|t| node.subcommand(t)) {
        chain.push(child.name.clone());
        path.push(child);
        node = child;
    }

    debug!(root = %root.name, chain = ?chain, "Resolved command chain");
    Resolution {
        consumed: chain.len(),
        path,
        chain,
    }
}
