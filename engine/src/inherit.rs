//! Flag inheritance between parent and child commands.
//!
//! Inheritance runs when a child is attached, never during a parse. The
//! child's [`InheritMode`] decides what it receives:
//!
//! - [`InheritMode::None`]: nothing.
//! - [`InheritMode::DirectParent`]: a one-time snapshot of the parent's
//!   flags as they are at attach time.
//! - [`InheritMode::AllParents`]: the union of every ancestor's flags
//!   (nearest ancestor wins on a name clash). These nodes are refreshed each
//!   time their subtree is attached higher up, so a subtree built bottom-up
//!   still sees root flags once it is wired in.
//!
//! Local flags always win and copies are taken verbatim.

use std::collections::HashSet;

use flagtree_core::{FlagRegistry, ProcessedFlag};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::node::{CommandNode, ParentLink};

/// Which ancestor flags a command receives when attached.
///
/// # Examples
///
/// ```
/// use flagtree_engine::InheritMode;
///
/// assert_eq!(InheritMode::default(), InheritMode::None);
/// let mode: InheritMode = serde_json::from_str("\"all-parents\"").unwrap();
/// assert_eq!(mode, InheritMode::AllParents);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InheritMode {
    #[default]
    None,
    DirectParent,
    AllParents,
}

/// What a child can see of the command it is attached under.
pub(crate) struct ParentView<'a> {
    pub(crate) registry: &'a FlagRegistry,
    pub(crate) ancestry: &'a [ProcessedFlag],
    pub(crate) path: Vec<String>,
}

impl<'a> ParentView<'a> {
    pub(crate) fn of(parent: &'a CommandNode) -> Self {
        Self {
            registry: &parent.registry,
            ancestry: &parent.ancestry,
            path: parent.path(),
        }
    }
}

/// Union of the parent's flags and everything above it, nearest first.
fn lineage(view: &ParentView<'_>) -> Vec<ProcessedFlag> {
    let mut seen = HashSet::new();
    view.registry
        .all_flags()
        .iter()
        .chain(view.ancestry)
        .filter(|flag| seen.insert(flag.name.as_str()))
        .cloned()
        .collect()
}

/// Applies inheritance to a freshly attached child and re-walks its subtree.
pub(crate) fn attach_to(child: &mut CommandNode, view: &ParentView<'_>) {
    resolve(child, view, true);
}

fn resolve(node: &mut CommandNode, view: &ParentView<'_>, attaching: bool) {
    node.parent = Some(ParentLink {
        path: view.path.clone(),
    });
    node.ancestry = lineage(view);

    match node.inherit_mode {
        InheritMode::None => {}
        InheritMode::DirectParent => {
            if attaching {
                let copied = view
                    .registry
                    .all_flags()
                    .iter()
                    .filter(|flag| node.registry.insert_inherited(flag))
                    .count();
                debug!(command = %node.name, copied, "Inherited flags from direct parent");
            }
        }
        InheritMode::AllParents => {
            node.registry.remove_inherited();
            let copied = node
                .ancestry
                .iter()
                .filter(|flag| node.registry.insert_inherited(flag))
                .count();
            debug!(command = %node.name, copied, "Inherited flags from all parents");
        }
    }

    let CommandNode {
        name,
        registry,
        ancestry,
        children,
        parent,
        ..
    } = node;
    let mut path = parent.as_ref().map(|p| p.path.clone()).unwrap_or_default();
    path.push(name.clone());
    let below = ParentView {
        registry: &*registry,
        ancestry: ancestry.as_slice(),
        path,
    };
    for child in children.iter_mut() {
        resolve(child, &below, false);
    }
}

#[cfg(test)]
mod tests {
    use flagtree_core::{FlagDefinition, Value};

    use super::*;

    fn node(name: &str, flags: &[&str]) -> CommandNode {
        let mut node = CommandNode::new(name);
        for flag in flags {
            node.add_flag(FlagDefinition::new(*flag).option(format!("--{flag}")))
                .unwrap();
        }
        node
    }

    #[test]
    fn test_none_mode_keeps_only_local_flags() {
        let mut root = node("root", &["verbose"]);
        root.attach(node("child", &["name"]));
        let child = root.subcommand("child").unwrap();
        assert!(!child.has_flag("verbose"));
        assert!(child.has_flag("name"));
    }

    #[test]
    fn test_direct_parent_is_a_snapshot() {
        let mut parent = node("parent", &["verbose"]);
        parent.attach(node("child", &[]).with_inherit(InheritMode::DirectParent));
        parent
            .add_flag(FlagDefinition::new("late").option("--late"))
            .unwrap();

        let child = parent.subcommand("child").unwrap();
        assert!(child.has_flag("verbose"));
        assert!(!child.has_flag("late"));
    }

    #[test]
    fn test_direct_parent_ignores_grandparent() {
        let mut grand = node("grand", &["root-flag"]);
        let mut parent = node("parent", &["parent-flag"]);
        parent.attach(node("child", &[]).with_inherit(InheritMode::DirectParent));
        grand.attach(parent);

        let child = grand.subcommand("parent").unwrap().subcommand("child").unwrap();
        assert!(child.has_flag("parent-flag"));
        assert!(!child.has_flag("root-flag"));
    }

    #[test]
    fn test_all_parents_rewalks_bottom_up_builds() {
        let mut root = node("root", &["config"]);
        let mut level1 = node("level1", &["region"]).with_inherit(InheritMode::AllParents);
        level1.attach(node("level2", &["force"]).with_inherit(InheritMode::AllParents));
        root.attach(level1);

        let level2 = root
            .subcommand("level1")
            .and_then(|n| n.subcommand("level2"))
            .unwrap();
        let names: Vec<&str> = level2.flags().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["force", "region", "config"]);
        assert!(level2.get_flag("config").unwrap().inherited);
        assert_eq!(
            level2.parent().unwrap().path,
            vec!["root".to_string(), "level1".to_string()]
        );
    }

    #[test]
    fn test_all_parents_sees_grandparent_through_attached_parent() {
        let mut grand = node("grand", &["g"]);
        grand.attach(node("parent", &["p"]));
        grand
            .subcommand_mut("parent")
            .unwrap()
            .attach(node("child", &[]).with_inherit(InheritMode::AllParents));

        let child = grand
            .subcommand("parent")
            .and_then(|n| n.subcommand("child"))
            .unwrap();
        assert!(child.has_flag("p"));
        assert!(child.has_flag("g"));
    }

    #[test]
    fn test_local_flag_wins_over_every_ancestor() {
        let mut root = CommandNode::new("root");
        root.add_flag(
            FlagDefinition::new("x")
                .option("--x")
                .default_value("root"),
        )
        .unwrap();
        let mut child = CommandNode::new("child").with_inherit(InheritMode::AllParents);
        child
            .add_flag(
                FlagDefinition::new("x")
                    .option("--x")
                    .default_value("child"),
            )
            .unwrap();
        root.attach(child);

        let x = root.subcommand("child").unwrap().get_flag("x").unwrap();
        assert!(!x.inherited);
        assert_eq!(x.default_value, Some(Value::from("child")));
    }

    #[test]
    fn test_nearest_ancestor_wins_in_union() {
        let mut root = CommandNode::new("root");
        root.add_flag(FlagDefinition::new("x").option("--x").default_value("root"))
            .unwrap();
        let mut mid = CommandNode::new("mid");
        mid.add_flag(FlagDefinition::new("x").option("--x").default_value("mid"))
            .unwrap();
        mid.attach(CommandNode::new("leaf").with_inherit(InheritMode::AllParents));
        root.attach(mid);

        let leaf = root
            .subcommand("mid")
            .and_then(|n| n.subcommand("leaf"))
            .unwrap();
        assert_eq!(
            leaf.get_flag("x").unwrap().default_value,
            Some(Value::from("mid"))
        );
    }
}
