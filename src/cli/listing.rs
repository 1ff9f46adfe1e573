//! cli::listing
//!
//! Text rendering of the function tree for `--list`.
//!
//! Namespaces end with `/`; leaves are plain (green on a terminal). Leaves
//! with no registered implementation are flagged, and the linking table is
//! listed after the tree.

use std::collections::BTreeMap;

use crate::core::config::LinkEntry;
use crate::core::tree::CommandTree;
use crate::core::types::OperationPath;
use crate::engine::Registry;
use crate::ui::output;

const INDENT: &str = "  ";

/// Render the tree rooted at the namespace root.
pub fn render(
    tree: &CommandTree,
    registry: &Registry,
    links: &BTreeMap<String, LinkEntry>,
    color: bool,
) -> String {
    let mut lines = Vec::new();
    for entry in tree.walk() {
        let name = tree.content(entry.id);
        let indent = INDENT.repeat(entry.depth);
        if entry.id == tree.root() || !tree.is_leaf(entry.id) {
            lines.push(format!("{}{}/", indent, name));
            continue;
        }

        let registered = OperationPath::new(tree.path_of(entry.id))
            .map(|path| registry.contains(&path))
            .unwrap_or(false);
        let mut line = format!("{}{}", indent, output::green(name, color));
        if !registered {
            line.push_str(" (not implemented)");
        }
        lines.push(line);
    }

    if !links.is_empty() {
        lines.push(String::new());
        lines.push("aliases:".to_string());
        for (alias, entry) in links {
            lines.push(format!("{}{} -> {}", INDENT, alias, entry.function));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::keywords::MemoryKeywords;
    use std::sync::Arc;

    fn tree_for(registry: &Registry) -> CommandTree {
        let mut tree = CommandTree::new("translator");
        for path in registry.paths() {
            tree.insert(path.segments());
        }
        tree.insert(["mosfire", "func_expose"]);
        tree
    }

    #[test]
    fn namespaces_and_leaves_differ() {
        let registry = builtin::registry(Arc::new(MemoryKeywords::new())).unwrap();
        let text = render(&tree_for(&registry), &registry, &BTreeMap::new(), false);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "translator/",
                "  keywords/",
                "    read",
                "    waitfor",
                "    write",
                "  util/",
                "    echo",
                "  mosfire/",
                "    func_expose (not implemented)",
            ]
        );
    }

    #[test]
    fn colored_leaves() {
        let registry = builtin::registry(Arc::new(MemoryKeywords::new())).unwrap();
        let text = render(&tree_for(&registry), &registry, &BTreeMap::new(), true);
        assert!(text.contains("\x1b[32mecho\x1b[0m"));
        assert!(text.contains("  util/\n"));
    }

    #[test]
    fn aliases_listed() {
        let registry = Registry::new();
        let mut links = BTreeMap::new();
        links.insert(
            "exp".to_string(),
            LinkEntry {
                function: "mosfire.func_expose".to_string(),
                arguments: toml::Table::new(),
            },
        );
        let text = render(&tree_for(&registry), &registry, &links, false);
        assert!(text.ends_with("aliases:\n  exp -> mosfire.func_expose"));
    }
}
