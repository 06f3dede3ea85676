//! Indented text view of a tree: one line per node, four dots per level.

use std::io;

use super::Tree;

const INDENT: &str = "....";

/// Render every node in pre-order.
pub fn render(tree: &Tree) -> String {
    let mut out = String::new();
    for node in tree.nodes() {
        out.push_str(&INDENT.repeat(node.depth));
        out.push_str(node.display_name());
        out.push('\n');
    }
    out
}

pub fn write_to<W: io::Write>(tree: &Tree, writer: &mut W) -> io::Result<()> {
    writer.write_all(render(tree).as_bytes())
}
