use std::fmt::{self, Write};

use crate::block::Block;
use crate::tree::{Inline, Node, NodeId, Tree};

/// Markdown-like text rendering of a subtree.
pub struct TreeDisplay<'a> {
    tree: &'a Tree,
    id: NodeId,
    number_titles: bool,
}

impl<'a> TreeDisplay<'a> {
    pub fn new(tree: &'a Tree, id: NodeId) -> Self {
        TreeDisplay {
            tree,
            id,
            number_titles: false,
        }
    }

    /// Overlay display numbers onto file block titles that do not embed them.
    pub fn number_titles(mut self, on: bool) -> Self {
        self.number_titles = on;
        self
    }

    fn render(&self, id: NodeId, out: &mut String) -> fmt::Result {
        match self.tree.node(id) {
            Node::Root | Node::Section => self.render_children(id, out),
            Node::Paragraph(content) => {
                write_inlines(out, content)?;
                writeln!(out)?;
                writeln!(out)
            }
            Node::Heading { level, content } => {
                for _ in 0..*level {
                    write!(out, "#")?;
                }
                write!(out, " ")?;
                write_inlines(out, content)?;
                writeln!(out)?;
                writeln!(out)
            }
            Node::CodeBlock { language, content } => {
                write!(out, "```")?;
                if let Some(lang) = language {
                    write!(out, "{}", lang)?;
                }
                writeln!(out)?;
                write!(out, "{}", content)?;
                writeln!(out, "```")?;
                writeln!(out)
            }
            Node::Blockquote => {
                let mut inner = String::new();
                self.render_children(id, &mut inner)?;
                for line in inner.trim_end().lines() {
                    writeln!(out, "> {}", line)?;
                }
                writeln!(out)
            }
            Node::List { start } => {
                for (i, &item) in self.tree.children(id).iter().enumerate() {
                    let marker = match start {
                        Some(n) => format!("{}. ", *n as usize + i),
                        None => "- ".to_string(),
                    };
                    let mut inner = String::new();
                    self.render_children(item, &mut inner)?;
                    let pad = " ".repeat(marker.len());
                    for (j, line) in inner.trim_end().lines().enumerate() {
                        if j == 0 {
                            writeln!(out, "{}{}", marker, line)?;
                        } else if line.is_empty() {
                            writeln!(out)?;
                        } else {
                            writeln!(out, "{}{}", pad, line)?;
                        }
                    }
                }
                writeln!(out)
            }
            Node::Item => self.render_children(id, out),
            Node::Rule => {
                writeln!(out, "---")?;
                writeln!(out)
            }
            Node::Block(block) => {
                writeln!(out, ":::{{{}}} {}", block.kind(), block.label())?;
                write!(out, "**")?;
                self.render_title(block, out)?;
                writeln!(out, "**")?;
                writeln!(out)?;
                self.render_children(id, out)?;
                writeln!(out, ":::")?;
                writeln!(out)
            }
            Node::Start(block) => {
                writeln!(out, ":::{{{}-start}} {}", block.kind(), block.label())?;
                self.render_children(id, out)
            }
            Node::End(marker) => {
                writeln!(out, ":::{{{}-end}}", marker.kind)?;
                writeln!(out)
            }
        }
    }

    fn render_children(&self, id: NodeId, out: &mut String) -> fmt::Result {
        for &child in self.tree.children(id) {
            self.render(child, out)?;
        }
        Ok(())
    }

    fn render_title(&self, block: &Block, out: &mut String) -> fmt::Result {
        if let Block::File(file) = block {
            if self.number_titles && file.numbered {
                if let (Some(number), Some((Inline::Text(prefix), rest))) =
                    (&file.number, file.title.split_first())
                {
                    write!(out, "{} {}", prefix, number)?;
                    return write_inlines(out, rest);
                }
            }
        }
        write_inlines(out, block.title())
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline]) -> fmt::Result {
    for inline in inlines {
        write!(out, "{}", inline)?;
    }
    Ok(())
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render(self.id, &mut out)?;
        f.write_str(&out)
    }
}
