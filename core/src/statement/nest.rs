//! Rebuilds the block structure of a function from line indentation.

use crate::diagnostics::{Context, Diagnostics, ErrorKind};
use crate::syntax::Line;

/// A source line with the lines indented under it.
#[derive(Debug)]
pub(crate) struct LineNode<'a> {
    pub line: &'a Line<'a>,
    pub children: Vec<LineNode<'a>>,
}

impl<'a> LineNode<'a> {
    fn new(line: &'a Line<'a>) -> Self {
        LineNode {
            line,
            children: Vec::new(),
        }
    }
}

struct Level<'a> {
    indent: u32,
    nodes: Vec<LineNode<'a>>,
}

fn close_level<'a>(stack: &mut Vec<Level<'a>>) {
    let level = stack.pop().expect("nesting stack keeps its root level");
    let parent = stack
        .last_mut()
        .and_then(|p| p.nodes.last_mut())
        .expect("a nested level always follows a parent line");
    parent.children = level.nodes;
}

/// Groups `lines` by indentation.
///
/// A deeper line opens a level under the previous line. A shallower line
/// closes levels until one with exactly its indent is found; landing
/// strictly between two levels is an `InvalidIndent` error and the line
/// is kept at the enclosing level.
pub(crate) fn nest<'a>(lines: &'a [Line<'a>], diagnostics: &mut Diagnostics) -> Vec<LineNode<'a>> {
    let Some(first) = lines.first() else {
        return Vec::new();
    };
    let mut stack = vec![Level {
        indent: first.indent,
        nodes: Vec::new(),
    }];

    for line in lines {
        let top = stack.last().expect("nesting stack keeps its root level");
        if line.indent > top.indent {
            if top.nodes.is_empty() {
                diagnostics.report(&line.anchor, ErrorKind::UnexpectedIndent);
                continue;
            }
            stack.push(Level {
                indent: line.indent,
                nodes: vec![LineNode::new(line)],
            });
            continue;
        }

        while stack.len() > 1 && line.indent < stack[stack.len() - 1].indent {
            close_level(&mut stack);
        }
        let level = stack.last_mut().expect("nesting stack keeps its root level");
        if line.indent != level.indent {
            let context = level.nodes.first().map(|node| Context::BlockStartsHere {
                indent: level.indent,
                anchor: node.line.anchor.clone(),
            });
            diagnostics.report_with(
                &line.anchor,
                ErrorKind::InvalidIndent,
                context.as_slice(),
            );
        }
        level.nodes.push(LineNode::new(line));
    }

    while stack.len() > 1 {
        close_level(&mut stack);
    }
    stack.pop().map(|level| level.nodes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::tokenize;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn shape(nodes: &[LineNode<'_>]) -> Vec<(String, usize)> {
        nodes
            .iter()
            .map(|n| (n.line.lexicals[0].text.to_string(), n.children.len()))
            .collect()
    }

    #[test]
    fn test_nested_levels() {
        let mut diagnostics = Diagnostics::new();
        let source = indoc! {"
            if a
                b
                if c
                    d
            e
        "};
        let lines = tokenize(0, source, 4, &mut diagnostics);
        let nodes = nest(&lines, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert_eq!(shape(&nodes), vec![("if".to_string(), 2), ("e".to_string(), 0)]);
        assert_eq!(shape(&nodes[0].children), vec![("b".to_string(), 0), ("if".to_string(), 1)]);
    }

    #[test]
    fn test_indent_between_levels_is_rejected() {
        let mut diagnostics = Diagnostics::new();
        let source = indoc! {"
            if a
                b
              c
        "};
        let lines = tokenize(0, source, 4, &mut diagnostics);
        nest(&lines, &mut diagnostics);
        let diagnostic = diagnostics.iter().next().expect("indent diagnostic");
        assert_eq!(diagnostic.kind, ErrorKind::InvalidIndent);
        assert_eq!(diagnostic.related.len(), 1);
    }
}
