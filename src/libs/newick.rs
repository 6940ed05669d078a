use color_eyre::{eyre::eyre, Result};

use crate::graphs::pedigree_graph::{
    EdgeData, EdgeKind, NodeIndex, PedigreeGraph, VertexData, VertexType,
};

/// Parses one rooted Newick string and appends its somatic tree to the graph,
/// anchored at a germline vertex.
///
/// The root branch length becomes the anchor edge. Somatic vertices copy the
/// anchor's sex and ploidy; unnamed nodes are labeled
/// `{anchor label}/{vertex index}`. With `normalize` set, every branch is
/// rescaled so the deepest leaf sits at depth 1.
pub fn parse_newick(
    text: &str,
    graph: &mut PedigreeGraph,
    anchor: NodeIndex,
    normalize: bool,
) -> Result<()> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
        nodes: vec![],
    };
    let root = parser.parse_tree()?;

    let scale = match normalize {
        true => {
            let depth = parser.max_depth(root);
            if depth > 0.0 {
                1.0 / depth
            } else {
                1.0
            }
        }
        false => 1.0,
    };

    let anchor_label = graph[anchor].label.clone();
    let sex = graph[anchor].sex;
    let ploidy = graph[anchor].ploidy;

    let mut stack = vec![(root, anchor)];
    while let Some((id, parent)) = stack.pop() {
        let node = &parser.nodes[id];
        let label = match &node.label {
            Some(label) => label.clone(),
            None => format!("{anchor_label}/{}", graph.node_count()),
        };
        let length = node.length * scale;
        let children = node.children.clone();

        let v = graph.add_node(VertexData {
            label,
            sex,
            ploidy,
            ty: VertexType::Somatic,
        });
        graph.add_edge(
            parent,
            v,
            EdgeData {
                length,
                kind: EdgeKind::SOMA,
            },
        );

        // reversed so vertices are created in source order
        for &child in children.iter().rev() {
            stack.push((child, v));
        }
    }

    Ok(())
}

struct ParsedNode {
    label: Option<String>,
    length: f64,
    children: Vec<usize>,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    nodes: Vec<ParsedNode>,
}

impl Parser<'_> {
    fn parse_tree(&mut self) -> Result<usize> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Err(eyre!("tree is empty"));
        }
        let root = self.parse_node()?;
        self.skip_whitespace();
        match self.peek() {
            Some(b';') => self.pos += 1,
            other => return Err(self.unexpected(other, "';'")),
        }
        self.skip_whitespace();
        if let Some(trailing) = self.peek() {
            return Err(self.unexpected(Some(trailing), "end of input"));
        }
        Ok(root)
    }

    fn parse_node(&mut self) -> Result<usize> {
        self.skip_whitespace();

        let mut children = vec![];
        if self.peek() == Some(b'(') {
            self.pos += 1;
            children.push(self.parse_node()?);
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => {
                        self.pos += 1;
                        children.push(self.parse_node()?);
                    }
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    other => return Err(self.unexpected(other, "',' or ')'")),
                }
            }
        }

        let label = self.parse_label();
        let length = match self.peek() {
            Some(b':') => {
                self.pos += 1;
                self.parse_length()?
            }
            _ => 1.0,
        };

        self.nodes.push(ParsedNode {
            label,
            length,
            children,
        });
        Ok(self.nodes.len() - 1)
    }

    fn parse_label(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, b'(' | b')' | b',' | b':' | b';') || c.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    fn parse_length(&mut self) -> Result<f64> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        let length: f64 = raw
            .parse()
            .map_err(|_| eyre!("branch length at byte {start} is not a number: {raw:?}"))?;
        if !length.is_finite() || length < 0.0 {
            return Err(eyre!("branch length at byte {start} is negative: {raw}"));
        }
        Ok(length)
    }

    fn max_depth(&self, id: usize) -> f64 {
        let node = &self.nodes[id];
        let below = node
            .children
            .iter()
            .map(|&child| self.max_depth(child))
            .fold(0.0, f64::max);
        node.length + below
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self, found: Option<u8>, expected: &str) -> color_eyre::eyre::Report {
        match found {
            Some(c) => eyre!(
                "unexpected character {:?} at byte {}, expected {expected}",
                c as char,
                self.pos
            ),
            None => eyre!("unexpected end of input, expected {expected}"),
        }
    }
}
