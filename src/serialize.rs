//! JSON wire format (`{key, values, metadata, children}`, with metadata
//! arrays as `{shape, dtype, base64|values}`) and the plain-text ASCII tree
//! grammar used for fixtures and round-trip tests.

use {
    crate::{
        error::{Error, Result},
        types::{
            children::Children,
            dtype::Dtype,
            metadata::{MetadataArrayWire, MetadataMap},
            node::Node,
            value::ValueGroup,
        },
    },
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

#[derive(Serialize, Deserialize)]
struct NodeWire {
    key: String,
    values: ValueGroup,
    #[serde(default)]
    metadata: BTreeMap<String, MetadataArrayWire>,
    #[serde(default)]
    children: Vec<NodeWire>,
}

fn to_wire(node: &Node) -> NodeWire {
    NodeWire {
        key: node.key().to_string(),
        values: node.values().clone(),
        metadata: node.metadata().iter().map(|(k, v)| (k.clone(), v.to_wire())).collect(),
        children: node.children().as_slice().iter().map(to_wire).collect(),
    }
}

fn from_wire(wire: NodeWire, depth: usize) -> Result<Node> {
    let mut metadata = MetadataMap::new();
    for (name, wire_arr) in wire.metadata {
        metadata.insert(name, crate::types::metadata::MetadataArray::from_wire(wire_arr)?);
    }
    let children: Result<Vec<Node>> =
        wire.children.into_iter().map(|c| from_wire(c, depth + 1)).collect();
    Node::new(wire.key, wire.values, Children::new(children?), metadata, depth)
}

pub fn to_json(node: &Node) -> Result<String> {
    Ok(serde_json::to_string(&to_wire(node))?)
}

pub fn to_json_pretty(node: &Node) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_wire(node))?)
}

pub fn from_json(text: &str) -> Result<Node> {
    let wire: NodeWire = serde_json::from_str(text)?;
    from_wire(wire, 0)
}

/// Render a qube using the same connector glyphs as the original tree
/// formatter: `├── `, `└── `, `│   `, 4-space indent per level. Does not
/// carry metadata — this is a structure-only view.
pub fn to_ascii(node: &Node) -> String {
    let mut out = String::new();
    out.push_str(&node.values().summary());
    out.push('\n');
    render_children(node.children().as_slice(), "", &mut out);
    out
}

fn render_children(children: &[Node], prefix: &str, out: &mut String) {
    for (i, child) in children.iter().enumerate() {
        let last = i == children.len() - 1;
        let connector = if last { "└── " } else { "├── " };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(child.key());
        out.push('=');
        out.push_str(&child.values().summary());
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_children(child.children().as_slice(), &child_prefix, out);
    }
}

struct Spine {
    depth: usize,
    key: String,
    values: ValueGroup,
}

struct Builder {
    depth: usize,
    key: String,
    values: ValueGroup,
    children: Vec<Node>,
}

impl Builder {
    fn build(self) -> Result<Node> {
        Node::new(self.key, self.values, Children::new(self.children), MetadataMap::new(), self.depth)
    }
}

/// Parse the ASCII tree grammar. Rejects input where a duplicate sibling
/// key appears at the same indent level — such input would require a
/// compression pass to even define a tree, and this parser does not compress
/// (construction-time ambiguity, not a data error, is reported as such).
pub fn from_ascii(text: &str) -> Result<Node> {
    let mut stack: Vec<Builder> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();

    for raw_line in text.lines() {
        if raw_line.trim().is_empty() {
            continue;
        }
        let indent_chars: usize = raw_line.chars().take_while(|c| " │├└─".contains(*c)).count();
        let depth0 = indent_chars / 4;
        let content = raw_line.trim_start_matches([' ', '│', '├', '└', '─']);

        let spines = parse_spine(content, depth0)?;

        for spine in spines {
            while let Some(top) = stack.last() {
                if top.depth >= spine.depth {
                    let finished = stack.pop().unwrap();
                    let finished_depth = finished.depth;
                    let finished_key = finished.key.clone();
                    let node = finished.build()?;
                    attach(&mut stack, &mut roots, node, finished_depth, &finished_key)?;
                } else {
                    break;
                }
            }
            stack.push(Builder { depth: spine.depth, key: spine.key, values: spine.values, children: vec![] });
        }
    }

    while let Some(finished) = stack.pop() {
        let finished_depth = finished.depth;
        let finished_key = finished.key.clone();
        let node = finished.build()?;
        attach(&mut stack, &mut roots, node, finished_depth, &finished_key)?;
    }

    Node::root(Children::new(roots))
}

fn attach(
    stack: &mut [Builder],
    roots: &mut Vec<Node>,
    node: Node,
    depth: usize,
    key: &str,
) -> Result<()> {
    let siblings = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };
    let _ = depth;
    if siblings.iter().any(|n| n.key() == key) {
        return Err(Error::AmbiguousAscii(format!(
            "duplicate sibling key {key:?} at the same indent level"
        )));
    }
    siblings.push(node);
    Ok(())
}

fn parse_spine(content: &str, base_depth: usize) -> Result<Vec<Spine>> {
    content
        .split(',')
        .enumerate()
        .map(|(i, part)| {
            let part = part.trim();
            let (key, values) = part
                .split_once('=')
                .ok_or_else(|| Error::AmbiguousAscii(format!("expected key=values, got {part:?}")))?;
            let values = if values.trim() == "*" {
                ValueGroup::wildcard()
            } else {
                ValueGroup::from_strs(values.split('/').map(str::trim))?
            };
            Ok(Spine { depth: base_depth + i, key: key.trim().to_string(), values })
        })
        .collect()
}

pub fn dtype_from_name(name: &str) -> Result<Dtype> {
    match name {
        "str" => Ok(Dtype::Str),
        "int64" => Ok(Dtype::Int64),
        "float64" => Ok(Dtype::Float64),
        "date" => Ok(Dtype::Date),
        "datetime" => Ok(Dtype::Datetime),
        other => Err(Error::TypeMismatch(format!("unknown dtype {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip_preserves_structure() {
        let mut children = Children::default();
        children.insert(
            Node::new("a", ValueGroup::from_strs(["1", "2"]).unwrap(), Children::default(), MetadataMap::new(), 1)
                .unwrap(),
        );
        let root = Node::root(children).unwrap();
        let json = to_json(&root).unwrap();
        let back = from_json(&json).unwrap();
        assert_eq!(back.hash(), root.hash());
    }

    #[test]
    fn ascii_roundtrip_basic_tree() {
        let text = "root\n├── a=1/2\n│   └── b=x\n└── a=3\n    └── b=y\n";
        let node = from_ascii(text).unwrap();
        assert_eq!(node.children().count(), 2);
    }

    #[test]
    fn duplicate_sibling_key_is_ambiguous() {
        let text = "root\n├── a=1\n└── a=2\n";
        let err = from_ascii(text);
        assert!(err.is_err());
    }
}
