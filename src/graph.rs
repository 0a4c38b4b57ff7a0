use core::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::value::Value;

/// One recorded call: the operator, its rendered arguments and the name of
/// what it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub op: String,
    pub args: Vec<String>,
    pub output: String,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self { nodes: vec![] }
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn record(&mut self, op: &str, args: &[&Value], output: &Value) {
        log::trace!("recording {op}");
        self.push(Node {
            op: op.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            output: output.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Display for Graph {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, node) in self.nodes.iter().enumerate() {
            writeln!(f, "{i}: {} ({}) -> {}", node.op, node.args.iter().join(", "), node.output)?;
        }
        Ok(())
    }
}
