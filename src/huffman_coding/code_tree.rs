//! The code tree: a weighted binary tree built from a frequency table.
//!
//! Nodes live in an arena (a Vec) and refer to their children by index, so the tree has no shared
//! ownership and no cycles. Every tree carries one extra leaf, the EOF sentinel, which the encoder writes
//! after the last symbol and the decoder stops on.
//!
//! Construction must be deterministic: a decoder rebuilds the tree from nothing but the frequency table,
//! and has to land on exactly the same codes as the encoder. Ties are therefore broken by a weight carried
//! on every node (see `Priority`).

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt::{Display, Formatter};

use log::{debug, trace};
use rustc_hash::FxHashMap;

use super::freq_table::{FrequencyTable, EOF_SYMBOL};
use crate::error::{HuffError, Result};

/// Longest code we can hold. Counts are u64, which keeps real trees well under this.
pub const MAX_CODE_LEN: u32 = 128;

/// Index of a node in the tree arena.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeData {
    Kids { left: NodeId, right: NodeId },
    Leaf { symbol: u64, eof: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Sum of the counts of every leaf below this node.
    pub freq: u64,
    /// Tie-break weight: the symbol value for leaves, inherited from the right-most leaf for parents.
    pub weight: u64,
    /// True when the weight came from the EOF sentinel.
    pub eof_weight: bool,
    pub node_data: NodeData,
}

impl Node {
    fn leaf(symbol: u64, freq: u64, eof: bool) -> Node {
        Node {
            freq,
            weight: symbol,
            eof_weight: eof,
            node_data: NodeData::Leaf { symbol, eof },
        }
    }

    fn priority(&self) -> Priority {
        Priority {
            freq: self.freq,
            weight: self.weight,
            eof: self.eof_weight,
        }
    }
}

/// Merge order of the worklist. Lower sorts first and is merged first.
///
/// Ascending frequency, then descending weight. A data symbol can only share its weight with the
/// sentinel (a 64 bit symbol of value `EOF_SYMBOL`), in which case the sentinel side sorts first.
/// Each live node carries the weight of a different leaf, so this is a strict total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Priority {
    freq: u64,
    weight: u64,
    eof: bool,
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.freq
            .cmp(&other.freq)
            .then_with(|| other.weight.cmp(&self.weight))
            .then_with(|| other.eof.cmp(&self.eof))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A root-to-leaf path: left edges are 0, right edges are 1, first edge in the most significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Code {
    pub bits: u128,
    pub len: u32,
}

impl Code {
    fn push(self, bit: bool) -> Code {
        Code {
            bits: (self.bits << 1) | bit as u128,
            len: self.len + 1,
        }
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for i in (0..self.len).rev() {
            write!(f, "{}", (self.bits >> i) & 1)?;
        }
        Ok(())
    }
}

/// Huffman tree plus the code of every leaf.
#[derive(Debug, Clone)]
pub struct CodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    codes: FxHashMap<u64, Code>,
    eof_code: Code,
    depth: u32,
}

impl CodeTree {
    /// Build the tree for a table. Fails if the table has no symbols to code.
    pub fn build(table: &FrequencyTable) -> Result<CodeTree> {
        if table.is_empty() {
            return Err(HuffError::unsupported(
                "frequency table has no valid entries",
            ));
        }
        // The sentinel adds one more count; the root must still fit in a u64
        if table.total().and_then(|t| t.checked_add(1)).is_none() {
            return Err(HuffError::unsupported("total frequency overflows 64 bits"));
        }

        let entries = table.entries_sorted_by_symbol();
        let mut nodes: Vec<Node> = Vec::with_capacity(entries.len() * 2 + 1);
        let mut worklist = BinaryHeap::with_capacity(entries.len() + 1);

        // One singleton tree per symbol, then the sentinel
        for (symbol, freq) in entries {
            nodes.push(Node::leaf(symbol, freq, false));
        }
        nodes.push(Node::leaf(EOF_SYMBOL, 1, true));
        for (id, node) in nodes.iter().enumerate() {
            worklist.push(Reverse((node.priority(), id)));
        }

        // Pare it down to one node. The lowest node becomes the right child.
        while worklist.len() > 1 {
            let (right, left) = match (worklist.pop(), worklist.pop()) {
                (Some(Reverse((_, a))), Some(Reverse((_, b)))) => (a, b),
                _ => unreachable!("worklist holds at least two nodes"),
            };
            let heir = rightmost_leaf(&nodes, right);
            let node = Node {
                freq: nodes[left].freq + nodes[right].freq,
                weight: nodes[heir].weight,
                eof_weight: nodes[heir].eof_weight,
                node_data: NodeData::Kids { left, right },
            };
            trace!(
                "merge {} + {} -> {} (freq {}, weight 0x{:x})",
                left,
                right,
                nodes.len(),
                node.freq,
                node.weight
            );
            worklist.push(Reverse((node.priority(), nodes.len())));
            nodes.push(node);
        }
        let root = match worklist.pop() {
            Some(Reverse((_, root))) => root,
            None => unreachable!("worklist is never emptied by merging"),
        };

        let mut tree = CodeTree {
            nodes,
            root,
            codes: FxHashMap::default(),
            eof_code: Code::default(),
            depth: 0,
        };
        tree.assign_codes()?;
        debug!(
            "Built code tree: {} leaves, depth {}, EOF code {}",
            tree.codes.len() + 1,
            tree.depth,
            tree.eof_code
        );
        Ok(tree)
    }

    /// Walk the tree and record the path to every leaf.
    fn assign_codes(&mut self) -> Result<()> {
        let mut stack = vec![(self.root, Code::default())];
        while let Some((id, code)) = stack.pop() {
            if code.len > MAX_CODE_LEN {
                return Err(HuffError::unsupported(format!(
                    "code tree deeper than {} bits",
                    MAX_CODE_LEN
                )));
            }
            match self.nodes[id].node_data {
                NodeData::Kids { left, right } => {
                    stack.push((right, code.push(true)));
                    stack.push((left, code.push(false)));
                }
                NodeData::Leaf { symbol, eof } => {
                    self.depth = self.depth.max(code.len);
                    if eof {
                        self.eof_code = code;
                    } else {
                        self.codes.insert(symbol, code);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Move one edge down: false goes left, true goes right.
    pub fn step(&self, id: NodeId, bit: bool) -> Result<NodeId> {
        match self.nodes.get(id).map(|n| n.node_data) {
            Some(NodeData::Kids { left, right }) => Ok(if bit { right } else { left }),
            Some(NodeData::Leaf { .. }) => Err(HuffError::unsupported(format!(
                "cannot descend from leaf node {}",
                id
            ))),
            None => Err(HuffError::unsupported(format!("no tree node {}", id))),
        }
    }

    /// (symbol, is_eof) if the node is a leaf.
    pub fn leaf(&self, id: NodeId) -> Option<(u64, bool)> {
        match self.nodes[id].node_data {
            NodeData::Leaf { symbol, eof } => Some((symbol, eof)),
            NodeData::Kids { .. } => None,
        }
    }

    /// Code for a data symbol, or None if the table did not cover it.
    pub fn code(&self, symbol: u64) -> Option<Code> {
        self.codes.get(&symbol).copied()
    }

    pub fn eof_code(&self) -> Code {
        self.eof_code
    }

    /// Length of the longest code.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of leaves, sentinel included.
    pub fn leaf_count(&self) -> usize {
        self.codes.len() + 1
    }

    /// Every data symbol with its code, by ascending symbol.
    pub fn codes_by_symbol(&self) -> Vec<(u64, Code)> {
        let mut codes: Vec<(u64, Code)> = self.codes.iter().map(|(&s, &c)| (s, c)).collect();
        codes.sort_unstable_by_key(|&(s, _)| s);
        codes
    }
}

/// Follow right children down to a leaf.
fn rightmost_leaf(nodes: &[Node], mut id: NodeId) -> NodeId {
    while let NodeData::Kids { right, .. } = nodes[id].node_data {
        id = right;
    }
    id
}
