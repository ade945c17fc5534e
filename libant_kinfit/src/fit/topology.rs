use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::TopologyError;
use crate::particle_type::ParticleType;

/// Largest number of photon leaves a tree may have. The permutations are enumerated
/// exhaustively, so this bounds the work per fitter.
pub const MAX_LEAVES: usize = 8;

/// A node of a decay tree: either a final state photon or a decaying resonance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecayNode {
    Leaf(ParticleType),
    Decay {
        ptype: ParticleType,
        daughters: Vec<DecayNode>,
    },
}

impl DecayNode {
    pub fn ptype(&self) -> ParticleType {
        match self {
            Self::Leaf(ptype) => *ptype,
            Self::Decay { ptype, .. } => *ptype,
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Decay { daughters, .. } => daughters.iter().map(|d| d.n_leaves()).sum(),
        }
    }

    fn validate(&self) -> Result<(), TopologyError> {
        match self {
            Self::Leaf(ParticleType::Photon) => Ok(()),
            Self::Leaf(ptype) => Err(TopologyError::BadLeaf(*ptype)),
            Self::Decay { ptype, daughters } => {
                if !ptype.is_resonance() {
                    return Err(TopologyError::NotDecaying(*ptype));
                }
                if daughters.len() < 2 {
                    return Err(TopologyError::TooFewDaughters(*ptype));
                }
                daughters.iter().try_for_each(|d| d.validate())
            }
        }
    }
}

impl Display for DecayNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf(ptype) => write!(f, "{ptype}"),
            Self::Decay { ptype, daughters } => {
                write!(f, "{ptype}(")?;
                for (idx, daughter) in daughters.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{daughter}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The photon final state of a reaction `gamma p -> p + roots`.
///
/// Parsed from a textual description like `"EtaPrime(g Omega(g Pi0(g g)))"` or
/// `"Pi0(g g) Pi0(g g)"`. The recoil proton is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayTree {
    pub roots: Vec<DecayNode>,
}

impl DecayTree {
    pub fn n_leaves(&self) -> usize {
        self.roots.iter().map(|r| r.n_leaves()).sum()
    }
}

impl Display for DecayTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, root) in self.roots.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{root}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String, usize),
    Open(usize),
    Close(usize),
}

fn tokenize(description: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut name_start: Option<usize> = None;
    for (pos, c) in description.char_indices() {
        if c.is_alphanumeric() || c == '_' || c == '\'' {
            name_start.get_or_insert(pos);
            continue;
        }
        if let Some(start) = name_start.take() {
            tokens.push(Token::Name(description[start..pos].to_string(), start));
        }
        match c {
            '(' => tokens.push(Token::Open(pos)),
            ')' => tokens.push(Token::Close(pos)),
            _ => (),
        }
    }
    if let Some(start) = name_start {
        tokens.push(Token::Name(description[start..].to_string(), start));
    }
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    end: usize,
}

impl Parser {
    /// Parse nodes until the closing parenthesis of the current level (or the end at depth 0)
    fn parse_list(&mut self, depth: usize) -> Result<Vec<DecayNode>, TopologyError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.get(self.cursor).cloned() {
            self.cursor += 1;
            match token {
                Token::Name(name, _) => {
                    let ptype = ParticleType::from_str(&name)?;
                    if let Some(Token::Open(_)) = self.tokens.get(self.cursor) {
                        self.cursor += 1;
                        let daughters = self.parse_list(depth + 1)?;
                        nodes.push(DecayNode::Decay { ptype, daughters });
                    } else {
                        nodes.push(DecayNode::Leaf(ptype));
                    }
                }
                Token::Open(pos) => return Err(TopologyError::UnexpectedToken("(".into(), pos)),
                Token::Close(pos) => {
                    if depth == 0 {
                        return Err(TopologyError::UnbalancedParentheses(pos));
                    }
                    return Ok(nodes);
                }
            }
        }
        if depth > 0 {
            return Err(TopologyError::UnbalancedParentheses(self.end));
        }
        Ok(nodes)
    }
}

impl FromStr for DecayTree {
    type Err = TopologyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            tokens: tokenize(s),
            cursor: 0,
            end: s.len(),
        };
        let roots = parser.parse_list(0)?;
        if roots.is_empty() {
            return Err(TopologyError::Empty);
        }
        roots.iter().try_for_each(|r| r.validate())?;
        let tree = Self { roots };
        let n_leaves = tree.n_leaves();
        if n_leaves > MAX_LEAVES {
            return Err(TopologyError::TooManyLeaves(n_leaves, MAX_LEAVES));
        }
        Ok(tree)
    }
}

/// The predefined reaction channels
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Pi0_2g,
    Eta_2g,
    EtaPrime_2g,
    TwoPi0_4g,
    Pi0Eta_4g,
    ThreePi0_6g,
    Omega_gPi0_3g,
    EtaPrime_gOmega_ggPi0_4g,
}

impl Channel {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pi0_2g => "Pi0(g g)",
            Self::Eta_2g => "Eta(g g)",
            Self::EtaPrime_2g => "EtaPrime(g g)",
            Self::TwoPi0_4g => "Pi0(g g) Pi0(g g)",
            Self::Pi0Eta_4g => "Pi0(g g) Eta(g g)",
            Self::ThreePi0_6g => "Pi0(g g) Pi0(g g) Pi0(g g)",
            Self::Omega_gPi0_3g => "Omega(g Pi0(g g))",
            Self::EtaPrime_gOmega_ggPi0_4g => "EtaPrime(g Omega(g Pi0(g g)))",
        }
    }

    pub fn tree(&self) -> Result<DecayTree, TopologyError> {
        DecayTree::from_str(self.description())
    }
}

/// One internal node of a flattened tree
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlatNode {
    pub ptype: ParticleType,
    pub parent: Option<usize>,
    /// Leaf slots below this node, at any depth
    pub leaves: Vec<usize>,
}

/// Decay tree in index form: internal nodes in depth-first order, leaves numbered by slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlatTree {
    pub nodes: Vec<FlatNode>,
    pub leaf_parents: Vec<Option<usize>>,
}

impl FlatTree {
    pub fn new(tree: &DecayTree) -> Self {
        let mut flat = Self {
            nodes: Vec::new(),
            leaf_parents: Vec::new(),
        };
        for root in tree.roots.iter() {
            flat.add(root, None);
        }
        flat
    }

    fn add(&mut self, node: &DecayNode, parent: Option<usize>) -> Vec<usize> {
        match node {
            DecayNode::Leaf(_) => {
                self.leaf_parents.push(parent);
                vec![self.leaf_parents.len() - 1]
            }
            DecayNode::Decay { ptype, daughters } => {
                let idx = self.nodes.len();
                self.nodes.push(FlatNode {
                    ptype: *ptype,
                    parent,
                    leaves: Vec::new(),
                });
                let leaves: Vec<usize> = daughters
                    .iter()
                    .flat_map(|d| self.add(d, Some(idx)))
                    .collect();
                self.nodes[idx].leaves = leaves.clone();
                leaves
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.leaf_parents.len()
    }

    /// All assignments of photons to leaf slots that are distinct under the symmetries of
    /// the tree, as `slot -> photon index`, in lexicographic order.
    pub fn unique_permutations(&self, tree: &DecayTree) -> Vec<Vec<usize>> {
        let mut perm: Vec<usize> = (0..self.n_leaves()).collect();
        let mut seen = BTreeSet::new();
        let mut unique = Vec::new();
        loop {
            if seen.insert(canonical_tree(tree, &perm)) {
                unique.push(perm.clone());
            }
            if !next_permutation(&mut perm) {
                break;
            }
        }
        unique
    }
}

/// Tree with photon indices at the leaves and daughters in sorted order. Two assignments
/// are equivalent iff their canonical forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Canon {
    Leaf(usize),
    Node(ParticleType, Vec<Canon>),
}

fn canonical_tree(tree: &DecayTree, perm: &[usize]) -> Vec<Canon> {
    let mut slot = 0;
    let mut roots: Vec<Canon> = tree
        .roots
        .iter()
        .map(|r| canonical_node(r, perm, &mut slot))
        .collect();
    roots.sort();
    roots
}

fn canonical_node(node: &DecayNode, perm: &[usize], slot: &mut usize) -> Canon {
    match node {
        DecayNode::Leaf(_) => {
            let canon = Canon::Leaf(perm[*slot]);
            *slot += 1;
            canon
        }
        DecayNode::Decay { ptype, daughters } => {
            let mut children: Vec<Canon> = daughters
                .iter()
                .map(|d| canonical_node(d, perm, slot))
                .collect();
            children.sort();
            Canon::Node(*ptype, children)
        }
    }
}

fn next_permutation(values: &mut [usize]) -> bool {
    let Some(pivot) = values.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(successor) = values.iter().rposition(|&v| v > values[pivot]) else {
        return false;
    };
    values.swap(pivot, successor);
    values[pivot + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let tree = DecayTree::from_str("EtaPrime(g Omega(g Pi0(g g)))").unwrap();
        assert_eq!(tree.roots.len(), 1);
        assert_eq!(tree.n_leaves(), 4);
        assert_eq!(tree.to_string(), "EtaPrime(g Omega(g Pi0(g g)))");

        let tree = DecayTree::from_str(" Pi0( g g )Eta(g  g) ").unwrap();
        assert_eq!(tree.to_string(), "Pi0(g g) Eta(g g)");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DecayTree::from_str("  "), Err(TopologyError::Empty));
        assert_eq!(
            DecayTree::from_str("Pi0(g g"),
            Err(TopologyError::UnbalancedParentheses(7))
        );
        assert_eq!(
            DecayTree::from_str("Pi0(g g))"),
            Err(TopologyError::UnbalancedParentheses(8))
        );
        assert_eq!(
            DecayTree::from_str("(g g)"),
            Err(TopologyError::UnexpectedToken("(".into(), 0))
        );
        assert_eq!(
            DecayTree::from_str("Rho(g g)"),
            Err(TopologyError::UnknownParticle("Rho".into()))
        );
        assert_eq!(
            DecayTree::from_str("Pi0(g)"),
            Err(TopologyError::TooFewDaughters(ParticleType::Pi0))
        );
        assert_eq!(
            DecayTree::from_str("Pi0(g p)"),
            Err(TopologyError::BadLeaf(ParticleType::Proton))
        );
        assert_eq!(
            DecayTree::from_str("g(g g)"),
            Err(TopologyError::NotDecaying(ParticleType::Photon))
        );
        assert_eq!(
            DecayTree::from_str("Pi0(g g) Pi0(g g) Pi0(g g) Pi0(g g) g"),
            Err(TopologyError::TooManyLeaves(9, MAX_LEAVES))
        );
    }

    #[test]
    fn test_channels_parse() {
        for channel in [
            Channel::Pi0_2g,
            Channel::Eta_2g,
            Channel::EtaPrime_2g,
            Channel::TwoPi0_4g,
            Channel::Pi0Eta_4g,
            Channel::ThreePi0_6g,
            Channel::Omega_gPi0_3g,
            Channel::EtaPrime_gOmega_ggPi0_4g,
        ] {
            let tree = channel.tree().unwrap();
            assert_eq!(tree.to_string(), channel.description());
        }
    }

    #[test]
    fn test_flatten() {
        let tree = Channel::EtaPrime_gOmega_ggPi0_4g.tree().unwrap();
        let flat = FlatTree::new(&tree);
        let types: Vec<ParticleType> = flat.nodes.iter().map(|n| n.ptype).collect();
        assert_eq!(
            types,
            vec![ParticleType::EtaPrime, ParticleType::Omega, ParticleType::Pi0]
        );
        assert_eq!(flat.nodes[0].leaves, vec![0, 1, 2, 3]);
        assert_eq!(flat.nodes[1].leaves, vec![1, 2, 3]);
        assert_eq!(flat.nodes[2].leaves, vec![2, 3]);
        assert_eq!(flat.nodes[2].parent, Some(1));
        assert_eq!(flat.leaf_parents, vec![Some(0), Some(1), Some(2), Some(2)]);
    }

    #[test]
    fn test_unique_permutation_counts() {
        for (channel, count) in [
            (Channel::Pi0_2g, 1),
            (Channel::TwoPi0_4g, 3),
            (Channel::Pi0Eta_4g, 6),
            (Channel::Omega_gPi0_3g, 3),
            (Channel::EtaPrime_gOmega_ggPi0_4g, 12),
            (Channel::ThreePi0_6g, 15),
        ] {
            let tree = channel.tree().unwrap();
            let perms = FlatTree::new(&tree).unique_permutations(&tree);
            assert_eq!(perms.len(), count, "{channel:?}");
            assert_eq!(perms[0], (0..tree.n_leaves()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_two_pi0_pairings() {
        let tree = Channel::TwoPi0_4g.tree().unwrap();
        let perms = FlatTree::new(&tree).unique_permutations(&tree);
        assert_eq!(
            perms,
            vec![vec![0, 1, 2, 3], vec![0, 2, 1, 3], vec![0, 3, 1, 2]]
        );
    }
}
