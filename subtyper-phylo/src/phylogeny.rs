use crate::{newick, FromNewick};

use color_eyre::eyre::{eyre, Report, Result};
use itertools::Itertools;
use num_traits::AsPrimitive;
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use petgraph::visit::{Dfs, DfsPostOrder};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A [`Phylogeny`] as a rooted tree, directed from the root towards the tips.
///
/// - The nodes (`N`) can be a wide variety of types (ex. [`str`], [`String`], [`usize`]).
/// - The branches (`B`) must be a type that can be cast into an [`f32`] for the length.
/// - See [`Branch`](crate::Branch) for a branch type that also records bootstrap confidence.
#[derive(Clone, Debug)]
pub struct Phylogeny<N, B> {
    /// Directed graph of parents and children.
    ///
    /// `N` are nodes and `B` are branches.
    pub graph: Graph<N, B>,
    /// Lookup of node (`N`) to its [`NodeIndex`] in the graph.
    index: HashMap<N, NodeIndex>,
}

impl<N, B> Default for Phylogeny<N, B>
where
    N: Clone + Debug + Display + Eq + Hash + PartialEq,
    B: AsPrimitive<f32> + Debug + Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, B> Phylogeny<N, B>
where
    N: Clone + Debug + Display + Eq + Hash + PartialEq,
    B: AsPrimitive<f32> + Debug + Display,
{
    /// Returns a new empty [`Phylogeny`] with nodes (`N`) and branches (`B`).
    ///
    /// ## Examples
    ///
    /// Let the compiler figure out the type based on subsequent commands.
    ///
    /// ```rust
    /// let mut phylo = subtyper_phylo::Phylogeny::new();
    /// phylo.add_branch("A", "B", 10.0)?;
    /// phylo.add_branch("A", "C", 1.0)?;
    ///
    /// # assert_eq!(phylo.get_nodes()?, [&"A", &"B", &"C"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// Use custom data types, such as [`Branch`](crate::Branch).
    ///
    /// ```rust
    /// use subtyper_phylo::{Phylogeny, Branch};
    /// let branch = Branch { length: 1.0, confidence: 95.0 };
    ///
    /// let mut phylo = Phylogeny::new();
    /// phylo.add_branch("A".to_string(), "B".to_string(), branch)?;
    /// # assert_eq!(phylo.get_branches()?, [&branch]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn new() -> Self {
        Phylogeny { graph: Graph::new(), index: HashMap::new() }
    }

    /// Creates a branch (`B`) between the parent and child nodes (`N`) and returns the [`EdgeIndex`].
    ///
    /// - If the parent and child nodes don't exist yet in the phylogeny, these nodes are created.
    /// - If a branch already exists between parent and child, updates the branch.
    /// - If the child already has a different parent, or the new branch would create a cycle, returns an Error.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = subtyper_phylo::Phylogeny::new();
    /// phylo.add_branch("B", "C", 1.0)?;
    /// phylo.add_branch("A", "B", 2.0)?;
    /// phylo.add_branch("A", "B", 50.0)?;
    /// # assert_eq!(phylo.get_nodes()?,    [&"A", &"B", &"C"]);
    /// # assert_eq!(phylo.get_branches()?, [&1.0, &50.0]);
    ///
    /// // a node can only have one parent in a tree
    /// assert!(phylo.add_branch("A", "C", 1.0).is_err());
    /// // and cannot become its own ancestor
    /// assert!(phylo.add_branch("C", "A", 1.0).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn add_branch(&mut self, source: N, target: N, branch: B) -> Result<EdgeIndex, Report> {
        if let Ok(Some(parent)) = self.get_parent(&target) {
            if *parent != source {
                return Err(eyre!("Node {target} already has a parent {parent}, cannot add {source}."));
            }
        }
        if source == target || self.get_ancestors(&source).unwrap_or_default().contains(&&target) {
            return Err(eyre!("New branch between {source} and {target} introduced a cycle."));
        }

        let parent_node_index = self.add_node(source);
        let child_node_index = self.add_node(target);

        // add edge between parent to child, or update existing
        let edge_index = self.graph.update_edge(parent_node_index, child_node_index, branch);

        Ok(edge_index)
    }

    /// Adds a new node (`N`) to the [`Phylogeny`] and returns the [`NodeIndex`].
    ///
    /// - If the node already exists in the phylogeny, returns the existing [`NodeIndex`].
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper_phylo::Phylogeny;
    /// use petgraph::graph::NodeIndex;
    ///
    /// let mut phylo: Phylogeny<&str, f32> = Phylogeny::new();
    /// let _a_i = phylo.add_node("A");
    /// let b_i = phylo.add_node("B");
    /// assert_eq!(b_i, NodeIndex::new(1));
    /// assert_eq!(phylo.add_node("B"), b_i);
    /// ```
    pub fn add_node(&mut self, node: N) -> NodeIndex {
        match self.index.get(&node) {
            Some(node_index) => *node_index,
            None => {
                let node_index = self.graph.add_node(node.clone());
                self.index.insert(node, node_index);
                node_index
            }
        }
    }

    /// Returns the path of ancestors from the node (`N`) towards the root, nearest first.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = subtyper_phylo::Phylogeny::new();
    /// phylo.add_branch("A", "B", 1.0)?;
    /// phylo.add_branch("B", "C", 1.0)?;
    /// assert_eq!(phylo.get_ancestors(&"C")?, [&"B", &"A"]);
    /// assert!(phylo.get_ancestors(&"A")?.is_empty());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_ancestors(&self, node: &N) -> Result<Vec<&N>, Report> {
        let mut ancestors = Vec::new();
        let mut current = self.get_parent(node)?;
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.get_parent(parent)?;
        }
        Ok(ancestors)
    }

    /// Returns all branches (`B`) in the [`Phylogeny`].
    pub fn get_branches(&self) -> Result<Vec<&B>, Report> {
        Ok(self.graph.edge_weights().collect())
    }

    /// Returns immediate child nodes (`N`) of the requested node (`N`), in the order they were added.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// let mut phylo = subtyper_phylo::Phylogeny::new();
    /// phylo.add_branch("A", "B", 1.0)?;
    /// phylo.add_branch("A", "C", 1.0)?;
    /// assert_eq!(phylo.get_children(&"A")?, [&"B", &"C"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_children(&self, node: &N) -> Result<Vec<&N>, Report> {
        let node_index = self.get_node_index(node)?;
        let mut children = self
            .graph
            .neighbors(node_index)
            .map(|node_index| self.get_node(&node_index))
            .collect::<Result<Vec<&N>, Report>>()?;

        // children order is last added to first added, reverse this
        children.reverse();

        Ok(children)
    }

    /// Returns all descendant nodes (`N`) of a requested node, following all paths to tips.
    pub fn get_descendants(&self, node: &N) -> Result<Vec<&N>, Report> {
        // Construct a depth-first-search (Dfs)
        let node_index = self.get_node_index(node)?;
        let mut dfs = Dfs::new(&self.graph, node_index);

        let mut descendants = Vec::new();
        while let Some(descendant_index) = dfs.next(&self.graph) {
            // Exclude self
            if descendant_index == node_index {
                continue;
            }
            descendants.push(self.get_node(&descendant_index)?);
        }

        Ok(descendants)
    }

    /// Returns the node (`N`) at a [`NodeIndex`].
    pub fn get_node(&self, node_index: &NodeIndex) -> Result<&N, Report> {
        self.graph
            .node_weight(*node_index)
            .ok_or_else(|| eyre!("Failed to get node data for node index {node_index:?}"))
    }

    /// Returns all nodes (`N`) in the [`Phylogeny`], as a depth-first search from the root.
    pub fn get_nodes(&self) -> Result<Vec<&N>, Report> {
        let root_index = self.get_root_index()?;
        let mut dfs = Dfs::new(&self.graph, root_index);
        let mut nodes = Vec::new();
        while let Some(node_index) = dfs.next(&self.graph) {
            nodes.push(self.get_node(&node_index)?);
        }
        Ok(nodes)
    }

    /// Returns the [`NodeIndex`] of a node (`N`).
    pub fn get_node_index(&self, node: &N) -> Result<NodeIndex, Report> {
        self.index.get(node).copied().ok_or_else(|| eyre!("Failed to get node index of node {node}"))
    }

    /// Returns the parent of a node (`N`), or [`None`] for the root.
    pub fn get_parent(&self, node: &N) -> Result<Option<&N>, Report> {
        let node_index = self.get_node_index(node)?;
        self.graph
            .neighbors_directed(node_index, Direction::Incoming)
            .next()
            .map(|parent_index| self.get_node(&parent_index))
            .transpose()
    }

    /// Returns the root node (`N`) of the [`Phylogeny`].
    pub fn get_root(&self) -> Result<&N, Report> {
        let root_index = self.get_root_index()?;
        self.get_node(&root_index)
    }

    /// Returns the [`NodeIndex`] of the root node.
    ///
    /// Errors if the phylogeny is empty, or contains multiple disconnected trees.
    pub fn get_root_index(&self) -> Result<NodeIndex, Report> {
        if self.is_empty() {
            Err(eyre!("Failed to locate root node index in phylogeny as graph is empty!."))?
        }

        // get all nodes with no parents, could be root
        let root_indices: Vec<_> = self
            .graph
            .node_indices()
            .filter(|i| self.graph.neighbors_directed(*i, Direction::Incoming).next().is_none())
            .collect();

        match root_indices.len() {
            0 => Err(eyre!("Failed to locate root node index in phylogeny."))?,
            1 => Ok(root_indices[0]),
            _ => Err(eyre!("Failed to locate root node index in phylogeny, multiple roots found: {root_indices:?}"))?
        }
    }

    /// Returns the tips (nodes without children) of the [`Phylogeny`], in the order they were added.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper_phylo::{Branch, FromNewick, Phylogeny};
    /// let phylo: Phylogeny<String, Branch> = Phylogeny::from_newick("(A,(B,C)90,D);")?;
    /// assert_eq!(phylo.get_tips(), [&"A", &"B", &"C", &"D"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_tips(&self) -> Vec<&N> {
        self.graph
            .node_indices()
            .filter(|i| self.graph.neighbors(*i).next().is_none())
            .filter_map(|i| self.graph.node_weight(i))
            .collect()
    }

    /// Returns true if the [`Phylogeny`] has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns the [`Splits`] (bipartitions of the tips) defined by every branch of the tree.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper_phylo::{Branch, FromNewick, Phylogeny};
    /// use std::collections::BTreeSet;
    ///
    /// let phylo: Phylogeny<String, Branch> = Phylogeny::from_newick("((A,B),(C,D));")?;
    /// let splits = phylo.splits()?;
    /// let (a, b, c) = ("A".to_string(), "B".to_string(), "C".to_string());
    /// assert!(splits.contains(&BTreeSet::from([&a, &b])));
    /// assert!(!splits.contains(&BTreeSet::from([&a, &c])));
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn splits(&self) -> Result<Splits<'_, N>, Report>
    where
        N: Ord,
    {
        let root_index = self.get_root_index()?;

        // collect the tips below every node, children are visited before parents
        let mut below: HashMap<NodeIndex, BTreeSet<&N>> = HashMap::new();
        let mut dfs = DfsPostOrder::new(&self.graph, root_index);
        while let Some(node_index) = dfs.next(&self.graph) {
            let children = self.graph.neighbors(node_index).collect_vec();
            let tips = match children.is_empty() {
                true => BTreeSet::from([self.get_node(&node_index)?]),
                false => children
                    .iter()
                    .filter_map(|child| below.get(child))
                    .flat_map(|tips| tips.iter().copied())
                    .collect(),
            };
            below.insert(node_index, tips);
        }

        let tips = below.get(&root_index).cloned().unwrap_or_default();
        let clades = below.into_values().collect();

        Ok(Splits { tips, clades })
    }
}

// ----------------------------------------------------------------------------
// Splits
// ----------------------------------------------------------------------------

/// Where a query tip sits relative to the members of a reference cluster.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Placement {
    /// The query does not form a clade with the cluster.
    Outside,
    /// The query is nested inside the cluster clade.
    Inside,
    /// The cluster is a clade on its own, and the query is its closest outside relative.
    Sister,
}

/// Bipartitions of the tips of a [`Phylogeny`], with the tree treated as unrooted.
#[derive(Clone, Debug)]
pub struct Splits<'p, N> {
    /// All tips of the tree.
    pub tips: BTreeSet<&'p N>,
    /// Tips below each node of the tree.
    pub clades: HashSet<BTreeSet<&'p N>>,
}

impl<'p, N> Splits<'p, N>
where
    N: Debug + Display + Eq + Hash + Ord,
{
    /// Returns true if the taxa are separated from the other tips by a single branch.
    pub fn contains(&self, taxa: &BTreeSet<&'p N>) -> bool {
        if taxa.is_empty() {
            return false;
        }
        if taxa.len() == 1 || taxa.len() == self.tips.len() || self.clades.contains(taxa) {
            return true;
        }
        // unrooted: the complement of a clade is separated by the same branch
        let complement: BTreeSet<&N> = self.tips.difference(taxa).copied().collect();
        self.clades.contains(&complement)
    }

    /// Returns the [`Placement`] of the `query` tip relative to the cluster `members`.
    ///
    /// Members that are not tips of the tree are ignored. A cluster with a single member
    /// that pairs with the query counts as [`Placement::Inside`].
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper_phylo::{Branch, FromNewick, Phylogeny, Placement};
    /// let b = ["B1".to_string(), "B2".to_string()];
    /// let query = "QUERY".to_string();
    ///
    /// let phylo: Phylogeny<String, Branch> = Phylogeny::from_newick("(((A1,A2),(C1,C2)),(B1,(B2,QUERY)));")?;
    /// assert_eq!(phylo.splits()?.placement(&query, &b)?, Placement::Inside);
    ///
    /// let phylo: Phylogeny<String, Branch> = Phylogeny::from_newick("(((A1,A2),(C1,C2)),((B1,B2),QUERY));")?;
    /// assert_eq!(phylo.splits()?.placement(&query, &b)?, Placement::Sister);
    ///
    /// let phylo: Phylogeny<String, Branch> = Phylogeny::from_newick("(((A1,QUERY),(C1,C2)),((B1,B2),A2));")?;
    /// assert_eq!(phylo.splits()?.placement(&query, &b)?, Placement::Outside);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn placement(&self, query: &N, members: &[N]) -> Result<Placement, Report> {
        let query = self
            .tips
            .get(query)
            .copied()
            .ok_or_else(|| eyre!("Query {query} is not a tip of the phylogeny."))?;

        let members: BTreeSet<&N> =
            members.iter().filter_map(|m| self.tips.get(m).copied()).filter(|m| *m != query).collect();
        if members.is_empty() {
            return Ok(Placement::Outside);
        }

        let mut joint = members.clone();
        joint.insert(query);

        let placement = if !self.contains(&joint) {
            Placement::Outside
        } else if members.len() >= 2 && self.contains(&members) {
            Placement::Sister
        } else {
            Placement::Inside
        };

        Ok(placement)
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl<N, B> FromNewick for Phylogeny<N, B>
where
    N: Clone + Debug + Display + Eq + Hash + PartialEq + FromNewick,
    B: AsPrimitive<f32> + Debug + Display + FromNewick,
{
    /// Returns a [`Phylogeny`] created from a single [Newick](https://en.wikipedia.org/wiki/Newick_format) tree.
    ///
    /// Malformed trees (ex. duplicated tip labels) are returned as errors.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use subtyper_phylo::{Branch, FromNewick, Phylogeny};
    /// let phylo: Phylogeny<String, Branch> = Phylogeny::from_newick("(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;")?;
    /// assert_eq!(phylo.get_root()?, "F");
    /// assert_eq!(phylo.get_children(&"E".to_string())?, [&"C", &"D"]);
    ///
    /// assert!(Phylogeny::<String, Branch>::from_newick("(A,(A,B));").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    fn from_newick(newick: &str) -> Result<Phylogeny<N, B>, Report> {
        let mut node_i = 0;
        let (root, links) = newick::str_to_vec(newick, &mut node_i)?;
        let mut phylo = Phylogeny::new();
        phylo.add_node(root);
        links.into_iter().try_for_each(|(p, c, b)| phylo.add_branch(p, c, b).map(|_| ()))?;
        Ok(phylo)
    }
}
