use crate::FromNewick;
use color_eyre::eyre::{eyre, Report, Result};
use std::fmt::Display;

impl FromNewick for String {
    /// Returns the label of a Newick node, dropping the branch attributes.
    fn from_newick(newick: &str) -> Result<Self, Report> {
        let label = newick.replace(';', "").split(':').next().unwrap_or_default().to_string();
        Ok(label)
    }
}

/// Returns the individual trees found in a block of Newick text.
///
/// Trees are terminated by `;`, whitespace (including newlines inside a tree) is removed.
///
/// ## Examples
///
/// ```rust
/// use subtyper_phylo::newick;
/// let text = "((A,B),C);\n((A,C),\n B);\n";
/// assert_eq!(newick::split_trees(text), ["((A,B),C)", "((A,C),B)"]);
/// ```
pub fn split_trees(text: &str) -> Vec<String> {
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    text.split(';').filter(|tree| !tree.is_empty()).map(String::from).collect()
}

/// Returns the root node (`N`) and the (parent, child, branch) links of a Newick tree.
///
/// Internal nodes without a name, or with a numeric name (a bootstrap value), are
/// labelled `NODE_<i>` so that every node of the tree is unique.
///
/// ## Arguments
///
/// - `newick` - A Newick [`str`] (ex. `"(A,B);"`)
/// - `node_i` - Counter for naming unlabelled internal nodes.
///
/// ## Examples
///
/// From a Newick string with only tip names.
///
/// ```rust
/// use subtyper_phylo::{newick, Branch};
/// let mut node_i = 0;
/// let (root, links) = newick::str_to_vec::<String, Branch>("(A,(B,C));", &mut node_i)?;
/// assert_eq!(root, "NODE_0");
/// let pairs: Vec<_> = links.iter().map(|(p, c, _b)| (p.as_str(), c.as_str())).collect();
/// assert_eq!(pairs, [("NODE_0", "A"), ("NODE_0", "NODE_1"), ("NODE_1", "B"), ("NODE_1", "C")]);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
///
/// Bootstrap values on internal nodes and branch lengths.
///
/// ```rust
/// use subtyper_phylo::{newick, Branch};
/// let mut node_i = 0;
/// let (_root, links) = newick::str_to_vec::<String, Branch>("(A:0.1,(B:0.2,C:0.3)95:0.5);", &mut node_i)?;
/// assert_eq!(links[1].1, "NODE_1");
/// assert_eq!(links[1].2, Branch { length: 0.5, confidence: 95.0 });
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn str_to_vec<N, B>(newick: &str, node_i: &mut usize) -> Result<(N, Vec<(N, N, B)>), Report>
where
    N: Clone + Display + FromNewick,
    B: FromNewick,
{
    // strip ';' and whitespace characters
    let newick: String = newick.chars().filter(|c| !c.is_whitespace() && *c != ';').collect();
    if newick.is_empty() {
        return Err(eyre!("Failed to parse an empty newick string."));
    }

    let (inner, attributes) = split_node(&newick)?;
    let root: N = match inner {
        Some(_) => internal_node(attributes, node_i)?,
        None => N::from_newick(attributes)?,
    };

    let mut links = Vec::new();
    if let Some(inner) = inner {
        collect_links(inner, &root, node_i, &mut links)?;
    }

    Ok((root, links))
}

/// Recursively collect the links below `parent`, in the order they appear in the newick.
fn collect_links<N, B>(
    newick: &str,
    parent: &N,
    node_i: &mut usize,
    links: &mut Vec<(N, N, B)>,
) -> Result<(), Report>
where
    N: Clone + Display + FromNewick,
    B: FromNewick,
{
    for child in split_top_level(newick)?.into_iter().filter(|c| !c.is_empty()) {
        let (inner, attributes) = split_node(child)?;
        let branch = B::from_newick(attributes)?;
        let node: N = match inner {
            Some(_) => internal_node(attributes, node_i)?,
            None => N::from_newick(attributes)?,
        };
        links.push((parent.clone(), node.clone(), branch));

        if let Some(inner) = inner {
            collect_links(inner, &node, node_i, links)?;
        }
    }
    Ok(())
}

/// Name an internal node, replacing missing or numeric (bootstrap) labels.
fn internal_node<N>(attributes: &str, node_i: &mut usize) -> Result<N, Report>
where
    N: FromNewick,
{
    let label = attributes.split(':').next().unwrap_or_default();
    if label.is_empty() || label.parse::<f32>().is_ok() {
        let node = N::from_newick(&format!("NODE_{node_i}"))?;
        *node_i += 1;
        Ok(node)
    } else {
        N::from_newick(label)
    }
}

/// Split a node into the content inside its outer parentheses (if any) and its attributes.
fn split_node(newick: &str) -> Result<(Option<&str>, &str), Report> {
    if !newick.starts_with('(') {
        return Ok((None, newick));
    }

    let mut depth = 0;
    for (i, c) in newick.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((Some(&newick[1..i]), &newick[i + 1..]));
                }
            }
            _ => (),
        }
    }

    Err(eyre!("Failed to find matching outer parentheses from newick: {newick}"))
}

/// Split newick content on the commas that are not nested inside parentheses.
fn split_top_level(newick: &str) -> Result<Vec<&str>, Report> {
    let mut parts = Vec::new();
    let (mut depth, mut start) = (0_i32, 0);

    for (i, c) in newick.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&newick[start..i]);
                start = i + 1;
            }
            _ => (),
        }
        if depth < 0 {
            return Err(eyre!("Unbalanced parentheses in newick: {newick}"));
        }
    }
    if depth != 0 {
        return Err(eyre!("Unbalanced parentheses in newick: {newick}"));
    }
    parts.push(&newick[start..]);

    Ok(parts)
}
