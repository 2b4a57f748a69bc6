use rustc_hash::FxHashMap;

use crate::errors::*;
use crate::ops::significance_op::family_id_column;
use crate::ops::Op;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeChangeCount {
    pub node: String,
    pub expand: usize,
    pub contract: usize,
}

impl NodeChangeCount {
    /// `+<expand>` and/or `-<contract>`, or `None` when nothing changed at the node.
    pub fn suffix(&self) -> Option<String> {
        if self.expand == 0 && self.contract == 0 {
            return None;
        }

        let mut suffix = String::new();
        if self.expand > 0 {
            suffix.push_str(&format!("+{}", self.expand));
        }
        if self.contract > 0 {
            suffix.push_str(&format!("-{}", self.contract));
        }
        Some(suffix)
    }

    pub fn label(&self) -> Option<String> {
        self.suffix().map(|s| format!("{}{s}", self.node))
    }
}

pub struct NodeCountOp<'t> {
    table: &'t Table,
}

impl<'t> NodeCountOp<'t> {
    const NAME: &'static str = "NodeCountOp";

    /// Count expanded (> 0) and contracted (< 0) families for every node column of a
    /// change matrix. Every column except `FamilyID` is a node.
    pub fn new(table: &'t Table) -> Self {
        Self { table }
    }
}

impl<'t> Op for NodeCountOp<'t> {
    type Output = Vec<NodeChangeCount>;

    fn run(&self) -> Result<Self::Output> {
        let id_col = family_id_column(self.table)?;

        Ok(self
            .table
            .headers()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != id_col)
            .map(|(i, node)| {
                let (expand, contract) =
                    self.table
                        .numeric_column(i)
                        .flatten()
                        .fold((0, 0), |(e, c), v| {
                            if v > 0.0 {
                                (e + 1, c)
                            } else if v < 0.0 {
                                (e, c + 1)
                            } else {
                                (e, c)
                            }
                        });
                NodeChangeCount {
                    node: node.clone(),
                    expand,
                    contract,
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// How node names are located in the tree text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMatch {
    /// Whole labels only: the text on either side must not continue the name with a
    /// letter, digit or underscore. All labels are rewritten in a single pass.
    #[default]
    Bounded,
    /// Every literal occurrence, node by node. `N1` also matches inside `N10`.
    Substring,
}

pub struct TreeLabelOp<'a> {
    tree: &'a str,
    counts: &'a [NodeChangeCount],
    label_match: LabelMatch,
}

impl<'a> TreeLabelOp<'a> {
    const NAME: &'static str = "TreeLabelOp";

    /// Append expansion/contraction counts to the node labels of a tree.
    ///
    /// Nodes without any change are left as they are.
    pub fn new(tree: &'a str, counts: &'a [NodeChangeCount]) -> Self {
        Self {
            tree,
            counts,
            label_match: LabelMatch::default(),
        }
    }

    pub fn with_label_match(mut self, label_match: LabelMatch) -> Self {
        self.label_match = label_match;
        self
    }

    fn relabel_substring(&self) -> String {
        let mut tree = self.tree.to_owned();
        for count in self.counts {
            if let Some(label) = count.label() {
                tree = tree.replace(&count.node, &label);
            }
        }
        tree
    }

    fn relabel_bounded(&self) -> String {
        let labels = self
            .counts
            .iter()
            .filter(|c| !c.node.is_empty())
            .filter_map(|c| c.label().map(|l| (c.node.as_str(), l)))
            .collect::<FxHashMap<_, _>>();

        // longest names first so "A<10>" is tried before "A<1>"
        let mut nodes = labels.keys().copied().collect::<Vec<_>>();
        nodes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let tree = self.tree;
        let mut out = String::with_capacity(tree.len() + 8 * nodes.len());
        let mut i = 0;
        let mut copied = 0;

        while i < tree.len() {
            let rest = &tree[i..];
            let found = if i > 0 && continues_name(tree[..i].chars().next_back()) {
                None
            } else {
                nodes.iter().find(|node| {
                    rest.starts_with(**node) && !continues_name(rest[node.len()..].chars().next())
                })
            };

            match found {
                Some(node) => {
                    out.push_str(&tree[copied..i]);
                    out.push_str(&labels[node]);
                    i += node.len();
                    copied = i;
                }
                None => i += rest.chars().next().map(char::len_utf8).unwrap_or(1),
            }
        }
        out.push_str(&tree[copied..]);
        out
    }
}

fn continues_name(c: Option<char>) -> bool {
    matches!(c, Some(c) if c.is_alphanumeric() || c == '_')
}

impl<'a> Op for TreeLabelOp<'a> {
    type Output = String;

    fn run(&self) -> Result<Self::Output> {
        Ok(match self.label_match {
            LabelMatch::Bounded => self.relabel_bounded(),
            LabelMatch::Substring => self.relabel_substring(),
        })
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(node: &str, expand: usize, contract: usize) -> NodeChangeCount {
        NodeChangeCount {
            node: node.into(),
            expand,
            contract,
        }
    }

    #[test]
    fn counts_per_node() {
        let table = Table::new(
            "sig",
            vec!["FamilyID".into(), "N1".into(), "N3".into()],
            vec![
                vec!["OG1".into(), "2".into(), "1".into()],
                vec!["OG2".into(), "-1".into(), "3".into()],
                vec!["OG3".into(), "0".into(), "".into()],
            ],
        );
        let counts = NodeCountOp::new(&table).run().unwrap();
        assert_eq!(counts, vec![count("N1", 1, 1), count("N3", 2, 0)]);
        for c in &counts {
            assert!(c.expand + c.contract <= table.len());
        }
    }

    #[test]
    fn suffixes() {
        assert_eq!(count("N3", 2, 0).label().as_deref(), Some("N3+2"));
        assert_eq!(count("N3", 0, 4).label().as_deref(), Some("N3-4"));
        assert_eq!(count("N3", 1, 4).label().as_deref(), Some("N3+1-4"));
        assert_eq!(count("N3", 0, 0).label(), None);
    }

    #[test]
    fn unchanged_nodes_stay() {
        let counts = [count("N3", 2, 0), count("N4", 0, 0)];
        let tree = "((A:1,B:1)N3:2,C:3)N4;";
        let out = TreeLabelOp::new(tree, &counts).run().unwrap();
        assert_eq!(out, "((A:1,B:1)N3+2:2,C:3)N4;");
    }

    #[test]
    fn bounded_does_not_touch_longer_names() {
        let counts = [count("N1", 1, 0), count("N10", 0, 2)];
        let tree = "(N1:1,N10:1)root;";
        let out = TreeLabelOp::new(tree, &counts).run().unwrap();
        assert_eq!(out, "(N1+1:1,N10-2:1)root;");
    }

    #[test]
    fn bounded_cafe_labels() {
        let counts = [count("<1>", 1, 0), count("Siler_cupreus<2>", 0, 1), count("<10>", 3, 0)];
        let tree = "((Siler_cupreus<2>:1,B<3>:1)<1>:1,C<4>:2)<10>;";
        let out = TreeLabelOp::new(tree, &counts).run().unwrap();
        assert_eq!(out, "((Siler_cupreus<2>-1:1,B<3>:1)<1>+1:1,C<4>:2)<10>+3;");
    }

    #[test]
    fn substring_mode_rewrites_every_occurrence() {
        let counts = [count("N1", 1, 0)];
        let tree = "(N1:1,N10:1);";
        let out = TreeLabelOp::new(tree, &counts)
            .with_label_match(LabelMatch::Substring)
            .run()
            .unwrap();
        assert_eq!(out, "(N1+1:1,N1+10:1);");
    }
}
