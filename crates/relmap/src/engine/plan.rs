use relmap_core::schema::{Relationship, Schema, TableMapping};

use std::fmt::Write;
use tracing::debug;

/// Alias of the root table in every generated query.
pub(crate) const ROOT_ALIAS: &str = "a";

/// Separates a column's table alias from its name in result columns.
pub(crate) const ALIAS_SEPARATOR: &str = "__";

/// The joins and select items of one query over a mapping and every
/// relationship reachable from it within the depth bounds.
///
/// A plan is built per call and never stored, so a schema can be shared by
/// concurrent queries.
#[derive(Debug)]
pub(crate) struct Plan<'a> {
    schema: &'a Schema,

    /// Nodes in depth-first order; the root is first.
    pub(crate) nodes: Vec<Node<'a>>,
}

#[derive(Debug)]
pub(crate) struct Node<'a> {
    pub(crate) alias: String,

    pub(crate) mapping: &'a TableMapping,

    /// The relationship leading to this node; `None` for the root.
    pub(crate) relationship: Option<&'a Relationship>,

    /// Indices of the child nodes, in declaration order
    pub(crate) children: Vec<usize>,

    /// Member path from the root, e.g. `children.toys`. Empty for the root.
    pub(crate) path: String,

    /// `LEFT JOIN` bringing this node's table into the query
    pub(crate) join: Option<String>,
}

impl<'a> Plan<'a> {
    pub(crate) fn new(schema: &'a Schema, root: &'a TableMapping) -> Self {
        let mut plan = Plan {
            schema,
            nodes: vec![Node {
                alias: ROOT_ALIAS.to_string(),
                mapping: root,
                relationship: None,
                children: vec![],
                path: String::new(),
                join: None,
            }],
        };

        plan.expand(0, 1);
        plan
    }

    fn expand(&mut self, index: usize, depth: usize) {
        let mapping = self.nodes[index].mapping;
        let child_depth = depth + 1;

        for (position, relationship) in mapping.relationships.iter().enumerate() {
            if child_depth > relationship.max_depth() {
                debug!(
                    table = %mapping.table,
                    member = relationship.member(),
                    depth = child_depth,
                    "relmap.plan.depth_cutoff"
                );
                continue;
            }

            let parent = &self.nodes[index];

            // Schema validation caps relationships at one letter each.
            let letter = char::from(b'a' + position as u8);
            let alias = format!("{}{letter}", parent.alias);

            let path = if parent.path.is_empty() {
                relationship.member().to_string()
            } else {
                format!("{}.{}", parent.path, relationship.member())
            };

            let join = relationship.select_join_clause(self.schema, &parent.alias, &alias);

            let child = self.nodes.len();
            self.nodes.push(Node {
                alias,
                mapping: self.schema.mapping(relationship.target()),
                relationship: Some(relationship),
                children: vec![],
                path,
                join: Some(join),
            });
            self.nodes[index].children.push(child);

            self.expand(child, child_depth);
        }
    }

    pub(crate) fn root(&self) -> &Node<'a> {
        &self.nodes[0]
    }

    /// True if the joins can yield several physical rows per root row.
    pub(crate) fn fans_out(&self) -> bool {
        self.nodes
            .iter()
            .filter_map(|node| node.relationship)
            .any(Relationship::fans_out)
    }

    pub(crate) fn alias_for_path(&self, path: &str) -> Option<&str> {
        self.nodes
            .iter()
            .skip(1)
            .find(|node| node.path == path)
            .map(|node| node.alias.as_str())
    }

    pub(crate) fn node_for_alias(&self, alias: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.alias == alias)
    }

    /// `a.id AS a__id, a.name AS a__name, aa.id AS aa__id, ...`
    pub(crate) fn select_items(&self) -> String {
        let mut sql = String::new();

        for node in &self.nodes {
            for column in &node.mapping.columns {
                if !sql.is_empty() {
                    sql.push_str(", ");
                }

                let _ = write!(
                    sql,
                    "{alias}.{column} AS {alias}{ALIAS_SEPARATOR}{column}",
                    alias = node.alias
                );
            }
        }

        sql
    }

    /// Select items for the root primary key only.
    pub(crate) fn key_items(&self) -> String {
        self.root()
            .mapping
            .primary_key
            .iter()
            .map(|column| format!("{ROOT_ALIAS}.{column} AS {ROOT_ALIAS}{ALIAS_SEPARATOR}{column}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `table a LEFT JOIN ...`
    pub(crate) fn from_clause(&self) -> String {
        let mut sql = self.root_from_clause();

        for join in self.nodes.iter().filter_map(|node| node.join.as_deref()) {
            sql.push(' ');
            sql.push_str(join);
        }

        sql
    }

    /// `table a`, without joins
    pub(crate) fn root_from_clause(&self) -> String {
        format!("{} {ROOT_ALIAS}", self.root().mapping.table)
    }
}
