//! Join synthesis.
//!
//! Turns a resolved node path into join descriptors. Each plan has a single
//! base table (the root's); every hop after it contributes only join clauses.
//! Many-to-many hops produce two joins through the bridge table. Aliases are
//! unique within a plan: a table joined a second time gets a `_<n>` suffix.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::errors::{TreeError, TreeResult};
use super::lookup::FieldRef;
use super::node::{NodeId, TreeNode};
use super::Tree;
use crate::schema_catalog::{Direction, EdgeLink, EntityKey, RelationshipEdge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

impl JoinKind {
    fn for_nullable(nullable: bool) -> Self {
        if nullable {
            JoinKind::LeftOuter
        } else {
            JoinKind::Inner
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER JOIN"),
            JoinKind::LeftOuter => write!(f, "LEFT OUTER JOIN"),
        }
    }
}

/// One join: `left_alias` is already present in the plan, `table` is joined
/// under `alias`. `on` holds `(left column, right column)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDescriptor {
    pub left_alias: String,
    pub table: String,
    pub alias: String,
    pub kind: JoinKind,
    pub on: Vec<(String, String)>,
}

impl fmt::Display for JoinDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind, self.table)?;
        if self.alias != self.table {
            write!(f, " AS \"{}\"", self.alias)?;
        }
        let conditions: Vec<String> = self
            .on
            .iter()
            .map(|(left, right)| {
                format!(
                    "\"{}\".\"{}\" = \"{}\".\"{}\"",
                    self.left_alias, left, self.alias, right
                )
            })
            .collect();
        write!(f, " ON ({})", conditions.join(" AND "))
    }
}

/// Joins for one or more targets over a shared base table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub base_table: String,
    pub base_alias: String,
    pub joins: Vec<JoinDescriptor>,
    /// Alias of each requested target, in request order. A target that needs
    /// no join reports the base alias.
    pub aliases: Vec<String>,
}

impl fmt::Display for JoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM \"{}\"", self.base_table)?;
        if self.base_alias != self.base_table {
            write!(f, " AS \"{}\"", self.base_alias)?;
        }
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

/// Selected `(alias, column)` pairs over a join plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectPlan {
    pub columns: Vec<(String, String)>,
    pub plan: JoinPlan,
}

impl fmt::Display for SelectPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(alias, column)| format!("\"{}\".\"{}\"", alias, column))
            .collect();
        write!(f, "SELECT {} {}", columns.join(", "), self.plan)
    }
}

/// Accumulates joins, reusing the join of any node already in the plan.
struct JoinPlanner<'t> {
    tree: &'t Tree,
    base_alias: String,
    joins: Vec<JoinDescriptor>,
    joined: HashMap<NodeId, String>,
    used: HashSet<String>,
}

impl<'t> JoinPlanner<'t> {
    fn new(tree: &'t Tree) -> Self {
        let base_alias = tree.root().table.clone();
        Self {
            tree,
            joined: HashMap::from([(NodeId::ROOT, base_alias.clone())]),
            used: HashSet::from([base_alias.clone()]),
            base_alias,
            joins: Vec::new(),
        }
    }

    fn alias_for(&mut self, table: &str) -> String {
        if self.used.insert(table.to_string()) {
            return table.to_string();
        }
        let mut counter = 1;
        loop {
            let alias = format!("{}_{}", table, counter);
            if self.used.insert(alias.clone()) {
                log::debug!("Alias collision: joining '{}' as '{}'", table, alias);
                return alias;
            }
            counter += 1;
        }
    }

    /// Join every node of `path` not yet in the plan; returns the alias of
    /// the last node (the base alias for an empty path).
    fn join_path(&mut self, path: &[&TreeNode]) -> String {
        let mut left = self.base_alias.clone();
        for node in path {
            if let Some(alias) = self.joined.get(&node.id) {
                left = alias.clone();
                continue;
            }
            let Some(edge) = &node.edge else {
                continue;
            };
            let alias = self.join_hop(&left, node, edge);
            self.joined.insert(node.id, alias.clone());
            left = alias;
        }
        left
    }

    fn join_hop(&mut self, left: &str, node: &TreeNode, edge: &RelationshipEdge) -> String {
        match &edge.link {
            EdgeLink::ForeignKey {
                columns,
                references,
            } => {
                let on = match edge.direction {
                    Direction::Forward => zip_keys(columns, references),
                    Direction::Reverse => zip_keys(references, columns),
                };
                let alias = self.alias_for(&node.table);
                self.joins.push(JoinDescriptor {
                    left_alias: left.to_string(),
                    table: node.table.clone(),
                    alias: alias.clone(),
                    kind: JoinKind::for_nullable(edge.nullable),
                    on,
                });
                alias
            }
            EdgeLink::Through(through) => {
                let (near_key, near_columns, far_columns, far_key) = match edge.direction {
                    Direction::Forward => (
                        &through.source_key,
                        &through.source_columns,
                        &through.target_columns,
                        &through.target_key,
                    ),
                    Direction::Reverse => (
                        &through.target_key,
                        &through.target_columns,
                        &through.source_columns,
                        &through.source_key,
                    ),
                };

                let bridge_alias = self.alias_for(&through.table);
                self.joins.push(JoinDescriptor {
                    left_alias: left.to_string(),
                    table: through.table.clone(),
                    alias: bridge_alias.clone(),
                    kind: JoinKind::LeftOuter,
                    on: zip_keys(near_key, near_columns),
                });

                let alias = self.alias_for(&node.table);
                self.joins.push(JoinDescriptor {
                    left_alias: bridge_alias,
                    table: node.table.clone(),
                    alias: alias.clone(),
                    kind: JoinKind::LeftOuter,
                    on: zip_keys(far_columns, far_key),
                });
                alias
            }
        }
    }

    fn finish(self, aliases: Vec<String>) -> JoinPlan {
        JoinPlan {
            base_table: self.tree.root().table.clone(),
            base_alias: self.base_alias,
            joins: self.joins,
            aliases,
        }
    }
}

fn zip_keys(left: &[String], right: &[String]) -> Vec<(String, String)> {
    left.iter().cloned().zip(right.iter().cloned()).collect()
}

impl Tree {
    /// Ordered joins connecting the root to `target`. An empty list means the
    /// target lives on the base table.
    pub fn synthesize_joins(
        &self,
        target: &EntityKey,
        via: Option<&EntityKey>,
    ) -> TreeResult<Vec<JoinDescriptor>> {
        let path = self.resolve_path(target, via)?;
        let mut planner = JoinPlanner::new(self);
        planner.join_path(&path);
        Ok(planner.joins)
    }

    /// Joins for the self-join leaf of `entity` reached through `accessor`.
    pub fn synthesize_self_join(&self, entity: &EntityKey, accessor: &str) -> TreeResult<Vec<JoinDescriptor>> {
        let path = self.self_join_path(entity, accessor)?;
        let mut planner = JoinPlanner::new(self);
        planner.join_path(&path);
        Ok(planner.joins)
    }

    /// Union of the joins needed for every target, in target order.
    pub fn join_plan(&self, targets: &[EntityKey]) -> TreeResult<JoinPlan> {
        let mut planner = JoinPlanner::new(self);
        let mut aliases = Vec::with_capacity(targets.len());
        for target in targets {
            let path = self.resolve_path(target, None)?;
            aliases.push(planner.join_path(&path));
        }
        Ok(planner.finish(aliases))
    }

    /// Column selection over the joins the fields need, optionally led by
    /// the root's primary key.
    pub fn select(&self, fields: &[FieldRef], include_pk: bool) -> TreeResult<SelectPlan> {
        let mut planner = JoinPlanner::new(self);
        let mut columns = Vec::new();

        if include_pk {
            let base = planner.base_alias.clone();
            columns.extend(self.root().primary_key.iter().map(|c| (base.clone(), c.clone())));
        }

        let mut aliases = Vec::with_capacity(fields.len());
        for field in fields {
            let FieldRef::Field { entity, name } = field else {
                return Err(TreeError::invalid_lookup(
                    field.to_string(),
                    "reverse relationships cannot be selected as columns",
                ));
            };
            let column = self.column_of(entity, name)?;
            let path = self.resolve_path(entity, None)?;
            let alias = planner.join_path(&path);
            columns.push((alias.clone(), column));
            aliases.push(alias);
        }

        Ok(SelectPlan {
            columns,
            plan: planner.finish(aliases),
        })
    }

    fn column_of(&self, entity: &EntityKey, name: &str) -> TreeResult<String> {
        self.catalog()
            .get_fields(entity)?
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.column.clone())
            .ok_or_else(|| {
                TreeError::invalid_lookup(
                    format!("{}.{}", entity, name),
                    "not a column-backed field",
                )
            })
    }
}
