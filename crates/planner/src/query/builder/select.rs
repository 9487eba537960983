//! Typestate builder for [`Select`]: columns first, then the root table,
//! then everything that hangs off it.

use crate::query::ast::{
    common::{AliasedTable, JoinKind, OrderDir, TableRef},
    expr::Expr,
    select::{JoinClause, OrderByExpr, Select},
};

#[derive(Debug, Default, Clone)]
pub struct InitialState;

#[derive(Debug, Default, Clone)]
pub struct SelectState;

#[derive(Debug, Default, Clone)]
pub struct FromState;

#[derive(Debug, Clone)]
pub struct SelectBuilder<State> {
    ast: Select,
    #[allow(dead_code)]
    state: State,
}

impl Default for SelectBuilder<InitialState> {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectBuilder<InitialState> {
    pub fn new() -> Self {
        Self {
            ast: Select::default(),
            state: InitialState,
        }
    }

    pub fn select(mut self, columns: Vec<Expr>) -> SelectBuilder<SelectState> {
        self.ast.columns = columns;
        SelectBuilder {
            ast: self.ast,
            state: SelectState,
        }
    }
}

impl SelectBuilder<SelectState> {
    pub fn distinct(mut self, distinct: bool) -> Self {
        self.ast.distinct = distinct;
        self
    }

    /// Sets the root table. Every table in a compiled query is aliased.
    pub fn from(mut self, table: TableRef, alias: &str) -> SelectBuilder<FromState> {
        self.ast.from = Some(AliasedTable::new(table, alias));
        SelectBuilder {
            ast: self.ast,
            state: FromState,
        }
    }
}

impl SelectBuilder<FromState> {
    pub fn join(mut self, kind: JoinKind, table: TableRef, alias: &str, on: Expr) -> Self {
        self.ast.joins.push(JoinClause {
            kind,
            target: AliasedTable::new(table, alias),
            on,
        });
        self
    }

    /// Appends joins already collected by a join registry.
    pub fn joins(mut self, joins: Vec<JoinClause>) -> Self {
        self.ast.joins.extend(joins);
        self
    }

    /// Sets the `WHERE` condition; `None` leaves the clause out.
    pub fn where_clause(mut self, condition: Option<Expr>) -> Self {
        self.ast.where_clause = condition;
        self
    }

    pub fn order_by(mut self, expr: Expr, direction: OrderDir) -> Self {
        self.ast.order_by.push(OrderByExpr { expr, direction });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.ast.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.ast.offset = Some(offset);
        self
    }

    pub fn lock(mut self, clause: &str) -> Self {
        self.ast.lock = Some(clause.to_string());
        self
    }

    pub fn build(self) -> Select {
        self.ast
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::expr::BinaryOperator;
    use model::core::value::Value;

    #[test]
    fn test_build_with_where_clause() {
        let ast = SelectBuilder::new()
            .select(vec![Expr::column("identityAlias", "email")])
            .from(TableRef::new("identities"), "identityAlias")
            .where_clause(Some(Expr::binary(
                Expr::column("identityAlias", "active"),
                BinaryOperator::Eq,
                Expr::Value(Value::Boolean(true)),
            )))
            .build();

        assert_eq!(ast.from.unwrap().alias, "identityAlias");
        assert!(matches!(ast.where_clause, Some(Expr::BinaryOp(_))));
        assert!(!ast.distinct);
    }

    #[test]
    fn test_build_with_join_and_ordering() {
        let ast = SelectBuilder::new()
            .select(vec![
                Expr::column("identityAlias", "name"),
                Expr::column("identity_linksAlias0", "value"),
            ])
            .distinct(true)
            .from(TableRef::new("identities"), "identityAlias")
            .join(
                JoinKind::LeftOuter,
                TableRef::new("links"),
                "identity_linksAlias0",
                Expr::binary(
                    Expr::column("identityAlias", "id"),
                    BinaryOperator::Eq,
                    Expr::column("identity_linksAlias0", "identity_id"),
                ),
            )
            .order_by(Expr::column("identity_linksAlias0", "value"), OrderDir::Desc)
            .limit(10)
            .build();

        assert!(ast.distinct);
        assert_eq!(ast.joins.len(), 1);
        assert_eq!(ast.joins[0].kind, JoinKind::LeftOuter);
        assert_eq!(ast.joins[0].target.alias, "identity_linksAlias0");
        assert_eq!(ast.order_by[0].direction, OrderDir::Desc);
        assert_eq!(ast.limit, Some(10));
    }
}
