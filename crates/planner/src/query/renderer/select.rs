use crate::query::{
    ast::{
        common::{AliasedTable, TableRef},
        select::{JoinClause, OrderByExpr, Select},
    },
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        r.push(if self.distinct { "SELECT DISTINCT " } else { "SELECT " });
        r.separated(&self.columns, ", ");

        if let Some(from) = &self.from {
            r.push(" FROM ");
            from.render(r);
        }

        for join in &self.joins {
            r.push(" ");
            join.render(r);
        }

        if let Some(where_clause) = &self.where_clause {
            r.push(" WHERE ");
            where_clause.render(r);
        }

        if !self.order_by.is_empty() {
            r.push(" ORDER BY ");
            r.separated(&self.order_by, ", ");
        }

        // SQLite needs a LIMIT before it accepts an OFFSET.
        match (self.limit, self.offset) {
            (Some(limit), _) => r.push(&format!(" LIMIT {limit}")),
            (None, Some(_)) => {
                if let Some(all) = r.dialect.unbounded_limit() {
                    r.push(&format!(" LIMIT {all}"));
                }
            }
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            r.push(&format!(" OFFSET {offset}"));
        }

        if let Some(lock) = &self.lock {
            r.push(" ");
            r.push(lock);
        }
    }
}

impl Render for TableRef {
    fn render(&self, r: &mut Renderer) {
        if let Some(schema) = &self.schema {
            r.quoted(schema);
            r.push(".");
        }
        r.quoted(&self.name);
    }
}

impl Render for AliasedTable {
    fn render(&self, r: &mut Renderer) {
        self.table.render(r);
        r.push(" AS ");
        r.quoted(&self.alias);
    }
}

impl Render for JoinClause {
    fn render(&self, r: &mut Renderer) {
        r.push(self.kind.keyword());
        r.push(" ");
        self.target.render(r);
        r.push(" ON ");
        self.on.render(r);
    }
}

impl Render for OrderByExpr {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        r.push(" ");
        r.push(self.direction.keyword());
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::{
            common::{JoinKind, OrderDir, TableRef},
            expr::{BinaryOperator, Expr},
        },
        builder::select::SelectBuilder,
        dialect::{Postgres, SqlServer, Sqlite},
        renderer::render,
    };
    use model::core::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_with_outer_join_postgres() {
        let ast = SelectBuilder::new()
            .select(vec![
                Expr::column("identityAlias", "name").alias("name"),
                Expr::column("identity_managerAlias0", "name").alias("manager_name"),
            ])
            .distinct(true)
            .from(TableRef::new("identities"), "identityAlias")
            .join(
                JoinKind::LeftOuter,
                TableRef::new("identities"),
                "identity_managerAlias0",
                Expr::binary(
                    Expr::column("identityAlias", "manager_id"),
                    BinaryOperator::Eq,
                    Expr::column("identity_managerAlias0", "id"),
                ),
            )
            .where_clause(Some(Expr::binary(
                Expr::column("identityAlias", "title"),
                BinaryOperator::NotEq,
                Expr::Value(Value::from("intern")),
            )))
            .order_by(Expr::column("identityAlias", "name"), OrderDir::Desc)
            .limit(10)
            .offset(20)
            .build();

        let (sql, params) = render(&ast, &Postgres);

        let expected_sql = r#"SELECT DISTINCT "identityAlias"."name" AS "name", "identity_managerAlias0"."name" AS "manager_name" FROM "identities" AS "identityAlias" LEFT OUTER JOIN "identities" AS "identity_managerAlias0" ON "identityAlias"."manager_id" = "identity_managerAlias0"."id" WHERE "identityAlias"."title" <> $1 ORDER BY "identityAlias"."name" DESC LIMIT 10 OFFSET 20"#;
        assert_eq!(sql, expected_sql);
        assert_eq!(params, vec![Value::from("intern")]);
    }

    #[test]
    fn test_schema_qualified_table_sql_server() {
        let ast = SelectBuilder::new()
            .select(vec![Expr::column("t", "id").alias("id")])
            .from(TableRef::qualified("dbo", "identities"), "t")
            .build();

        let (sql, _) = render(&ast, &SqlServer);
        assert_eq!(sql, "SELECT [t].[id] AS [id] FROM [dbo].[identities] AS [t]");
    }

    #[test]
    fn test_offset_without_limit_sqlite() {
        let ast = SelectBuilder::new()
            .select(vec![Expr::column("t", "id").alias("id")])
            .from(TableRef::new("items"), "t")
            .offset(5)
            .build();

        let (sql, _) = render(&ast, &Sqlite);
        assert_eq!(sql, r#"SELECT "t"."id" AS "id" FROM "items" AS "t" LIMIT -1 OFFSET 5"#);

        let (sql, _) = render(&ast, &Postgres);
        assert_eq!(sql, r#"SELECT "t"."id" AS "id" FROM "items" AS "t" OFFSET 5"#);
    }

    #[test]
    fn test_lock_is_rendered_last() {
        let ast = SelectBuilder::new()
            .select(vec![Expr::column("t", "id").alias("id")])
            .from(TableRef::new("items"), "t")
            .order_by(Expr::column("t", "id"), OrderDir::Asc)
            .limit(3)
            .lock("FOR UPDATE")
            .build();

        let (sql, _) = render(&ast, &Postgres);
        assert_eq!(
            sql,
            r#"SELECT "t"."id" AS "id" FROM "items" AS "t" ORDER BY "t"."id" ASC LIMIT 3 FOR UPDATE"#
        );
    }
}
