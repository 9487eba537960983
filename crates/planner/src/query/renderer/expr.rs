use crate::query::{
    ast::expr::{BinaryOp, Expr, FunctionCall, Ident},
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => ident.render(r),
            Expr::Value(val) => r.bind(val.clone()),
            Expr::BinaryOp(op) => op.render(r),
            Expr::Like {
                expr,
                pattern,
                escape,
            } => {
                expr.render(r);
                r.push(" LIKE ");
                pattern.render(r);
                if let Some(c) = escape {
                    let literal = r.dialect.escape_literal(*c);
                    r.push(" ESCAPE ");
                    r.push(&literal);
                }
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                expr.render(r);
                r.push(if *negated { " NOT IN (" } else { " IN (" });
                r.separated(list, ", ");
                r.push(")");
            }
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                expr.render(r);
                r.push(if *negated { " NOT IN (" } else { " IN (" });
                subquery.render(r);
                r.push(")");
            }
            Expr::Exists { subquery, negated } => {
                r.push(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
                subquery.render(r);
                r.push(")");
            }
            Expr::IsNull { expr, negated } => {
                expr.render(r);
                r.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
            }
            Expr::And(children) => render_connective(r, children, " AND "),
            Expr::Or(children) => render_connective(r, children, " OR "),
            Expr::Not(child) => {
                r.push("NOT (");
                child.render(r);
                r.push(")");
            }
            Expr::Never => r.push("1 = 0"),
            Expr::FunctionCall(func) => func.render(r),
            Expr::Literal(text) => r.push(text),
            Expr::Alias { expr, alias } => {
                expr.render(r);
                r.push(" AS ");
                r.quoted(alias);
            }
        }
    }
}

// Nested connectives are always parenthesized.
fn render_connective(r: &mut Renderer, children: &[Expr], separator: &str) {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            r.push(separator);
        }
        if child.is_compound() {
            r.push("(");
            child.render(r);
            r.push(")");
        } else {
            child.render(r);
        }
    }
}

impl Render for Ident {
    fn render(&self, r: &mut Renderer) {
        if let Some(qualifier) = &self.qualifier {
            r.quoted(qualifier);
            r.push(".");
        }
        r.quoted(&self.name);
    }
}

impl Render for BinaryOp {
    fn render(&self, r: &mut Renderer) {
        self.left.render(r);
        r.push(" ");
        r.push(self.op.as_sql());
        r.push(" ");
        self.right.render(r);
    }
}

impl Render for FunctionCall {
    fn render(&self, r: &mut Renderer) {
        r.push(&self.name);
        r.push("(");
        if self.distinct {
            r.push("DISTINCT ");
        }
        if self.wildcard {
            r.push("*");
        } else {
            r.separated(&self.args, ", ");
        }
        r.push(")");
    }
}

#[cfg(test)]
mod tests {
    use crate::query::{
        ast::expr::{BinaryOperator, Expr},
        dialect::{MySql, Postgres},
        renderer::render,
    };
    use model::core::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_connectives_are_parenthesized() {
        let expr = Expr::Or(vec![
            Expr::And(vec![
                Expr::binary(Expr::column("a", "x"), BinaryOperator::Eq, Expr::Value(Value::Int(1))),
                Expr::binary(Expr::column("a", "y"), BinaryOperator::Gt, Expr::Value(Value::Int(2))),
            ]),
            Expr::Not(Box::new(Expr::IsNull {
                expr: Box::new(Expr::column("a", "z")),
                negated: false,
            })),
        ]);

        let (sql, params) = render(&expr, &Postgres);
        assert_eq!(
            sql,
            r#"("a"."x" = $1 AND "a"."y" > $2) OR NOT ("a"."z" IS NULL)"#
        );
        assert_eq!(params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_like_with_escape_and_in_list() {
        let expr = Expr::And(vec![
            Expr::Like {
                expr: Box::new(Expr::function("UPPER", vec![Expr::column("a", "name")])),
                pattern: Box::new(Expr::function("UPPER", vec![Expr::Value(Value::from("%x\\%%"))])),
                escape: Some('\\'),
            },
            Expr::InList {
                expr: Box::new(Expr::column("a", "id")),
                list: vec![Expr::Value(Value::Int(1)), Expr::Value(Value::Int(2))],
                negated: false,
            },
        ]);

        let (sql, _) = render(&expr, &MySql);
        assert_eq!(
            sql,
            r"UPPER(`a`.`name`) LIKE UPPER(?) ESCAPE '\\' AND `a`.`id` IN (?, ?)"
        );
    }

    #[test]
    fn test_never_and_alias() {
        let (sql, params) = render(&Expr::Never, &Postgres);
        assert_eq!(sql, "1 = 0");
        assert!(params.is_empty());

        let (sql, _) = render(&Expr::column("t", "name").alias("name"), &Postgres);
        assert_eq!(sql, r#""t"."name" AS "name""#);
    }
}
