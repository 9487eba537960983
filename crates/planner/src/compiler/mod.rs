//! Turns a [`QueryRequest`] into SQL for one backend.

pub mod escape;
pub mod filter;
pub mod optimize;

use crate::{
    alias::AliasContext,
    compiler::{filter::FilterCompiler, optimize::optimize},
    error::PlannerError,
    pagination::Paginator,
    query::{
        ast::{
            common::{OrderDir, TableRef},
            expr::{Expr, FunctionCall},
        },
        builder::select::SelectBuilder,
        capabilities::{DialectCapabilities, PagingStyle},
        dialect::Dialect,
        renderer::render,
    },
    schema::Schema,
    settings::CompilerSettings,
};
use model::query::{compiled::CompiledQuery, request::QueryRequest};
use tracing::debug;

/// Projection that counts rows instead of selecting them.
const COUNT_PROJECTION: &str = "count(*)";

pub struct QueryCompiler<'a> {
    schema: &'a Schema,
    dialect: &'a dyn Dialect,
    capabilities: &'a DialectCapabilities,
    settings: CompilerSettings,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(
        schema: &'a Schema,
        dialect: &'a dyn Dialect,
        capabilities: &'a DialectCapabilities,
    ) -> Self {
        Self {
            schema,
            dialect,
            capabilities,
            settings: CompilerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn compile(&self, request: &QueryRequest) -> Result<CompiledQuery, PlannerError> {
        let root = self.schema.entity(&request.entity)?;
        if let Some(filter) = &request.filter {
            filter.validate()?;
        }

        let filter = optimize(request.filter.as_ref(), &request.entity, &self.settings);

        let mut ctx = AliasContext::new(self.schema, &request.entity)?;
        let where_clause = FilterCompiler::new(&mut ctx, self.capabilities, request.ignore_case)
            .compile(filter.as_ref())?;

        let is_count = matches!(
            request.projected_properties.as_slice(),
            [only] if only.eq_ignore_ascii_case(COUNT_PROJECTION)
        );

        let use_distinct =
            request.distinct && self.capabilities.can_use_distinct(&request.projected_properties);
        let client_side_distinct = request.distinct && !use_distinct;

        // Orderings and projections must not drop rows, so their joins are
        // always outer joins.
        let mut order_by = Vec::new();
        if !is_count {
            for ordering in &request.orderings {
                let column = ctx.substitute_alias_with(&ordering.property, false, true)?;
                let fold = ordering.ignore_case && !self.capabilities.case_insensitive;
                // SELECT DISTINCT only orders by selected expressions.
                let expr = if fold && use_distinct {
                    debug!(
                        property = %ordering.property,
                        "Distinct query ordered with the column's own case"
                    );
                    column
                } else if fold {
                    Expr::function("UPPER", vec![column])
                } else {
                    column
                };
                order_by.push((expr, OrderDir::from_ascending(ordering.ascending)));
            }
        }

        let default_alias = ctx.default_alias().to_string();
        let columns = if is_count {
            let distinct = use_distinct || ctx.current().joins().has_outer_joins();
            let count = if distinct {
                FunctionCall {
                    name: "COUNT".to_string(),
                    args: vec![Expr::column(&default_alias, &root.id_column)],
                    wildcard: false,
                    distinct: true,
                }
            } else {
                FunctionCall {
                    name: "COUNT".to_string(),
                    args: Vec::new(),
                    wildcard: true,
                    distinct: false,
                }
            };
            vec![Expr::FunctionCall(count).alias("count")]
        } else if request.projected_properties.is_empty() {
            root.columns()
                .into_iter()
                .map(|(property, column)| Expr::column(&default_alias, column).alias(property))
                .collect()
        } else {
            let mut properties = request.projected_properties.clone();
            // A distinct result can only be ordered by selected columns.
            if use_distinct {
                for ordering in &request.orderings {
                    if !properties.contains(&ordering.property) {
                        properties.push(ordering.property.clone());
                    }
                }
            }
            let mut columns = Vec::with_capacity(properties.len());
            let mut names = Vec::with_capacity(properties.len());
            for property in &properties {
                let column = ctx.substitute_alias_with(property, false, true)?;
                let name = column_alias(property, &names);
                columns.push(column.alias(&name));
                names.push(name);
            }
            columns
        };

        let lock = if request.lock {
            let clause = self.dialect.lock_clause();
            if clause.is_none() {
                debug!("{} has no lock clause, lock request ignored", self.dialect.name());
            }
            clause
        } else {
            None
        };

        let alias_map = ctx.alias_map();
        let root_scope = ctx.into_root();

        let mut builder = SelectBuilder::new()
            .select(columns)
            .distinct(use_distinct && !is_count)
            .from(TableRef::new(&root.table), &default_alias)
            .joins(root_scope.joins().to_clauses())
            .where_clause(where_clause);
        for (expr, direction) in order_by {
            builder = builder.order_by(expr, direction);
        }

        let native_paging = self.capabilities.paging == PagingStyle::Limit;
        if native_paging {
            if request.limit > 0 {
                builder = builder.limit(request.limit);
            }
            if request.offset > 0 {
                builder = builder.offset(request.offset);
            }
        }
        if let Some(lock) = lock {
            builder = builder.lock(lock);
        }

        let (mut text, params) = render(&builder.build(), self.dialect);
        if !native_paging && request.is_paged() {
            text = Paginator::new(self.dialect, self.capabilities.paging).apply(
                &text,
                request.offset,
                request.limit,
            )?;
        }

        debug!("Compiled {} query: {}", self.dialect.name(), text);

        Ok(CompiledQuery {
            text,
            params,
            alias_map,
            client_side_distinct,
        })
    }
}

/// `manager.name` becomes `manager_name`; clashes get a numeric suffix.
fn column_alias(property: &str, taken: &[String]) -> String {
    let base = property.replace('.', "_");
    if !taken.contains(&base) {
        return base;
    }
    let free = (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate));
    free.unwrap_or(base)
}
