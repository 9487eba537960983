//! Turns statement nodes into SQL text plus bind parameters.

use crate::query::dialect::Dialect;
use model::core::value::Value;

pub mod expr;
pub mod select;

pub trait Render {
    fn render(&self, renderer: &mut Renderer);
}

/// Accumulates text and parameters while a statement is walked. Literal
/// values never reach the text; each one becomes a dialect placeholder.
pub struct Renderer<'a> {
    sql: String,
    params: Vec<Value>,
    pub dialect: &'a dyn Dialect,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            dialect,
        }
    }

    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub fn bind(&mut self, value: Value) {
        let placeholder = self.dialect.get_placeholder(self.params.len());
        self.params.push(value);
        self.sql.push_str(&placeholder);
    }

    pub fn quoted(&mut self, ident: &str) {
        let quoted = self.dialect.quote_identifier(ident);
        self.sql.push_str(&quoted);
    }

    /// Renders `items` with `separator` between them.
    pub fn separated<T: Render>(&mut self, items: &[T], separator: &str) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            item.render(self);
        }
    }
}

/// Renders `node` with `dialect`, returning the SQL text and its parameters.
pub fn render<T: Render + ?Sized>(node: &T, dialect: &dyn Dialect) -> (String, Vec<Value>) {
    let mut renderer = Renderer::new(dialect);
    node.render(&mut renderer);
    renderer.finish()
}
