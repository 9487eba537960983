pub mod alias;
pub mod compiler;
pub mod error;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod settings;
