pub mod ast;
pub mod builder;
pub mod capabilities;
pub mod dialect;
pub mod renderer;
