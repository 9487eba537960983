#![allow(dead_code)]

use model::query::{compiled::CompiledQuery, request::QueryRequest};
use planner::{
    compiler::QueryCompiler,
    error::PlannerError,
    query::{
        capabilities::{BackendKind, DialectCapabilities},
        dialect::dialect_for,
    },
    schema::{EntityDef, Schema},
    settings::CompilerSettings,
};

/// Identities with a manager and a collection of links to applications.
pub fn schema() -> Schema {
    Schema::new()
        .with_entity(
            "Identity",
            EntityDef::new("identities")
                .property("name")
                .property("email")
                .property("active")
                .property("title")
                .property("workgroup")
                .many_to_one("manager", "Identity", "manager_id")
                .one_to_many("links", "Link", "identity_id"),
        )
        .with_entity(
            "Link",
            EntityDef::new("links")
                .property("value")
                .property("native_identity")
                .many_to_one("application", "Application", "application_id")
                .many_to_one("identity", "Identity", "identity_id"),
        )
        .with_entity(
            "Application",
            EntityDef::new("applications").property("name"),
        )
}

pub fn compile(
    backend: BackendKind,
    request: &QueryRequest,
) -> Result<CompiledQuery, PlannerError> {
    compile_with(backend, CompilerSettings::default(), request)
}

pub fn compile_with(
    backend: BackendKind,
    settings: CompilerSettings,
    request: &QueryRequest,
) -> Result<CompiledQuery, PlannerError> {
    let caps = DialectCapabilities::for_backend(&backend)?;
    compile_caps(caps, settings, request)
}

pub fn compile_caps(
    caps: DialectCapabilities,
    settings: CompilerSettings,
    request: &QueryRequest,
) -> Result<CompiledQuery, PlannerError> {
    let schema = schema();
    let dialect = dialect_for(&caps.backend)?;
    QueryCompiler::new(&schema, dialect.as_ref(), &caps)
        .with_settings(settings)
        .compile(request)
}

/// Compiles for PostgreSQL, panicking on error.
pub fn pg(request: &QueryRequest) -> CompiledQuery {
    compile(BackendKind::Postgres, request).unwrap()
}

pub fn identities() -> QueryRequest {
    QueryRequest::new("Identity")
}
