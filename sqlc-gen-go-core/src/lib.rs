pub mod cmd;
pub mod codegen;
pub mod entities;
pub mod error;
pub mod go_type;
pub mod imports;
pub mod model;
pub mod naming;
pub mod opts;
pub mod plugin;
pub mod prune;
pub mod validate;

use crate::{
    codegen::Renderer,
    entities::{build_enums, build_queries, build_structs},
    error::GenError,
    go_type::{Engine, TypeResolver},
    opts::Options,
    plugin::{GenerateRequest, GenerateResponse},
    prune::filter_unused,
    validate::{check_capabilities, check_conflicts},
};

/// Turns one plugin request into the generated Go files.
///
/// Options are decoded and validated first, then entities are built, optionally
/// pruned, checked for naming conflicts and driver support, and finally rendered.
/// Nothing is rendered once a check has failed.
pub fn generate(req: &GenerateRequest) -> Result<GenerateResponse, GenError> {
    let options = Options::parse(req)?;
    let engine = Engine::from_settings(&req.settings.engine);
    let types = TypeResolver::new(&req.catalog, engine, &options);

    let enums = build_enums(req, &options);
    let structs = build_structs(req, &options, &types);
    let queries = build_queries(req, &options, &types, &structs)?;
    tracing::debug!(
        "Built {} enums, {} structs and {} queries",
        enums.len(),
        structs.len(),
        queries.len()
    );

    let (enums, structs) = match options.omit_unused_structs {
        true => {
            let (kept_enums, kept_structs) = filter_unused(enums, structs, &queries);
            tracing::debug!(
                "Kept {} enums and {} structs referenced by queries",
                kept_enums.len(),
                kept_structs.len()
            );
            (kept_enums, kept_structs)
        }
        false => (enums, structs),
    };

    check_conflicts(&options, &enums, &structs, &queries)?;
    check_capabilities(&options, &queries)?;

    let renderer = Renderer::new(&options, &req.sqlc_version)?;
    let output = renderer.render_all(&enums, &structs, &queries)?;
    tracing::info!("Generated {} files", output.len());
    Ok(output.finalize())
}
