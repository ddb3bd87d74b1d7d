pub mod context;
mod postprocess;

use std::collections::{BTreeMap, BTreeSet};

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::{
    cmd::CommandKind,
    error::GenError,
    imports::{FileKind, Importer},
    model::{Enum, Query, Struct},
    opts::{Options, OutputTarget},
    plugin::{File, GenerateResponse},
};

use self::context::ContextBuilder;

const TEMPLATES: &[(&str, &str)] = &[
    ("header.go.jinja", include_str!("codegen/templates/header.go.jinja")),
    ("struct.go.jinja", include_str!("codegen/templates/struct.go.jinja")),
    ("db.go.jinja", include_str!("codegen/templates/db.go.jinja")),
    ("models.go.jinja", include_str!("codegen/templates/models.go.jinja")),
    ("querier.go.jinja", include_str!("codegen/templates/querier.go.jinja")),
    ("queries.go.jinja", include_str!("codegen/templates/queries.go.jinja")),
    ("copyfrom.go.jinja", include_str!("codegen/templates/copyfrom.go.jinja")),
    ("batch.go.jinja", include_str!("codegen/templates/batch.go.jinja")),
];

/// Files produced by one run. Names are unique and kept in order.
#[derive(Debug, Default)]
pub struct OutputFiles {
    files: BTreeMap<String, String>,
}

impl OutputFiles {
    pub fn push(&mut self, name: String, contents: String) -> Result<(), GenError> {
        if self.files.contains_key(&name) {
            return Err(GenError::invalid_options(format!(
                "more than one generated file is named {name}"
            )));
        }
        self.files.insert(name, contents);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn finalize(self) -> GenerateResponse {
        GenerateResponse {
            files: self
                .files
                .into_iter()
                .map(|(name, contents)| File { name, contents })
                .collect(),
        }
    }
}

fn go_file_name(name: &str) -> String {
    match name.ends_with(".go") {
        true => name.to_owned(),
        false => format!("{name}.go"),
    }
}

fn render_error(file: &str, msg: impl ToString, partial: String) -> GenError {
    GenError::Render {
        file: file.to_owned(),
        msg: msg.to_string(),
        partial,
    }
}

pub struct Renderer<'a> {
    env: Environment<'static>,
    options: &'a Options,
    contexts: ContextBuilder<'a>,
}

impl<'a> Renderer<'a> {
    pub fn new(options: &'a Options, sqlc_version: &'a str) -> Result<Self, GenError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|err| render_error(name, err, String::new()))?;
        }
        Ok(Self {
            env,
            options,
            contexts: ContextBuilder::new(options, sqlc_version),
        })
    }

    /// Renders one file and checks the result is well-formed enough to hand to gofmt.
    fn render<S: Serialize>(&self, file: &str, template: &str, ctx: S) -> Result<String, GenError> {
        let rendered = self
            .env
            .get_template(template)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|err| render_error(file, err, String::new()))?;
        let text = postprocess::tidy(&rendered);
        postprocess::check_balance(&text).map_err(|msg| render_error(file, msg, text.clone()))?;
        tracing::info!("Rendered {file} ({} bytes)", text.len());
        Ok(text)
    }

    /// Renders every file for the built entities.
    pub fn render_all(
        &self,
        enums: &[Enum],
        structs: &[Struct],
        queries: &[Query],
    ) -> Result<OutputFiles, GenError> {
        let importer = Importer::new(self.options);
        let mut output = OutputFiles::default();

        let mut emit = |target: OutputTarget,
                        kind: FileKind,
                        source: &str,
                        mut structs: Vec<Struct>,
                        mut queries: Vec<Query>|
         -> Result<(), GenError> {
            let name = go_file_name(&target.file_name);
            let package = target.package.as_str();
            let imports = importer.resolve(kind, package, enums, &mut structs, &mut queries);
            let header = self.contexts.header(package, source, &imports);
            let text = match kind {
                FileKind::Db => self.render(&name, "db.go.jinja", self.contexts.db(header, &queries)),
                FileKind::Models => self.render(
                    &name,
                    "models.go.jinja",
                    self.contexts.models(header, enums, &structs),
                ),
                FileKind::Querier => self.render(
                    &name,
                    "querier.go.jinja",
                    self.contexts.querier(header, &queries),
                ),
                FileKind::Queries => self.render(
                    &name,
                    "queries.go.jinja",
                    self.contexts.queries(header, &queries),
                ),
                FileKind::CopyFrom => self.render(
                    &name,
                    "copyfrom.go.jinja",
                    self.contexts.copyfrom(header, &queries),
                ),
                FileKind::Batch => self.render(
                    &name,
                    "batch.go.jinja",
                    self.contexts.batch(header, &queries),
                ),
            }?;
            output.push(name, text)
        };

        emit(self.options.db_target(), FileKind::Db, "", vec![], queries.to_vec())?;
        emit(
            self.options.models_target(),
            FileKind::Models,
            "",
            structs.to_vec(),
            vec![],
        )?;
        if self.options.emit_interface {
            emit(
                self.options.querier_target(),
                FileKind::Querier,
                "",
                vec![],
                queries.to_vec(),
            )?;
        }

        let copyfrom: Vec<Query> = queries
            .iter()
            .filter(|query| query.cmd == CommandKind::CopyFrom)
            .cloned()
            .collect();
        if !copyfrom.is_empty() {
            emit(self.options.copyfrom_target(), FileKind::CopyFrom, "", vec![], copyfrom)?;
        }

        let batch: Vec<Query> = queries
            .iter()
            .filter(|query| query.cmd.is_batch())
            .cloned()
            .collect();
        if !batch.is_empty() {
            emit(self.options.batch_target(), FileKind::Batch, "", vec![], batch)?;
        }

        let sources: BTreeSet<&str> = queries.iter().map(|query| query.source_name.as_str()).collect();
        for source in sources {
            let routed: Vec<Query> = queries
                .iter()
                .filter(|query| query.source_name == source && !query.cmd.is_batch())
                .cloned()
                .collect();
            let target = OutputTarget {
                file_name: self.options.query_file_name(source),
                package: self.options.query_package(),
            };
            emit(target, FileKind::Queries, source, vec![], routed)?;
        }

        Ok(output)
    }
}
