//! Per-file import resolution.

use std::{collections::BTreeSet, fmt};

use serde::Serialize;

use crate::{
    cmd::CommandKind,
    model::{Enum, Field, Query, QueryValue, Struct},
    naming::to_camel_case,
    opts::{Options, SqlDriver},
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ImportSpec {
    pub path: String,
    pub alias: String,
}

impl ImportSpec {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            alias: String::new(),
        }
    }

    /// Standard library paths have no dot in their first segment.
    fn is_std(&self) -> bool {
        !self.path.split('/').next().unwrap_or_default().contains('.')
    }

    fn last_segment(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl fmt::Display for ImportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alias.is_empty() {
            true => write!(f, "{:?}", self.path),
            false => write!(f, "{} {:?}", self.alias, self.path),
        }
    }
}

/// Imports of one file: standard library first, then everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileImports {
    pub std: Vec<ImportSpec>,
    pub pkg: Vec<ImportSpec>,
}

impl FileImports {
    pub fn is_empty(&self) -> bool {
        self.std.is_empty() && self.pkg.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.std.iter().chain(&self.pkg).any(|spec| spec.path == path)
    }

    /// Import lines grouped as Go formats them, groups separated by an empty string.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.std.iter().map(ToString::to_string).collect();
        if !self.std.is_empty() && !self.pkg.is_empty() {
            lines.push(String::new());
        }
        lines.extend(self.pkg.iter().map(ToString::to_string));
        lines
    }
}

#[derive(Default)]
struct ImportSet {
    specs: BTreeSet<ImportSpec>,
}

impl ImportSet {
    fn add(&mut self, path: &str) {
        self.specs.insert(ImportSpec::new(path));
    }

    fn finish(self) -> FileImports {
        let (std, pkg) = self.specs.into_iter().partition(ImportSpec::is_std);
        FileImports { std, pkg }
    }
}

/// The generated file an import set is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Db,
    Models,
    Querier,
    CopyFrom,
    Batch,
    Queries,
}

fn strip_markers(type_name: &str) -> (&str, &str) {
    let body = type_name.trim_start_matches(['[', ']', '*']);
    (&type_name[..type_name.len() - body.len()], body)
}

/// Drops the qualifier of a type that lives in `package` itself.
pub fn localize(type_name: &str, package: &str) -> String {
    let (markers, body) = strip_markers(type_name);
    match body.strip_prefix(package).and_then(|rest| rest.strip_prefix('.')) {
        Some(local) => format!("{markers}{local}"),
        None => type_name.to_owned(),
    }
}

fn localize_fields(fields: &mut [Field], package: &str) {
    for field in fields {
        field.type_name = localize(&field.type_name, package);
        localize_fields(&mut field.embed_fields, package);
    }
}

pub fn localize_struct(structure: &mut Struct, package: &str) {
    structure.name = localize(&structure.name, package);
    localize_fields(&mut structure.fields, package);
}

fn localize_value(value: &mut QueryValue, package: &str) {
    value.typ = localize(&value.typ, package);
    if let Some(structure) = &mut value.structure {
        localize_struct(structure, package);
    }
}

pub struct Importer<'a> {
    options: &'a Options,
}

impl<'a> Importer<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    fn pgx_path(&self) -> &'static str {
        self.options.driver().import_path()
    }

    fn pgconn_path(&self) -> &'static str {
        match self.options.driver() {
            SqlDriver::PgxV5 => "github.com/jackc/pgx/v5/pgconn",
            _ => "github.com/jackc/pgconn",
        }
    }

    fn add_type(&self, set: &mut ImportSet, package: &str, type_name: &str) {
        let (_, bare) = strip_markers(type_name);
        let Some((qualifier, _)) = bare.split_once('.') else {
            return;
        };

        let overridden = self.options.overrides.iter().find_map(|item| {
            let spec = item.go_type();
            let path = spec.import_path?;
            (strip_markers(&spec.type_name).1 == bare).then_some(path)
        });
        if let Some(path) = overridden {
            set.add(&path);
            return;
        }

        let path = match qualifier {
            "time" => "time",
            "sql" => "database/sql",
            "json" => "encoding/json",
            "net" => "net",
            "netip" => "net/netip",
            "uuid" => "github.com/google/uuid",
            "pqtype" => "github.com/sqlc-dev/pqtype",
            "pgtype" if self.options.driver() == SqlDriver::PgxV5 => "github.com/jackc/pgx/v5/pgtype",
            "pgtype" => "github.com/jackc/pgtype",
            "pgconn" => self.pgconn_path(),
            models if Some(models) == self.options.models_qualifier() && models != package => {
                let path = self.options.models_package_import_path.as_str();
                let mut spec = ImportSpec::new(path);
                if spec.last_segment() != models {
                    spec.alias = models.to_owned();
                }
                set.specs.insert(spec);
                return;
            }
            _ => return,
        };
        set.add(path);
    }

    fn add_fields(&self, set: &mut ImportSet, package: &str, fields: &[Field]) {
        for field in fields {
            self.add_type(set, package, &field.type_name);
        }
    }

    /// Types spelled in a method signature for the argument.
    fn add_arg(&self, set: &mut ImportSet, package: &str, arg: &QueryValue) {
        if arg.is_empty() {
            return;
        }
        match &arg.structure {
            Some(structure) if !arg.emit => self.add_fields(set, package, &structure.fields),
            _ => self.add_type(set, package, &arg.type_name()),
        }
    }

    /// Field types of a params or row struct declared next to the query.
    fn add_declared(&self, set: &mut ImportSet, package: &str, value: &QueryValue) {
        if let (true, Some(structure)) = (value.emit, &value.structure) {
            self.add_fields(set, package, &structure.fields);
        }
    }

    fn add_signature(&self, set: &mut ImportSet, package: &str, query: &Query) {
        self.add_arg(set, package, &query.arg);
        if query.has_ret_type() && !query.cmd.is_batch() {
            self.add_type(set, package, &query.ret.type_name());
        }
        if query.cmd == CommandKind::ExecResult {
            match self.options.driver().is_pgx() {
                true => set.add(self.pgconn_path()),
                false => set.add("database/sql"),
            }
        }
    }

    fn needs_pq(&self, queries: &[&Query]) -> bool {
        if self.options.driver().is_pgx() {
            return false;
        }
        let slice = |field: &Field| {
            field.type_name.starts_with("[]") && field.type_name != "[]byte" && !field.has_sqlc_slice()
        };
        queries.iter().any(|query| {
            let ret = match query.has_ret_type() {
                true => query.ret.fields(),
                false => vec![],
            };
            let arg = match query.arg.is_empty() {
                true => vec![],
                false => query.arg.fields(),
            };
            arg.iter().chain(&ret).any(slice)
        })
    }

    /// Imports for one file given the entities routed to it.
    pub fn imports(
        &self,
        kind: FileKind,
        package: &str,
        enums: &[Enum],
        structs: &[Struct],
        queries: &[Query],
    ) -> FileImports {
        let mut set = ImportSet::default();
        let pgx = self.options.driver().is_pgx();
        match kind {
            FileKind::Db => {
                set.add("context");
                if pgx {
                    set.add(self.pgx_path());
                    set.add(self.pgconn_path());
                } else {
                    set.add("database/sql");
                    if self.options.emit_prepared_queries {
                        set.add("fmt");
                    }
                }
            }
            FileKind::Models => {
                if !enums.is_empty() {
                    set.add("database/sql/driver");
                    set.add("fmt");
                }
                for structure in structs {
                    self.add_fields(&mut set, package, &structure.fields);
                }
            }
            FileKind::Querier => {
                set.add("context");
                for query in queries {
                    self.add_signature(&mut set, package, query);
                }
            }
            FileKind::Queries => {
                // copyfrom queries only contribute their params struct here.
                let methods: Vec<&Query> = queries
                    .iter()
                    .filter(|query| query.cmd != CommandKind::CopyFrom)
                    .collect();
                if !methods.is_empty() {
                    set.add("context");
                }
                for query in queries {
                    self.add_declared(&mut set, package, &query.arg);
                    self.add_declared(&mut set, package, &query.ret);
                }
                for query in &methods {
                    self.add_signature(&mut set, package, query);
                }
                if self.needs_pq(&methods) {
                    set.add(SqlDriver::LibPq.import_path());
                }
            }
            FileKind::CopyFrom => {
                set.add("context");
                if self.options.uses_mysql_driver() {
                    for path in ["fmt", "io", "sync/atomic", "github.com/hexon/mysqltsv"] {
                        set.add(path);
                    }
                    set.add(SqlDriver::GoSqlDriverMysql.import_path());
                }
                for query in queries {
                    self.add_arg(&mut set, package, &query.arg);
                }
            }
            FileKind::Batch => {
                set.add("context");
                set.add("errors");
                set.add(self.pgx_path());
                for query in queries {
                    self.add_signature(&mut set, package, query);
                    self.add_declared(&mut set, package, &query.arg);
                    self.add_declared(&mut set, package, &query.ret);
                    if query.has_ret_type() {
                        self.add_type(&mut set, package, &query.ret.type_name());
                    }
                }
            }
        }
        set.finish()
    }

    /// Localises the file's own package qualifier, resolves imports, then
    /// renames arguments that would shadow an imported package.
    pub fn resolve(
        &self,
        kind: FileKind,
        package: &str,
        enums: &[Enum],
        structs: &mut [Struct],
        queries: &mut [Query],
    ) -> FileImports {
        for structure in structs.iter_mut() {
            localize_struct(structure, package);
        }
        for query in queries.iter_mut() {
            localize_value(&mut query.arg, package);
            localize_value(&mut query.ret, package);
        }
        let imports = self.imports(kind, package, enums, structs, queries);
        replace_conflicted_args(&imports, queries);
        imports
    }
}

/// Renames an argument named like an imported package, e.g. `sql` -> `argSql`.
pub fn replace_conflicted_args(imports: &FileImports, queries: &mut [Query]) {
    let taken: BTreeSet<&str> = imports
        .std
        .iter()
        .chain(&imports.pkg)
        .map(|spec| match spec.alias.is_empty() {
            true => spec.last_segment(),
            false => spec.alias.as_str(),
        })
        .collect();
    for query in queries {
        if taken.contains(query.arg.name.as_str()) {
            query.arg.name = to_camel_case(&format!("arg_{}", query.arg.name));
        }
    }
}
