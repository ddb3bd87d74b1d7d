//! Template contexts. Every Go snippet is computed here so templates stay declarative.

use serde::Serialize;

use crate::{
    cmd::{CallStyle, CommandKind},
    imports::FileImports,
    model::{Enum, Field, Query, QueryValue, Struct, render_tags},
    naming::{comment, escape_backtick},
    opts::Options,
};

#[derive(Debug, Serialize)]
pub struct Header {
    pub build_tags: String,
    pub sqlc_version: String,
    pub source: String,
    pub package: String,
    pub imports: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StructDecl {
    pub name: String,
    pub comment: Vec<String>,
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EnumCtx {
    pub name: String,
    pub null_name: String,
    pub comment: Vec<String>,
    pub const_lines: Vec<String>,
    pub constant_names: Vec<String>,
    pub null_struct: StructDecl,
}

#[derive(Debug, Serialize)]
pub struct Statement {
    pub field: String,
    pub constant: String,
    pub method: String,
}

#[derive(Debug, Serialize)]
pub struct DbCtx {
    pub header: Header,
    pub pgx: bool,
    pub uses_copyfrom: bool,
    pub uses_batch: bool,
    pub db_argument: bool,
    pub prepared: bool,
    pub statements: Vec<Statement>,
    pub queries_fields: Vec<String>,
    pub with_tx_fields: Vec<String>,
    pub tx_type: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsCtx {
    pub header: Header,
    pub enums: Vec<EnumCtx>,
    pub structs: Vec<StructDecl>,
    pub emit_enum_valid_method: bool,
    pub emit_all_enum_values: bool,
}

#[derive(Debug, Serialize)]
pub struct MethodSig {
    pub comments: Vec<String>,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct QuerierCtx {
    pub header: Header,
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Default, Serialize)]
pub struct QueryCtx {
    pub cmd: &'static str,
    pub method_name: String,
    pub constant_name: String,
    pub sql: String,
    pub comments: Vec<String>,
    pub has_method: bool,
    pub arg_struct: Option<StructDecl>,
    pub ret_struct: Option<StructDecl>,
    pub params: String,
    pub returns: String,
    pub call: String,
    pub result_return: String,

    pub ret_name: String,
    pub ret_type: String,
    pub ret_define_type: String,
    pub ret_return_name: String,
    pub ret_zero: String,
    pub ret_declare: bool,
    pub scan_row: String,
    pub scan_rows: String,
    pub scan_batch_rows: String,

    pub arg_name: String,
    pub arg_slice_pair: String,
    pub arg_slice_type: String,
    pub table_go_slice: String,
    pub column_names_go_slice: String,
    pub copy_method: String,
    pub copy_values: Vec<String>,
    pub exec_method: String,
    pub mysql_table: String,
    pub mysql_columns: String,
    pub mysql_appends: Vec<String>,
    pub batch_method: String,
    pub batch_values: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QueriesCtx {
    pub header: Header,
    pub queries: Vec<QueryCtx>,
    pub pgx: bool,
    pub emit_empty_slices: bool,
}

#[derive(Debug, Serialize)]
pub struct CopyFromCtx {
    pub header: Header,
    pub queries: Vec<QueryCtx>,
    pub mysql: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchCtx {
    pub header: Header,
    pub queries: Vec<QueryCtx>,
    pub emit_empty_slices: bool,
}

/// Pads every cell but the last of each row so the columns line up the way gofmt does.
pub fn align(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(row.len().saturating_sub(1)) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    rows.iter()
        .map(|row| {
            let last = row.len().saturating_sub(1);
            row.iter()
                .enumerate()
                .map(|(idx, cell)| match idx == last {
                    true => cell.clone(),
                    false => format!("{cell:<width$} ", width = widths[idx]),
                })
                .collect()
        })
        .collect()
}

/// Go interpreted string literal.
pub fn go_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Re-indents a broken argument list so its items sit one level below `depth`.
fn indent_args(list: &str, depth: usize) -> String {
    if !list.starts_with('\n') || depth == 1 {
        return list.to_owned();
    }
    let items = list.replace("\n\t\t", &format!("\n{}", "\t".repeat(depth + 1)));
    match items.strip_suffix("\n\t") {
        Some(body) => format!("{body}\n{}", "\t".repeat(depth)),
        None => items,
    }
}

fn comment_lines(text: &str) -> Vec<String> {
    match text.is_empty() {
        true => vec![],
        false => comment(text).lines().map(str::to_owned).collect(),
    }
}

fn field_lines(fields: &[(Vec<String>, Vec<String>)]) -> Vec<String> {
    let rows: Vec<Vec<String>> = fields.iter().map(|(_, row)| row.clone()).collect();
    let aligned = align(&rows);
    fields
        .iter()
        .zip(aligned)
        .flat_map(|((comments, _), line)| comments.iter().cloned().chain(std::iter::once(line)))
        .collect()
}

fn field_row(field: &Field) -> (Vec<String>, Vec<String>) {
    let mut row = vec![field.name.clone(), field.type_name.clone()];
    let tag = field.tag();
    if !tag.is_empty() {
        row.push(format!("`{tag}`"));
    }
    (comment_lines(&field.comment), row)
}

pub fn struct_decl(structure: &Struct) -> StructDecl {
    let rows: Vec<_> = structure.fields.iter().map(field_row).collect();
    StructDecl {
        name: structure.name.clone(),
        comment: comment_lines(&structure.comment),
        lines: field_lines(&rows),
    }
}

/// Params struct declaration, one field per distinct name.
fn unique_struct_decl(value: &QueryValue) -> Option<StructDecl> {
    let structure = value.structure.as_ref().filter(|_| value.emit)?;
    let rows: Vec<_> = value.unique_fields().iter().map(field_row).collect();
    Some(StructDecl {
        name: structure.name.clone(),
        comment: vec![],
        lines: field_lines(&rows),
    })
}

fn emitted_struct_decl(value: &QueryValue) -> Option<StructDecl> {
    value.structure.as_ref().filter(|_| value.emit).map(struct_decl)
}

pub fn enum_ctx(item: &Enum) -> EnumCtx {
    let const_rows: Vec<Vec<String>> = item
        .constants
        .iter()
        .map(|constant| {
            vec![
                constant.name.clone(),
                constant.type_name.clone(),
                format!("= {}", go_string(&constant.value)),
            ]
        })
        .collect();

    let mut name_row = vec![item.name.clone(), item.name.clone()];
    let mut valid_row = vec!["Valid".to_owned(), "bool".to_owned()];
    if !item.name_tags.is_empty() {
        name_row.push(format!("`{}`", render_tags(&item.name_tags)));
    }
    if !item.valid_tags.is_empty() {
        valid_row.push(format!("`{}`", render_tags(&item.valid_tags)));
    }
    valid_row.push(format!("// Valid is true if {} is not NULL", item.name));

    EnumCtx {
        name: item.name.clone(),
        null_name: item.null_name(),
        comment: comment_lines(&item.comment),
        const_lines: align(&const_rows),
        constant_names: item.constants.iter().map(|c| c.name.clone()).collect(),
        null_struct: StructDecl {
            name: item.null_name(),
            comment: vec![],
            lines: align(&[name_row, valid_row]),
        },
    }
}

pub struct ContextBuilder<'a> {
    options: &'a Options,
    style: CallStyle,
    sqlc_version: &'a str,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(options: &'a Options, sqlc_version: &'a str) -> Self {
        Self {
            options,
            style: CallStyle {
                driver: options.driver(),
                prepared: options.emit_prepared_queries,
                db_argument: options.emit_methods_with_db_argument,
            },
            sqlc_version,
        }
    }

    pub fn header(&self, package: &str, source: &str, imports: &FileImports) -> Header {
        Header {
            build_tags: self.options.build_tags.clone(),
            sqlc_version: match self.options.omit_sqlc_version {
                true => String::new(),
                false => self.sqlc_version.to_owned(),
            },
            source: source.to_owned(),
            package: package.to_owned(),
            imports: imports.lines(),
        }
    }

    fn pgx(&self) -> bool {
        self.style.driver.is_pgx()
    }

    pub fn db(&self, header: Header, queries: &[Query]) -> DbCtx {
        let pgx = self.pgx();
        let prepared = self.options.emit_prepared_queries && !pgx;
        let statements: Vec<Statement> = match prepared {
            true => queries
                .iter()
                .filter(|query| !query.cmd.is_batch() && query.cmd != CommandKind::CopyFrom)
                .map(|query| Statement {
                    field: query.field_name.clone(),
                    constant: query.constant_name.clone(),
                    method: query.method_name.clone(),
                })
                .collect(),
            false => vec![],
        };

        let mut field_rows = vec![];
        let mut tx_rows = vec![];
        if !self.options.emit_methods_with_db_argument {
            field_rows.push(vec!["db".to_owned(), "DBTX".to_owned()]);
            tx_rows.push(vec!["db:".to_owned(), "tx,".to_owned()]);
        }
        if prepared {
            field_rows.push(vec!["tx".to_owned(), "*sql.Tx".to_owned()]);
            tx_rows.push(vec!["tx:".to_owned(), "tx,".to_owned()]);
            for stmt in &statements {
                field_rows.push(vec![stmt.field.clone(), "*sql.Stmt".to_owned()]);
                tx_rows.push(vec![format!("{}:", stmt.field), format!("q.{},", stmt.field)]);
            }
        }

        DbCtx {
            header,
            pgx,
            uses_copyfrom: queries.iter().any(|query| query.cmd == CommandKind::CopyFrom),
            uses_batch: queries.iter().any(|query| query.cmd.is_batch()),
            db_argument: self.options.emit_methods_with_db_argument,
            prepared,
            statements,
            queries_fields: align(&field_rows),
            with_tx_fields: align(&tx_rows),
            tx_type: match pgx {
                true => "pgx.Tx".to_owned(),
                false => "*sql.Tx".to_owned(),
            },
        }
    }

    pub fn models(&self, header: Header, enums: &[Enum], structs: &[Struct]) -> ModelsCtx {
        ModelsCtx {
            header,
            enums: enums.iter().map(enum_ctx).collect(),
            structs: structs.iter().map(struct_decl).collect(),
            emit_enum_valid_method: self.options.emit_enum_valid_method,
            emit_all_enum_values: self.options.emit_all_enum_values,
        }
    }

    /// Parameter list of a generated method, context first.
    fn params(&self, query: &Query) -> String {
        let mut params = vec!["ctx context.Context".to_owned()];
        if self.options.emit_methods_with_db_argument {
            params.push("db DBTX".to_owned());
        }
        let arg = match query.cmd == CommandKind::CopyFrom || query.cmd.is_batch() {
            true => query.arg.slice_pair(),
            false => query.arg.pair(),
        };
        if !arg.is_empty() {
            params.push(arg);
        }
        params.join(", ")
    }

    fn returns(&self, query: &Query) -> String {
        match query.cmd {
            CommandKind::One => format!("({}, error)", query.ret.define_type()),
            CommandKind::Many => format!("([]{}, error)", query.ret.define_type()),
            CommandKind::Exec => "error".to_owned(),
            CommandKind::ExecRows | CommandKind::ExecLastId | CommandKind::CopyFrom => {
                "(int64, error)".to_owned()
            }
            CommandKind::ExecResult if self.pgx() => "(pgconn.CommandTag, error)".to_owned(),
            CommandKind::ExecResult => "(sql.Result, error)".to_owned(),
            CommandKind::BatchExec | CommandKind::BatchMany | CommandKind::BatchOne => {
                format!("*{}BatchResults", query.method_name)
            }
        }
    }

    pub fn querier(&self, header: Header, queries: &[Query]) -> QuerierCtx {
        let methods = queries
            .iter()
            .map(|query| MethodSig {
                comments: query.comments.clone(),
                signature: format!(
                    "{}({}) {}",
                    query.method_name,
                    self.params(query),
                    self.returns(query)
                ),
            })
            .collect();
        QuerierCtx { header, methods }
    }

    fn result_return(&self, cmd: CommandKind) -> String {
        match cmd {
            CommandKind::ExecRows if self.pgx() => "return result.RowsAffected(), nil".to_owned(),
            CommandKind::ExecRows => "return result.RowsAffected()".to_owned(),
            CommandKind::ExecLastId => "return result.LastInsertId()".to_owned(),
            _ => String::new(),
        }
    }

    fn mysql_append(field: &Field, path: String) -> String {
        match field.type_name.as_str() {
            "string" => format!("e.AppendString({path})"),
            "[]byte" | "json.RawMessage" => format!("e.AppendBytes({path})"),
            _ => format!("e.AppendValue({path})"),
        }
    }

    /// Per-row values of a slice argument, accessed through `row`.
    fn row_values(value: &QueryValue, row: &str) -> Vec<(Field, String)> {
        match &value.structure {
            Some(structure) => structure
                .fields
                .iter()
                .map(|field| (field.clone(), format!("{row}.{}", field.name)))
                .collect(),
            None => value
                .fields()
                .into_iter()
                .map(|field| (field, row.to_owned()))
                .collect(),
        }
    }

    pub fn query(&self, query: &Query) -> QueryCtx {
        let arg = &query.arg;
        let ret = &query.ret;
        let has_method = query.cmd != CommandKind::CopyFrom && !query.cmd.is_batch();
        let arg_struct = match query.cmd.is_batch() {
            true => emitted_struct_decl(arg),
            false => unique_struct_decl(arg),
        };
        let exec_style = CallStyle {
            prepared: false,
            ..self.style
        };

        QueryCtx {
            cmd: query.cmd.as_str(),
            method_name: query.method_name.clone(),
            constant_name: query.constant_name.clone(),
            sql: escape_backtick(&query.sql),
            comments: query.comments.clone(),
            has_method,
            arg_struct,
            ret_struct: emitted_struct_decl(ret),
            params: self.params(query),
            returns: self.returns(query),
            call: query.cmd.call_statement(
                self.style,
                &query.constant_name,
                &query.field_name,
                &arg.params(),
            ),
            result_return: self.result_return(query.cmd),

            ret_name: ret.name.clone(),
            ret_type: ret.type_name(),
            ret_define_type: ret.define_type(),
            ret_return_name: ret.return_name(),
            ret_zero: match ret.is_pointer() {
                true => "nil".to_owned(),
                false => ret.name.clone(),
            },
            ret_declare: arg.pair() != ret.pair() || arg.define_type() != ret.define_type(),
            scan_row: ret.scan(),
            scan_rows: indent_args(&ret.scan(), 2),
            scan_batch_rows: indent_args(&ret.scan(), 4),

            arg_name: arg.name.clone(),
            arg_slice_pair: arg.slice_pair(),
            arg_slice_type: format!("[]{}", arg.define_type()),
            table_go_slice: query.table_identifier_as_go_slice(),
            column_names_go_slice: arg.column_names_as_go_slice(),
            copy_method: query.cmd.query_method(exec_style),
            copy_values: Self::row_values(arg, "r.rows[0]")
                .into_iter()
                .map(|(_, path)| path)
                .collect(),
            exec_method: CommandKind::Exec.query_method(exec_style),
            mysql_table: query.table_identifier_for_mysql(),
            mysql_columns: arg.column_names().join(", "),
            mysql_appends: Self::row_values(arg, "row")
                .into_iter()
                .map(|(field, path)| Self::mysql_append(&field, path))
                .collect(),
            batch_method: query.cmd.query_method(exec_style),
            batch_values: Self::row_values(arg, "a")
                .into_iter()
                .map(|(_, path)| path)
                .collect(),
        }
    }

    pub fn queries(&self, header: Header, queries: &[Query]) -> QueriesCtx {
        QueriesCtx {
            header,
            queries: queries.iter().map(|query| self.query(query)).collect(),
            pgx: self.pgx(),
            emit_empty_slices: self.options.emit_empty_slices,
        }
    }

    pub fn copyfrom(&self, header: Header, queries: &[Query]) -> CopyFromCtx {
        CopyFromCtx {
            header,
            queries: queries.iter().map(|query| self.query(query)).collect(),
            mysql: self.options.uses_mysql_driver() && !self.pgx(),
        }
    }

    pub fn batch(&self, header: Header, queries: &[Query]) -> BatchCtx {
        BatchCtx {
            header,
            queries: queries.iter().map(|query| self.query(query)).collect(),
            emit_empty_slices: self.options.emit_empty_slices,
        }
    }
}
