//! Extraction of enums, structs and queries from the catalog and query list.

use std::collections::BTreeMap;

use crate::{
    cmd::CommandKind,
    error::GenError,
    go_type::{TypeResolver, UNKNOWN_TYPE},
    model::{Constant, Enum, Field, Query, QueryValue, Struct},
    naming::{arg_name, enum_replace, escape, json_tag_name, lower_title, singular, struct_name, upper_title},
    opts::Options,
    plugin::{Catalog, Column, GenerateRequest, Identifier, Parameter},
};

fn qualified_name(catalog: &Catalog, schema: &str, name: &str) -> String {
    match schema == catalog.default_schema {
        true => name.to_owned(),
        false => format!("{schema}_{name}"),
    }
}

pub fn build_enums(req: &GenerateRequest, options: &Options) -> Vec<Enum> {
    let mut enums = vec![];
    for schema in req.catalog.schemas.iter().filter(|schema| !schema.is_system()) {
        for item in &schema.enums {
            let enum_name = qualified_name(&req.catalog, &schema.name, &item.name);
            let name = struct_name(&enum_name, options);
            let mut name_tags = BTreeMap::new();
            let mut valid_tags = BTreeMap::new();
            if options.emit_json_tags {
                name_tags.insert("json".to_owned(), json_tag_name(&enum_name, options));
                valid_tags.insert("json".to_owned(), json_tag_name("valid", options));
            }

            let mut seen = Vec::<String>::new();
            let mut constants = vec![];
            for (idx, value) in item.vals.iter().enumerate() {
                let mut label = enum_replace(value);
                if label.is_empty() || seen.contains(&label) {
                    label = format!("value_{idx}");
                }
                constants.push(Constant {
                    name: struct_name(&format!("{enum_name}_{label}"), options),
                    value: value.clone(),
                    type_name: name.clone(),
                });
                seen.push(label);
            }

            enums.push(Enum {
                name,
                comment: item.comment.clone(),
                constants,
                name_tags,
                valid_tags,
            });
        }
    }
    enums.sort_by(|left, right| left.name.cmp(&right.name));
    enums
}

pub fn build_structs(req: &GenerateRequest, options: &Options, types: &TypeResolver) -> Vec<Struct> {
    let mut structs = vec![];
    for schema in req.catalog.schemas.iter().filter(|schema| !schema.is_system()) {
        for table in &schema.tables {
            let table_name = qualified_name(&req.catalog, &schema.name, &table.rel.name);
            let struct_base = match options.emit_exact_table_names {
                true => table_name,
                false => singular(&table_name, options),
            };
            let fields = table
                .columns
                .iter()
                .map(|column| {
                    let mut tags = BTreeMap::new();
                    if options.emit_db_tags {
                        tags.insert("db".to_owned(), column.name.clone());
                    }
                    if options.emit_json_tags {
                        tags.insert("json".to_owned(), json_tag_name(&column.name, options));
                    }
                    Field {
                        name: struct_name(&column.name, options),
                        db_name: column.name.clone(),
                        type_name: types.go_type(column),
                        tags,
                        comment: column.comment.clone(),
                        column: Some(column.clone()),
                        embed_fields: vec![],
                    }
                })
                .collect();
            structs.push(Struct {
                table: Some(Identifier::new(&schema.name, &table.rel.name)),
                name: struct_name(&struct_base, options),
                fields,
                comment: table.comment.clone(),
            });
        }
    }
    structs.sort_by(|left, right| left.name.cmp(&right.name));
    structs
}

/// A model struct flattened into a query row by `sqlc.embed`.
struct GoEmbed {
    model_type: String,
    model_name: String,
    fields: Vec<Field>,
}

impl GoEmbed {
    fn find(
        embed: Option<&Identifier>,
        structs: &[Struct],
        default_schema: &str,
        options: &Options,
    ) -> Option<Self> {
        let embed = embed?;
        let found = structs.iter().find(|item| {
            item.table
                .as_ref()
                .is_some_and(|table| table.same_table(embed, default_schema))
        })?;
        Some(Self {
            model_type: options.model_type(&found.name),
            model_name: found.name.clone(),
            fields: found.fields.clone(),
        })
    }
}

struct GoColumn<'a> {
    id: i32,
    column: &'a Column,
    embed: Option<GoEmbed>,
}

fn column_name(column: &Column, pos: usize) -> String {
    match column.name.is_empty() {
        true => format!("column_{}", pos + 1),
        false => column.name.clone(),
    }
}

fn param_name(param: &Parameter) -> String {
    match param.column.name.is_empty() {
        true => format!("dollar_{}", param.number),
        false => arg_name(&param.column.name),
    }
}

fn columns_to_struct(
    options: &Options,
    types: &TypeResolver,
    name: String,
    columns: Vec<GoColumn>,
    use_id: bool,
) -> Result<Struct, GenError> {
    let mut fields: Vec<Field> = vec![];
    let mut seen: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut suffixes: BTreeMap<i32, usize> = BTreeMap::new();

    for (idx, go_column) in columns.into_iter().enumerate() {
        let column = go_column.column;
        let mut col_name = column_name(column, idx);
        let mut tag_name = col_name.clone();
        if let Some(embed) = &go_column.embed {
            col_name = embed.model_name.clone();
            tag_name = crate::naming::to_snake_case(&col_name);
        }
        let mut field_name = struct_name(&col_name, options);
        let base_field_name = field_name.clone();

        // Columns bound to the same numbered parameter share one suffix.
        let previous = seen.get(&field_name).map_or(0, Vec::len);
        let suffix = match suffixes.get(&go_column.id) {
            Some(&suffix) if use_id => suffix,
            _ if previous > 0 && !column.is_named_param => previous + 1,
            _ => 0,
        };
        suffixes.insert(go_column.id, suffix);
        if suffix > 0 {
            tag_name = format!("{tag_name}_{suffix}");
            field_name = format!("{field_name}_{suffix}");
        }

        let mut tags = BTreeMap::new();
        if options.emit_db_tags {
            tags.insert("db".to_owned(), tag_name.clone());
        }
        if options.emit_json_tags {
            tags.insert("json".to_owned(), json_tag_name(&tag_name, options));
        }

        let (type_name, embed_fields) = match go_column.embed {
            Some(embed) => (embed.model_type, embed.fields),
            None => (types.go_type(column), vec![]),
        };
        fields.push(Field {
            name: field_name,
            db_name: col_name,
            type_name,
            tags,
            comment: String::new(),
            column: Some(column.clone()),
            embed_fields,
        });
        seen.entry(base_field_name).or_default().push(idx);
    }

    // A field of unknown type borrows the type of a same-named sibling.
    for idx in 0..fields.len() {
        let Some(siblings) = seen.get(&fields[idx].name) else {
            continue;
        };
        if siblings.len() < 2 || fields[idx].type_name != UNKNOWN_TYPE {
            continue;
        }
        let known = siblings
            .iter()
            .filter(|&&other| other != idx)
            .map(|&other| fields[other].type_name.clone())
            .find(|type_name| type_name != UNKNOWN_TYPE);
        if let Some(type_name) = known {
            fields[idx].type_name = type_name;
        }
    }

    check_incompatible_field_types(&fields)?;
    Ok(Struct {
        table: None,
        name,
        fields,
        comment: String::new(),
    })
}

fn check_incompatible_field_types(fields: &[Field]) -> Result<(), GenError> {
    let mut field_types: BTreeMap<&str, &str> = BTreeMap::new();
    for field in fields {
        match field_types.get(field.name.as_str()) {
            None => {
                field_types.insert(&field.name, &field.type_name);
            }
            Some(&known) if known != field.type_name => {
                return Err(GenError::malformed(format!(
                    "named param {} has incompatible types: {}, {}",
                    field.name, field.type_name, known
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// A query returns rows into a struct when it has columns or is `:one`, `:many` or `:batchmany`.
fn put_out_columns(query: &crate::plugin::Query, cmd: CommandKind) -> bool {
    !query.columns.is_empty()
        || matches!(
            cmd,
            CommandKind::One | CommandKind::Many | CommandKind::BatchMany
        )
}

/// Whether a model struct has exactly the shape of a query's result columns.
fn matches_model(
    model: &Struct,
    query: &crate::plugin::Query,
    options: &Options,
    types: &TypeResolver,
    default_schema: &str,
) -> bool {
    if model.fields.len() != query.columns.len() {
        return false;
    }
    model.fields.iter().zip(&query.columns).enumerate().all(|(idx, (field, column))| {
        let same_table = match (&column.table, &model.table) {
            (Some(column_table), Some(model_table)) => {
                column_table.same_table(model_table, default_schema)
            }
            _ => false,
        };
        field.name == struct_name(&column_name(column, idx), options)
            && field.type_name == types.go_type(column)
            && same_table
    })
}

pub fn build_queries(
    req: &GenerateRequest,
    options: &Options,
    types: &TypeResolver,
    structs: &[Struct],
) -> Result<Vec<Query>, GenError> {
    let driver = options.driver();
    let default_schema = req.catalog.default_schema.as_str();
    let limit = usize::try_from(options.query_parameter_limit).unwrap_or(0);
    let mut queries = vec![];

    for query in &req.queries {
        if query.name.is_empty() || query.cmd.is_empty() {
            tracing::debug!("Skipping unnamed query in {}", query.filename);
            continue;
        }
        let cmd = CommandKind::parse(&query.cmd)?;
        let constant_name = match options.emit_exported_queries {
            true => upper_title(&query.name),
            false => lower_title(&query.name),
        };

        let mut comments = query.comments.clone();
        if options.emit_sql_as_comment {
            if comments.is_empty() {
                comments.push(query.name.clone());
            }
            comments.push(" ".to_owned());
            comments.extend(query.text.lines().map(|line| format!("  {line}")));
        }

        let arg = match query.params.as_slice() {
            [] => QueryValue::empty(driver),
            [param] if limit != 0 => QueryValue {
                name: escape(&param_name(param)),
                db_name: param.column.name.clone(),
                typ: types.go_type(&param.column),
                column: Some(param.column.clone()),
                ..QueryValue::empty(driver)
            },
            params => {
                let columns = params
                    .iter()
                    .map(|param| GoColumn {
                        id: param.number,
                        column: &param.column,
                        embed: None,
                    })
                    .collect();
                let structure =
                    columns_to_struct(options, types, format!("{}Params", query.name), columns, false)?;
                // Slice-taking commands need a named element type even below the limit.
                let emit = params.len() > limit || cmd == CommandKind::CopyFrom || cmd.is_batch();
                QueryValue {
                    emit,
                    name: "arg".to_owned(),
                    structure: Some(structure),
                    emit_pointer: options.emit_params_struct_pointers,
                    ..QueryValue::empty(driver)
                }
            }
        };
        if cmd.requires_argument() && arg.is_empty() {
            return Err(GenError::malformed(format!(
                "query {} uses {cmd} but has no parameters",
                query.name
            )));
        }

        let single_column = match query.columns.as_slice() {
            [column] if column.embed_table.is_none() => Some(column),
            _ => None,
        };
        let ret = if let Some(column) = single_column {
            let name = column_name(column, 0).replace('$', "_");
            QueryValue {
                name: escape(&name),
                db_name: name,
                typ: types.go_type(column),
                column: Some(column.clone()),
                ..QueryValue::empty(driver)
            }
        } else if put_out_columns(query, cmd) {
            let reused = structs
                .iter()
                .find(|model| matches_model(model, query, options, types, default_schema));
            let (structure, emit) = match reused {
                Some(model) => (
                    Struct {
                        name: options.model_type(&model.name),
                        ..model.clone()
                    },
                    false,
                ),
                None => {
                    let columns = query
                        .columns
                        .iter()
                        .enumerate()
                        .map(|(idx, column)| GoColumn {
                            id: idx as i32,
                            column,
                            embed: GoEmbed::find(
                                column.embed_table.as_ref(),
                                structs,
                                default_schema,
                                options,
                            ),
                        })
                        .collect();
                    let structure =
                        columns_to_struct(options, types, format!("{}Row", query.name), columns, true)?;
                    (structure, true)
                }
            };
            QueryValue {
                emit,
                name: "i".to_owned(),
                structure: Some(structure),
                emit_pointer: options.emit_result_struct_pointers,
                ..QueryValue::empty(driver)
            }
        } else {
            QueryValue::empty(driver)
        };

        queries.push(Query {
            cmd,
            sql: query.text.clone(),
            method_name: query.name.clone(),
            field_name: format!("{}Stmt", lower_title(&query.name)),
            constant_name,
            source_name: query.filename.clone(),
            comments,
            table: query.insert_into_table.clone(),
            arg,
            ret,
        });
    }
    queries.sort_by(|left, right| left.method_name.cmp(&right.method_name));
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::go_type::Engine;

    fn request() -> GenerateRequest {
        serde_json::from_value(json!({
            "settings": { "engine": "postgresql" },
            "catalog": {
                "default_schema": "public",
                "schemas": [
                    {
                        "name": "public",
                        "enums": [{ "name": "book_status", "vals": ["draft", "in-print", "in print", ""] }],
                        "tables": [
                            {
                                "rel": { "name": "authors" },
                                "columns": [
                                    { "name": "id", "not_null": true, "type": { "name": "int8" } },
                                    { "name": "name", "not_null": true, "type": { "name": "text" } },
                                ]
                            },
                            {
                                "rel": { "name": "books" },
                                "columns": [
                                    { "name": "id", "not_null": true, "type": { "name": "int8" } },
                                    { "name": "status", "type": { "name": "book_status" } },
                                ]
                            }
                        ]
                    },
                    { "name": "pg_catalog", "enums": [{ "name": "internal", "vals": ["x"] }] }
                ]
            },
            "queries": [
                {
                    "name": "GetAuthor", "cmd": ":one", "filename": "authors.sql",
                    "text": "SELECT id, name FROM authors WHERE id = $1",
                    "columns": [
                        { "name": "id", "not_null": true, "type": { "name": "int8" }, "table": { "name": "authors" } },
                        { "name": "name", "not_null": true, "type": { "name": "text" }, "table": { "name": "authors" } }
                    ],
                    "params": [{ "number": 1, "column": { "name": "id", "not_null": true, "type": { "name": "int8" } } }]
                },
                {
                    "name": "CountBooks", "cmd": ":one", "filename": "books.sql",
                    "text": "SELECT count(*) FROM books",
                    "columns": [{ "name": "count", "not_null": true, "type": { "name": "int8" } }]
                },
                {
                    "name": "UpdateBook", "cmd": ":exec", "filename": "books.sql",
                    "text": "UPDATE books SET status = $1 WHERE id = $2",
                    "params": [
                        { "number": 1, "column": { "name": "status", "type": { "name": "book_status" } } },
                        { "number": 2, "column": { "name": "id", "not_null": true, "type": { "name": "int8" } } }
                    ]
                },
                { "name": "", "cmd": ":exec", "text": "SELECT 1" }
            ]
        }))
        .unwrap()
    }

    fn build(req: &GenerateRequest, options: &Options) -> (Vec<Enum>, Vec<Struct>, Vec<Query>) {
        let types = TypeResolver::new(&req.catalog, Engine::Postgresql, options);
        let enums = build_enums(req, options);
        let structs = build_structs(req, options, &types);
        let queries = build_queries(req, options, &types, &structs).unwrap();
        (enums, structs, queries)
    }

    #[test]
    fn enums_skip_system_schemas_and_dedupe_labels() {
        let (enums, _, _) = build(&request(), &Options::default());
        assert_eq!(enums.len(), 1);
        let names: Vec<_> = enums[0].constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["BookStatusDraft", "BookStatusInPrint", "BookStatusInprint", "BookStatusValue3"]
        );
        assert_eq!(enums[0].constants[1].value, "in-print");
    }

    #[test]
    fn structs_are_singular_and_sorted() {
        let (_, structs, _) = build(&request(), &Options::default());
        let names: Vec<_> = structs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Author", "Book"]);
        assert_eq!(structs[1].fields[1].type_name, "NullBookStatus");

        let options = Options {
            emit_exact_table_names: true,
            ..Default::default()
        };
        let (_, structs, _) = build(&request(), &options);
        assert_eq!(structs[0].name, "Authors");
    }

    #[test]
    fn queries_are_sorted_and_shaped() {
        let (_, _, queries) = build(&request(), &Options::default());
        let names: Vec<_> = queries.iter().map(|q| q.method_name.as_str()).collect();
        assert_eq!(names, vec!["CountBooks", "GetAuthor", "UpdateBook"]);

        let count = &queries[0];
        assert_eq!(count.ret.typ, "int64");
        assert_eq!(count.ret.name, "count");
        assert!(count.arg.is_empty());

        let get = &queries[1];
        assert_eq!(get.arg.pair(), "id int64");
        assert_eq!(get.constant_name, "getAuthor");
        assert_eq!(get.field_name, "getAuthorStmt");
        let ret = get.ret.structure.as_ref().unwrap();
        assert_eq!(ret.name, "Author");
        assert!(!get.ret.emit);

        let update = &queries[2];
        assert_eq!(update.arg.type_name(), "UpdateBookParams");
        assert!(update.arg.emit);
        assert_eq!(update.arg.params(), "arg.Status, arg.ID");
    }

    #[test]
    fn columnless_batchone_has_no_row_struct() {
        let mut req = request();
        req.queries[2].cmd = ":batchone".into();
        let (_, _, queries) = build(&req, &Options::default());
        assert!(queries[2].ret.structure.is_none());
        assert!(queries[2].ret.is_empty());

        req.queries[2].cmd = ":many".into();
        let (_, _, queries) = build(&req, &Options::default());
        let row = queries[2].ret.structure.as_ref().unwrap();
        assert_eq!(row.name, "UpdateBookRow");
    }

    #[test]
    fn parameter_limit_flattens_small_structs() {
        let options = Options {
            query_parameter_limit: 4,
            ..Default::default()
        };
        let (_, _, queries) = build(&request(), &options);
        let update = &queries[2];
        assert!(!update.arg.emit);
        assert_eq!(update.arg.pair(), "status NullBookStatus, id int64");
    }

    #[test]
    fn exported_constants_are_title_cased() {
        let options = Options {
            emit_exported_queries: true,
            ..Default::default()
        };
        let (_, _, queries) = build(&request(), &options);
        assert_eq!(queries[1].constant_name, "GetAuthor");
    }

    #[test]
    fn unknown_command_is_malformed() {
        let mut req = request();
        req.queries[0].cmd = ":fetch".into();
        let options = Options::default();
        let types = TypeResolver::new(&req.catalog, Engine::Postgresql, &options);
        let err = build_queries(&req, &options, &types, &[]).unwrap_err();
        assert!(matches!(err, GenError::MalformedInput { .. }));
    }

    #[test]
    fn copyfrom_without_params_is_malformed() {
        let mut req = request();
        req.queries[1].cmd = ":copyfrom".into();
        let options = Options::default();
        let types = TypeResolver::new(&req.catalog, Engine::Postgresql, &options);
        assert!(build_queries(&req, &options, &types, &[]).is_err());
    }

    #[test]
    fn repeated_columns_get_suffixes() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "settings": { "engine": "postgresql" },
            "queries": [{
                "name": "Pairs", "cmd": ":many", "filename": "q.sql",
                "columns": [
                    { "name": "id", "not_null": true, "type": { "name": "int4" } },
                    { "name": "id", "not_null": true, "type": { "name": "int4" } }
                ]
            }]
        }))
        .unwrap();
        let options = Options::default();
        let (_, _, queries) = build(&req, &options);
        let row = queries[0].ret.structure.as_ref().unwrap();
        let names: Vec<_> = row.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "ID_2"]);
        assert!(queries[0].ret.emit);
    }

    #[test]
    fn conflicting_named_param_types_are_rejected() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "settings": { "engine": "postgresql" },
            "queries": [{
                "name": "Find", "cmd": ":many", "filename": "q.sql",
                "columns": [{ "name": "a", "type": { "name": "text" } }],
                "params": [
                    { "number": 1, "column": { "name": "key", "is_named_param": true, "not_null": true, "type": { "name": "text" } } },
                    { "number": 2, "column": { "name": "key", "is_named_param": true, "not_null": true, "type": { "name": "int4" } } }
                ]
            }]
        }))
        .unwrap();
        let options = Options::default();
        let types = TypeResolver::new(&req.catalog, Engine::Postgresql, &options);
        let err = build_queries(&req, &options, &types, &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "named param Key has incompatible types: int32, string"
        );
    }

    #[test]
    fn embedded_tables_flatten_model_fields() {
        let mut req = request();
        req.queries = vec![serde_json::from_value(json!({
            "name": "GetBookWithAuthor", "cmd": ":one", "filename": "books.sql",
            "columns": [
                { "name": "id", "not_null": true, "type": { "name": "int8" }, "table": { "name": "books" } },
                { "name": "authors", "embed_table": { "name": "authors" } }
            ]
        }))
        .unwrap()];
        let options = Options::default();
        let (_, _, queries) = build(&req, &options);
        let row = queries[0].ret.structure.as_ref().unwrap();
        assert_eq!(row.name, "GetBookWithAuthorRow");
        assert_eq!(row.fields[1].name, "Author");
        assert_eq!(row.fields[1].type_name, "Author");
        assert_eq!(row.fields[1].embed_fields.len(), 2);
        assert_eq!(queries[0].ret.scan(), "&i.ID, &i.Author.ID, &i.Author.Name");
    }
}
