use std::collections::BTreeSet;

use crate::model::{Enum, Query, Struct};

/// Name a type reference is compared by: slice and pointer markers and any
/// package qualifier removed, so `[]models.Author` and `Author` are the same.
fn bare_type(type_name: &str) -> &str {
    let mut name = type_name;
    loop {
        if let Some(rest) = name.strip_prefix("[]") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('*') {
            name = rest;
        } else {
            break;
        }
    }
    match name.rsplit_once('.') {
        Some((_, unqualified)) => unqualified,
        None => name,
    }
}

fn referenced_types(queries: &[Query]) -> BTreeSet<String> {
    let mut keep = BTreeSet::new();
    for query in queries {
        if !query.arg.is_empty() {
            keep.insert(bare_type(&query.arg.type_name()).to_owned());
            if let Some(structure) = &query.arg.structure {
                for field in &structure.fields {
                    keep.insert(bare_type(&field.type_name).to_owned());
                }
            }
        }
        if query.has_ret_type() {
            keep.insert(bare_type(&query.ret.type_name()).to_owned());
            if let Some(structure) = &query.ret.structure {
                for field in &structure.fields {
                    keep.insert(bare_type(&field.type_name).to_owned());
                    for embed in &field.embed_fields {
                        keep.insert(bare_type(&embed.type_name).to_owned());
                    }
                }
            }
        }
    }
    keep
}

/// Drops the enums and structs that no query argument or result refers to.
pub fn filter_unused(
    enums: Vec<Enum>,
    structs: Vec<Struct>,
    queries: &[Query],
) -> (Vec<Enum>, Vec<Struct>) {
    let keep = referenced_types(queries);
    let enums = enums
        .into_iter()
        .filter(|item| keep.contains(&item.name) || keep.contains(&item.null_name()))
        .collect();
    let structs = structs
        .into_iter()
        .filter(|item| keep.contains(&item.name))
        .collect();
    (enums, structs)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        cmd::CommandKind,
        model::{Field, QueryValue},
        opts::SqlDriver,
    };

    fn field(name: &str, type_name: &str) -> Field {
        Field {
            name: name.into(),
            db_name: name.to_lowercase(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    fn model(name: &str, fields: Vec<Field>) -> Struct {
        Struct {
            name: name.into(),
            fields,
            ..Default::default()
        }
    }

    fn enumeration(name: &str) -> Enum {
        Enum {
            name: name.into(),
            comment: String::new(),
            constants: vec![],
            name_tags: BTreeMap::new(),
            valid_tags: BTreeMap::new(),
        }
    }

    fn query(cmd: CommandKind, arg: QueryValue, ret: QueryValue) -> Query {
        Query {
            cmd,
            sql: String::new(),
            method_name: "Q".into(),
            field_name: "qStmt".into(),
            constant_name: "q".into(),
            source_name: "query.sql".into(),
            comments: vec![],
            table: None,
            arg,
            ret,
        }
    }

    fn returning(structure: Struct) -> QueryValue {
        QueryValue {
            name: "i".into(),
            structure: Some(structure),
            ..QueryValue::empty(SqlDriver::LibPq)
        }
    }

    #[test]
    fn keeps_returned_models_and_their_field_types() {
        let enums = vec![enumeration("Mood"), enumeration("Color")];
        let structs = vec![
            model("Author", vec![field("Mood", "NullMood")]),
            model("Book", vec![]),
        ];
        let queries = vec![query(
            CommandKind::Many,
            QueryValue::empty(SqlDriver::LibPq),
            returning(structs[0].clone()),
        )];
        let (enums, structs) = filter_unused(enums, structs, &queries);
        assert_eq!(enums.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(), vec!["Mood"]);
        assert_eq!(structs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["Author"]);
    }

    #[test]
    fn follows_one_level_of_embedding() {
        let mut embedded = field("Author", "models.Author");
        embedded.embed_fields = vec![field("Mood", "models.Mood")];
        let row = model("GetBookRow", vec![field("Title", "string"), embedded]);
        let queries = vec![query(
            CommandKind::One,
            QueryValue::empty(SqlDriver::PgxV5),
            returning(row),
        )];
        let (enums, structs) = filter_unused(
            vec![enumeration("Mood")],
            vec![model("Author", vec![]), model("Publisher", vec![])],
            &queries,
        );
        assert_eq!(enums.len(), 1);
        assert_eq!(structs.len(), 1);
        assert_eq!(structs[0].name, "Author");
    }

    #[test]
    fn exec_results_do_not_count() {
        let queries = vec![query(
            CommandKind::Exec,
            QueryValue::empty(SqlDriver::LibPq),
            returning(model("Author", vec![])),
        )];
        let (_, structs) = filter_unused(vec![], vec![model("Author", vec![])], &queries);
        assert!(structs.is_empty());
    }

    #[test]
    fn slice_arguments_reference_their_element() {
        let arg = QueryValue {
            name: "moods".into(),
            typ: "[]Mood".into(),
            ..QueryValue::empty(SqlDriver::PgxV5)
        };
        let queries = vec![query(CommandKind::Exec, arg, QueryValue::empty(SqlDriver::PgxV5))];
        let (enums, _) = filter_unused(vec![enumeration("Mood")], vec![], &queries);
        assert_eq!(enums.len(), 1);
    }

    #[test]
    fn bare_type_strips_markers_and_qualifiers() {
        assert_eq!(bare_type("[]*models.Author"), "Author");
        assert_eq!(bare_type("sql.NullString"), "NullString");
        assert_eq!(bare_type("int64"), "int64");
    }
}
