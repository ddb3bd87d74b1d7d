//! Checks run over the built entities before anything is rendered.

use std::collections::BTreeSet;

use crate::{
    cmd::CommandKind,
    error::{Conflict, GenError},
    model::{Enum, Query, Struct},
    opts::Options,
};

/// Rejects generated names that would collide in the Go output.
pub fn check_conflicts(
    options: &Options,
    enums: &[Enum],
    structs: &[Struct],
    queries: &[Query],
) -> Result<(), GenError> {
    let mut enum_names = BTreeSet::new();
    for item in enums {
        enum_names.insert(item.name.clone());
        enum_names.insert(item.null_name());
    }

    let mut struct_names = BTreeSet::new();
    for item in structs {
        if enum_names.contains(&item.name) {
            return Err(GenError::NamingConflict {
                conflict: Conflict::StructWithEnum,
                name: item.name.clone(),
            });
        }
        struct_names.insert(item.name.as_str());
    }

    if !options.emit_exported_queries {
        return Ok(());
    }
    for query in queries {
        let name = &query.constant_name;
        if enum_names.contains(name) {
            return Err(GenError::NamingConflict {
                conflict: Conflict::ConstantWithEnum,
                name: name.clone(),
            });
        }
        if struct_names.contains(name.as_str()) {
            return Err(GenError::NamingConflict {
                conflict: Conflict::ConstantWithStruct,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Rejects commands the configured driver cannot generate code for.
pub fn check_capabilities(options: &Options, queries: &[Query]) -> Result<(), GenError> {
    let driver = options.driver();
    let mysql = options.uses_mysql_driver();

    let copyfrom: Vec<&Query> = queries
        .iter()
        .filter(|query| query.cmd == CommandKind::CopyFrom)
        .collect();
    if !copyfrom.is_empty() && !driver.is_pgx() && !mysql {
        return Err(GenError::capability(
            ":copyfrom is only supported by pgx and github.com/go-sql-driver/mysql",
        ));
    }
    if mysql {
        let timestamped = copyfrom
            .iter()
            .flat_map(|query| query.arg.fields())
            .any(|field| field.type_name == "time.Time");
        if timestamped {
            return Err(GenError::capability(
                "values with a timezone are not yet supported",
            ));
        }
    }

    if queries.iter().any(|query| query.cmd.is_batch()) && !driver.is_pgx() {
        return Err(GenError::capability(
            ":batch* commands are only supported by pgx",
        ));
    }
    if driver.is_pgx() && queries.iter().any(|query| query.cmd == CommandKind::ExecLastId) {
        return Err(GenError::capability(":execlastid is not supported by pgx"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        model::{Field, QueryValue, Struct},
        opts::{SqlDriver, SqlPackage},
    };

    fn enumeration(name: &str) -> Enum {
        Enum {
            name: name.into(),
            comment: String::new(),
            constants: vec![],
            name_tags: BTreeMap::new(),
            valid_tags: BTreeMap::new(),
        }
    }

    fn query(cmd: CommandKind, constant: &str, arg: QueryValue) -> Query {
        Query {
            cmd,
            sql: String::new(),
            method_name: constant.into(),
            field_name: String::new(),
            constant_name: constant.into(),
            source_name: "query.sql".into(),
            comments: vec![],
            table: None,
            arg,
            ret: QueryValue::empty(SqlDriver::LibPq),
        }
    }

    fn copy_arg(type_name: &str) -> QueryValue {
        QueryValue {
            emit: true,
            name: "arg".into(),
            structure: Some(Struct {
                name: "CreateEventsParams".into(),
                fields: vec![Field {
                    name: "At".into(),
                    db_name: "at".into(),
                    type_name: type_name.into(),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..QueryValue::empty(SqlDriver::LibPq)
        }
    }

    fn model(name: &str) -> Struct {
        Struct {
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn struct_named_like_null_enum_conflicts() {
        let err = check_conflicts(
            &Options::default(),
            &[enumeration("Mood")],
            &[model("NullMood")],
            &[],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "struct name conflicts with enum name: NullMood");
    }

    #[test]
    fn exported_constants_are_checked_only_when_enabled() {
        let queries = [query(CommandKind::One, "Author", QueryValue::empty(SqlDriver::LibPq))];
        let structs = [model("Author")];
        assert!(check_conflicts(&Options::default(), &[], &structs, &queries).is_ok());

        let options = Options {
            emit_exported_queries: true,
            ..Default::default()
        };
        let err = check_conflicts(&options, &[], &structs, &queries).unwrap_err();
        assert_eq!(err.to_string(), "query constant name conflicts with struct name: Author");

        let queries = [query(CommandKind::One, "Mood", QueryValue::empty(SqlDriver::LibPq))];
        let err = check_conflicts(&options, &[enumeration("Mood")], &[], &queries).unwrap_err();
        assert_eq!(err.to_string(), "query constant name conflicts with enum name: Mood");
    }

    #[test]
    fn copyfrom_needs_pgx_or_mysql() {
        let queries = [query(CommandKind::CopyFrom, "createEvents", copy_arg("string"))];
        let err = check_capabilities(&Options::default(), &queries).unwrap_err();
        assert_eq!(
            err.to_string(),
            ":copyfrom is only supported by pgx and github.com/go-sql-driver/mysql"
        );

        let pgx = Options {
            sql_package: SqlPackage::PgxV4,
            ..Default::default()
        };
        assert!(check_capabilities(&pgx, &queries).is_ok());

        let mysql = Options {
            sql_driver: Some(SqlDriver::GoSqlDriverMysql),
            ..Default::default()
        };
        assert!(check_capabilities(&mysql, &queries).is_ok());
    }

    #[test]
    fn mysql_copyfrom_rejects_timestamps() {
        let mysql = Options {
            sql_driver: Some(SqlDriver::GoSqlDriverMysql),
            ..Default::default()
        };
        let queries = [query(CommandKind::CopyFrom, "createEvents", copy_arg("time.Time"))];
        let err = check_capabilities(&mysql, &queries).unwrap_err();
        assert_eq!(err.to_string(), "values with a timezone are not yet supported");
    }

    #[test]
    fn batches_need_pgx() {
        let queries = [query(CommandKind::BatchExec, "touch", copy_arg("string"))];
        let err = check_capabilities(&Options::default(), &queries).unwrap_err();
        assert!(matches!(err, GenError::Capability { .. }));
        let pgx = Options {
            sql_package: SqlPackage::PgxV5,
            ..Default::default()
        };
        assert!(check_capabilities(&pgx, &queries).is_ok());
    }

    #[test]
    fn pgx_has_no_last_insert_id() {
        let pgx = Options {
            sql_package: SqlPackage::PgxV5,
            ..Default::default()
        };
        let queries = [query(CommandKind::ExecLastId, "insert", QueryValue::empty(SqlDriver::PgxV5))];
        assert!(check_capabilities(&pgx, &queries).is_err());
        assert!(check_capabilities(&Options::default(), &queries).is_ok());
    }
}
