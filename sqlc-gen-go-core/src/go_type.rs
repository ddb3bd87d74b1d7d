//! Mapping from catalog column types to Go types.

use crate::{
    naming::struct_name,
    opts::{Options, SqlDriver},
    plugin::{Catalog, Column, Identifier},
};

pub const UNKNOWN_TYPE: &str = "interface{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Postgresql,
    Mysql,
    Sqlite,
    Other,
}

impl Engine {
    pub fn from_settings(engine: &str) -> Self {
        match engine {
            "postgresql" => Engine::Postgresql,
            "mysql" => Engine::Mysql,
            "sqlite" => Engine::Sqlite,
            _ => Engine::Other,
        }
    }
}

/// Resolves Go types for columns of one request.
pub struct TypeResolver<'a> {
    catalog: &'a Catalog,
    engine: Engine,
    options: &'a Options,
}

impl<'a> TypeResolver<'a> {
    pub fn new(catalog: &'a Catalog, engine: Engine, options: &'a Options) -> Self {
        Self {
            catalog,
            engine,
            options,
        }
    }

    pub fn go_type(&self, column: &Column) -> String {
        let inner = match self.column_override(column) {
            Some(go_type) if column.is_sqlc_slice => return format!("[]{go_type}"),
            Some(go_type) => return go_type,
            None => self.go_inner_type(column),
        };
        if column.is_sqlc_slice {
            return format!("[]{inner}");
        }
        if column.is_array {
            let dims = column.array_dims.max(1) as usize;
            return format!("{}{inner}", "[]".repeat(dims));
        }
        inner
    }

    /// Column overrides match the column's name before any `AS` alias.
    fn column_override(&self, column: &Column) -> Option<String> {
        let table = column.table.as_ref()?;
        let column_name = match column.original_name.is_empty() {
            true => column.name.as_str(),
            false => column.original_name.as_str(),
        };
        self.options.overrides.iter().find_map(|item| {
            let target = item.column.as_deref()?;
            let matches = match target.split('.').collect::<Vec<_>>().as_slice() {
                [table_name, target_column] => {
                    *table_name == table.name
                        && *target_column == column_name
                        && self.in_default_schema(table)
                }
                [schema, table_name, target_column] => {
                    Identifier::new(schema, table_name).same_table(table, &self.catalog.default_schema)
                        && *target_column == column_name
                }
                _ => false,
            };
            matches.then(|| item.go_type().type_name)
        })
    }

    fn in_default_schema(&self, table: &Identifier) -> bool {
        table.schema.is_empty() || table.schema == self.catalog.default_schema
    }

    fn go_inner_type(&self, column: &Column) -> String {
        let data_type = column.data_type();
        let column_type = data_type.trim_start_matches("pg_catalog.").to_lowercase();
        let not_null = column.not_null || column.is_array;

        let db_override = self.options.overrides.iter().find(|item| {
            item.db_type.as_deref() == Some(column_type.as_str()) && item.nullable != not_null
        });
        if let Some(item) = db_override {
            return item.go_type().type_name;
        }

        let mapped = match self.engine {
            Engine::Postgresql => self.postgres_type(&column_type, not_null),
            Engine::Mysql => mysql_type(&column_type, column, not_null),
            Engine::Sqlite => sqlite_type(&column_type, not_null),
            Engine::Other => None,
        };
        mapped
            .or_else(|| self.catalog_type(column, not_null))
            .unwrap_or_else(|| UNKNOWN_TYPE.to_owned())
    }

    fn emit_pointers(&self) -> bool {
        self.options.driver().is_pgx() && self.options.emit_pointers_for_null_types
    }

    /// Picks the not-null type, the pgx/v5 nullable type, or the database/sql nullable type.
    fn nullable(&self, not_null: bool, plain: &str, pgx_null: &str, std_null: &str) -> String {
        if not_null {
            plain.to_owned()
        } else if self.emit_pointers() {
            format!("*{plain}")
        } else if self.options.driver() == SqlDriver::PgxV5 {
            pgx_null.to_owned()
        } else {
            std_null.to_owned()
        }
    }

    fn postgres_type(&self, column_type: &str, not_null: bool) -> Option<String> {
        let driver = self.options.driver();
        let v5 = driver == SqlDriver::PgxV5;
        let ty = match column_type {
            "serial" | "serial4" => self.nullable(not_null, "int32", "pgtype.Int4", "sql.NullInt32"),
            "bigserial" | "serial8" => {
                self.nullable(not_null, "int64", "pgtype.Int8", "sql.NullInt64")
            }
            "smallserial" | "serial2" => {
                self.nullable(not_null, "int16", "pgtype.Int2", "sql.NullInt16")
            }
            "integer" | "int" | "int4" => {
                self.nullable(not_null, "int32", "pgtype.Int4", "sql.NullInt32")
            }
            "bigint" | "int8" => self.nullable(not_null, "int64", "pgtype.Int8", "sql.NullInt64"),
            "smallint" | "int2" => {
                self.nullable(not_null, "int16", "pgtype.Int2", "sql.NullInt16")
            }
            "float" | "double precision" | "float8" => {
                self.nullable(not_null, "float64", "pgtype.Float8", "sql.NullFloat64")
            }
            "real" | "float4" => {
                self.nullable(not_null, "float32", "pgtype.Float4", "sql.NullFloat64")
            }
            "numeric" if v5 => "pgtype.Numeric".to_owned(),
            "numeric" | "money" => {
                self.nullable(not_null, "string", "pgtype.Text", "sql.NullString")
            }
            "boolean" | "bool" => self.nullable(not_null, "bool", "pgtype.Bool", "sql.NullBool"),
            "json" | "jsonb" => match driver {
                SqlDriver::PgxV5 => "[]byte".to_owned(),
                SqlDriver::PgxV4 if column_type == "json" => "pgtype.JSON".to_owned(),
                SqlDriver::PgxV4 => "pgtype.JSONB".to_owned(),
                _ if not_null => "json.RawMessage".to_owned(),
                _ => "pqtype.NullRawMessage".to_owned(),
            },
            "bytea" | "blob" => "[]byte".to_owned(),
            "date" if v5 => "pgtype.Date".to_owned(),
            "time" if v5 => "pgtype.Time".to_owned(),
            "timestamp" if v5 => "pgtype.Timestamp".to_owned(),
            "timestamptz" if v5 => "pgtype.Timestamptz".to_owned(),
            "date" | "time" | "timestamp" | "timestamptz" => {
                self.nullable(not_null, "time.Time", "pgtype.Timestamp", "sql.NullTime")
            }
            "timetz" => self.nullable(not_null, "string", "pgtype.Text", "sql.NullString"),
            "text" | "varchar" | "bpchar" | "char" | "string" | "citext" | "name" | "ltree"
            | "lquery" | "ltxtquery" => {
                self.nullable(not_null, "string", "pgtype.Text", "sql.NullString")
            }
            "uuid" if v5 => "pgtype.UUID".to_owned(),
            "uuid" if not_null => "uuid.UUID".to_owned(),
            "uuid" if self.emit_pointers() => "*uuid.UUID".to_owned(),
            "uuid" => "uuid.NullUUID".to_owned(),
            "inet" if v5 => self.nullable(not_null, "netip.Addr", "*netip.Addr", ""),
            "inet" => "pqtype.Inet".to_owned(),
            "cidr" if v5 => self.nullable(not_null, "netip.Prefix", "*netip.Prefix", ""),
            "cidr" => "pqtype.CIDR".to_owned(),
            "macaddr" | "macaddr8" if v5 => "net.HardwareAddr".to_owned(),
            "macaddr" | "macaddr8" => "pqtype.Macaddr".to_owned(),
            "interval" if v5 => "pgtype.Interval".to_owned(),
            "interval" => self.nullable(not_null, "int64", "pgtype.Interval", "sql.NullInt64"),
            "void" | "any" => UNKNOWN_TYPE.to_owned(),
            _ => return None,
        };
        Some(ty)
    }

    /// Enum and composite types declared in the catalog.
    fn catalog_type(&self, column: &Column, not_null: bool) -> Option<String> {
        let ident = column.r#type.as_ref()?;
        let default_schema = &self.catalog.default_schema;
        let wanted_schema = match ident.schema.is_empty() {
            true => default_schema.as_str(),
            false => ident.schema.as_str(),
        };
        for schema in self.catalog.schemas.iter().filter(|schema| !schema.is_system()) {
            if schema.name != wanted_schema {
                continue;
            }
            if schema.enums.iter().any(|item| item.name == ident.name) {
                let enum_name = match &schema.name == default_schema {
                    true => ident.name.clone(),
                    false => format!("{}_{}", schema.name, ident.name),
                };
                let name = struct_name(&enum_name, self.options);
                return Some(match not_null {
                    true => self.options.model_type(&name),
                    false => self.options.model_type(&format!("Null{name}")),
                });
            }
            if schema.composite_types.iter().any(|item| item.name == ident.name) {
                return Some(match (not_null, self.emit_pointers()) {
                    (true, _) => "string".to_owned(),
                    (false, true) => "*string".to_owned(),
                    (false, false) => "sql.NullString".to_owned(),
                });
            }
        }
        None
    }
}

fn mysql_type(column_type: &str, column: &Column, not_null: bool) -> Option<String> {
    let pick = |plain: &str, null: &str| match not_null {
        true => plain.to_owned(),
        false => null.to_owned(),
    };
    let sized = |signed: &str, unsigned: &str, null: &str| match column.unsigned {
        true => pick(unsigned, null),
        false => pick(signed, null),
    };
    let ty = match column_type {
        "varchar" | "text" | "char" | "tinytext" | "mediumtext" | "longtext" => {
            pick("string", "sql.NullString")
        }
        "tinyint" if column.length == 1 => pick("bool", "sql.NullBool"),
        "tinyint" => sized("int8", "uint8", "sql.NullInt16"),
        "year" => pick("int16", "sql.NullInt16"),
        "smallint" => sized("int16", "uint16", "sql.NullInt16"),
        "int" | "integer" | "mediumint" => sized("int32", "uint32", "sql.NullInt32"),
        "bigint" => sized("int64", "uint64", "sql.NullInt64"),
        "blob" | "binary" | "varbinary" | "tinyblob" | "mediumblob" | "longblob" => {
            "[]byte".to_owned()
        }
        "double" | "double precision" | "real" | "float" => pick("float64", "sql.NullFloat64"),
        "decimal" | "dec" | "fixed" => pick("string", "sql.NullString"),
        "enum" => "string".to_owned(),
        "date" | "timestamp" | "datetime" | "time" => pick("time.Time", "sql.NullTime"),
        "boolean" | "bool" => pick("bool", "sql.NullBool"),
        "json" => "json.RawMessage".to_owned(),
        "any" => UNKNOWN_TYPE.to_owned(),
        _ => return None,
    };
    Some(ty)
}

fn sqlite_type(column_type: &str, not_null: bool) -> Option<String> {
    let pick = |plain: &str, null: &str| match not_null {
        true => plain.to_owned(),
        false => null.to_owned(),
    };
    let ty = match column_type {
        "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint"
        | "unsignedbigint" | "int2" | "int8" => pick("int64", "sql.NullInt64"),
        "blob" => "[]byte".to_owned(),
        "real" | "double" | "doubleprecision" | "float" => pick("float64", "sql.NullFloat64"),
        "boolean" | "bool" => pick("bool", "sql.NullBool"),
        "date" | "datetime" | "timestamp" => pick("time.Time", "sql.NullTime"),
        "any" => UNKNOWN_TYPE.to_owned(),
        text if ["character", "varchar", "varyingcharacter", "nchar", "nativecharacter", "nvarchar"]
            .iter()
            .any(|prefix| text.starts_with(prefix))
            || text == "text"
            || text == "clob" =>
        {
            pick("string", "sql.NullString")
        }
        numeric if numeric.starts_with("decimal") || numeric == "numeric" => {
            pick("float64", "sql.NullFloat64")
        }
        _ => return None,
    };
    Some(ty)
}
