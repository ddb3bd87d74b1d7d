use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::GenError, plugin::GenerateRequest};

pub const DEFAULT_PACKAGE: &str = "db";

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum SqlPackage {
    #[default]
    #[serde(rename = "database/sql", alias = "")]
    Standard,
    #[serde(rename = "pgx/v4")]
    PgxV4,
    #[serde(rename = "pgx/v5")]
    PgxV5,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SqlDriver {
    #[serde(rename = "github.com/jackc/pgx/v4")]
    PgxV4,
    #[serde(rename = "github.com/jackc/pgx/v5")]
    PgxV5,
    #[serde(rename = "github.com/lib/pq")]
    LibPq,
    #[serde(rename = "github.com/go-sql-driver/mysql")]
    GoSqlDriverMysql,
}

impl SqlDriver {
    pub fn from_package(package: SqlPackage) -> Self {
        match package {
            SqlPackage::PgxV4 => SqlDriver::PgxV4,
            SqlPackage::PgxV5 => SqlDriver::PgxV5,
            SqlPackage::Standard => SqlDriver::LibPq,
        }
    }

    pub fn is_pgx(self) -> bool {
        matches!(self, SqlDriver::PgxV4 | SqlDriver::PgxV5)
    }

    pub fn import_path(self) -> &'static str {
        match self {
            SqlDriver::PgxV4 => "github.com/jackc/pgx/v4",
            SqlDriver::PgxV5 => "github.com/jackc/pgx/v5",
            SqlDriver::LibPq => "github.com/lib/pq",
            SqlDriver::GoSqlDriverMysql => "github.com/go-sql-driver/mysql",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JsonTagsCaseStyle {
    #[default]
    #[serde(alias = "")]
    None,
    Camel,
    Pascal,
    Snake,
}

/// A Go type written as `[import/path.]Type`, e.g. `github.com/gofrs/uuid.UUID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTypeSpec {
    pub import_path: Option<String>,
    pub type_name: String,
}

impl GoTypeSpec {
    pub fn parse(spec: &str) -> Self {
        let prefix_len = spec.len() - spec.trim_start_matches(['[', ']', '*']).len();
        let (prefix, body) = spec.split_at(prefix_len);
        let last_segment_start = body.rfind('/').map_or(0, |idx| idx + 1);
        let Some(dot) = body[last_segment_start..].find('.') else {
            return Self {
                import_path: None,
                type_name: spec.to_owned(),
            };
        };
        let dot = last_segment_start + dot;
        let import_path = &body[..dot];
        let package = &body[last_segment_start..dot];
        Self {
            import_path: Some(import_path.to_owned()),
            type_name: format!("{prefix}{package}.{}", &body[dot + 1..]),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Override {
    #[serde(default)]
    pub db_type: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    pub go_type: String,
    #[serde(default)]
    pub nullable: bool,
}

impl Override {
    pub fn go_type(&self) -> GoTypeSpec {
        GoTypeSpec::parse(&self.go_type)
    }
}

/// Where a generated file lands and which Go package it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub file_name: String,
    pub package: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
#[must_use]
pub struct Options {
    pub package: String,
    pub emit_interface: bool,
    pub emit_json_tags: bool,
    pub json_tags_id_uppercase: bool,
    pub json_tags_case_style: JsonTagsCaseStyle,
    pub emit_db_tags: bool,
    pub emit_prepared_queries: bool,
    pub emit_exact_table_names: bool,
    pub emit_empty_slices: bool,
    pub emit_exported_queries: bool,
    pub emit_result_struct_pointers: bool,
    pub emit_params_struct_pointers: bool,
    pub emit_methods_with_db_argument: bool,
    pub emit_pointers_for_null_types: bool,
    pub emit_enum_valid_method: bool,
    pub emit_all_enum_values: bool,
    pub emit_sql_as_comment: bool,
    pub build_tags: String,
    pub sql_package: SqlPackage,
    pub sql_driver: Option<SqlDriver>,
    pub overrides: Vec<Override>,
    pub rename: BTreeMap<String, String>,
    pub initialisms: Vec<String>,
    pub inflection_exclude_table_names: Vec<String>,
    pub query_parameter_limit: i32,
    pub omit_sqlc_version: bool,
    pub omit_unused_structs: bool,
    pub output_files_prefix: String,
    pub output_files_suffix: String,
    pub output_files_package: String,
    pub output_db_file_name: String,
    pub output_db_package: String,
    pub output_models_file_name: String,
    pub output_models_package: String,
    pub models_package_import_path: String,
    pub output_querier_file_name: String,
    pub output_querier_package: String,
    pub output_copyfrom_file_name: String,
    pub output_copyfrom_package: String,
    pub output_batch_file_name: String,
    pub output_batch_package: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            package: String::new(),
            emit_interface: false,
            emit_json_tags: false,
            json_tags_id_uppercase: false,
            json_tags_case_style: JsonTagsCaseStyle::None,
            emit_db_tags: false,
            emit_prepared_queries: false,
            emit_exact_table_names: false,
            emit_empty_slices: false,
            emit_exported_queries: false,
            emit_result_struct_pointers: false,
            emit_params_struct_pointers: false,
            emit_methods_with_db_argument: false,
            emit_pointers_for_null_types: false,
            emit_enum_valid_method: false,
            emit_all_enum_values: false,
            emit_sql_as_comment: false,
            build_tags: String::new(),
            sql_package: SqlPackage::Standard,
            sql_driver: None,
            overrides: vec![],
            rename: BTreeMap::new(),
            initialisms: vec!["id".to_owned()],
            inflection_exclude_table_names: vec![],
            query_parameter_limit: 1,
            omit_sqlc_version: false,
            omit_unused_structs: false,
            output_files_prefix: String::new(),
            output_files_suffix: String::new(),
            output_files_package: String::new(),
            output_db_file_name: String::new(),
            output_db_package: String::new(),
            output_models_file_name: String::new(),
            output_models_package: String::new(),
            models_package_import_path: String::new(),
            output_querier_file_name: String::new(),
            output_querier_package: String::new(),
            output_copyfrom_file_name: String::new(),
            output_copyfrom_package: String::new(),
            output_batch_file_name: String::new(),
            output_batch_package: String::new(),
        }
    }
}

fn pick(value: &str, fallback: &str) -> String {
    match value.is_empty() {
        true => fallback.to_owned(),
        false => value.to_owned(),
    }
}

impl Options {
    /// Decodes the plugin options blob of a request and checks it for contradictions.
    pub fn parse(req: &GenerateRequest) -> Result<Self, GenError> {
        let mut options: Options = match &req.plugin_options {
            serde_json::Value::Null => Options::default(),
            value => serde_json::from_value(value.clone())
                .map_err(|err| GenError::invalid_options(format!("unable to decode: {err}")))?,
        };
        if options.package.is_empty() {
            options.package = DEFAULT_PACKAGE.to_owned();
        }
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), GenError> {
        if self.emit_methods_with_db_argument && self.emit_prepared_queries {
            return Err(GenError::invalid_options(
                "emit_methods_with_db_argument and emit_prepared_queries options are mutually exclusive",
            ));
        }
        if self.query_parameter_limit < 0 {
            return Err(GenError::invalid_options(
                "query parameter limit must not be negative",
            ));
        }
        if self.models_qualifier().is_some() && self.models_package_import_path.is_empty() {
            return Err(GenError::invalid_options(
                "models_package_import_path must be set when output_models_package differs from package",
            ));
        }
        Ok(())
    }

    /// Driver implied by `sql_package`; `sql_driver` only refines the stdlib case.
    pub fn driver(&self) -> SqlDriver {
        SqlDriver::from_package(self.sql_package)
    }

    pub fn uses_mysql_driver(&self) -> bool {
        self.sql_driver == Some(SqlDriver::GoSqlDriverMysql)
    }

    pub fn is_initialism(&self, word: &str) -> bool {
        self.initialisms.iter().any(|item| item == word)
    }

    /// Package name model types are qualified with when they live outside the main package.
    pub fn models_qualifier(&self) -> Option<&str> {
        let models = self.output_models_package.as_str();
        match !models.is_empty() && models != self.package {
            true => Some(models),
            false => None,
        }
    }

    pub fn model_type(&self, name: &str) -> String {
        match self.models_qualifier() {
            Some(package) => format!("{package}.{name}"),
            None => name.to_owned(),
        }
    }

    pub fn db_target(&self) -> OutputTarget {
        OutputTarget {
            file_name: pick(&self.output_db_file_name, "db.go"),
            package: pick(&self.output_db_package, &self.package),
        }
    }

    pub fn models_target(&self) -> OutputTarget {
        OutputTarget {
            file_name: pick(&self.output_models_file_name, "models.go"),
            package: pick(&self.output_models_package, &self.package),
        }
    }

    pub fn querier_target(&self) -> OutputTarget {
        OutputTarget {
            file_name: pick(&self.output_querier_file_name, "querier.go"),
            package: pick(&self.output_querier_package, &self.package),
        }
    }

    pub fn copyfrom_target(&self) -> OutputTarget {
        OutputTarget {
            file_name: pick(&self.output_copyfrom_file_name, "copyfrom.go"),
            package: pick(&self.output_copyfrom_package, &self.package),
        }
    }

    pub fn batch_target(&self) -> OutputTarget {
        OutputTarget {
            file_name: pick(&self.output_batch_file_name, "batch.go"),
            package: pick(&self.output_batch_package, &self.package),
        }
    }

    pub fn query_package(&self) -> String {
        pick(&self.output_files_package, &self.package)
    }

    /// Final name of the query file generated for one source file.
    pub fn query_file_name(&self, source: &str) -> String {
        format!(
            "{}{source}{}",
            self.output_files_prefix, self.output_files_suffix
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(options: serde_json::Value) -> Result<Options, GenError> {
        let req = GenerateRequest {
            plugin_options: options,
            ..Default::default()
        };
        Options::parse(&req)
    }

    #[test]
    fn defaults_apply_when_blob_is_missing() {
        let options = parse(serde_json::Value::Null).unwrap();
        assert_eq!(options.package, DEFAULT_PACKAGE);
        assert_eq!(options.query_parameter_limit, 1);
        assert_eq!(options.initialisms, vec!["id".to_owned()]);
        assert_eq!(options.driver(), SqlDriver::LibPq);
    }

    #[test]
    fn decodes_driver_selection() {
        let options = parse(json!({ "package": "store", "sql_package": "pgx/v5" })).unwrap();
        assert_eq!(options.driver(), SqlDriver::PgxV5);
        assert!(options.driver().is_pgx());

        let options = parse(json!({ "sql_driver": "github.com/go-sql-driver/mysql" })).unwrap();
        assert!(options.uses_mysql_driver());
        assert!(!options.driver().is_pgx());
    }

    #[test]
    fn rejects_unknown_package() {
        let err = parse(json!({ "sql_package": "pgx/v9" })).unwrap_err();
        assert!(matches!(err, GenError::InvalidOptions { .. }));
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(parse(json!({ "emit_everything": true })).is_err());
    }

    #[test]
    fn prepared_queries_and_db_argument_are_exclusive() {
        let err = parse(json!({
            "emit_prepared_queries": true,
            "emit_methods_with_db_argument": true,
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid options: emit_methods_with_db_argument and emit_prepared_queries options are mutually exclusive"
        );
    }

    #[test]
    fn negative_parameter_limit_is_rejected() {
        let err = parse(json!({ "query_parameter_limit": -1 })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid options: query parameter limit must not be negative"
        );
    }

    #[test]
    fn separate_models_package_needs_import_path() {
        assert!(parse(json!({ "package": "db", "output_models_package": "models" })).is_err());
        let options = parse(json!({
            "package": "db",
            "output_models_package": "models",
            "models_package_import_path": "example.com/app/models",
        }))
        .unwrap();
        assert_eq!(options.model_type("Author"), "models.Author");
        assert_eq!(options.models_target().package, "models");
        assert_eq!(options.db_target().package, "db");
    }

    #[test]
    fn output_targets_fall_back_to_defaults() {
        let options = parse(json!({
            "output_db_file_name": "handle.go",
            "output_files_prefix": "q_",
            "output_files_suffix": "_gen",
        }))
        .unwrap();
        assert_eq!(options.db_target().file_name, "handle.go");
        assert_eq!(options.models_target().file_name, "models.go");
        assert_eq!(options.query_file_name("query.sql"), "q_query.sql_gen");
    }

    #[test]
    fn go_type_spec_splits_import_path() {
        let spec = GoTypeSpec::parse("github.com/gofrs/uuid.UUID");
        assert_eq!(spec.import_path.as_deref(), Some("github.com/gofrs/uuid"));
        assert_eq!(spec.type_name, "uuid.UUID");

        let spec = GoTypeSpec::parse("*time.Time");
        assert_eq!(spec.import_path.as_deref(), Some("time"));
        assert_eq!(spec.type_name, "*time.Time");

        let spec = GoTypeSpec::parse("string");
        assert_eq!(spec.import_path, None);
        assert_eq!(spec.type_name, "string");
    }
}
