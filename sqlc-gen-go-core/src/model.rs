//! Generated entities: enums, structs and queries, plus the Go snippets derived from them.

use std::collections::BTreeMap;

use crate::{
    cmd::CommandKind,
    naming::{escape, lower_title},
    opts::SqlDriver,
    plugin::{Column, Identifier},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub name: String,
    pub value: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enum {
    pub name: String,
    pub comment: String,
    pub constants: Vec<Constant>,
    pub name_tags: BTreeMap<String, String>,
    pub valid_tags: BTreeMap<String, String>,
}

impl Enum {
    pub fn null_name(&self) -> String {
        format!("Null{}", self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub db_name: String,
    pub type_name: String,
    pub tags: BTreeMap<String, String>,
    pub comment: String,
    pub column: Option<Column>,
    pub embed_fields: Vec<Field>,
}

/// Renders a tag map as the body of a Go struct tag, e.g. `db:"id" json:"id"`.
pub fn render_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(key, value)| format!("{key}:\"{value}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Field {
    pub fn tag(&self) -> String {
        render_tags(&self.tags)
    }

    pub fn has_sqlc_slice(&self) -> bool {
        self.column.as_ref().is_some_and(|column| column.is_sqlc_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Struct {
    pub table: Option<Identifier>,
    pub name: String,
    pub fields: Vec<Field>,
    pub comment: String,
}

/// Lower-cases the leading word of an exported name: `AuthorID` -> `authorID`, `ID` -> `id`.
fn to_lower_case(name: &str) -> String {
    if name.chars().all(|c| !c.is_lowercase()) {
        return name.to_lowercase();
    }
    lower_title(name)
}

/// Slices other than `[]byte` need `pq.Array` wrapping under database/sql.
fn needs_pq_array(type_name: &str, driver: SqlDriver) -> bool {
    type_name.starts_with("[]") && type_name != "[]byte" && !driver.is_pgx()
}

fn join_arguments(items: Vec<String>) -> String {
    if items.len() <= 3 {
        return items.join(", ");
    }
    format!("\n\t\t{},\n\t", items.join(",\n\t\t"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub type_name: String,
}

/// Argument or return shape of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryValue {
    pub emit: bool,
    pub name: String,
    pub db_name: String,
    pub structure: Option<Struct>,
    pub typ: String,
    pub driver: SqlDriver,
    pub column: Option<Column>,
    pub emit_pointer: bool,
}

impl QueryValue {
    pub fn empty(driver: SqlDriver) -> Self {
        Self {
            emit: false,
            name: String::new(),
            db_name: String::new(),
            structure: None,
            typ: String::new(),
            driver,
            column: None,
            emit_pointer: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.typ.is_empty() && self.name.is_empty() && self.structure.is_none()
    }

    pub fn is_struct(&self) -> bool {
        self.structure.is_some()
    }

    pub fn emit_struct(&self) -> bool {
        self.emit
    }

    pub fn is_pointer(&self) -> bool {
        self.emit_pointer && self.structure.is_some()
    }

    /// Go type of the value; empty for an empty value.
    pub fn type_name(&self) -> String {
        if !self.typ.is_empty() {
            return self.typ.clone();
        }
        match &self.structure {
            Some(structure) => structure.name.clone(),
            None => String::new(),
        }
    }

    pub fn define_type(&self) -> String {
        match self.is_pointer() {
            true => format!("*{}", self.type_name()),
            false => self.type_name(),
        }
    }

    pub fn return_name(&self) -> String {
        match self.is_pointer() {
            true => format!("&{}", escape(&self.name)),
            false => escape(&self.name),
        }
    }

    /// Fields of the value's struct, or a single pseudo-field for a scalar.
    pub fn fields(&self) -> Vec<Field> {
        match &self.structure {
            Some(structure) => structure.fields.clone(),
            None => vec![Field {
                name: self.name.clone(),
                db_name: self.db_name.clone(),
                type_name: self.typ.clone(),
                column: self.column.clone(),
                ..Default::default()
            }],
        }
    }

    pub fn unique_fields(&self) -> Vec<Field> {
        let Some(structure) = &self.structure else {
            return vec![];
        };
        let mut seen = Vec::<&str>::new();
        let mut fields = vec![];
        for field in &structure.fields {
            if seen.contains(&field.name.as_str()) {
                continue;
            }
            seen.push(&field.name);
            fields.push(field.clone());
        }
        fields
    }

    pub fn pairs(&self) -> Vec<Argument> {
        if self.is_empty() {
            return vec![];
        }
        if let (false, Some(structure)) = (self.emit_struct(), &self.structure) {
            let mut seen = Vec::<String>::new();
            let mut out = vec![];
            for field in &structure.fields {
                let name = escape(&to_lower_case(&field.name));
                if seen.contains(&name) {
                    continue;
                }
                seen.push(name.clone());
                out.push(Argument {
                    name,
                    type_name: field.type_name.clone(),
                });
            }
            return out;
        }
        vec![Argument {
            name: self.name.clone(),
            type_name: self.define_type(),
        }]
    }

    /// Parameter list of the generated method, e.g. `id int64`.
    pub fn pair(&self) -> String {
        self.pairs()
            .into_iter()
            .map(|arg| format!("{} {}", arg.name, arg.type_name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn slice_pair(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        format!("{} []{}", self.name, self.define_type())
    }

    pub fn variable_for_field(&self, field: &Field) -> String {
        if !self.is_struct() {
            return self.name.clone();
        }
        if !self.emit_struct() {
            return to_lower_case(&field.name);
        }
        format!("{}.{}", self.name, field.name)
    }

    /// Call arguments passed after the SQL text.
    pub fn params(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = vec![];
        match &self.structure {
            None => {
                let name = escape(&self.name);
                let slice = self.column.as_ref().is_some_and(|column| column.is_sqlc_slice);
                match !slice && needs_pq_array(&self.typ, self.driver) {
                    true => out.push(format!("pq.Array({name})")),
                    false => out.push(name),
                }
            }
            Some(structure) => {
                for field in &structure.fields {
                    let name = escape(&self.variable_for_field(field));
                    match !field.has_sqlc_slice() && needs_pq_array(&field.type_name, self.driver) {
                        true => out.push(format!("pq.Array({name})")),
                        false => out.push(name),
                    }
                }
            }
        }
        join_arguments(out)
    }

    /// Scan destinations for the value, embedded structs flattened.
    pub fn scan(&self) -> String {
        let target = |path: String, type_name: &str| match needs_pq_array(type_name, self.driver) {
            true => format!("pq.Array(&{path})"),
            false => format!("&{path}"),
        };
        let mut out = vec![];
        match &self.structure {
            None => out.push(target(self.name.clone(), &self.typ)),
            Some(structure) => {
                for field in &structure.fields {
                    if field.embed_fields.is_empty() {
                        out.push(target(
                            format!("{}.{}", self.name, field.name),
                            &field.type_name,
                        ));
                        continue;
                    }
                    for embed in &field.embed_fields {
                        out.push(target(
                            format!("{}.{}.{}", self.name, field.name, embed.name),
                            &embed.type_name,
                        ));
                    }
                }
            }
        }
        join_arguments(out)
    }

    pub fn column_names(&self) -> Vec<String> {
        match &self.structure {
            None => vec![self.db_name.clone()],
            Some(structure) => structure
                .fields
                .iter()
                .map(|field| field.db_name.clone())
                .collect(),
        }
    }

    pub fn column_names_as_go_slice(&self) -> String {
        let names = match &self.structure {
            None => vec![format!("{:?}", self.db_name)],
            Some(structure) => structure
                .fields
                .iter()
                .map(|field| {
                    let name = field
                        .column
                        .as_ref()
                        .map(|column| column.original_name.as_str())
                        .filter(|original| !original.is_empty())
                        .unwrap_or(&field.db_name);
                    format!("{name:?}")
                })
                .collect(),
        };
        format!("[]string{{{}}}", names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub cmd: CommandKind,
    pub sql: String,
    pub method_name: String,
    pub field_name: String,
    pub constant_name: String,
    pub source_name: String,
    pub comments: Vec<String>,
    pub table: Option<Identifier>,
    pub arg: QueryValue,
    pub ret: QueryValue,
}

impl Query {
    pub fn has_ret_type(&self) -> bool {
        self.cmd.scans_rows() && !self.ret.is_empty()
    }

    pub fn table_identifier_as_go_slice(&self) -> String {
        let Some(table) = &self.table else {
            return "[]string{}".to_owned();
        };
        let mut names = vec![];
        if !table.schema.is_empty() {
            names.push(format!("{:?}", table.schema));
        }
        names.push(format!("{:?}", table.name));
        format!("[]string{{{}}}", names.join(", "))
    }

    pub fn table_identifier_for_mysql(&self) -> String {
        let Some(table) = &self.table else {
            return String::new();
        };
        match table.schema.is_empty() {
            true => format!("`{}`", table.name),
            false => format!("`{}`.`{}`", table.schema, table.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, db_name: &str, type_name: &str) -> Field {
        Field {
            name: name.into(),
            db_name: db_name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    fn params_struct(emit: bool, fields: Vec<Field>) -> QueryValue {
        QueryValue {
            emit,
            name: "arg".into(),
            structure: Some(Struct {
                name: "CreateAuthorParams".into(),
                fields,
                ..Default::default()
            }),
            ..QueryValue::empty(SqlDriver::LibPq)
        }
    }

    #[test]
    fn scalar_value() {
        let value = QueryValue {
            name: "id".into(),
            db_name: "id".into(),
            typ: "int64".into(),
            ..QueryValue::empty(SqlDriver::LibPq)
        };
        assert_eq!(value.pair(), "id int64");
        assert_eq!(value.params(), "id");
        assert_eq!(value.scan(), "&id");
        assert_eq!(value.column_names_as_go_slice(), "[]string{\"id\"}");
    }

    #[test]
    fn emitted_struct_is_passed_whole() {
        let value = params_struct(
            true,
            vec![field("Name", "name", "string"), field("Bio", "bio", "sql.NullString")],
        );
        assert_eq!(value.pair(), "arg CreateAuthorParams");
        assert_eq!(value.params(), "arg.Name, arg.Bio");
        assert_eq!(value.slice_pair(), "arg []CreateAuthorParams");
    }

    #[test]
    fn unemitted_struct_is_flattened() {
        let value = params_struct(
            false,
            vec![field("Name", "name", "string"), field("AuthorID", "author_id", "int64")],
        );
        assert_eq!(value.pair(), "name string, authorID int64");
        assert_eq!(value.params(), "name, authorID");
    }

    #[test]
    fn long_argument_lists_break_lines() {
        let value = params_struct(
            true,
            vec![
                field("A", "a", "string"),
                field("B", "b", "string"),
                field("C", "c", "string"),
                field("D", "d", "string"),
            ],
        );
        assert_eq!(
            value.params(),
            "\n\t\targ.A,\n\t\targ.B,\n\t\targ.C,\n\t\targ.D,\n\t"
        );
    }

    #[test]
    fn slices_use_pq_array_only_for_stdlib() {
        let mut value = QueryValue {
            name: "tags".into(),
            typ: "[]string".into(),
            ..QueryValue::empty(SqlDriver::LibPq)
        };
        assert_eq!(value.params(), "pq.Array(tags)");
        assert_eq!(value.scan(), "pq.Array(&tags)");
        value.driver = SqlDriver::PgxV5;
        assert_eq!(value.params(), "tags");
    }

    #[test]
    fn scan_flattens_embedded_fields() {
        let mut embedded = field("Author", "author", "Author");
        embedded.embed_fields = vec![field("ID", "id", "int64"), field("Name", "name", "string")];
        let value = QueryValue {
            emit: true,
            name: "i".into(),
            structure: Some(Struct {
                name: "GetBookRow".into(),
                fields: vec![field("Title", "title", "string"), embedded],
                ..Default::default()
            }),
            ..QueryValue::empty(SqlDriver::PgxV5)
        };
        assert_eq!(value.scan(), "&i.Title, &i.Author.ID, &i.Author.Name");
    }

    #[test]
    fn pointer_returns() {
        let mut value = params_struct(true, vec![field("Name", "name", "string")]);
        value.name = "i".into();
        value.emit_pointer = true;
        assert_eq!(value.define_type(), "*CreateAuthorParams");
        assert_eq!(value.return_name(), "&i");
    }

    #[test]
    fn table_identifiers() {
        let query = Query {
            cmd: CommandKind::CopyFrom,
            sql: String::new(),
            method_name: "CreateAuthors".into(),
            field_name: "createAuthorsStmt".into(),
            constant_name: "createAuthors".into(),
            source_name: "query.sql".into(),
            comments: vec![],
            table: Some(Identifier::new("public", "authors")),
            arg: QueryValue::empty(SqlDriver::PgxV5),
            ret: QueryValue::empty(SqlDriver::PgxV5),
        };
        assert_eq!(query.table_identifier_as_go_slice(), "[]string{\"public\", \"authors\"}");
        assert_eq!(query.table_identifier_for_mysql(), "`public`.`authors`");
        assert!(!query.has_ret_type());
    }
}
