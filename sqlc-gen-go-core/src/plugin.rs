use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Identifier {
    pub catalog: String,
    pub schema: String,
    pub name: String,
}

impl Identifier {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            catalog: String::new(),
            schema: schema.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Two identifiers name the same table once an empty schema is read as the default one.
    pub fn same_table(&self, other: &Identifier, default_schema: &str) -> bool {
        let schema = |ident: &Identifier| match ident.schema.is_empty() {
            true => default_schema.to_owned(),
            false => ident.schema.clone(),
        };
        self.name == other.name && schema(self) == schema(other)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Column {
    pub name: String,
    pub not_null: bool,
    pub is_array: bool,
    pub comment: String,
    pub length: i32,
    pub is_named_param: bool,
    pub is_func_call: bool,
    pub scope: String,
    pub table: Option<Identifier>,
    pub table_alias: String,
    #[serde(rename = "type")]
    pub r#type: Option<Identifier>,
    pub is_sqlc_slice: bool,
    pub embed_table: Option<Identifier>,
    pub original_name: String,
    pub unsigned: bool,
    pub array_dims: i32,
}

impl Column {
    /// SQL type name with the implicit `pg_catalog` schema removed.
    pub fn data_type(&self) -> String {
        let Some(ident) = &self.r#type else {
            return String::new();
        };
        match ident.schema.as_str() {
            "" | "pg_catalog" => ident.name.clone(),
            schema => format!("{schema}.{}", ident.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    pub rel: Identifier,
    pub columns: Vec<Column>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enum {
    pub name: String,
    pub vals: Vec<String>,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeType {
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub comment: String,
    pub name: String,
    pub tables: Vec<Table>,
    pub enums: Vec<Enum>,
    pub composite_types: Vec<CompositeType>,
}

impl Schema {
    /// Schemas owned by the database itself never produce generated types.
    pub fn is_system(&self) -> bool {
        matches!(self.name.as_str(), "pg_catalog" | "information_schema")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub comment: String,
    pub default_schema: String,
    pub name: String,
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    pub number: i32,
    pub column: Column,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub text: String,
    pub name: String,
    pub cmd: String,
    pub columns: Vec<Column>,
    pub params: Vec<Parameter>,
    pub comments: Vec<String>,
    pub filename: String,
    pub insert_into_table: Option<Identifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    pub engine: String,
    pub schema: Vec<String>,
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub settings: Settings,
    pub catalog: Catalog,
    pub queries: Vec<Query>,
    pub sqlc_version: String,
    #[serde(deserialize_with = "options_blob")]
    pub plugin_options: Value,
    #[serde(deserialize_with = "options_blob")]
    pub global_options: Value,
}

/// Options arrive either inline as a JSON object or as an encoded JSON document.
fn options_blob<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let bytes = match value {
        Value::String(text) if text.trim().is_empty() => return Ok(Value::Null),
        Value::String(text) => text.into_bytes(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|byte| u8::try_from(byte).ok())
                    .ok_or_else(|| serde::de::Error::custom("options byte array holds a non-byte"))
            })
            .collect::<Result<Vec<u8>, D::Error>>()?,
        other => return Ok(other),
    };
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub files: Vec<File>,
}
