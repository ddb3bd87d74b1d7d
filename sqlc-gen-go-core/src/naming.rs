use std::sync::LazyLock;

use regex::Regex;

use crate::opts::{JsonTagsCaseStyle, Options};

const GO_KEYWORDS: &[&str] = &[
    "break",
    "default",
    "func",
    "interface",
    "select",
    "case",
    "defer",
    "go",
    "map",
    "struct",
    "chan",
    "else",
    "goto",
    "package",
    "switch",
    "const",
    "fallthrough",
    "if",
    "range",
    "type",
    "continue",
    "for",
    "import",
    "return",
    "var",
    "q",
];

fn title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn upper_title(word: &str) -> String {
    title(word)
}

pub fn lower_title(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Prefixes Go keywords (and the receiver name) so they can be used as identifiers.
pub fn escape(name: &str) -> String {
    match GO_KEYWORDS.contains(&name) {
        true => format!("_{name}"),
        false => name.to_owned(),
    }
}

/// Exported Go identifier for a SQL name, e.g. `author_id` -> `AuthorID`.
pub fn struct_name(name: &str, options: &Options) -> String {
    if let Some(rename) = options.rename.get(name).filter(|rename| !rename.is_empty()) {
        return rename.clone();
    }
    let cleaned: String = name
        .chars()
        .map(|c| match c.is_alphanumeric() {
            true => c,
            false => '_',
        })
        .collect();
    let mut out = String::new();
    for part in cleaned.split('_') {
        match options.is_initialism(part) {
            true => out.push_str(&part.to_uppercase()),
            false => out.push_str(&title(part)),
        }
    }
    match out.chars().next() {
        Some(first) if first.is_ascii_digit() => format!("_{out}"),
        _ => out,
    }
}

/// Unexported Go parameter name for a SQL name, e.g. `author_id` -> `authorID`.
pub fn arg_name(name: &str) -> String {
    let mut out = String::new();
    for (idx, part) in name.split('_').enumerate() {
        if idx == 0 {
            out.push_str(&part.to_lowercase());
        } else if part == "id" {
            out.push_str("ID");
        } else {
            out.push_str(&title(part));
        }
    }
    out
}

/// Sanitises an enum label so it can be part of a Go constant name.
pub fn enum_replace(value: &str) -> String {
    value
        .chars()
        .filter_map(|c| match c {
            '-' | ':' | '/' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
];

/// (singular, plural)
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("mombie", "mombies"),
];

/// (pattern, replacement), later rules take precedence.
const SINGULAR_RULES: &[(&str, &str)] = &[
    ("s$", ""),
    ("(ss)$", "${1}"),
    ("(n)ews$", "${1}ews"),
    ("([ti])a$", "${1}um"),
    (
        "((a)naly|(b)a|(d)iagno|(p)arenthe|(p)rogno|(s)ynop|(t)he)(sis|ses)$",
        "${1}sis",
    ),
    ("(^analy)(sis|ses)$", "${1}sis"),
    ("([^f])ves$", "${1}fe"),
    ("(hive)s$", "${1}"),
    ("(tive)s$", "${1}"),
    ("([lr])ves$", "${1}f"),
    ("([^aeiouy]|qu)ies$", "${1}y"),
    ("(s)eries$", "${1}eries"),
    ("(m)ovies$", "${1}ovie"),
    ("(c)ookies$", "${1}ookie"),
    ("(x|ch|ss|sh)es$", "${1}"),
    ("^(m|l)ice$", "${1}ouse"),
    ("(bus)(es)?$", "${1}"),
    ("(o)es$", "${1}"),
    ("(shoe)s$", "${1}"),
    ("(cris|test)(is|es)$", "${1}is"),
    ("^(a)x[ie]s$", "${1}xis"),
    ("(octop|vir)(us|i)$", "${1}us"),
    ("(alias|status)(es)?$", "${1}"),
    ("^(ox)en", "${1}"),
    ("(vert|ind)ices$", "${1}ex"),
    ("(matr)ices$", "${1}ix"),
    ("(quiz)zes$", "${1}"),
    ("(database)s$", "${1}"),
];

/// Inflections tried in order, the first matching one wins.
static SINGULAR_INFLECTIONS: LazyLock<Vec<(Regex, String)>> = LazyLock::new(|| {
    let mut compiled: Vec<(String, String)> = vec![];
    for word in UNCOUNTABLE {
        compiled.push((format!("^(?i)({word})$"), "${1}".to_owned()));
    }
    for (singular, plural) in IRREGULAR {
        compiled.push((format!("{}$", plural.to_uppercase()), singular.to_uppercase()));
        compiled.push((format!("{}$", title(plural)), title(singular)));
        compiled.push((format!("{plural}$"), (*singular).to_owned()));
    }
    for (pattern, replace) in SINGULAR_RULES.iter().rev() {
        compiled.push((pattern.to_uppercase(), replace.to_uppercase()));
        compiled.push(((*pattern).to_owned(), (*replace).to_owned()));
        compiled.push((format!("(?i){pattern}"), (*replace).to_owned()));
    }
    compiled
        .into_iter()
        .filter_map(|(pattern, replace)| Some((Regex::new(&pattern).ok()?, replace)))
        .collect()
});

/// English singular of a table name.
pub fn singular(name: &str, options: &Options) -> String {
    if options
        .inflection_exclude_table_names
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(name))
    {
        return name.to_owned();
    }
    match name.to_lowercase().as_str() {
        "campus" | "meta" => return name.to_owned(),
        "calories" => return "calorie".to_owned(),
        "waves" => return "wave".to_owned(),
        "metadata" => return "metadata".to_owned(),
        _ => {}
    }
    SINGULAR_INFLECTIONS
        .iter()
        .find(|(pattern, _)| pattern.is_match(name))
        .map(|(pattern, replace)| pattern.replace_all(name, replace.as_str()).into_owned())
        .unwrap_or_else(|| name.to_owned())
}

pub fn to_pascal_case(name: &str) -> String {
    name.split('_').map(title).collect()
}

pub fn to_camel_case(name: &str) -> String {
    lower_title(&to_pascal_case(name))
}

pub fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    for (idx, c) in name.char_indices() {
        if c.is_uppercase() {
            if idx > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn uppercase_id(name: String) -> String {
    match name.strip_suffix("Id") {
        Some(stem) => format!("{stem}ID"),
        None => name,
    }
}

pub fn json_tag_name(name: &str, options: &Options) -> String {
    let id_upper = options.json_tags_id_uppercase;
    match options.json_tags_case_style {
        JsonTagsCaseStyle::None => name.to_owned(),
        JsonTagsCaseStyle::Snake => to_snake_case(name),
        JsonTagsCaseStyle::Camel if id_upper => uppercase_id(to_camel_case(name)),
        JsonTagsCaseStyle::Camel => to_camel_case(name),
        JsonTagsCaseStyle::Pascal if id_upper => uppercase_id(to_pascal_case(name)),
        JsonTagsCaseStyle::Pascal => to_pascal_case(name),
    }
}

/// Turns free text into `//` comment lines.
pub fn comment(text: &str) -> String {
    text.lines()
        .map(|line| match line.is_empty() {
            true => "//".to_owned(),
            false => format!("// {line}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// SQL text goes into Go raw string literals, which cannot contain backticks.
pub fn escape_backtick(sql: &str) -> String {
    sql.replace('`', "` + \"`\" + `")
}
