//! Prisma schema parser.
//!
//! Parsing runs in two passes. The first collects every declared model,
//! view, enum and composite type name so field types can be classified; the
//! second converts each model block into a canonical [`Model`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::{Pair, Pairs};
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::grammar::{PrismaParser, Rule};
use crate::error::{SchemaError, SchemaResult};
use crate::model::{CanonicalType, Model, ModelField, OrmConfig};
use crate::typemap;
use crate::workspace::WorkspaceReader;

/// Everything recovered from one schema file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrismaSchema {
    /// `provider` of the `datasource` block.
    pub datasource_provider: Option<String>,
    /// Models and views, in declaration order.
    pub models: Vec<Model>,
    /// Declared enum names.
    pub enums: Vec<SmolStr>,
}

/// An attribute argument value.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    String(String),
    Number(String),
    Path(String),
    Call(String, Vec<Arg>),
    Array(Vec<Value>),
}

impl Value {
    fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Field names in a list such as `[a, b(sort: Desc)]`.
    fn names(&self) -> Vec<String> {
        match self {
            Value::Array(items) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Path(p) | Value::Call(p, _) => Some(p.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Arg {
    name: Option<String>,
    value: Value,
}

#[derive(Debug, Clone, Default)]
struct Attribute {
    name: String,
    args: Vec<Arg>,
}

impl Attribute {
    /// A named argument, or the first positional one when `name` is absent.
    fn arg(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .or_else(|| self.args.iter().find(|a| a.name.is_none()))
            .map(|a| &a.value)
    }

    fn named(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }
}

/// A declared field before classification.
struct RawField {
    name: String,
    type_name: String,
    unsupported: Option<String>,
    list: bool,
    optional: bool,
    attributes: Vec<Attribute>,
}

/// A model or view block before classification.
struct RawModel {
    name: String,
    fields: Vec<RawField>,
    attributes: Vec<Attribute>,
}

/// Parse a schema from a string.
pub fn parse_prisma_schema(input: &str) -> SchemaResult<PrismaSchema> {
    parse_named("schema.prisma", input)
}

/// Parse a schema, naming `file` in syntax errors.
pub fn parse_named(file: &str, input: &str) -> SchemaResult<PrismaSchema> {
    let pairs = PrismaParser::parse(Rule::schema, input).map_err(|e| {
        let (offset, len) = match e.location {
            InputLocation::Pos(pos) => (pos, 1),
            InputLocation::Span((start, end)) => (start, end.saturating_sub(start).max(1)),
        };
        SchemaError::syntax(file, input, offset, len, e.variant.message().to_string())
    })?;

    let mut schema = PrismaSchema::default();
    let mut raw_models = Vec::new();
    let mut composite_types = HashSet::new();

    for pair in pairs.flatten().filter(|p| is_top_level(p.as_rule())) {
        match pair.as_rule() {
            Rule::config_block => {
                if let Some(provider) = parse_datasource_provider(pair) {
                    schema.datasource_provider = Some(provider);
                }
            }
            Rule::model_def | Rule::view_def => raw_models.push(parse_raw_model(pair)?),
            Rule::type_def => {
                composite_types.insert(parse_raw_model(pair)?.name);
            }
            Rule::enum_def => {
                let mut inner = pair.into_inner();
                let name = next_pair(&mut inner, "enum")?;
                schema.enums.push(SmolStr::new(name.as_str()));
            }
            _ => {}
        }
    }

    let model_names: HashSet<&str> = raw_models.iter().map(|m| m.name.as_str()).collect();
    let enums: HashSet<&str> = schema.enums.iter().map(SmolStr::as_str).collect();
    let names = Names {
        models: &model_names,
        enums: &enums,
        composites: &composite_types,
    };

    let mut models: Vec<Model> = Vec::new();
    for raw in &raw_models {
        let Some(model) = convert_model(raw, &names) else {
            continue;
        };
        if let Some(first) = models.iter().find(|m| m.table_name == model.table_name) {
            warn!(
                table = %model.table_name,
                model = %model.name,
                first = %first.name,
                "duplicate table name, keeping first declaration"
            );
            continue;
        }
        models.push(model);
    }
    schema.models = models;

    Ok(schema)
}

/// Read and parse the schema named by `config`, returning its models.
///
/// Read and syntax failures are logged and yield no models.
pub fn find_models(reader: &dyn WorkspaceReader, config: &OrmConfig) -> Vec<Model> {
    let Some(path) = config.config_path.as_deref() else {
        debug!("no Prisma schema path configured");
        return Vec::new();
    };

    match read_schema(reader, path) {
        Ok(schema) => schema.models,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse Prisma schema");
            Vec::new()
        }
    }
}

/// Read and parse a schema file.
pub fn read_schema(reader: &dyn WorkspaceReader, path: &Path) -> SchemaResult<PrismaSchema> {
    let source = reader.read_file(path)?;
    parse_named(&path.display().to_string(), &source)
}

fn is_top_level(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::config_block | Rule::model_def | Rule::view_def | Rule::type_def | Rule::enum_def
    )
}

fn next_pair<'i>(inner: &mut Pairs<'i, Rule>, what: &str) -> SchemaResult<Pair<'i, Rule>> {
    inner
        .next()
        .ok_or_else(|| SchemaError::invalid_model(what, "malformed declaration"))
}

fn parse_datasource_provider(pair: Pair<'_, Rule>) -> Option<String> {
    let mut inner = pair.into_inner();
    if inner.next()?.as_str() != "datasource" {
        return None;
    }
    inner
        .filter(|p| p.as_rule() == Rule::config_entry)
        .find_map(|entry| {
            let mut parts = entry.into_inner();
            let key = parts.next()?;
            if key.as_str() != "provider" {
                return None;
            }
            parts.next().and_then(|v| parse_value(v).as_string().map(str::to_string))
        })
}

fn parse_raw_model(pair: Pair<'_, Rule>) -> SchemaResult<RawModel> {
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, "model")?.as_str().to_string();

    let mut model = RawModel {
        name,
        fields: Vec::new(),
        attributes: Vec::new(),
    };

    for item in inner {
        match item.as_rule() {
            Rule::field_def => model.fields.push(parse_raw_field(&model.name, item)?),
            Rule::block_attribute => model.attributes.push(parse_attribute(item)),
            _ => {}
        }
    }

    Ok(model)
}

fn parse_raw_field(model: &str, pair: Pair<'_, Rule>) -> SchemaResult<RawField> {
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, model)?.as_str().to_string();
    let field_type = next_pair(&mut inner, model)?;

    let mut field = RawField {
        name,
        type_name: String::new(),
        unsupported: None,
        list: false,
        optional: false,
        attributes: Vec::new(),
    };

    for part in field_type.into_inner() {
        match part.as_rule() {
            Rule::type_name => field.type_name = part.as_str().to_string(),
            Rule::unsupported_arg => {
                field.unsupported = part
                    .into_inner()
                    .next()
                    .and_then(|s| parse_value(s).as_string().map(str::to_string));
            }
            Rule::list_marker => field.list = true,
            Rule::optional_marker => field.optional = true,
            _ => {}
        }
    }

    field.attributes = inner
        .filter(|p| p.as_rule() == Rule::field_attribute)
        .map(parse_attribute)
        .collect();

    Ok(field)
}

fn parse_attribute(pair: Pair<'_, Rule>) -> Attribute {
    let mut attr = Attribute::default();
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::attr_path => attr.name = part.as_str().to_string(),
            Rule::attribute_args => attr.args = part.into_inner().map(parse_arg).collect(),
            _ => {}
        }
    }
    attr
}

fn parse_arg(pair: Pair<'_, Rule>) -> Arg {
    let mut name = None;
    let mut value = Value::Path(String::new());
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::arg_name => name = Some(part.as_str().to_string()),
            _ => value = parse_value(part),
        }
    }
    Arg { name, value }
}

fn parse_value(pair: Pair<'_, Rule>) -> Value {
    match pair.as_rule() {
        Rule::string => Value::String(unescape(pair.into_inner().as_str())),
        Rule::number => Value::Number(pair.as_str().to_string()),
        Rule::array => Value::Array(pair.into_inner().map(parse_value).collect()),
        Rule::function_call => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
            Value::Call(name, inner.map(parse_arg).collect())
        }
        _ => Value::Path(pair.as_str().to_string()),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Declared names used to classify field types.
struct Names<'a> {
    models: &'a HashSet<&'a str>,
    enums: &'a HashSet<&'a str>,
    composites: &'a HashSet<String>,
}

fn convert_model(raw: &RawModel, names: &Names<'_>) -> Option<Model> {
    let block = |name: &str| raw.attributes.iter().find(|a| a.name == name);

    if block("ignore").is_some() {
        debug!(model = %raw.name, "skipping @@ignore model");
        return None;
    }

    let table_name = block("map")
        .and_then(|a| a.arg("name"))
        .and_then(Value::as_string)
        .map_or_else(|| raw.name.clone(), str::to_string);

    let compound_pk: Vec<String> = block("id")
        .and_then(|a| a.arg("fields"))
        .map(Value::names)
        .unwrap_or_default();

    // scalar field -> model it references through `@relation(fields: [...])`
    let mut foreign_keys: HashMap<String, String> = HashMap::new();
    for field in &raw.fields {
        if !names.models.contains(field.type_name.as_str()) {
            continue;
        }
        if let Some(relation) = field.attributes.iter().find(|a| a.name == "relation") {
            for scalar in relation.named("fields").map(Value::names).unwrap_or_default() {
                foreign_keys.insert(scalar, field.type_name.clone());
            }
        }
    }

    let mut model = Model::new(raw.name.as_str(), table_name);
    for field in &raw.fields {
        if field.attributes.iter().any(|a| a.name == "ignore") {
            continue;
        }

        let mut converted = convert_field(field, names);
        if compound_pk.iter().any(|pk| pk == &field.name) {
            converted = converted.primary_key();
        }
        if let Some(target) = foreign_keys.get(&field.name) {
            converted = converted.references(target.as_str());
        }
        model.fields.push(converted);
    }

    Some(model)
}

fn convert_field(field: &RawField, names: &Names<'_>) -> ModelField {
    let attr = |name: &str| field.attributes.iter().find(|a| a.name == name);
    let type_name = field.type_name.as_str();

    if names.models.contains(type_name) {
        let mut relation = ModelField::new(field.name.as_str(), type_name, CanonicalType::Unknown)
            .nullable(field.optional)
            .without_column();
        relation.referenced_model = Some(SmolStr::new(type_name));
        return relation;
    }

    let native = field
        .attributes
        .iter()
        .find_map(|a| a.name.strip_prefix("db.").map(|n| (n, a)));

    let canonical = if field.list {
        CanonicalType::Array
    } else if names.enums.contains(type_name) {
        CanonicalType::Enum
    } else if names.composites.contains(type_name) {
        CanonicalType::Json
    } else if let Some(unsupported) = &field.unsupported {
        typemap::sql_type(unsupported)
    } else if !typemap::is_prisma_scalar(type_name) {
        warn!(field = %field.name, type_name, "unresolved Prisma type");
        CanonicalType::Unknown
    } else {
        typemap::prisma_scalar_type(type_name, native.map(|(n, _)| n))
    };

    let mut converted = ModelField::new(field.name.as_str(), type_name, canonical)
        .nullable(field.optional);

    if attr("id").is_some() {
        converted = converted.primary_key();
    }
    if let Some(column) = attr("map").and_then(|a| a.arg("name")).and_then(Value::as_string) {
        converted = converted.with_column(column);
    }
    if let Some((_, native_attr)) = native {
        let length = native_attr.args.first().and_then(|a| match &a.value {
            Value::Number(n) => n.parse().ok(),
            _ => None,
        });
        if let Some(length) = length {
            if canonical == CanonicalType::Text {
                converted = converted.with_max_length(length);
            }
        }
    }

    converted
}
