//! UAST Query Evaluation
//!
//! The [`QueryEngine`] trait is the seam between the shotness engine and
//! whatever evaluates queries over a UAST. [`DslQueryEngine`] implements the
//! subset of the UAST DSL needed to select trackable units:
//!
//! ```text
//! structural:  filter(<predicate>)    direct children of the root
//!              rfilter(<predicate>)   root and every descendant, pre-order
//! predicate:   <cond> [&& <cond>]* [|| <cond> [&& <cond>]*]*
//! cond:        .roles has "Function"
//!              .type == "Method"      .type != "Lambda"
//!              .token == "main"       .props.visibility == "pub"
//! name query:  .props.name | .token | .type | .id
//! ```

use regex::Regex;
use thiserror::Error;

use super::Node;

/// Query evaluation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid query '{query}': {reason}")]
    Syntax { query: String, reason: String },

    #[error("Query pattern failed to compile: {0}")]
    Pattern(String),
}

impl QueryError {
    pub fn syntax(query: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// A structural query and a name query, parsed once and run against
/// every file revision
pub trait QueryEngine: Send + Sync {
    /// Nodes selected by the structural query, in document order
    fn select<'a>(&self, root: &'a Node) -> QueryResult<Vec<&'a Node>>;

    /// Name of a selected node according to the name query
    fn resolve_name(&self, node: &Node) -> QueryResult<Option<String>>;
}

#[derive(Debug, Clone, PartialEq)]
enum Field {
    Type,
    Token,
    Id,
    Roles,
    Prop(String),
}

impl Field {
    fn parse(path: &str, query: &str) -> QueryResult<Self> {
        match path {
            "type" => Ok(Field::Type),
            "token" => Ok(Field::Token),
            "id" => Ok(Field::Id),
            "roles" => Ok(Field::Roles),
            other => match other.strip_prefix("props.") {
                Some(key) if !key.is_empty() => Ok(Field::Prop(key.to_string())),
                _ => Err(QueryError::syntax(query, format!("unknown field '.{}'", other))),
            },
        }
    }

    fn scalar(&self, node: &Node) -> Option<String> {
        match self {
            Field::Type => Some(node.node_type.clone()),
            Field::Token => Some(node.token.clone()),
            Field::Id => Some(node.id.to_string()),
            Field::Prop(key) => node.prop(key).map(str::to_string),
            Field::Roles => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Has,
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq)]
struct Condition {
    field: Field,
    comparison: Comparison,
    value: String,
}

impl Condition {
    fn matches(&self, node: &Node) -> bool {
        match (&self.field, self.comparison) {
            (Field::Roles, Comparison::Has) => node.has_role(&self.value),
            (field, Comparison::Equal) => field.scalar(node).as_deref() == Some(self.value.as_str()),
            (field, Comparison::NotEqual) => field.scalar(node).as_deref() != Some(self.value.as_str()),
            _ => false,
        }
    }
}

/// Parsed structural query: a disjunction of conjunctions
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    recursive: bool,
    any_of: Vec<Vec<Condition>>,
}

impl Selector {
    fn matches(&self, node: &Node) -> bool {
        self.any_of
            .iter()
            .any(|all| all.iter().all(|cond| cond.matches(node)))
    }
}

/// Grammar of the DSL subset described in the module docs
struct DslParser {
    selector_pattern: Regex,
    condition_pattern: Regex,
    field_pattern: Regex,
}

impl DslParser {
    fn new() -> QueryResult<Self> {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| QueryError::Pattern(e.to_string()));
        Ok(Self {
            selector_pattern: compile(r"^(rfilter|filter)\s*\((.*)\)$")?,
            condition_pattern: compile(
                r#"^\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_-]*)?)\s*(has|==|!=)\s*"([^"]*)"$"#,
            )?,
            field_pattern: compile(r"^\.([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_-]*)?)$")?,
        })
    }

    fn parse_selector(&self, query: &str) -> QueryResult<Selector> {
        let trimmed = query.trim();
        let captures = self
            .selector_pattern
            .captures(trimmed)
            .ok_or_else(|| QueryError::syntax(query, "expected filter(...) or rfilter(...)"))?;

        let recursive = &captures[1] == "rfilter";
        let body = captures[2].trim();
        if body.is_empty() {
            return Err(QueryError::syntax(query, "empty predicate"));
        }

        let mut any_of = Vec::new();
        for clause in split_outside_quotes(body, "||") {
            let mut all = Vec::new();
            for atom in split_outside_quotes(&clause, "&&") {
                all.push(self.parse_condition(atom.trim(), query)?);
            }
            any_of.push(all);
        }

        Ok(Selector { recursive, any_of })
    }

    fn parse_condition(&self, atom: &str, query: &str) -> QueryResult<Condition> {
        let captures = self
            .condition_pattern
            .captures(atom)
            .ok_or_else(|| QueryError::syntax(query, format!("cannot parse condition '{}'", atom)))?;

        let field = Field::parse(&captures[1], query)?;
        let comparison = match &captures[2] {
            "has" => Comparison::Has,
            "==" => Comparison::Equal,
            _ => Comparison::NotEqual,
        };

        match (&field, comparison) {
            (Field::Roles, Comparison::Has) => {}
            (Field::Roles, _) => {
                return Err(QueryError::syntax(query, ".roles only supports 'has'"));
            }
            (_, Comparison::Has) => {
                return Err(QueryError::syntax(query, "'has' only applies to .roles"));
            }
            _ => {}
        }

        Ok(Condition {
            field,
            comparison,
            value: captures[3].to_string(),
        })
    }

    fn parse_field(&self, query: &str) -> QueryResult<Field> {
        let trimmed = query.trim();
        let captures = self
            .field_pattern
            .captures(trimmed)
            .ok_or_else(|| QueryError::syntax(query, "expected a field path such as .props.name"))?;
        match Field::parse(&captures[1], query)? {
            Field::Roles => Err(QueryError::syntax(query, ".roles is not a scalar field")),
            field => Ok(field),
        }
    }
}

/// Compiled DSL queries
#[derive(Debug, Clone, PartialEq)]
pub struct DslQueryEngine {
    selector: Selector,
    name_field: Field,
}

impl DslQueryEngine {
    /// Parse both queries; any syntax error is reported here, never during a scan
    pub fn compile(struct_query: &str, name_query: &str) -> QueryResult<Self> {
        let parser = DslParser::new()?;
        Ok(Self {
            selector: parser.parse_selector(struct_query)?,
            name_field: parser.parse_field(name_query)?,
        })
    }
}

impl QueryEngine for DslQueryEngine {
    fn select<'a>(&self, root: &'a Node) -> QueryResult<Vec<&'a Node>> {
        let selector = &self.selector;
        let matches = if selector.recursive {
            root.pre_order().filter(|n| selector.matches(n)).collect()
        } else {
            root.children.iter().filter(|n| selector.matches(n)).collect()
        };
        Ok(matches)
    }

    fn resolve_name(&self, node: &Node) -> QueryResult<Option<String>> {
        Ok(self.name_field.scalar(node))
    }
}

/// Split `input` on `separator`, ignoring separators inside double quotes
fn split_outside_quotes(input: &str, separator: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && rest.starts_with(separator) {
            parts.push(std::mem::take(&mut current));
            rest = &rest[separator.len()..];
            continue;
        }
        current.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    parts.push(current);
    parts
}
