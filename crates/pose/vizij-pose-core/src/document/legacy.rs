//! Strict readers for the two pre-JSON document layouts.
//!
//! Both are literal dumps of nested containers:
//! - `.list`: `['ns:hand', 'ns:foot']`, object names with no attributes
//! - `.dict`: `{'ns:hand': {'translateX': ('doubleLinear', 1.5)}}`
//!
//! Only literals are accepted (strings, numbers, `True`/`False`/`None`, lists,
//! tuples, dicts); anything else is a syntax error. Nothing is evaluated.

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while_m_n},
    character::complete::{char, multispace0, none_of, one_of},
    combinator::{all_consuming, map, map_opt, opt, value},
    error::{context, ContextError, ParseError as NomParseError},
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::{delimited, preceded, separated_pair, terminated},
    IResult,
};
use thiserror::Error;
use vizij_api_core::Value;

use super::{AttrRecord, ObjectRecord};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LegacyError {
    #[error("syntax error:\n{0}")]
    Syntax(String),
    #[error("unexpected layout: {0}")]
    Shape(String),
}

/// A parsed literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Attribute value view; `None` for values an attribute cannot hold.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Literal::Bool(b) => Some(Value::Bool(*b)),
            Literal::Int(i) => Some(Value::Int(*i)),
            Literal::Float(f) => Some(Value::Float(*f)),
            Literal::Str(s) => Some(Value::Text(s.clone())),
            Literal::List(items) | Literal::Tuple(items) => items
                .iter()
                .map(Literal::to_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Literal::None | Literal::Dict(_) => None,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

pub fn parse_literal(input: &str) -> Result<Literal, LegacyError> {
    match all_consuming(ws(literal::<nom::error::VerboseError<&str>>))(input) {
        Ok((_, lit)) => Ok(lit),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(LegacyError::Syntax(nom::error::convert_error(input, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(LegacyError::Syntax("incomplete input".to_string())),
    }
}

/// Object names from a `.list` file.
pub fn parse_list(input: &str) -> Result<Vec<String>, LegacyError> {
    let items = match parse_literal(input)? {
        Literal::List(items) | Literal::Tuple(items) => items,
        other => return Err(LegacyError::Shape(format!("expected a list, found {other:?}"))),
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| LegacyError::Shape(format!("object name must be a string: {item:?}")))
        })
        .collect()
}

/// Object records from a `.dict` file.
///
/// Each attribute entry is a `(type, value)` pair; a `{'type': .., 'value': ..}`
/// mapping is accepted as well. Attributes whose value is `None` are dropped.
pub fn parse_dict(input: &str) -> Result<IndexMap<String, ObjectRecord>, LegacyError> {
    let entries = match parse_literal(input)? {
        Literal::Dict(entries) => entries,
        other => return Err(LegacyError::Shape(format!("expected a dict, found {other:?}"))),
    };

    let mut objects = IndexMap::with_capacity(entries.len());
    for (name, attrs) in &entries {
        let name = name
            .as_str()
            .ok_or_else(|| LegacyError::Shape(format!("object name must be a string: {name:?}")))?;
        let attrs = match attrs {
            Literal::Dict(attrs) => attrs,
            other => {
                return Err(LegacyError::Shape(format!(
                    "attributes of '{name}' must be a dict, found {other:?}"
                )))
            }
        };

        let mut record = ObjectRecord::default();
        for (attr, entry) in attrs {
            let attr = attr.as_str().ok_or_else(|| {
                LegacyError::Shape(format!("attribute name on '{name}' must be a string"))
            })?;
            let (type_name, raw) = attr_entry(entry)
                .ok_or_else(|| LegacyError::Shape(format!("bad record for '{name}.{attr}'")))?;
            match raw.to_value() {
                Some(value) => {
                    record.attrs.insert(
                        attr.to_string(),
                        AttrRecord {
                            type_name: type_name.to_string(),
                            value,
                        },
                    );
                }
                None => log::debug!("dropping '{name}.{attr}': no storable value"),
            }
        }
        objects.insert(name.to_string(), record);
    }
    Ok(objects)
}

fn attr_entry(entry: &Literal) -> Option<(&str, &Literal)> {
    match entry {
        Literal::Tuple(pair) | Literal::List(pair) if pair.len() == 2 => {
            Some((pair[0].as_str()?, &pair[1]))
        }
        Literal::Dict(fields) => {
            let field = |key: &str| {
                fields
                    .iter()
                    .find(|(k, _)| k.as_str() == Some(key))
                    .map(|(_, v)| v)
            };
            Some((field("type")?.as_str()?, field("value")?))
        }
        _ => None,
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn ws<'a, O, E, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    E: NomParseError<&'a str>,
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

fn literal<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Literal, E> {
    alt((
        value(Literal::None, tag("None")),
        value(Literal::Bool(true), tag("True")),
        value(Literal::Bool(false), tag("False")),
        map(string_literal, Literal::Str),
        number_literal,
        map(sequence('[', ']'), Literal::List),
        map(sequence('(', ')'), Literal::Tuple),
        dict_literal,
    ))(input)
}

fn sequence<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    open: char,
    close: char,
) -> impl FnMut(&'a str) -> IResult<&'a str, Vec<Literal>, E> {
    move |input| {
        delimited(
            char(open),
            terminated(
                separated_list0(char(','), ws(literal)),
                opt(ws(char(','))),
            ),
            preceded(multispace0, context("closing bracket", char(close))),
        )(input)
    }
}

fn dict_literal<'a, E: NomParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, Literal, E> {
    let entry = separated_pair(ws(literal), char(':'), ws(literal));
    map(
        delimited(
            char('{'),
            terminated(separated_list0(char(','), entry), opt(ws(char(',')))),
            preceded(multispace0, context("closing brace", char('}'))),
        ),
        Literal::Dict,
    )(input)
}

fn quoted<'a, E: NomParseError<&'a str>>(
    quote: char,
) -> impl FnMut(&'a str) -> IResult<&'a str, String, E> {
    let forbidden = if quote == '"' { "\"\\" } else { "'\\" };
    move |input| {
        map(
            delimited(
                char(quote),
                opt(escaped_transform(
                    none_of(forbidden),
                    '\\',
                    alt((
                        value('\n', char('n')),
                        value('\r', char('r')),
                        value('\t', char('t')),
                        value('\\', char('\\')),
                        value('"', char('"')),
                        value('\'', char('\'')),
                        hex_escape('x', 2),
                        hex_escape('u', 4),
                        hex_escape('U', 8),
                    )),
                )),
                char(quote),
            ),
            Option::unwrap_or_default,
        )(input)
    }
}

/// `\xhh`, `\uhhhh` and `\Uhhhhhhhh` code point escapes.
fn hex_escape<'a, E: NomParseError<&'a str>>(
    prefix: char,
    digits: usize,
) -> impl FnMut(&'a str) -> IResult<&'a str, char, E> {
    map_opt(
        preceded(
            char(prefix),
            take_while_m_n(digits, digits, |c: char| c.is_ascii_hexdigit()),
        ),
        |hex: &str| u32::from_str_radix(hex, 16).ok().and_then(char::from_u32),
    )
}

fn string_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, String, E> {
    preceded(opt(one_of("uU")), alt((quoted('\''), quoted('"'))))(input)
}

// Integers keep an optional long suffix (`3L`) from older dumps.
fn number_literal<'a, E: NomParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Literal, E> {
    let (remaining, text) = recognize_float(input)?;
    let is_float = text.contains(|c| matches!(c, '.' | 'e' | 'E'));
    let parsed = if is_float {
        text.parse::<f64>().ok().map(Literal::Float)
    } else {
        text.parse::<i64>().ok().map(Literal::Int)
    };
    match parsed {
        Some(lit) if is_float => Ok((remaining, lit)),
        Some(lit) => {
            let (remaining, _) = opt(one_of("lL"))(remaining)?;
            Ok((remaining, lit))
        }
        None => Err(nom::Err::Error(E::from_error_kind(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars() {
        assert_eq!(parse_literal("None").unwrap(), Literal::None);
        assert_eq!(parse_literal(" True ").unwrap(), Literal::Bool(true));
        assert_eq!(parse_literal("-3").unwrap(), Literal::Int(-3));
        assert_eq!(parse_literal("7L").unwrap(), Literal::Int(7));
        assert_eq!(parse_literal("1.5e-3").unwrap(), Literal::Float(0.0015));
        assert_eq!(parse_literal("u'ns:hand'").unwrap(), Literal::Str("ns:hand".into()));
        assert_eq!(parse_literal(r#""it's""#).unwrap(), Literal::Str("it's".into()));
        assert_eq!(parse_literal("''").unwrap(), Literal::Str(String::new()));
    }

    #[test]
    fn code_point_escapes() {
        assert_eq!(
            parse_literal(r"'caf\xe9 \u00e9\U0001F600'").unwrap(),
            Literal::Str("caf\u{e9} \u{e9}\u{1F600}".into())
        );
        assert!(parse_literal(r"'\xZZ'").is_err());
        assert!(parse_literal(r"'\uD800'").is_err());
    }

    #[test]
    fn containers_allow_trailing_commas() {
        let lit = parse_literal("[1, (2.0,), {'a': []},]").unwrap();
        assert_eq!(
            lit,
            Literal::List(vec![
                Literal::Int(1),
                Literal::Tuple(vec![Literal::Float(2.0)]),
                Literal::Dict(vec![(Literal::Str("a".into()), Literal::List(vec![]))]),
            ])
        );
    }

    #[test]
    fn rejects_code() {
        assert!(parse_literal("__import__('os')").is_err());
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("{'a': 1} extra").is_err());
    }

    #[test]
    fn list_layout() {
        let names = parse_list("['ns:hand', u\"ns:foot\"]").unwrap();
        assert_eq!(names, vec!["ns:hand", "ns:foot"]);
        assert!(matches!(parse_list("[1]"), Err(LegacyError::Shape(_))));
        assert!(matches!(parse_list("{}"), Err(LegacyError::Shape(_))));
    }

    #[test]
    fn dict_layout() {
        let text = "{
            'ns:hand': {
                'translateX': ('doubleLinear', 1.5),
                'visibility': ['bool', True],
                'label': {'type': 'string', 'value': None},
            },
            'ns:foot': {},
        }";
        let objects = parse_dict(text).unwrap();
        assert_eq!(objects.len(), 2);
        let hand = &objects["ns:hand"];
        assert_eq!(hand.attrs.len(), 2);
        assert_eq!(hand.attrs["translateX"].type_name, "doubleLinear");
        assert_eq!(hand.attrs["translateX"].value, Value::Float(1.5));
        assert_eq!(hand.attrs["visibility"].value, Value::Bool(true));
        assert!(objects["ns:foot"].attrs.is_empty());
    }
}
