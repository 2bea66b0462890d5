use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, value},
    multi::separated_list1,
    sequence::{delimited, preceded, terminated},
};
use regex::Regex;
use crate::core::error::{Error, Result};
use crate::core::types::{SpanKind, SpanStatus};
use crate::query::ast::{Attribute, AttributeScope, Condition, Hints, Intrinsic, Operator, Query, Static};

type NomError<'a> = nom::error::Error<&'a str>;

/// Parser for span filter expressions
///
/// Examples:
/// - `{ }` -> match everything
/// - `{ span.http.method = "GET" && duration > 100ms }`
/// - `{ resource.service.name =~ "check.*" } with (most_recent=true)`
#[derive(Debug, Clone, Default)]
pub struct QueryParser;

impl QueryParser {
    pub fn new() -> Self {
        QueryParser
    }

    /// Parse a filter expression into a Query AST
    pub fn parse(&self, input: &str) -> Result<Query> {
        let (_, (conditions, hints)) = all_consuming(delimited(
            multispace0,
            (body, opt(hints)),
            multispace0,
        ))
        .parse(input)
        .map_err(|e| syntax_error(input, e))?;

        let query = Query {
            conditions: conditions.unwrap_or_default(),
            hints: Hints { entries: hints.unwrap_or_default() },
        };
        validate(&query)?;
        Ok(query)
    }

    /// Parse, degrading an empty or malformed filter to match-all.
    pub fn parse_or_match_all(&self, input: &str) -> Query {
        if input.trim().is_empty() {
            return Query::match_all();
        }
        self.parse(input).unwrap_or_else(|_| Query::match_all())
    }

    /// Parse a bare attribute such as `span.foo`, `.foo` or `name`
    pub fn parse_identifier(&self, input: &str) -> Result<Attribute> {
        let (_, attr) = all_consuming(attribute)
            .parse(input.trim())
            .map_err(|_| Error::invalid_argument(format!("invalid attribute identifier: {:?}", input)))?;
        Ok(attr)
    }
}

fn syntax_error(input: &str, err: nom::Err<NomError<'_>>) -> Error {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = input.len() - e.input.len();
            Error::parse(format!("syntax error at offset {} in {:?}", offset, input))
        }
        nom::Err::Incomplete(_) => Error::parse(format!("incomplete query {:?}", input)),
    }
}

fn validate(query: &Query) -> Result<()> {
    for cond in &query.conditions {
        if matches!(cond.op, Operator::Regex | Operator::NotRegex) {
            match &cond.operand {
                Static::String(pattern) => {
                    Regex::new(pattern)?;
                }
                other => {
                    return Err(Error::parse(format!("regex operator requires a string, got {}", other)));
                }
            }
        }
    }
    Ok(())
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = NomError<'a>>
where
    F: Parser<&'a str, Output = O, Error = NomError<'a>>,
{
    delimited(multispace0, inner, multispace0)
}

/// A word not directly followed by another identifier character
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = NomError<'a>> {
    terminated(tag(word), not(satisfy(|c: char| c.is_alphanumeric() || c == '_')))
}

fn body(input: &str) -> IResult<&str, Option<Vec<Condition>>> {
    delimited(
        (char('{'), multispace0),
        opt(separated_list1(ws(tag("&&")), condition)),
        (multispace0, char('}')),
    )
    .parse(input)
}

fn hints(input: &str) -> IResult<&str, Vec<(String, Static)>> {
    preceded(
        (multispace0, keyword("with"), multispace0),
        delimited(
            (char('('), multispace0),
            separated_list1(ws(char(',')), hint),
            (multispace0, char(')')),
        ),
    )
    .parse(input)
}

fn hint(input: &str) -> IResult<&str, (String, Static)> {
    map(
        (
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
            ws(char('=')),
            static_value,
        ),
        |(name, _, v): (&str, char, Static)| (name.to_string(), v),
    )
    .parse(input)
}

fn condition(input: &str) -> IResult<&str, Condition> {
    map(
        (attribute, ws(operator), static_value),
        |(attribute, op, operand)| Condition { attribute, op, operand },
    )
    .parse(input)
}

fn attr_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '/')).parse(input)
}

fn scope_prefix(input: &str) -> IResult<&str, AttributeScope> {
    alt((
        value(AttributeScope::Span, tag("span")),
        value(AttributeScope::Resource, tag("resource")),
        value(AttributeScope::Event, tag("event")),
        value(AttributeScope::Link, tag("link")),
        value(AttributeScope::Instrumentation, tag("instrumentation")),
    ))
    .parse(input)
}

fn intrinsic(input: &str) -> IResult<&str, Intrinsic> {
    alt((
        value(Intrinsic::TraceId, tag("trace:id")),
        value(Intrinsic::SpanId, tag("span:id")),
        value(Intrinsic::ParentId, tag("span:parentID")),
        value(Intrinsic::Name, keyword("name")),
        value(Intrinsic::Duration, keyword("duration")),
        value(Intrinsic::Status, keyword("status")),
        value(Intrinsic::Kind, keyword("kind")),
    ))
    .parse(input)
}

fn attribute(input: &str) -> IResult<&str, Attribute> {
    alt((
        map(
            (scope_prefix, preceded(char('.'), attr_name)),
            |(scope, name): (AttributeScope, &str)| Attribute::scoped(scope, name),
        ),
        map(preceded(char('.'), attr_name), |name: &str| {
            Attribute::scoped(AttributeScope::None, name)
        }),
        map(intrinsic, Attribute::Intrinsic),
    ))
    .parse(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::NotEq, tag("!=")),
        value(Operator::NotRegex, tag("!~")),
        value(Operator::Regex, tag("=~")),
        value(Operator::Gte, tag(">=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Eq, tag("=")),
        value(Operator::Gt, tag(">")),
        value(Operator::Lt, tag("<")),
    ))
    .parse(input)
}

fn static_value(input: &str) -> IResult<&str, Static> {
    alt((
        map(string_literal, Static::String),
        map(duration_literal, Static::Duration),
        map(float_literal, Static::Float),
        map(int_literal, Static::Int),
        value(Static::Bool(true), keyword("true")),
        value(Static::Bool(false), keyword("false")),
        map(status_keyword, Static::Status),
        map(kind_keyword, Static::Kind),
    ))
    .parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let (rest, _) = char('"').parse(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&rest[i + 1..], out)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(nom::Err::Error(NomError::new(input, nom::error::ErrorKind::Char)))
}

fn duration_literal(input: &str) -> IResult<&str, u64> {
    map_res(
        (
            digit1,
            terminated(
                alt((tag("ns"), tag("us"), tag("ms"), tag("s"), tag("m"), tag("h"))),
                not(satisfy(|c: char| c.is_alphanumeric())),
            ),
        ),
        |(digits, unit): (&str, &str)| {
            let multiplier: u64 = match unit {
                "ns" => 1,
                "us" => 1_000,
                "ms" => 1_000_000,
                "s" => 1_000_000_000,
                "m" => 60_000_000_000,
                _ => 3_600_000_000_000,
            };
            digits.parse::<u64>().map(|n| n * multiplier)
        },
    )
    .parse(input)
}

fn float_literal(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize((opt(char('-')), digit1, char('.'), digit1)),
        |s: &str| s.parse::<f64>(),
    )
    .parse(input)
}

fn int_literal(input: &str) -> IResult<&str, i64> {
    map_res(recognize((opt(char('-')), digit1)), |s: &str| s.parse::<i64>()).parse(input)
}

fn status_keyword(input: &str) -> IResult<&str, SpanStatus> {
    alt((
        value(SpanStatus::Error, keyword("error")),
        value(SpanStatus::Ok, keyword("ok")),
        value(SpanStatus::Unset, keyword("unset")),
    ))
    .parse(input)
}

fn kind_keyword(input: &str) -> IResult<&str, SpanKind> {
    alt((
        value(SpanKind::Unspecified, keyword("unspecified")),
        value(SpanKind::Internal, keyword("internal")),
        value(SpanKind::Server, keyword("server")),
        value(SpanKind::Client, keyword("client")),
        value(SpanKind::Producer, keyword("producer")),
        value(SpanKind::Consumer, keyword("consumer")),
    ))
    .parse(input)
}
