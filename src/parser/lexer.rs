// Lexical helpers shared by the listing parsers

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, none_of},
    combinator::{map, not, recognize, value},
    multi::{fold_many0, many0_count},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
    IResult,
};

/// Surround a parser with optional whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Command and argument names: `[A-Za-z_][A-Za-z0-9_]*`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        String::from,
    )(input)
}

fn string_char(input: &str) -> IResult<&str, char> {
    alt((
        none_of("\\\""),
        preceded(
            char('\\'),
            alt((
                value('\\', char('\\')),
                value('"', char('"')),
                value('\n', char('n')),
                value('\t', char('t')),
            )),
        ),
    ))(input)
}

/// Double-quoted string with `\"`, `\\`, `\n` and `\t` escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(string_char, String::new, |mut acc, c| {
            acc.push(c);
            acc
        }),
        char('"'),
    )(input)
}

pub fn number_literal(input: &str) -> IResult<&str, f64> {
    double(input)
}

/// `true` or `false`, not followed by more identifier characters
pub fn bool_literal(input: &str) -> IResult<&str, bool> {
    terminated(
        alt((value(true, tag("true")), value(false, tag("false")))),
        not(alt((alphanumeric1, tag("_")))),
    )(input)
}

/// Quote a string so that [`string_literal`] reads it back unchanged
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
