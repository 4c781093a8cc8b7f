// Command parser for code listings

use super::ast::{Argument, Command, Value};
use super::lexer::{bool_literal, identifier, number_literal, string_literal, ws};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::{map, opt},
    multi::separated_list0,
    sequence::{delimited, separated_pair, terminated},
    IResult,
};

/// Parse a literal value: string, boolean, string list or number
pub fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        map(string_literal, Value::Str),
        map(bool_literal, Value::Bool),
        map(parse_string_list, Value::List),
        map(number_literal, Value::Number),
    ))(input)
}

/// `["a", "b"]`, trailing comma allowed
fn parse_string_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('[')),
        terminated(separated_list0(ws(char(',')), ws(string_literal)), opt(ws(char(',')))),
        ws(char(']')),
    )(input)
}

/// `name: value`
pub fn parse_argument(input: &str) -> IResult<&str, Argument> {
    map(
        separated_pair(ws(identifier), ws(char(':')), ws(parse_value)),
        |(name, value)| Argument { name, value },
    )(input)
}

/// Parse one command
/// Format: name() or name(arg: value, ...)
pub fn parse_command(input: &str) -> IResult<&str, Command> {
    let (input, name) = ws(identifier)(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, args) = separated_list0(ws(char(',')), parse_argument)(input)?;
    let (input, _) = opt(ws(char(',')))(input)?;
    let (input, _) = ws(char(')'))(input)?;

    Ok((input, Command { name, args }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_with_mixed_args() {
        let (rest, cmd) =
            parse_command(r#"scatter(x: "sepal_length", y: "petal_length", alpha: 0.7, size: 70)"#).unwrap();
        assert_eq!(rest, "");
        assert_eq!(cmd.name, "scatter");
        assert_eq!(cmd.args.len(), 4);
        assert_eq!(cmd.arg("x"), Some(&Value::Str("sepal_length".to_string())));
        assert_eq!(cmd.arg("alpha"), Some(&Value::Number(0.7)));
        assert_eq!(cmd.arg("size"), Some(&Value::Number(70.0)));
    }

    #[test]
    fn test_parse_command_without_args() {
        let (_, cmd) = parse_command("boxes( )").unwrap();
        assert_eq!(cmd.name, "boxes");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_parse_list_and_bool() {
        let (_, cmd) = parse_command(r#"heatmap(columns: ["a", "b",], annotate: false)"#).unwrap();
        assert_eq!(
            cmd.arg("columns"),
            Some(&Value::List(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(cmd.arg("annotate"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_unquoted_column_is_rejected() {
        assert!(parse_command("histogram(x: sepal_length)").is_err());
    }
}
