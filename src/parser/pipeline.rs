// Pipeline parser for code listings

use super::ast::Pipeline;
use super::command::parse_command;
use super::lexer::ws;
use nom::{
    bytes::complete::tag,
    character::complete::char,
    combinator::{eof, opt},
    multi::separated_list1,
    IResult,
};

/// Parse a complete listing
/// Format: df | command(...) | command(...)
pub fn parse_pipeline(input: &str) -> IResult<&str, Pipeline> {
    // Optional: consume leading "df"
    let (input, _) = opt(ws(tag("df")))(input)?;

    // If input starts with "|", consume it
    let (input, _) = opt(ws(char('|')))(input)?;

    let (input, commands) = separated_list1(ws(char('|')), parse_command)(input)?;

    // Consume trailing whitespace and ensure end of input
    let (input, _) = ws(eof)(input)?;

    Ok((input, Pipeline { commands }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_theme_and_chart() {
        let text = r#"df
  | theme(palette: "deep", context: "notebook", grid: "whitegrid", dark: false, dpi: 300)
  | scatter(x: "x", y: "y", hue: "g", alpha: 0.7, size: 70)
"#;
        let (_, pipeline) = parse_pipeline(text).unwrap();
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(pipeline.commands[0].name, "theme");
        assert_eq!(pipeline.commands[1].name, "scatter");
    }

    #[test]
    fn test_parse_without_df_prefix() {
        let (_, pipeline) = parse_pipeline(r#"histogram(x: "a")"#).unwrap();
        assert_eq!(pipeline.commands.len(), 1);
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        assert!(parse_pipeline(r#"df | histogram(x: "a") extra"#).is_err());
        assert!(parse_pipeline("df |").is_err());
        assert!(parse_pipeline("").is_err());
    }
}
