//! Listing parser
//!
//! A listing is a `df | command(arg: value, ...) | ...` pipeline. The parser
//! only checks syntax; [`crate::resolve`] gives the commands their meaning.

pub mod ast;
pub mod command;
pub mod lexer;
pub mod pipeline;

pub use ast::{Argument, Command, Pipeline, Value};
pub use pipeline::parse_pipeline;

use crate::error::{LabError, LabResult};

/// Parse a complete listing, reporting the offending position on failure
pub fn parse_listing(input: &str) -> LabResult<Pipeline> {
    match parse_pipeline(input) {
        Ok((_, pipeline)) => Ok(pipeline),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = input.len() - e.input.len();
            let (line, column) = line_and_column(input, offset);
            let near: String = e.input.chars().take(20).collect();
            Err(LabError::Parse(format!(
                "unexpected input at line {}, column {}: '{}'",
                line,
                column,
                near.trim_end()
            )))
        }
        Err(nom::Err::Incomplete(_)) => Err(LabError::Parse("unexpected end of listing".to_string())),
    }
}

fn line_and_column(input: &str, offset: usize) -> (usize, usize) {
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse_listing("df\n  | scatter(x: \"a\",, y: \"b\")").unwrap_err();
        match err {
            LabError::Parse(message) => assert!(message.contains("line 2"), "{}", message),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
