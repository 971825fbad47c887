// Settings which control how lexer tables are generated.

use crate::charset::CharSet;
use crate::errors::*;
use crate::regexp::{default_line_terminators, parse_with_options, ParseOptions, RegExpNode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerOptions {
    /// Emit one table per connected group of lexer states instead of a single
    /// table serving all of them.
    pub split_tables: bool,

    /// Reject rules which can match the empty string instead of only warning
    /// about them.
    pub empty_match_is_error: bool,

    /// Characters not matched by '.'.
    pub line_terminators: CharSet,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            split_tables: true,
            empty_match_is_error: false,
            line_terminators: default_line_terminators(),
        }
    }
}

impl LexerOptions {
    /// Applies a single textual setting.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "split_tables" => {
                self.split_tables = parse_bool(name, value)?;
            }
            "empty_match_is_error" => {
                self.empty_match_is_error = parse_bool(name, value)?;
            }
            "line_terminators" => {
                self.line_terminators = parse_class(name, value)?;
            }
            _ => {
                return Err(format_err!("Unknown lexer option: {}", name));
            }
        }

        debug!("Set lexer option {} = {}", name, value);
        Ok(())
    }

    /// Options for parsing the rules' regular expressions.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            any_char: self.line_terminators.complement(),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format_err!(
            "Option {} expects true or false but got: {}",
            name,
            value
        )),
    }
}

fn parse_class(name: &str, value: &str) -> Result<CharSet> {
    if !value.starts_with('[') {
        return Err(format_err!(
            "Option {} expects a bracket character class but got: {}",
            name,
            value
        ));
    }

    match parse_with_options(value, &ParseOptions::default())? {
        RegExpNode::Singleton(set) => Ok(set),
        RegExpNode::EmptyLanguage => Ok(CharSet::empty()),
        _ => Err(format_err!(
            "Option {} expects a single character class but got: {}",
            name,
            value
        )),
    }
}
