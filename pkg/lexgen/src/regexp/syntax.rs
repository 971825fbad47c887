// Recursive descent parser for the regular expressions used in lexer rules.
/*
    General grammar is:
        Regexp -> Alternation
        Alternation -> Sequence ('|' Sequence)*
        Sequence -> Quantified*
        Quantified -> Atom Quantifier*
        Quantifier -> '?' | '*' | '+' | '{' Number? (',' Number?)? '}'
        Atom -> '(' Alternation ')' | CharacterClass | '.' | Escape | Literal
        CharacterClass -> '[' '^'? ']'? ClassItem* ']'
        ClassItem -> ClassChar ('-' ClassChar)?
*/

use failure::Fail;

use crate::charset::{CharRange, CharSet};
use crate::regexp::node::RegExpNode;

/// Reasons for which an expression can fail to parse.
#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum RegExpParseError {
    #[fail(display = "Unexpected end of expression, expected {}", expected)]
    UnexpectedEnd { expected: String },

    #[fail(
        display = "Unexpected character '{}' at position {}, expected {}",
        found, position, expected
    )]
    UnexpectedCharacter {
        position: usize,
        found: char,
        expected: String,
    },

    #[fail(
        display = "Character range at position {} is backwards: U+{:04X} comes after U+{:04X}",
        position, from, to
    )]
    InvertedRange { position: usize, from: u32, to: u32 },

    #[fail(
        display = "Repetition at position {} has a minimum of {} above its maximum of {}",
        position, min, max
    )]
    InvalidRepetition {
        position: usize,
        min: usize,
        max: usize,
    },

    #[fail(
        display = "Repetition count at position {} is larger than {}",
        position, limit
    )]
    RepetitionTooLarge { position: usize, limit: usize },
}

impl RegExpParseError {
    /// Character offset in the expression at which the error was detected.
    /// None if the end of the expression was reached.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::UnexpectedEnd { .. } => None,
            Self::UnexpectedCharacter { position, .. }
            | Self::InvertedRange { position, .. }
            | Self::InvalidRepetition { position, .. }
            | Self::RepetitionTooLarge { position, .. } => Some(*position),
        }
    }
}

/// Largest count accepted in a '{m,n}' repetition. Repetitions are expanded
/// into copies of the repeated expression.
pub const MAX_REPETITION: usize = 1000;

/// Characters which end a line. By default '.' matches anything but these.
pub fn default_line_terminators() -> CharSet {
    CharSet::from_chars(vec!['\n', '\r', '\u{85}', '\u{2028}', '\u{2029}'])
}

#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Set of characters matched by '.'.
    pub any_char: CharSet,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            any_char: default_line_terminators().complement(),
        }
    }
}

/// Cursor over the characters of an expression.
pub struct ParseContext {
    chars: Vec<char>,
    position: usize,
}

impl ParseContext {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    pub fn current(&self) -> Option<char> {
        self.chars.get(self.position).cloned()
    }

    /// Looks at the character 'offset' positions after the current one.
    pub fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).cloned()
    }

    pub fn advance(&mut self) {
        if !self.is_end() {
            self.position += 1;
        }
    }
}

pub fn parse_with_options(
    text: &str,
    options: &ParseOptions,
) -> Result<RegExpNode, RegExpParseError> {
    let mut parser = Parser {
        context: ParseContext::new(text),
        options,
    };

    let node = parser.alternation()?;

    // The only way to stop early is on an unbalanced ')'.
    if !parser.context.is_end() {
        return Err(parser.unexpected("the end of the expression"));
    }

    Ok(node)
}

struct Parser<'a> {
    context: ParseContext,
    options: &'a ParseOptions,
}

impl<'a> Parser<'a> {
    /// Error for when the current character (or the end) isn't what was
    /// expected.
    fn unexpected(&self, expected: &str) -> RegExpParseError {
        match self.context.current() {
            Some(found) => RegExpParseError::UnexpectedCharacter {
                position: self.context.position(),
                found,
                expected: expected.to_string(),
            },
            None => RegExpParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn expect(&mut self, c: char, expected: &str) -> Result<(), RegExpParseError> {
        if self.context.current() != Some(c) {
            return Err(self.unexpected(expected));
        }

        self.context.advance();
        Ok(())
    }

    /// Consumes the current character. Errors out at the end of input.
    fn next_char(&mut self, expected: &str) -> Result<char, RegExpParseError> {
        let c = self
            .context
            .current()
            .ok_or_else(|| self.unexpected(expected))?;
        self.context.advance();
        Ok(c)
    }

    fn alternation(&mut self) -> Result<RegExpNode, RegExpParseError> {
        let mut branches = vec![self.sequence()?];
        while self.context.current() == Some('|') {
            self.context.advance();
            branches.push(self.sequence()?);
        }

        Ok(RegExpNode::union(branches))
    }

    fn sequence(&mut self) -> Result<RegExpNode, RegExpParseError> {
        let mut items = vec![];
        loop {
            match self.context.current() {
                None | Some('|') | Some(')') => break,
                _ => items.push(self.quantified()?),
            }
        }

        Ok(RegExpNode::concatenation(items))
    }

    fn quantified(&mut self) -> Result<RegExpNode, RegExpParseError> {
        let mut node = self.atom()?;
        loop {
            node = match self.context.current() {
                Some('?') => {
                    self.context.advance();
                    RegExpNode::optional(node)
                }
                Some('*') => {
                    self.context.advance();
                    RegExpNode::kleene_star(node)
                }
                Some('+') => {
                    self.context.advance();
                    RegExpNode::repetition(node, 1, None)
                }
                Some('{') => {
                    let (min, max) = self.repetition_bounds()?;
                    RegExpNode::repetition(node, min, max)
                }
                _ => return Ok(node),
            };
        }
    }

    fn atom(&mut self) -> Result<RegExpNode, RegExpParseError> {
        match self.context.current() {
            Some('(') => {
                self.context.advance();
                let inner = self.alternation()?;
                self.expect(')', "')' to close the group")?;
                Ok(inner)
            }
            Some('[') => self.character_class(),
            Some('.') => {
                self.context.advance();
                Ok(RegExpNode::singleton(self.options.any_char.clone()))
            }
            Some('\\') => {
                self.context.advance();
                let c = self.escape()?;
                Ok(RegExpNode::singleton(CharSet::single(c)))
            }
            Some('?') | Some('*') | Some('+') | Some('{') => {
                Err(self.unexpected("an expression before the quantifier"))
            }
            Some(c) => {
                self.context.advance();
                Ok(RegExpNode::singleton(CharSet::from_char(c)))
            }
            None => Err(self.unexpected("an expression")),
        }
    }

    /// Parses '{m}', '{m,}', '{,n}', '{m,n}' or '{,}'.
    fn repetition_bounds(&mut self) -> Result<(usize, Option<usize>), RegExpParseError> {
        let start = self.context.position();
        self.expect('{', "'{'")?;

        let min = self.number()?;
        let (min, max) = if self.context.current() == Some(',') {
            self.context.advance();
            (min.unwrap_or(0), self.number()?)
        } else {
            match min {
                Some(n) => (n, Some(n)),
                None => return Err(self.unexpected("a number or ','")),
            }
        };

        self.expect('}', "'}' to close the repetition")?;

        if let Some(max) = max {
            if min > max {
                return Err(RegExpParseError::InvalidRepetition {
                    position: start,
                    min,
                    max,
                });
            }
        }

        Ok((min, max))
    }

    /// Parses a decimal number if one is present.
    fn number(&mut self) -> Result<Option<usize>, RegExpParseError> {
        let start = self.context.position();
        let mut value: Option<usize> = None;
        while let Some(d) = self.context.current().and_then(|c| c.to_digit(10)) {
            let next = value.unwrap_or(0) * 10 + (d as usize);
            if next > MAX_REPETITION {
                return Err(RegExpParseError::RepetitionTooLarge {
                    position: start,
                    limit: MAX_REPETITION,
                });
            }

            value = Some(next);
            self.context.advance();
        }

        Ok(value)
    }

    fn character_class(&mut self) -> Result<RegExpNode, RegExpParseError> {
        self.expect('[', "'['")?;

        let inverted = self.context.current() == Some('^');
        if inverted {
            self.context.advance();
        }

        let mut ranges = vec![];
        let mut first = true;
        loop {
            match self.context.current() {
                None => return Err(self.unexpected("']' to close the character class")),
                // A ']' right after the opening bracket is a literal.
                Some(']') if !first => {
                    self.context.advance();
                    break;
                }
                _ => {}
            }
            first = false;

            let start = self.context.position();
            let from = self.class_char()?;

            // A '-' right before the closing bracket is a literal.
            if self.context.current() == Some('-') && self.context.peek(1) != Some(']') {
                self.context.advance();
                let to = self.class_char()?;
                if from > to {
                    return Err(RegExpParseError::InvertedRange {
                        position: start,
                        from,
                        to,
                    });
                }

                ranges.push(CharRange::new(from, to));
            } else {
                ranges.push(CharRange::single(from));
            }
        }

        let set = if inverted {
            CharSet::new_inverted(ranges)
        } else {
            CharSet::new(ranges)
        };

        Ok(RegExpNode::singleton(set))
    }

    fn class_char(&mut self) -> Result<u32, RegExpParseError> {
        let c = self.next_char("']' to close the character class")?;
        if c == '\\' {
            self.escape()
        } else {
            Ok(c as u32)
        }
    }

    /// Parses the remainder of an escape sequence after the '\'.
    fn escape(&mut self) -> Result<u32, RegExpParseError> {
        let c = self.next_char("an escaped character")?;
        Ok(match c {
            '0' => 0,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0C,
            'n' => 0x0A,
            'r' => 0x0D,
            't' => 0x09,
            'v' => 0x0B,
            'x' => self.hex(2)?,
            'u' => self.hex(4)?,
            other => other as u32,
        })
    }

    fn hex(&mut self, num_digits: usize) -> Result<u32, RegExpParseError> {
        let mut value = 0;
        for _ in 0..num_digits {
            let digit = match self.context.current().and_then(|c| c.to_digit(16)) {
                Some(d) => d,
                None => return Err(self.unexpected("a hexadecimal digit")),
            };

            value = value * 16 + digit;
            self.context.advance();
        }

        Ok(value)
    }
}
