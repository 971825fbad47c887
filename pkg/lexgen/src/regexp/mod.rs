// Regular expressions used to describe lexer tokens.
//
// Supported syntax: literals, '.', bracket classes ('[a-z]', '[^"]'), groups,
// alternation ('|') and the quantifiers '?', '*', '+', '{m}', '{m,}', '{,n}'
// and '{m,n}'. Escapes: '\0 \a \b \f \n \r \t \v', '\xHH', '\uHHHH'; any
// other escaped character stands for itself.

mod node;
mod syntax;

pub use self::node::RegExpNode;
pub use self::syntax::{
    default_line_terminators, parse_with_options, ParseContext, ParseOptions, RegExpParseError,
    MAX_REPETITION,
};
