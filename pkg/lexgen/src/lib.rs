// Core of the lexer generator: compiles lexer rules written as regular
// expressions into deterministic automata and character class tables.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub mod algorithms;
pub mod charset;
pub mod errors;
pub mod fsm;
pub mod graph;
pub mod lexer;
pub mod options;
pub mod regexp;

pub use charset::{CharRange, CharSet};
pub use fsm::{Dfa, Nfa, NodeData};
pub use graph::{Graph, GraphBuilder, StateId, TransitionId};
pub use lexer::{compile_lexer, CompiledLexer, LexerRule, LexerSpec, LexerState};
pub use options::LexerOptions;
pub use regexp::RegExpNode;
