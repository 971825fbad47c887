// Compiles a lexer description (a list of lexer states each holding an ordered
// list of token rules) into DFA transition tables.
//
// All rules of all states are compiled into one NFA with a start state per
// lexer state. Rules are numbered globally in declaration order and earlier
// rules take precedence when several accept the same input.

use std::fmt;

use failure::Fail;

use crate::errors::*;
use crate::fsm::{create_dfa, extract_alphabet, split_distinct_graphs, Alphabet};
use crate::fsm::{Dfa, Nfa, NodeData};
use crate::graph::StateId;
use crate::options::LexerOptions;
use crate::regexp::{parse_with_options, RegExpNode, RegExpParseError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerRule {
    /// Regular expression matched by this rule.
    pub pattern: String,

    /// Name of the token produced on a match.
    pub token_type: String,
}

impl LexerRule {
    pub fn new(pattern: &str, token_type: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            token_type: token_type.to_string(),
        }
    }
}

/// A mode of the lexer with its own set of active rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexerState {
    pub label: String,
    pub rules: Vec<LexerRule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LexerSpec {
    pub states: Vec<LexerState>,
}

#[derive(Debug, Fail, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[fail(display = "{}", _0)]
    Parse(#[cause] RegExpParseError),

    #[fail(display = "Rule matches the empty string")]
    MatchesEmptyString,
}

/// Problem with a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDiagnostic {
    pub state_index: usize,

    /// Global index of the rule.
    pub rule_index: usize,

    pub pattern: String,
    pub error: RuleError,
}

impl fmt::Display for RuleDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Rule #{} /{}/ in state #{}: {}",
            self.rule_index, self.pattern, self.state_index, self.error
        )
    }
}

/// Every rule which failed to compile. Rules are checked independently so
/// one bad rule doesn't hide problems in the ones after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerCompileError {
    pub diagnostics: Vec<RuleDiagnostic>,
}

impl fmt::Display for LexerCompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} lexer rule(s) failed to compile", self.diagnostics.len())?;
        for d in self.diagnostics.iter() {
            write!(f, "\n  {}", d)?;
        }

        Ok(())
    }
}

impl Fail for LexerCompileError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleInfo {
    /// Lexer state in which this rule is declared.
    pub state_index: usize,
    pub token_type: String,
    pub pattern: String,
}

/// A DFA along with the character classes its transitions are expressed in.
pub struct LexerTable {
    pub dfa: Dfa,
    pub alphabet: Alphabet,

    /// (lexer state index, DFA start state) for every lexer state served by
    /// this table. Sorted by lexer state index.
    pub entries: Vec<(usize, StateId)>,
}

impl LexerTable {
    fn new(dfa: Dfa) -> Self {
        let alphabet = extract_alphabet(&dfa);
        let mut entries: Vec<(usize, StateId)> = dfa
            .start_states()
            .iter()
            .filter_map(|id| dfa.state(*id).label().start_index.map(|i| (i, *id)))
            .collect();
        entries.sort();

        Self {
            dfa,
            alphabet,
            entries,
        }
    }

    /// Position (row in the transition table) of the start state used by the
    /// given lexer state.
    pub fn entry(&self, state_index: usize) -> Option<usize> {
        self.entries
            .iter()
            .find(|(i, _)| *i == state_index)
            .and_then(|(_, id)| self.dfa.position(*id))
    }

    /// Dense table indexed by [state position][character class] holding the
    /// position of the next state.
    pub fn transition_table(&self) -> Vec<Vec<Option<usize>>> {
        let mut table = vec![vec![None; self.alphabet.len()]; self.dfa.num_states()];
        for t in self.dfa.transitions() {
            let (from, to) = match (self.dfa.position(t.from()), self.dfa.position(t.to())) {
                (Some(from), Some(to)) => (from, to),
                _ => continue,
            };

            for class in self.alphabet.classes_in(t.label()) {
                debug_assert!(table[from][class].is_none());
                table[from][class] = Some(to);
            }
        }

        table
    }

    /// Rule accepted upon ending in the state at the given position.
    pub fn accepting_rule(&self, position: usize) -> Option<usize> {
        self.dfa
            .states()
            .get(position)
            .and_then(|id| self.dfa.state(*id).label().end_index)
    }
}

pub struct CompiledLexer {
    pub tables: Vec<LexerTable>,

    /// Every rule indexed by its global index.
    pub rules: Vec<RuleInfo>,
}

impl CompiledLexer {
    /// Finds the table which serves the given lexer state.
    pub fn table_for_state(&self, state_index: usize) -> Option<&LexerTable> {
        self.tables
            .iter()
            .find(|t| t.entries.iter().any(|(i, _)| *i == state_index))
    }
}

pub fn compile_lexer(spec: &LexerSpec, options: &LexerOptions) -> Result<CompiledLexer> {
    let parse_options = options.parse_options();

    let mut rules = vec![];
    let mut nodes = vec![];
    let mut diagnostics = vec![];

    for (state_index, state) in spec.states.iter().enumerate() {
        if state.rules.is_empty() {
            warn!("Lexer state '{}' has no rules", state.label);
        }

        for rule in state.rules.iter() {
            let rule_index = rules.len();
            rules.push(RuleInfo {
                state_index,
                token_type: rule.token_type.clone(),
                pattern: rule.pattern.clone(),
            });

            let mut diagnose = |error| {
                diagnostics.push(RuleDiagnostic {
                    state_index,
                    rule_index,
                    pattern: rule.pattern.clone(),
                    error,
                })
            };

            let node = match parse_with_options(&rule.pattern, &parse_options) {
                Ok(node) => node,
                Err(e) => {
                    diagnose(RuleError::Parse(e));
                    continue;
                }
            };

            if node.matches_empty_string() {
                if options.empty_match_is_error {
                    diagnose(RuleError::MatchesEmptyString);
                    continue;
                }

                warn!(
                    "Rule '{}' /{}/ in lexer state '{}' matches the empty string",
                    rule.token_type, rule.pattern, state.label
                );
            }

            if let RegExpNode::EmptyLanguage = node {
                warn!(
                    "Rule '{}' /{}/ in lexer state '{}' can never match",
                    rule.token_type, rule.pattern, state.label
                );
            }

            nodes.push((state_index, rule_index, node));
        }
    }

    if !diagnostics.is_empty() {
        return Err(LexerCompileError { diagnostics }.into());
    }

    let mut nfa = Nfa::new();
    {
        let mut builder = nfa.builder();
        let starts: Vec<StateId> = (0..spec.states.len())
            .map(|i| builder.new_state(true, NodeData::start(i)))
            .collect();

        for (state_index, rule_index, node) in nodes.iter() {
            let end = builder.new_state(false, NodeData::end(*rule_index, *rule_index));
            node.generate_nfa(&mut builder, starts[*state_index], end)?;
        }
    }

    debug!(
        "Built NFA with {} states for {} rules",
        nfa.num_states(),
        rules.len()
    );

    let dfa = create_dfa(&nfa);
    let dfas = if options.split_tables {
        split_distinct_graphs(dfa)
    } else {
        vec![dfa]
    };

    let mut tables: Vec<LexerTable> = dfas.into_iter().map(LexerTable::new).collect();

    // Lexer states which can't match anything end up with identical start
    // states which the DFA construction merges. Point them at the survivor.
    for state_index in 0..spec.states.len() {
        let served = tables
            .iter()
            .any(|t| t.entries.iter().any(|(i, _)| *i == state_index));
        if served {
            continue;
        }

        let shared = tables.iter_mut().find_map(|t| {
            let id = t
                .dfa
                .start_states()
                .iter()
                .cloned()
                .find(|id| {
                    t.dfa.outgoing(*id).next().is_none() && !t.dfa.state(*id).label().is_terminal()
                });
            id.map(|id| (t, id))
        });

        match shared {
            Some((table, id)) => {
                trace!("Lexer state {} shares an empty start state", state_index);
                table.entries.push((state_index, id));
                table.entries.sort();
            }
            None => {
                return Err(format_err!(
                    "No DFA start state generated for lexer state {}",
                    state_index
                ));
            }
        }
    }

    debug!("Compiled lexer into {} table(s)", tables.len());

    Ok(CompiledLexer { tables, rules })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::charset::CharSet;

    fn spec(states: &[(&str, &[(&str, &str)])]) -> LexerSpec {
        LexerSpec {
            states: states
                .iter()
                .map(|(label, rules)| LexerState {
                    label: label.to_string(),
                    rules: rules.iter().map(|(p, t)| LexerRule::new(p, t)).collect(),
                })
                .collect(),
        }
    }

    /// Longest match using only the generated tables. Returns the matched
    /// length and rule.
    fn longest_match(lexer: &CompiledLexer, state_index: usize, text: &str) -> Option<(usize, usize)> {
        let table = lexer.table_for_state(state_index)?;
        let transitions = table.transition_table();

        let mut current = table.entry(state_index)?;
        let mut best = table.accepting_rule(current).map(|r| (0, r));
        for (i, c) in text.chars().enumerate() {
            let class = table.alphabet.class_of(c as u32)?;
            current = match transitions[current][class] {
                Some(next) => next,
                None => break,
            };

            if let Some(rule) = table.accepting_rule(current) {
                best = Some((i + 1, rule));
            }
        }

        best
    }

    #[test]
    fn dollar_loop_table() {
        let lexer = compile_lexer(
            &spec(&[("main", &[("(\\$|[bob\\$])*", "WORD")])]),
            &LexerOptions::default(),
        )
        .unwrap();

        assert_eq!(lexer.tables.len(), 1);
        let table = &lexer.tables[0];
        assert_eq!(table.dfa.num_states(), 1);
        assert_eq!(table.alphabet.len(), 2);

        let loop_class = table.alphabet.class_of('b' as u32).unwrap();
        assert_eq!(table.alphabet.classes()[loop_class], CharSet::from_chars(vec!['$', 'b', 'o']));

        let transitions = table.transition_table();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0][loop_class], Some(0));
        assert_eq!(transitions[0][1 - loop_class], None);
        assert_eq!(table.accepting_rule(0), Some(0));
        assert_eq!(table.entry(0), Some(0));

        assert_eq!(longest_match(&lexer, 0, "bo$bx"), Some((4, 0)));
    }

    #[test]
    fn earlier_rules_win() {
        let lexer = compile_lexer(
            &spec(&[(
                "main",
                &[("if", "IF"), ("[a-z]+", "IDENT"), ("[0-9]+", "NUMBER"), (" +", "SPACE")],
            )]),
            &LexerOptions::default(),
        )
        .unwrap();

        assert_eq!(lexer.rules.len(), 4);
        assert_eq!(lexer.rules[1].token_type, "IDENT");

        assert_eq!(longest_match(&lexer, 0, "if x"), Some((2, 0)));
        assert_eq!(longest_match(&lexer, 0, "iffy"), Some((4, 1)));
        assert_eq!(longest_match(&lexer, 0, "42;"), Some((2, 2)));
        assert_eq!(longest_match(&lexer, 0, ";"), None);
    }

    #[test]
    fn every_bad_rule_is_reported() {
        let result = compile_lexer(
            &spec(&[
                ("main", &[("a(b", "A"), ("ok", "OK"), ("[z-a]", "B")]),
                ("string", &[("x{3,1}", "C"), ("\"", "QUOTE"), ("y{0,1000000000}", "D")]),
            ]),
            &LexerOptions::default(),
        );

        let err = match result {
            Ok(_) => panic!("Expected an error"),
            Err(e) => e,
        };
        let err = err.downcast::<LexerCompileError>().unwrap();

        let found: Vec<(usize, usize)> = err
            .diagnostics
            .iter()
            .map(|d| (d.state_index, d.rule_index))
            .collect();
        assert_eq!(found, vec![(0, 0), (0, 2), (1, 3), (1, 5)]);

        match &err.diagnostics[1].error {
            RuleError::Parse(RegExpParseError::InvertedRange { .. }) => {}
            e => panic!("Unexpected error: {:?}", e),
        }
        match &err.diagnostics[2].error {
            RuleError::Parse(RegExpParseError::InvalidRepetition { min: 3, max: 1, .. }) => {}
            e => panic!("Unexpected error: {:?}", e),
        }
        match &err.diagnostics[3].error {
            RuleError::Parse(RegExpParseError::RepetitionTooLarge { position: 4, .. }) => {}
            e => panic!("Unexpected error: {:?}", e),
        }

        assert!(err.to_string().contains("a(b"));
    }

    #[test]
    fn empty_matches_can_be_rejected() {
        let rules = spec(&[("main", &[("a*", "A"), ("b", "B")])]);

        assert!(compile_lexer(&rules, &LexerOptions::default()).is_ok());

        let mut options = LexerOptions::default();
        options.set("empty_match_is_error", "true").unwrap();
        let err = compile_lexer(&rules, &options)
            .err()
            .unwrap()
            .downcast::<LexerCompileError>()
            .unwrap();
        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].rule_index, 0);
        assert_eq!(err.diagnostics[0].error, RuleError::MatchesEmptyString);
    }

    #[test]
    fn independent_states_get_separate_tables() {
        let rules = spec(&[
            ("main", &[("[a-z]+", "IDENT"), ("\"", "QUOTE")]),
            ("string", &[("[^\"]+", "TEXT"), ("\"", "QUOTE")]),
        ]);

        let lexer = compile_lexer(&rules, &LexerOptions::default()).unwrap();
        assert_eq!(lexer.tables.len(), 2);
        assert_eq!(lexer.tables[0].entries.len(), 1);
        assert_eq!(lexer.tables[0].entries[0].0, 0);
        assert_eq!(lexer.tables[1].entries[0].0, 1);
        assert_eq!(longest_match(&lexer, 0, "abc\""), Some((3, 0)));
        assert_eq!(longest_match(&lexer, 1, "a b\""), Some((3, 2)));
        assert_eq!(longest_match(&lexer, 1, "\""), Some((1, 3)));

        let mut options = LexerOptions::default();
        options.set("split_tables", "false").unwrap();
        let lexer = compile_lexer(&rules, &options).unwrap();
        assert_eq!(lexer.tables.len(), 1);
        assert_eq!(lexer.tables[0].entries.len(), 2);
        assert_eq!(longest_match(&lexer, 1, "a b\""), Some((3, 2)));
    }

    #[test]
    fn line_terminators_control_dot() {
        let rules = spec(&[("main", &[(".+", "LINE")])]);

        let lexer = compile_lexer(&rules, &LexerOptions::default()).unwrap();
        assert_eq!(longest_match(&lexer, 0, "ab;c\nd"), Some((4, 0)));

        let mut options = LexerOptions::default();
        options.set("line_terminators", "[;]").unwrap();
        let lexer = compile_lexer(&rules, &options).unwrap();
        assert_eq!(longest_match(&lexer, 0, "ab;c\nd"), Some((2, 0)));
    }

    #[test]
    fn states_without_rules_are_still_served() {
        let lexer = compile_lexer(
            &spec(&[("a", &[]), ("b", &[("x", "X")]), ("c", &[])]),
            &LexerOptions::default(),
        )
        .unwrap();

        for i in 0..3 {
            let table = lexer.table_for_state(i).unwrap();
            assert!(table.entry(i).is_some());
        }

        assert_eq!(longest_match(&lexer, 0, "x"), None);
        assert_eq!(longest_match(&lexer, 1, "x"), Some((1, 0)));
        assert_eq!(longest_match(&lexer, 2, "x"), None);
        assert_eq!(
            lexer.table_for_state(0).unwrap().entry(0),
            lexer.table_for_state(2).unwrap().entry(2)
        );
    }
}
