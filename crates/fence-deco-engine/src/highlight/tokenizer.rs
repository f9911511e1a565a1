use std::sync::LazyLock;

use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// A classified run of code text. Offsets are bytes into the tokenized
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub offset: usize,
    pub length: usize,
    /// Most specific first.
    pub classes: Vec<String>,
}

/// Splits code into classified tokens. Must be deterministic.
pub trait Tokenizer {
    fn tokenize(&self, code: &str, language: Option<&str>, auto_detect: bool) -> Vec<Token>;
}

/// [`Tokenizer`] backed by syntect's bundled grammars.
///
/// Token classes come from the scope stack, innermost scope first: for each
/// scope the first two atoms joined with `-` and then the first atom alone,
/// e.g. `entity.name.function.rust` gives `entity-name`, `entity`. The root
/// `source`/`text` scopes are left out.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntectTokenizer;

impl SyntectTokenizer {
    pub fn new() -> Self {
        Self
    }

    fn syntax_for(code: &str, language: Option<&str>, auto_detect: bool) -> Option<&'static SyntaxReference> {
        let set: &'static SyntaxSet = &SYNTAX_SET;
        if let Some(language) = language.filter(|l| !l.is_empty())
            && let Some(syntax) = set.find_syntax_by_token(language)
        {
            return Some(syntax);
        }
        if auto_detect {
            return code
                .lines()
                .next()
                .and_then(|first| set.find_syntax_by_first_line(first));
        }
        None
    }
}

fn scope_classes(stack: &[Scope]) -> Vec<String> {
    let mut classes = Vec::new();
    for scope in stack.iter().rev() {
        let name = scope.build_string();
        let mut atoms = name.split('.');
        let Some(first) = atoms.next() else {
            continue;
        };
        if first == "source" || first == "text" {
            continue;
        }
        if let Some(second) = atoms.next() {
            let pair = format!("{first}-{second}");
            if !classes.contains(&pair) {
                classes.push(pair);
            }
        }
        if !classes.iter().any(|c| c == first) {
            classes.push(first.to_string());
        }
    }
    classes
}

impl Tokenizer for SyntectTokenizer {
    fn tokenize(&self, code: &str, language: Option<&str>, auto_detect: bool) -> Vec<Token> {
        let Some(syntax) = Self::syntax_for(code, language, auto_detect) else {
            return Vec::new();
        };

        let mut tokens = Vec::new();
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut line_start = 0;

        for line in LinesWithEndings::from(code) {
            let ops = match state.parse_line(line, &SYNTAX_SET) {
                Ok(ops) => ops,
                Err(e) => {
                    log::warn!("Tokenizing {} failed: {e}", syntax.name);
                    return tokens;
                }
            };
            let content_len = line.trim_end_matches(['\n', '\r']).len();
            let mut emit = |from: usize, to: usize, stack: &ScopeStack| {
                let to = to.min(content_len);
                if to <= from {
                    return;
                }
                let classes = scope_classes(stack.as_slice());
                if !classes.is_empty() {
                    tokens.push(Token {
                        offset: line_start + from,
                        length: to - from,
                        classes,
                    });
                }
            };

            let mut pos = 0;
            for (index, op) in ops {
                emit(pos, index, &stack);
                if let Err(e) = stack.apply(&op) {
                    log::warn!("Scope stack error in {}: {e}", syntax.name);
                    return tokens;
                }
                pos = index;
            }
            emit(pos, line.len(), &stack);
            line_start += line.len();
        }

        tokens
    }
}
