//! Label text formats and the modal label-edit state machine.
//!
//! ```text
//! Closed --open--> Editing --commit--> Closed (label applied if non-empty and changed)
//!                     |
//!                     +----cancel----> Closed (no-op)
//! ```
//!
//! Transition labels use the notation of their variant:
//!
//! - FSA: `a, b` (lambda shown as `λ`)
//! - PDA: `read, pop/push`, each part `λ` when lambda
//! - TM:  `read/write,D` with `∅` for a blank symbol

use serde::{Deserialize, Serialize};

use crate::{Direction, PdaAttributes, StateId, TmAttributes, Transition, TransitionId, TransitionVariant};

/// Symbol shown for lambda/epsilon.
pub const LAMBDA: &str = "λ";

/// Symbol shown for a blank tape cell.
pub const BLANK: &str = "∅";

/// What a label edit applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "id", rename_all = "lowercase")]
pub enum EditTarget {
    /// A state label.
    State(StateId),
    /// A transition label.
    Transition(TransitionId),
}

/// An open edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// Edited entity.
    pub target: EditTarget,
    /// Label when the edit opened.
    pub original: String,
    /// Current text.
    pub draft: String,
}

/// A committed edit ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedLabel {
    /// Edited entity.
    pub target: EditTarget,
    /// New label text, trimmed.
    pub text: String,
}

/// Modal editor for one label at a time.
#[derive(Debug, Clone, Default)]
pub struct LabelEditor {
    session: Option<EditSession>,
}

impl LabelEditor {
    /// Create a closed editor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an edit. Any edit already open is cancelled.
    pub fn open(&mut self, target: EditTarget, current: impl Into<String>) -> &EditSession {
        let original = current.into();
        self.session.insert(EditSession {
            target,
            draft: original.clone(),
            original,
        })
    }

    /// Replace the draft text. Ignored when closed.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        if let Some(session) = self.session.as_mut() {
            session.draft = text.into();
        }
    }

    /// Close the edit, returning the label to apply.
    ///
    /// Returns `None` when nothing is open, the draft is blank, or it equals
    /// the original label.
    pub fn commit(&mut self) -> Option<CommittedLabel> {
        let session = self.session.take()?;
        let text = session.draft.trim();
        if text.is_empty() || text == session.original.trim() {
            return None;
        }
        Some(CommittedLabel {
            target: session.target,
            text: text.to_string(),
        })
    }

    /// Close the edit without applying it.
    pub fn cancel(&mut self) -> Option<EditSession> {
        self.session.take()
    }

    /// Drop the edit if it targets a removed entity.
    pub fn forget(&mut self, target: &EditTarget) {
        if self.session.as_ref().is_some_and(|s| s.target == *target) {
            self.session = None;
        }
    }

    /// The open edit, if any.
    #[must_use]
    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Whether an edit is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }
}

/// Format a transition label in its variant's notation.
#[must_use]
pub fn format_transition_label(transition: &Transition) -> String {
    match &transition.variant {
        TransitionVariant::Fsa => {
            let mut parts: Vec<&str> = transition.symbols.iter().map(String::as_str).collect();
            if let Some(lambda) = &transition.lambda_symbol {
                parts.push(lambda);
            }
            parts.join(", ")
        }
        TransitionVariant::Pda(attrs) => format_pda_label(attrs),
        TransitionVariant::Tm(attrs) => format_tm_label(attrs),
    }
}

fn format_pda_label(attrs: &PdaAttributes) -> String {
    let part = |lambda: bool, symbol: &str| {
        if lambda {
            LAMBDA.to_string()
        } else {
            symbol.to_string()
        }
    };
    format!(
        "{}, {}/{}",
        part(attrs.is_lambda_input, &attrs.read_symbol),
        part(attrs.is_lambda_pop, &attrs.pop_symbol),
        part(attrs.is_lambda_push, &attrs.push_symbol)
    )
}

fn format_tm_label(attrs: &TmAttributes) -> String {
    let blank = |symbol: &str| {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            BLANK.to_string()
        } else {
            symbol.to_string()
        }
    };
    format!(
        "{}/{},{}",
        blank(&attrs.read_symbol),
        blank(&attrs.write_symbol),
        attrs.direction.as_str()
    )
}

/// Whether a token spells lambda/epsilon.
#[must_use]
pub fn is_lambda_token(token: &str) -> bool {
    let token = token.trim();
    matches!(
        token.to_lowercase().as_str(),
        "λ" | "ε" | "lambda" | "epsilon" | "eps"
    )
}

/// Parse FSA label text into ordered, de-duplicated symbols and an optional
/// lambda marker.
#[must_use]
pub fn parse_symbols(text: &str) -> (Vec<String>, Option<String>) {
    let mut symbols: Vec<String> = Vec::new();
    let mut lambda = None;
    for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if is_lambda_token(token) {
            lambda = Some(LAMBDA.to_string());
        } else if !symbols.iter().any(|s| s == token) {
            symbols.push(token.to_string());
        }
    }
    (symbols, lambda)
}

fn stack_part(text: &str) -> (String, bool) {
    if is_lambda_token(text) {
        (String::new(), true)
    } else {
        (text.trim().to_string(), false)
    }
}

/// Parse `read, pop/push` notation. Missing parts are empty.
#[must_use]
pub fn parse_pda_label(text: &str) -> PdaAttributes {
    let (read, stack) = text.split_once(',').unwrap_or((text, ""));
    let (pop, push) = stack.split_once('/').unwrap_or((stack, ""));
    let (read_symbol, is_lambda_input) = stack_part(read);
    let (pop_symbol, is_lambda_pop) = stack_part(pop);
    let (push_symbol, is_lambda_push) = stack_part(push);
    PdaAttributes {
        read_symbol,
        pop_symbol,
        push_symbol,
        is_lambda_input,
        is_lambda_pop,
        is_lambda_push,
    }
}

/// Parse `read/write,D` notation, keeping the tape number.
#[must_use]
pub fn parse_tm_label(text: &str, tape_number: Option<u32>) -> TmAttributes {
    let (symbols, direction) = text.rsplit_once(',').unwrap_or((text, "R"));
    let (read, write) = symbols.split_once('/').unwrap_or((symbols, ""));
    let unblank = |s: &str| {
        let s = s.trim();
        if s == BLANK {
            String::new()
        } else {
            s.to_string()
        }
    };
    TmAttributes {
        read_symbol: unblank(read),
        write_symbol: unblank(write),
        direction: Direction::parse(direction),
        tape_number,
    }
}

/// Copy of `transition` relabelled from `text` in its own notation.
#[must_use]
pub fn relabel_transition(transition: &Transition, text: &str) -> Transition {
    let mut updated = transition.clone();
    match &transition.variant {
        TransitionVariant::Fsa => {
            let (symbols, lambda) = parse_symbols(text);
            updated.symbols = symbols;
            updated.lambda_symbol = lambda;
        }
        TransitionVariant::Pda(_) => {
            let attrs = parse_pda_label(text);
            updated.symbols = if attrs.is_lambda_input || attrs.read_symbol.is_empty() {
                Vec::new()
            } else {
                vec![attrs.read_symbol.clone()]
            };
            updated.lambda_symbol = attrs.is_lambda_input.then(|| LAMBDA.to_string());
            updated.variant = TransitionVariant::Pda(attrs);
        }
        TransitionVariant::Tm(attrs) => {
            let attrs = parse_tm_label(text, attrs.tape_number);
            updated.symbols = if attrs.read_symbol.is_empty() {
                Vec::new()
            } else {
                vec![attrs.read_symbol.clone()]
            };
            updated.variant = TransitionVariant::Tm(attrs);
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_changed_label() {
        let mut editor = LabelEditor::new();
        editor.open(EditTarget::State("q0".into()), "q0");
        editor.set_draft("  start ");
        let committed = editor.commit().expect("committed");
        assert_eq!(committed.text, "start");
        assert_eq!(committed.target, EditTarget::State("q0".into()));
        assert!(!editor.is_open());
    }

    #[test]
    fn test_commit_unchanged_or_blank_is_noop() {
        let mut editor = LabelEditor::new();
        editor.open(EditTarget::State("q0".into()), "q0");
        assert!(editor.commit().is_none());

        editor.open(EditTarget::State("q0".into()), "q0");
        editor.set_draft("   ");
        assert!(editor.commit().is_none());
        assert!(!editor.is_open());
    }

    #[test]
    fn test_cancel_discards_draft() {
        let mut editor = LabelEditor::new();
        editor.open(EditTarget::Transition("t1".into()), "a");
        editor.set_draft("b");
        assert!(editor.cancel().is_some());
        assert!(editor.commit().is_none());
    }

    #[test]
    fn test_open_replaces_previous_session() {
        let mut editor = LabelEditor::new();
        editor.open(EditTarget::State("q0".into()), "q0");
        editor.open(EditTarget::State("q1".into()), "q1");
        assert_eq!(
            editor.session().map(|s| s.target.clone()),
            Some(EditTarget::State("q1".into()))
        );
    }

    #[test]
    fn test_parse_symbols_handles_lambda_and_duplicates() {
        let (symbols, lambda) = parse_symbols("a, b, a, eps, ,c");
        assert_eq!(symbols, vec!["a", "b", "c"]);
        assert_eq!(lambda.as_deref(), Some(LAMBDA));
    }

    #[test]
    fn test_fsa_label_format() {
        let mut t = Transition::new("t1", "q0", "q1", &["a", "b"]);
        assert_eq!(t.label(), "a, b");
        t.lambda_symbol = Some(LAMBDA.to_string());
        assert_eq!(t.label(), "a, b, λ");
    }

    #[test]
    fn test_pda_label_round_trip() {
        let attrs = parse_pda_label("a, λ/AZ");
        assert_eq!(attrs.read_symbol, "a");
        assert!(attrs.is_lambda_pop);
        assert_eq!(attrs.push_symbol, "AZ");
        assert_eq!(format_pda_label(&attrs), "a, λ/AZ");
    }

    #[test]
    fn test_tm_label_round_trip() {
        let attrs = parse_tm_label("∅/1,l", Some(2));
        assert_eq!(attrs.read_symbol, "");
        assert_eq!(attrs.write_symbol, "1");
        assert_eq!(attrs.direction, Direction::L);
        assert_eq!(attrs.tape_number, Some(2));
        assert_eq!(format_tm_label(&attrs), "∅/1,L");
    }

    #[test]
    fn test_relabel_pda_transition_tracks_input_symbol() {
        let t = Transition::new("t1", "q0", "q1", &[])
            .with_variant(TransitionVariant::Pda(PdaAttributes::default()));
        let updated = relabel_transition(&t, "b, Z/bZ");
        assert_eq!(updated.symbols, vec!["b"]);
        assert_eq!(updated.label(), "b, Z/bZ");
    }
}
