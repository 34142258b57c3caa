//! Conditional-inclusion groups (`#if` ... `#endif`)
//!
//! Macros are never expanded, so most `#if` conditions cannot be decided
//! and their groups stay live. Two kinds of group are decided because they
//! routinely hold text that is not C at all:
//!
//! - groups whose condition is a constant, `#if 0` being the usual case
//! - groups keyed on `__cplusplus`, which is never defined for C sources
//!
//! Conditions combine these with `!`, `&&`, `||` and parentheses. Anything
//! else (other macros, comparisons, arithmetic) makes the whole condition
//! unknown. Branches are tracked the way the preprocessor does: once a
//! branch is known to be taken, every later `#elif`/`#else` branch is dead.

/// Three-valued truth of a directive condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Condition {
    True,
    False,
    Unknown,
}

impl Condition {
    fn from_bool(value: bool) -> Self {
        if value {
            Condition::True
        } else {
            Condition::False
        }
    }

    fn not(self) -> Self {
        match self {
            Condition::True => Condition::False,
            Condition::False => Condition::True,
            Condition::Unknown => Condition::Unknown,
        }
    }

    fn and(self, other: Self) -> Self {
        match (self, other) {
            (Condition::False, _) | (_, Condition::False) => Condition::False,
            (Condition::True, Condition::True) => Condition::True,
            _ => Condition::Unknown,
        }
    }

    fn or(self, other: Self) -> Self {
        match (self, other) {
            (Condition::True, _) | (_, Condition::True) => Condition::True,
            (Condition::False, Condition::False) => Condition::False,
            _ => Condition::Unknown,
        }
    }
}

/// The conditional-inclusion directives; every other directive is `Other`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    If(Condition),
    Elif(Condition),
    Else,
    Endif,
    Other,
}

impl Directive {
    /// Classify the text of a directive line with the leading `#` removed,
    /// continuations joined and comments blanked
    pub(crate) fn parse(text: &str) -> Self {
        let text = text.trim_start();
        let name_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        let (name, rest) = text.split_at(name_len);

        match name {
            "if" => Directive::If(evaluate(rest)),
            "ifdef" => Directive::If(is_defined(rest.trim())),
            "ifndef" => Directive::If(is_defined(rest.trim()).not()),
            "elif" => Directive::Elif(evaluate(rest)),
            "elifdef" => Directive::Elif(is_defined(rest.trim())),
            "elifndef" => Directive::Elif(is_defined(rest.trim()).not()),
            "else" => Directive::Else,
            "endif" => Directive::Endif,
            _ => Directive::Other,
        }
    }
}

/// Whether `name` is a defined macro, as far as can be known
fn is_defined(name: &str) -> Condition {
    if name == "__cplusplus" {
        Condition::False
    } else {
        Condition::Unknown
    }
}

#[derive(Debug)]
struct Group {
    /// Every enclosing group is live
    parent_live: bool,
    /// The current branch is live
    branch_live: bool,
    /// An earlier or the current branch is known to be taken
    resolved: bool,
    seen_else: bool,
}

/// Stack of open conditional groups
#[derive(Debug, Default)]
pub(crate) struct ConditionalStack {
    groups: Vec<Group>,
}

impl ConditionalStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether text at this point belongs to the translation unit
    pub(crate) fn is_live(&self) -> bool {
        self.groups
            .last()
            .map_or(true, |group| group.parent_live && group.branch_live)
    }

    /// Apply one directive, returning a message for misplaced ones
    pub(crate) fn apply(&mut self, directive: Directive) -> Result<(), &'static str> {
        match directive {
            Directive::If(condition) => {
                let parent_live = self.is_live();
                self.groups.push(Group {
                    parent_live,
                    branch_live: condition != Condition::False,
                    resolved: condition == Condition::True,
                    seen_else: false,
                });
            }
            Directive::Elif(condition) => {
                let group = self.groups.last_mut().ok_or("#elif without #if")?;
                if group.seen_else {
                    return Err("#elif after #else");
                }
                group.branch_live = !group.resolved && condition != Condition::False;
                group.resolved |= condition == Condition::True;
            }
            Directive::Else => {
                let group = self.groups.last_mut().ok_or("#else without #if")?;
                if group.seen_else {
                    return Err("#else after #else");
                }
                group.branch_live = !group.resolved;
                group.resolved = true;
                group.seen_else = true;
            }
            Directive::Endif => {
                self.groups.pop().ok_or("#endif without #if")?;
            }
            Directive::Other => {}
        }
        Ok(())
    }
}

// ===== Condition evaluation =====

#[derive(Debug, Clone, PartialEq)]
enum CondToken<'t> {
    Number(&'t str),
    Ident(&'t str),
    LParen,
    RParen,
    Not,
    AndAnd,
    OrOr,
    /// Any operator the evaluator does not model
    Other,
}

fn cond_tokens(text: &str) -> Vec<CondToken<'_>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let ch = bytes[i];
        if ch.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        if ch.is_ascii_alphanumeric() || ch == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &text[start..i];
            tokens.push(if ch.is_ascii_digit() {
                CondToken::Number(word)
            } else {
                CondToken::Ident(word)
            });
            continue;
        }

        let pair = bytes.get(i + 1).copied();
        let (token, len) = match (ch, pair) {
            (b'&', Some(b'&')) => (CondToken::AndAnd, 2),
            (b'|', Some(b'|')) => (CondToken::OrOr, 2),
            (b'!', Some(b'=')) => (CondToken::Other, 2),
            (b'!', _) => (CondToken::Not, 1),
            (b'(', _) => (CondToken::LParen, 1),
            (b')', _) => (CondToken::RParen, 1),
            _ => (CondToken::Other, 1),
        };
        tokens.push(token);
        i += len;
    }

    tokens
}

/// Deepest parenthesis nesting evaluated before giving up
const MAX_CONDITION_DEPTH: usize = 32;

/// Evaluate the condition of `#if`/`#elif`
fn evaluate(text: &str) -> Condition {
    let tokens = cond_tokens(text);
    let mut evaluator = Evaluator {
        tokens: &tokens,
        position: 0,
    };
    match evaluator.or_expr(0) {
        Some(condition) if evaluator.position == tokens.len() => condition,
        _ => Condition::Unknown,
    }
}

/// Recursive descent over condition tokens; `None` means the condition
/// uses something outside the modelled subset
struct Evaluator<'a, 't> {
    tokens: &'a [CondToken<'t>],
    position: usize,
}

impl<'a, 't> Evaluator<'a, 't> {
    fn peek(&self) -> Option<&'a CondToken<'t>> {
        self.tokens.get(self.position)
    }

    fn eat(&mut self, token: &CondToken<'t>) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self, depth: usize) -> Option<Condition> {
        let mut value = self.and_expr(depth)?;
        while self.eat(&CondToken::OrOr) {
            value = value.or(self.and_expr(depth)?);
        }
        Some(value)
    }

    fn and_expr(&mut self, depth: usize) -> Option<Condition> {
        let mut value = self.unary(depth)?;
        while self.eat(&CondToken::AndAnd) {
            value = value.and(self.unary(depth)?);
        }
        Some(value)
    }

    fn unary(&mut self, depth: usize) -> Option<Condition> {
        let mut negations = 0;
        while self.eat(&CondToken::Not) {
            negations += 1;
        }
        let value = self.primary(depth)?;
        Some(if negations % 2 == 1 { value.not() } else { value })
    }

    fn primary(&mut self, depth: usize) -> Option<Condition> {
        let token = self.peek()?.clone();
        self.position += 1;

        match token {
            CondToken::Number(digits) => integer_value(digits).map(|n| Condition::from_bool(n != 0)),
            CondToken::Ident("defined") => {
                let parenthesized = self.eat(&CondToken::LParen);
                let CondToken::Ident(name) = self.peek()?.clone() else {
                    return None;
                };
                self.position += 1;
                if parenthesized && !self.eat(&CondToken::RParen) {
                    return None;
                }
                Some(is_defined(name))
            }
            // An undefined macro evaluates to 0
            CondToken::Ident("__cplusplus") => Some(Condition::False),
            CondToken::Ident(_) => Some(Condition::Unknown),
            CondToken::LParen if depth < MAX_CONDITION_DEPTH => {
                let value = self.or_expr(depth + 1)?;
                self.eat(&CondToken::RParen).then_some(value)
            }
            _ => None,
        }
    }
}

/// Value of an integer literal with optional `u`/`l` suffixes
fn integer_value(literal: &str) -> Option<u64> {
    let digits = literal.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(directive: &str) -> Condition {
        match Directive::parse(directive) {
            Directive::If(condition) | Directive::Elif(condition) => condition,
            other => panic!("Expected a conditional directive, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_conditions() {
        assert_eq!(condition("if 0"), Condition::False);
        assert_eq!(condition("if 1"), Condition::True);
        assert_eq!(condition("if (0)"), Condition::False);
        assert_eq!(condition("if 0x10UL"), Condition::True);
        assert_eq!(condition("elif !1"), Condition::False);
    }

    #[test]
    fn test_cplusplus_conditions() {
        assert_eq!(condition("ifdef __cplusplus"), Condition::False);
        assert_eq!(condition("ifndef __cplusplus"), Condition::True);
        assert_eq!(condition("if defined(__cplusplus)"), Condition::False);
        assert_eq!(condition("if defined __cplusplus && FOO"), Condition::False);
        assert_eq!(condition("if !defined(__cplusplus) || FOO"), Condition::True);
        assert_eq!(condition("if __cplusplus"), Condition::False);
    }

    #[test]
    fn test_unknown_conditions() {
        assert_eq!(condition("ifdef DEBUG"), Condition::Unknown);
        assert_eq!(condition("if FOO > 2"), Condition::Unknown);
        assert_eq!(condition("if defined(FOO) || 0"), Condition::Unknown);
        assert_eq!(condition("if __STDC_VERSION__ >= 201112L"), Condition::Unknown);
        assert_eq!(condition("if (1"), Condition::Unknown);
        assert_eq!(condition("if 1 != 2"), Condition::Unknown);
    }

    #[test]
    fn test_other_directives() {
        assert_eq!(Directive::parse(" include <stdio.h>"), Directive::Other);
        assert_eq!(Directive::parse("define X 1"), Directive::Other);
        assert_eq!(Directive::parse("  else  "), Directive::Else);
        assert_eq!(Directive::parse("endif // done"), Directive::Endif);
    }

    #[test]
    fn test_else_follows_taken_branch() {
        let mut stack = ConditionalStack::new();

        stack.apply(Directive::If(Condition::False)).unwrap();
        assert!(!stack.is_live());
        stack.apply(Directive::Elif(Condition::True)).unwrap();
        assert!(stack.is_live());
        stack.apply(Directive::Elif(Condition::True)).unwrap();
        assert!(!stack.is_live());
        stack.apply(Directive::Else).unwrap();
        assert!(!stack.is_live());
        stack.apply(Directive::Endif).unwrap();
        assert!(stack.is_live());
    }

    #[test]
    fn test_unknown_branches_stay_live() {
        let mut stack = ConditionalStack::new();

        stack.apply(Directive::If(Condition::Unknown)).unwrap();
        assert!(stack.is_live());
        stack.apply(Directive::Else).unwrap();
        assert!(stack.is_live());
    }

    #[test]
    fn test_nested_groups_inherit_dead_parent() {
        let mut stack = ConditionalStack::new();

        stack.apply(Directive::If(Condition::False)).unwrap();
        stack.apply(Directive::If(Condition::True)).unwrap();
        assert!(!stack.is_live());
        stack.apply(Directive::Else).unwrap();
        assert!(!stack.is_live());
        stack.apply(Directive::Endif).unwrap();
        stack.apply(Directive::Else).unwrap();
        assert!(stack.is_live());
    }

    #[test]
    fn test_misplaced_directives() {
        let mut stack = ConditionalStack::new();
        assert_eq!(stack.apply(Directive::Endif), Err("#endif without #if"));
        assert_eq!(stack.apply(Directive::Else), Err("#else without #if"));

        stack.apply(Directive::If(Condition::Unknown)).unwrap();
        stack.apply(Directive::Else).unwrap();
        assert_eq!(stack.apply(Directive::Elif(Condition::True)), Err("#elif after #else"));
        assert_eq!(stack.apply(Directive::Else), Err("#else after #else"));
    }
}
