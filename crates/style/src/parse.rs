//! Stylesheet text parser, grounded directly on
//! `original_source/css.py`'s `CSSParser`: a hand-rolled recursive
//! descent parser (no selector combinators beyond tag/descendant/
//! pseudoclass, no shorthand expansion) that recovers from a malformed
//! rule by skipping to the next `}` rather than aborting the whole
//! sheet.

use crate::selector::{MediaQuery, Rule, Selector};
use std::collections::HashMap;

pub struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self { chars: source.chars().collect(), pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn literal(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// A run of "word" characters, matching the teacher's permissive
    /// `isalnum() or in ",/#-.%()\"'"` character class plus quoted colons.
    fn word(&mut self) -> Option<String> {
        let start = self.pos;
        let mut in_quote = false;
        while let Some(cur) = self.peek() {
            if cur == '\'' {
                in_quote = !in_quote;
            }
            let allowed = cur.is_alphanumeric() || ",/#-.%()\"'".contains(cur) || (in_quote && cur == ':');
            if allowed {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos > start {
            Some(self.chars[start..self.pos].iter().collect())
        } else {
            None
        }
    }

    fn ignore_until(&mut self, chars: &[char]) -> Option<char> {
        while let Some(cur) = self.peek() {
            if chars.contains(&cur) {
                return Some(cur);
            }
            self.pos += 1;
        }
        None
    }

    fn until_chars(&mut self, chars: &[char]) -> String {
        let start = self.pos;
        while let Some(cur) = self.peek() {
            if chars.contains(&cur) {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn pair(&mut self, until: &[char]) -> Option<(String, String)> {
        let prop = self.word()?;
        self.whitespace();
        if !self.literal(':') {
            return None;
        }
        self.whitespace();
        let val = self.until_chars(until);
        Some((prop.to_lowercase(), val.trim().to_owned()))
    }

    /// A `{ ... }` declaration block, already positioned just past the
    /// opening brace.
    pub fn body(&mut self) -> HashMap<String, String> {
        let mut pairs = HashMap::new();
        while self.peek().is_some() && self.peek() != Some('}') {
            match self.pair(&[';', '}']) {
                Some((prop, val)) => {
                    pairs.insert(prop, val);
                    self.whitespace();
                    self.literal(';');
                    self.whitespace();
                }
                None => match self.ignore_until(&[';', '}']) {
                    Some(';') => {
                        self.literal(';');
                        self.whitespace();
                    }
                    _ => break,
                },
            }
        }
        pairs
    }

    fn simple_selector(&mut self) -> Option<Selector> {
        let tag = self.word()?.to_lowercase();
        let mut out = Selector::tag(tag);
        if self.peek() == Some(':') {
            self.literal(':');
            let pseudoclass = self.word()?.to_lowercase();
            out = Selector::pseudoclass(pseudoclass, out);
        }
        Some(out)
    }

    fn selector(&mut self) -> Option<Selector> {
        let mut out = self.simple_selector()?;
        self.whitespace();
        while self.peek().is_some() && self.peek() != Some('{') {
            let descendant = self.simple_selector()?;
            out = Selector::descendant(out, descendant);
            self.whitespace();
        }
        Some(out)
    }

    fn media_query(&mut self) -> Option<(String, String)> {
        self.literal('@');
        if self.word()?.to_lowercase() != "media" {
            return None;
        }
        self.whitespace();
        if !self.literal('(') {
            return None;
        }
        self.whitespace();
        let pair = self.pair(&[')'])?;
        self.whitespace();
        self.literal(')');
        Some(pair)
    }

    /// Parses the whole sheet, matching `CSSParser.parse`'s
    /// error-tolerant per-rule recovery.
    pub fn parse(&mut self) -> Vec<Rule> {
        let mut rules = Vec::new();
        let mut media: Option<MediaQuery> = None;
        self.whitespace();
        while self.peek().is_some() {
            let before = self.pos;
            let progressed = if self.peek() == Some('@') && media.is_none() {
                self.parse_media_open(&mut media)
            } else if self.peek() == Some('}') && media.is_some() {
                self.literal('}');
                media = None;
                self.whitespace();
                true
            } else {
                self.parse_rule(media, &mut rules)
            };
            if !progressed && self.pos == before {
                // Recovery failed to consume anything; skip to the next
                // rule boundary so a single malformed byte can't loop
                // forever.
                match self.ignore_until(&['}']) {
                    Some('}') => {
                        self.literal('}');
                        self.whitespace();
                    }
                    _ => break,
                }
            }
        }
        rules
    }

    fn parse_media_open(&mut self, media: &mut Option<MediaQuery>) -> bool {
        let Some((prop, val)) = self.media_query() else {
            return false;
        };
        if prop == "prefers-color-scheme" {
            *media = match val.as_str() {
                "dark" => Some(MediaQuery::PrefersDark),
                "light" => Some(MediaQuery::PrefersLight),
                _ => None,
            };
        }
        self.whitespace();
        self.literal('{');
        self.whitespace();
        true
    }

    fn parse_rule(&mut self, media: Option<MediaQuery>, rules: &mut Vec<Rule>) -> bool {
        let Some(selector) = self.selector() else {
            return false;
        };
        if !self.literal('{') {
            return false;
        }
        self.whitespace();
        let body = self.body();
        if !self.literal('}') {
            return false;
        }
        self.whitespace();
        rules.push(Rule { media, selector, body });
        true
    }
}

/// Parses a full stylesheet (spec.md §4.2 "style rules parsed from CSS
/// text"). Malformed rules are skipped rather than aborting the sheet,
/// matching the teacher's error-tolerant cascade.
#[must_use]
pub fn parse(source: &str) -> Vec<Rule> {
    Parser::new(source).parse()
}

/// Parses a single inline `style="..."` attribute body (no selector, no
/// braces), per `original_source/css.py`'s `style()` function reusing
/// `CSSParser(...).body()` for inline declarations.
#[must_use]
pub fn parse_inline(source: &str) -> HashMap<String, String> {
    Parser::new(source).body()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_tag_rule() {
        let rules = parse("p { color: red; font-size: 16px; }");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].body.get("color"), Some(&"red".to_owned()));
        assert_eq!(rules[0].body.get("font-size"), Some(&"16px".to_owned()));
    }

    #[test]
    fn parses_descendant_and_pseudoclass_selectors() {
        let rules = parse("div p:focus { color: blue; }");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selector.priority(), 2);
    }

    #[test]
    fn media_query_gates_rules_inside_the_block() {
        let rules = parse("@media (prefers-color-scheme: dark) { body { color: white; } }");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].media, Some(MediaQuery::PrefersDark));
    }

    #[test]
    fn malformed_rule_is_skipped_without_losing_later_rules() {
        let rules = parse("bad{{{ p { color: green; } }");
        assert!(rules.iter().any(|r| r.body.get("color") == Some(&"green".to_owned())));
    }

    #[test]
    fn inline_style_parses_as_a_bare_body() {
        let pairs = parse_inline("color: red; opacity: 0.5");
        assert_eq!(pairs.get("color"), Some(&"red".to_owned()));
        assert_eq!(pairs.get("opacity"), Some(&"0.5".to_owned()));
    }
}
