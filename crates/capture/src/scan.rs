// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier scanner for captured source.
//!
//! Produces the free-looking names in a block of Python source: comments and
//! string literals are skipped, as are keywords and attribute names following
//! a `.`. F-string interpolations are not scanned; names used only there must
//! be declared as explicit references.

use crate::builtins::is_keyword;
use std::collections::BTreeSet;

const STRING_PREFIXES: &[&str] =
    &["r", "u", "b", "f", "br", "rb", "fr", "rf", "R", "U", "B", "F", "Br", "bR", "BR", "Rb"];

/// Sorted set of identifiers referenced by `source`.
pub fn identifiers(source: &str) -> BTreeSet<String> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = BTreeSet::new();
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '"' || c == '\'' {
            i = skip_string(&chars, i);
            prev = Some(c);
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let is_prefix = i < chars.len()
                && (chars[i] == '"' || chars[i] == '\'')
                && STRING_PREFIXES.contains(&word.as_str());
            if !is_prefix && prev != Some('.') && !is_keyword(&word) {
                out.insert(word);
            }
            prev = Some('a');
            continue;
        }
        if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            prev = Some('0');
            continue;
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
        i += 1;
    }
    out
}

/// Index just past the string literal opening at `start`.
fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = if triple { start + 3 } else { start + 1 };
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            i += 2;
            continue;
        }
        if c == quote {
            if !triple {
                return i + 1;
            }
            if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                return i + 3;
            }
        } else if c == '\n' && !triple {
            // Unterminated single-line string
            return i;
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
