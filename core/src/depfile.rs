//! Parser for compiler-emitted dependency listings (`cc -MM`).
//!
//! ```text
//! out/a.o: a.c a.h \
//!   util.h
//! ```
//!
//! A trailing backslash continues the current rule on the next line. Inside
//! a path `\ ` is a space, `\#` a hash and `$$` a dollar sign.

use std::collections::HashMap;

/// Target path to its prerequisites, in listing order.
pub type DepMap = HashMap<String, Vec<String>>;

pub fn parse(text: &str) -> DepMap {
    let mut map = DepMap::new();

    for statement in statements(text) {
        let Some(colon) = statement.iter().position(|t| t.ends_with(':')) else {
            continue;
        };

        let mut targets: Vec<String> = statement[..colon].to_vec();
        let last = statement[colon].trim_end_matches(':');
        if !last.is_empty() {
            targets.push(last.to_string());
        }
        let deps = &statement[colon + 1..];

        for target in targets {
            map.entry(target).or_default().extend(deps.iter().cloned());
        }
    }

    map
}

/// Splits the listing into logical lines, each a list of unescaped tokens.
fn statements(text: &str) -> Vec<Vec<String>> {
    let mut statements = Vec::new();
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&(escaped @ (' ' | '#'))) => {
                    current.push(escaped);
                    chars.next();
                }
                Some('\n') => {
                    chars.next();
                    flush(&mut current, &mut tokens);
                }
                Some('\r') => {
                    chars.next();
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    flush(&mut current, &mut tokens);
                }
                _ => current.push('\\'),
            },
            '$' if chars.peek() == Some(&'$') => {
                chars.next();
                current.push('$');
            }
            '\n' => {
                flush(&mut current, &mut tokens);
                if !tokens.is_empty() {
                    statements.push(std::mem::take(&mut tokens));
                }
            }
            c if c.is_whitespace() => flush(&mut current, &mut tokens),
            c => current.push(c),
        }
    }

    flush(&mut current, &mut tokens);
    if !tokens.is_empty() {
        statements.push(tokens);
    }

    statements
}

fn flush(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}
