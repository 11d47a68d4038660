//! Template expansion: `$N` positional args, `${name}` named
//! variables, `$$` escapes, optional `stripEmpty` whitespace collapsing,
//! and cycle detection for variables whose expansion chain loops back on
//! itself.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// A named template, whose own body may reference other named variables.
#[derive(Debug, Clone)]
pub struct Template<'a> {
    pub body: &'a str,
}

/// Lookup table for `${name}` variables, each itself a template body.
pub type Variables<'a> = HashMap<&'a str, Template<'a>>;

/// Expands `template` against `positional` args (`$1`-indexed) and `vars`
/// (`${name}`-indexed), collapsing whitespace-bracketed empty expansions
/// when `strip_empty` is set.
///
/// ## Errors
///
/// [`Error::CircularReference`] if a named variable's expansion chain
/// returns to itself; [`Error::InvalidArgument`] for a malformed `$`
/// escape (a bare `$` not followed by a digit, `{`, or another `$`) or a
/// `$N`/`${name}` reference with no matching argument/variable.
pub fn expand(template: &str, positional: &[&str], vars: &Variables<'_>, strip_empty: bool) -> Result<String> {
    let mut in_progress = Vec::new();
    let raw = expand_inner(template, positional, vars, &mut in_progress)?;
    Ok(if strip_empty { collapse_empty_expansions(template, &raw, positional, vars)? } else { raw })
}

fn expand_inner<'a>(
    template: &str,
    positional: &[&str],
    vars: &Variables<'a>,
    in_progress: &mut Vec<&'a str>,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some((_, '$')) => {
                chars.next();
                out.push('$');
            }
            Some((_, '{')) => {
                chars.next();
                let name = take_until(&mut chars, '}').ok_or_else(|| {
                    Error::InvalidArgument(format!("unclosed '${{' in template {template:?}"))
                })?;
                out.push_str(&expand_named(&name, positional, vars, in_progress)?);
            }
            Some((_, d)) if d.is_ascii_digit() => {
                let digits = take_digits(&mut chars);
                let index: usize = digits.parse().map_err(|_| {
                    Error::InvalidArgument(format!("'${digits}' is not a valid positional reference"))
                })?;
                let value = positional.get(index.saturating_sub(1)).copied().ok_or_else(|| {
                    Error::InvalidArgument(format!("no positional argument ${index} was supplied"))
                })?;
                out.push_str(value);
            }
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "bare '$' not followed by a digit, '{{', or '$' in template {template:?}"
                )));
            }
        }
    }

    Ok(out)
}

fn expand_named<'a>(
    name: &str,
    positional: &[&str],
    vars: &Variables<'a>,
    in_progress: &mut Vec<&'a str>,
) -> Result<String> {
    let (key, entry) = vars
        .get_key_value(name)
        .ok_or_else(|| Error::InvalidArgument(format!("no variable named '{name}' was supplied")))?;

    if in_progress.contains(key) {
        return Err(Error::CircularReference { var: (*key).to_string() });
    }

    in_progress.push(key);
    let result = expand_inner(entry.body, positional, vars, in_progress);
    in_progress.pop();
    result
}

fn take_until(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>, end: char) -> Option<String> {
    let mut out = String::new();
    for (_, c) in chars.by_ref() {
        if c == end {
            return Some(out);
        }
        out.push(c);
    }
    None
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>) -> String {
    let mut out = String::new();
    while let Some((_, c)) = chars.peek() {
        if c.is_ascii_digit() {
            out.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

/// Re-expands `template`, this time tracking which top-level `$...`
/// expansions produced empty strings, and collapses any literal whitespace
/// bracketing one of those into a single space.
///
/// This has to walk the template a second time (rather than post-process
/// `expanded`) because collapsing needs to know *which* gaps in the output
/// came from an empty expansion versus literal text that happened to be
/// empty.
fn collapse_empty_expansions(
    template: &str,
    expanded: &str,
    positional: &[&str],
    vars: &Variables<'_>,
) -> Result<String> {
    // Re-run expansion segment-by-segment so each expansion's emptiness is
    // known at the point its surrounding whitespace is being considered.
    let mut in_progress = Vec::new();
    let mut segments: Vec<(String, bool)> = Vec::new(); // (text, is_expansion)
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some((_, '$')) => {
                chars.next();
                literal.push('$');
            }
            Some((_, '{')) => {
                chars.next();
                let name = take_until(&mut chars, '}').ok_or_else(|| {
                    Error::InvalidArgument(format!("unclosed '${{' in template {template:?}"))
                })?;
                if !literal.is_empty() {
                    segments.push((std::mem::take(&mut literal), false));
                }
                let value = expand_named(&name, positional, vars, &mut in_progress)?;
                segments.push((value, true));
            }
            Some((_, d)) if d.is_ascii_digit() => {
                let digits = take_digits(&mut chars);
                let index: usize = digits.parse().unwrap_or(0);
                let value = positional
                    .get(index.saturating_sub(1))
                    .copied()
                    .unwrap_or_default()
                    .to_string();
                if !literal.is_empty() {
                    segments.push((std::mem::take(&mut literal), false));
                }
                segments.push((value, true));
            }
            _ => {}
        }
    }
    if !literal.is_empty() {
        segments.push((literal, false));
    }

    let mut out = String::with_capacity(expanded.len());
    for (i, (text, is_expansion)) in segments.iter().enumerate() {
        if *is_expansion && text.is_empty() {
            let prev_ends_whitespace = segments.get(i.wrapping_sub(1)).is_some_and(|(t, _)| t.ends_with(char::is_whitespace));
            let next_starts_whitespace = segments.get(i + 1).is_some_and(|(t, _)| t.starts_with(char::is_whitespace));
            if prev_ends_whitespace && next_starts_whitespace {
                continue;
            }
        }
        out.push_str(text);
    }

    // Collapse a run of >1 whitespace left behind at a stripped join back to
    // exactly one space, without touching whitespace elsewhere.
    let mut result = String::with_capacity(out.len());
    let mut prev_space = false;
    for c in out.chars() {
        if c == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        result.push(c);
    }

    Ok(result)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strip_empty_collapses_interior_whitespace() {
        let vars = Variables::new();
        let with_empty = expand("A $1 B", &[""], &vars, true).unwrap();
        assert_eq!(with_empty, "A B");

        let with_value = expand("A $1 B", &["x"], &vars, true).unwrap();
        assert_eq!(with_value, "A x B");
    }

    #[test]
    fn positional_args_are_one_based() {
        let vars = Variables::new();
        assert_eq!(expand("$1-$2", &["a", "b"], &vars, false).unwrap(), "a-b");
    }

    #[test]
    fn named_variables_expand_through_braces() {
        let mut vars = Variables::new();
        vars.insert("greeting", Template { body: "hello" });
        assert_eq!(expand("${greeting}, world", &[], &vars, false).unwrap(), "hello, world");
    }

    #[test]
    fn dollar_dollar_escapes_to_a_literal_dollar() {
        let vars = Variables::new();
        assert_eq!(expand("cost: $$5", &[], &vars, false).unwrap(), "cost: $5");
    }

    #[test]
    fn missing_positional_argument_is_an_error() {
        let vars = Variables::new();
        assert!(expand("$1", &[], &vars, false).is_err());
    }

    #[test]
    fn direct_self_reference_is_a_circular_reference() {
        let mut vars = Variables::new();
        vars.insert("a", Template { body: "${a}" });
        let err = expand("${a}", &[], &vars, false).unwrap_err();
        assert!(matches!(err, Error::CircularReference { .. }));
    }

    #[test]
    fn transitive_cycle_is_detected() {
        let mut vars = Variables::new();
        vars.insert("a", Template { body: "${b}" });
        vars.insert("b", Template { body: "${a}" });
        let err = expand("${a}", &[], &vars, false).unwrap_err();
        assert!(matches!(err, Error::CircularReference { .. }));
    }

    #[test]
    fn named_variable_expansion_is_not_flagged_as_a_false_cycle() {
        let mut vars = Variables::new();
        vars.insert("a", Template { body: "x" });
        vars.insert("b", Template { body: "${a}${a}" });
        assert_eq!(expand("${b}", &[], &vars, false).unwrap(), "xx");
    }
}
