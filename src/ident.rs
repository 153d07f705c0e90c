//! Property-name helpers shared by renderers.
use std::collections::{BTreeMap, BTreeSet};
use once_cell::sync::Lazy;

pub static DEFAULT_ABBREVIATIONS: Lazy<BTreeSet<String>> = Lazy::new(|| {
    [
        "API", "DB", "HTTP", "HTTPS", "ID", "JSON", "OS", "SQL", "SSH", "URI", "URL", "XML", "YAML",
    ]
    .into_iter()
    .map(String::from)
    .collect()
});

/// False when `name` contains a space, a double quote or a comma; such a
/// property cannot be bound to a declared field by typical decoders.
pub fn is_usable(name: &str) -> bool {
    !name.contains([' ', '"', ','])
}

/// Split a kebab, snake or camel case name into its components.
pub fn split_components(name: &str) -> Vec<String> {
    if name.contains('-') {
        name.split('-').map(String::from).collect()
    } else if name.contains('_') {
        name.split('_').map(String::from).collect()
    } else {
        split_camel(name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Lower,
    Upper,
    Digit,
    Other,
}

fn class_of(c: char) -> CharClass {
    if c.is_lowercase() {
        CharClass::Lower
    } else if c.is_uppercase() {
        CharClass::Upper
    } else if c.is_numeric() {
        CharClass::Digit
    } else {
        CharClass::Other
    }
}

/// `"HTTPServerID2"` → `["HTTP", "Server", "ID", "2"]`.
fn split_camel(name: &str) -> Vec<String> {
    let mut runs: Vec<(CharClass, Vec<char>)> = Vec::new();
    for c in name.chars() {
        let class = class_of(c);
        match runs.last_mut() {
            Some((last, chars)) if *last == class => chars.push(c),
            _ => runs.push((class, vec![c])),
        }
    }
    // an upper run followed by a lower run donates its last letter:
    // "HTTPServer" is "HTTP" + "Server", not "HTTPS" + "erver"
    for i in 0..runs.len().saturating_sub(1) {
        if runs[i].0 == CharClass::Upper && runs[i + 1].0 == CharClass::Lower {
            if let Some(c) = runs[i].1.pop() {
                runs[i + 1].1.insert(0, c);
            }
        }
    }
    runs.into_iter()
        .filter(|(_, chars)| !chars.is_empty())
        .map(|(_, chars)| chars.into_iter().collect())
        .collect()
}

/// Exported (PascalCase) identifier for `name`, with the default
/// abbreviation set.
pub fn export_name(name: &str) -> String {
    export_name_with(name, &DEFAULT_ABBREVIATIONS, &BTreeMap::new())
}

/// Like [`export_name`] with caller abbreviations. A name listed in `renames`
/// is returned as its mapped value, untouched.
pub fn export_name_with(
    name: &str,
    abbreviations: &BTreeSet<String>,
    renames: &BTreeMap<String, String>,
) -> String {
    if let Some(renamed) = renames.get(name) {
        return renamed.clone();
    }
    let mut out = String::with_capacity(name.len());
    for component in split_components(name) {
        if component.is_empty() {
            continue;
        }
        let upper = component.to_uppercase();
        if abbreviations.contains(&upper) {
            out.push_str(&upper);
            continue;
        }
        let mut chars = component.chars();
        let Some(first) = chars.next() else { continue };
        if component == upper {
            out.push(first);
            out.push_str(&chars.as_str().to_lowercase());
        } else {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    let mut ident: String = out
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !ident.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        ident.insert(0, '_');
    }
    ident
}
