use std::collections::BTreeMap;
use super::Stats;

/// Per-name property children of an object position.
pub type Properties = BTreeMap<String, Stats>;

pub(super) fn merge_properties(mut a: Properties, b: Properties) -> Properties {
    for (name, fb) in b {
        let merged = match a.remove(&name) {
            None => fb,
            Some(fa) => fa.merge(fb),
        };
        a.insert(name, merged);
    }
    a
}

pub(super) fn merge_child(a: Option<Box<Stats>>, b: Option<Box<Stats>>) -> Option<Box<Stats>> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x),
        (Some(x), Some(y)) => Some(Box::new(x.merge(*y))),
    }
}
