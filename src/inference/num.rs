use serde_json::Number;

/// How a JSON number is counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NumKind {
    Int,
    Float,
}

/// An integral literal (no fraction, no exponent) is an `Int`; everything
/// else is a `Float`.
///
/// Integers outside the `i64`/`u64` range are decoded by `serde_json` as
/// `f64`, so they count as `Float` even though the literal is integral.
pub fn classify(n: &Number) -> NumKind {
    if n.is_i64() || n.is_u64() {
        NumKind::Int
    } else {
        NumKind::Float
    }
}

pub fn is_zero(n: &Number) -> bool {
    n.as_f64().is_some_and(|f| f == 0.0)
}
