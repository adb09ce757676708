//! Parameter literals accepted on the command line.

use stmtkit_db::Value;

/// Parses a command-line parameter into a [`Value`].
///
/// `null` (any case) is NULL, `x'…'` is a hex blob, `'…'` is text taken
/// verbatim, then integers and finite reals are tried before falling back
/// to plain text.
pub(crate) fn parse(input: &str) -> Result<Value, String> {
    if input.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    let blob = input
        .strip_prefix("x'")
        .or_else(|| input.strip_prefix("X'"))
        .and_then(|rest| rest.strip_suffix('\''));
    if let Some(hex_digits) = blob {
        return hex::decode(hex_digits)
            .map(Value::Blob)
            .map_err(|e| format!("invalid blob literal {input:?}: {e}"));
    }
    if let Some(text) = input
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Ok(Value::Text(text.to_string()));
    }
    if let Ok(v) = input.parse::<i64>() {
        return Ok(Value::Integer(v));
    }
    match input.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Value::Real(v)),
        _ => Ok(Value::Text(input.to_string())),
    }
}
