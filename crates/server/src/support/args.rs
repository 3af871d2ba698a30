#![forbid(unsafe_code)]

use super::ai::ai_error;
use serde_json::{Map, Value};

pub(crate) type Args = Map<String, Value>;

pub(crate) fn require_string(args: &Args, key: &str) -> Result<String, Value> {
    let Some(v) = args.get(key).and_then(|v| v.as_str()) else {
        return Err(ai_error("INVALID_INPUT", &format!("{key} is required")));
    };
    if v.trim().is_empty() {
        return Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must not be empty"),
        ));
    }
    Ok(v.to_string())
}

pub(crate) fn optional_string(args: &Args, key: &str) -> Result<Option<String>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(v) => Ok(Some(v.to_string())),
        _ => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a string"),
        )),
    }
}

pub(crate) fn optional_usize(args: &Args, key: &str) -> Result<Option<usize>, Value> {
    let Some(value) = args.get(key) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(|v| usize::try_from(v).unwrap_or(usize::MAX))
            .map(Some)
            .ok_or_else(|| {
                ai_error(
                    "INVALID_INPUT",
                    &format!("{key} must be a non-negative integer"),
                )
            }),
        _ => Err(ai_error(
            "INVALID_INPUT",
            &format!("{key} must be a non-negative integer"),
        )),
    }
}

pub(crate) fn require_usize(args: &Args, key: &str) -> Result<usize, Value> {
    optional_usize(args, key)?
        .ok_or_else(|| ai_error("INVALID_INPUT", &format!("{key} is required")))
}

pub(crate) fn require_array<'a>(args: &'a Args, key: &str) -> Result<&'a Vec<Value>, Value> {
    args.get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| ai_error("INVALID_INPUT", &format!("{key} must be an array")))
}

pub(crate) fn require_object<'a>(args: &'a Args, key: &str) -> Result<&'a Args, Value> {
    args.get(key)
        .and_then(|v| v.as_object())
        .ok_or_else(|| ai_error("INVALID_INPUT", &format!("{key} must be an object")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Args {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn strings_must_be_present_and_non_blank() {
        let a = args(json!({"tableId": "tbl_1", "blank": "  ", "num": 3}));
        assert_eq!(require_string(&a, "tableId").unwrap(), "tbl_1");
        assert!(require_string(&a, "blank").is_err());
        assert!(require_string(&a, "missing").is_err());
        assert!(optional_string(&a, "num").is_err());
        assert_eq!(optional_string(&a, "missing").unwrap(), None);
    }

    #[test]
    fn usize_rejects_negatives_and_strings() {
        let a = args(json!({"count": 10, "neg": -1, "text": "10", "nothing": null}));
        assert_eq!(require_usize(&a, "count").unwrap(), 10);
        assert!(optional_usize(&a, "neg").is_err());
        assert!(optional_usize(&a, "text").is_err());
        assert_eq!(optional_usize(&a, "nothing").unwrap(), None);
        assert!(require_usize(&a, "nothing").is_err());
    }
}
