//! ID3 tag block (`meta` option).

use serde_json::{Map, Value};

use super::{scalar_to_string, OptionResult};
use crate::error::LameError;

/// Tags taking a value, mapped to their LAME switch.
const VALUE_TAGS: &[(&str, &str)] = &[
    ("title", "--tt"),
    ("artist", "--ta"),
    ("album", "--tl"),
    ("year", "--ty"),
    ("comment", "--tc"),
    ("track", "--tn"),
    ("genre", "--tg"),
    ("artwork", "--ti"),
    ("genre-list", "--genre-list"),
    ("pad-id3v2-size", "--pad-id3v2-size"),
];

/// Tag switches without a value; the switch is `--<key>`.
const FLAG_TAGS: &[&str] = &[
    "add-id3v2",
    "id3v1-only",
    "id3v2-only",
    "id3v2-latin1",
    "id3v2-utf16",
    "space-id3v1",
    "pad-id3v2",
    "ignore-tag-errors",
];

const CUSTOM_FRAME_SWITCH: &str = "--tv";

pub(super) fn meta_tokens(value: &Value) -> OptionResult {
    let Value::Object(map) = value else {
        return Err(LameError::invalid("'meta' must be an object."));
    };

    let mut args = Vec::new();
    for (key, value) in map {
        if let Some((_, switch)) = VALUE_TAGS.iter().find(|(name, _)| name == key) {
            let text = scalar_to_string(value).ok_or_else(|| {
                LameError::invalid(format!("'meta.{key}' must be a string or number."))
            })?;
            args.push(switch.to_string());
            args.push(text);
        } else if FLAG_TAGS.contains(&key.as_str()) {
            match value {
                Value::Bool(true) => args.push(format!("--{key}")),
                Value::Bool(false) | Value::Null => {}
                _ => {
                    return Err(LameError::invalid(format!(
                        "'meta.{key}' must be boolean."
                    )));
                }
            }
        } else if key == "custom" {
            args.extend(custom_frame_tokens(value)?);
        } else {
            return Err(LameError::invalid(format!(
                "'meta' unknown property '{key}'"
            )));
        }
    }

    Ok(args)
}

/// Expands user-defined frames into `--tv id=value` pairs.
///
/// Accepted shapes: `{id: value}`, `["id=value", [id, value], {id, value}]`,
/// or `null` (nothing emitted).
fn custom_frame_tokens(value: &Value) -> OptionResult {
    let frames = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) => object_frames(map)?,
        Value::Array(entries) => {
            let mut frames = Vec::with_capacity(entries.len());
            for entry in entries {
                frames.push(array_frame(entry)?);
            }
            frames
        }
        _ => {
            return Err(LameError::invalid(
                "'meta.custom' must be an array or object.",
            ));
        }
    };

    let mut args = Vec::with_capacity(frames.len() * 2);
    for (id, value) in frames {
        args.push(CUSTOM_FRAME_SWITCH.to_string());
        args.push(format!("{id}={value}"));
    }
    Ok(args)
}

fn object_frames(map: &Map<String, Value>) -> Result<Vec<(String, String)>, LameError> {
    map.iter()
        .map(|(id, value)| frame(id, value))
        .collect()
}

fn array_frame(entry: &Value) -> Result<(String, String), LameError> {
    match entry {
        Value::String(text) => {
            let (id, value) = text.split_once('=').ok_or_else(|| {
                LameError::invalid("'meta.custom' array entries must be 'id=value'.")
            })?;
            frame(id, &Value::String(value.to_string()))
        }
        Value::Array(pair) if pair.len() == 2 => {
            let id = pair[0].as_str().unwrap_or_default();
            frame(id, &pair[1])
        }
        Value::Object(object) => {
            let id = object.get("id").and_then(Value::as_str).unwrap_or_default();
            frame(id, object.get("value").unwrap_or(&Value::Null))
        }
        _ => Err(LameError::invalid(
            "'meta.custom' array entries must be strings, tuples, or objects with id/value.",
        )),
    }
}

fn frame(id: &str, value: &Value) -> Result<(String, String), LameError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(LameError::invalid(
            "'meta.custom' frame id must be a non-empty string.",
        ));
    }
    let value = scalar_to_string(value).ok_or_else(|| {
        LameError::invalid(format!(
            "'meta.custom' frame '{id}' must have a string, number or boolean value."
        ))
    })?;
    Ok((id.to_string(), value))
}
