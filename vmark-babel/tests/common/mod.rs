//! Helpers shared by the integration tests.

use serde_json::Value;
use vmark_babel::Document;

/// The document as JSON with every `source_line` removed, so trees parsed
/// from differently laid out text can be compared structurally.
pub fn shape(doc: &Document) -> Value {
    let mut value = serde_json::to_value(doc).expect("document serializes");
    strip_source_lines(&mut value);
    value
}

fn strip_source_lines(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("source_line");
            map.values_mut().for_each(strip_source_lines);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_source_lines),
        _ => {}
    }
}

/// `serialize(parse(source))`.
pub fn round_trip(source: &str) -> String {
    vmark_babel::serialize(&vmark_babel::parse(source))
}
