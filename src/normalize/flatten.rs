use serde_json::{Map, Value};

/// Flatten nested objects into one level, joining keys with `separator`.
///
/// Arrays stay intact as values, including any objects inside them. An empty
/// nested object is kept as an empty object value under its joined key.
pub fn flatten_record(record: &Map<String, Value>, separator: &str) -> Map<String, Value> {
    let mut out = Map::with_capacity(record.len());
    flatten_into(record, None, separator, &mut out);
    out
}

fn flatten_into(obj: &Map<String, Value>, prefix: Option<&str>, separator: &str, out: &mut Map<String, Value>) {
    for (key, value) in obj.iter() {
        let path = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, separator, key),
            None => key.clone(),
        };

        match value {
            Value::Object(inner) if !inner.is_empty() => {
                flatten_into(inner, Some(&path), separator, out);
            }
            _ => {
                out.insert(path, value.clone());
            }
        }
    }
}
