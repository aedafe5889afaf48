pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Load the input document from `--input`, else from piped stdin, else an
/// empty object so flags alone can describe the request.
pub fn load_document(path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_document(path);
    }
    if let Some(data) = stdin::read_stdin()? {
        return Ok(data);
    }
    Ok(Value::Object(Map::new()))
}

/// Overlay flag values onto the document. `None` flags leave the document
/// value in place.
pub fn apply_overrides(
    mut doc: Value,
    overrides: Vec<(&str, Option<Value>)>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let map = doc
        .as_object_mut()
        .ok_or("input document must be a JSON/YAML object")?;
    for (key, value) in overrides {
        if let Some(v) = value {
            map.insert(key.to_string(), v);
        }
    }
    Ok(doc)
}

/// Deserialize the merged document into a typed core input.
pub fn into_input<T: DeserializeOwned>(doc: Value) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_value(doc).map_err(|e| format!("Invalid input document: {e}").into())
}
