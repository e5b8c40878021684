//! Deserialization with JSON-path context in error messages.
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// Same as [`from_str_with_path`] for an already parsed document, e.g. the
/// output of a jq pre-filter.
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// A document holding either one `T` or an array of them.
pub fn one_or_many<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, String> {
    match value {
        Value::Array(items) => items.into_iter().map(from_value_with_path).collect(),
        single => from_value_with_path(single).map(|one| vec![one]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;
    use serde_json::json;

    #[test]
    fn error_names_the_failing_path() {
        let src = r#"{ "kind": "object", "serialName": "a.B",
                       "elements": [ { "name": "x", "descriptor": { "kind": "tuple", "serialName": "t" } } ] }"#;
        let err = from_str_with_path::<Descriptor>(src).unwrap_err();
        assert!(err.starts_with("at JSON path elements[0].descriptor.kind"), "{err}");
        assert!(err.contains("unknown descriptor kind `tuple`"), "{err}");
    }

    #[test]
    fn single_or_array() {
        let one = json!({ "kind": "string", "serialName": "kotlin.String" });
        assert_eq!(one_or_many::<Descriptor>(one.clone()).unwrap(), vec![Descriptor::string()]);
        let many = one_or_many::<Descriptor>(json!([one.clone(), one])).unwrap();
        assert_eq!(many.len(), 2);
    }
}
