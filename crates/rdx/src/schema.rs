//! 🧬 Schema: the bouncer that checks JSON's ID before it gets into the typed club.
//!
//! 🎬 *[a JSON blob walks up to the door. it claims to be a Character.]*
//! *["Where's your `status` field?" asks the bouncer.]*
//! *[the blob looks at its shoes. it has no `status` field. it never did.]*
//!
//! 📦 A [`Schema`] is a declarative shape: strings, integers, nullable things, arrays,
//! objects with required and optional fields. [`validate`] walks a `serde_json::Value`
//! against it and either hands back typed data or a [`FieldErrors`] map of
//! `"path" -> ["what went wrong"]`. Nothing here logs and nothing here panics.
//! Callers own the logging, because callers know the context. 🦆
//!
//! 🧠 Knowledge graph:
//! - Arrays at the top level are validated element-wise (paths start with the index).
//! - Unknown object keys are welcome. The API grows fields; we do not throw tantrums.
//! - After the shape passes, serde decodes into `T`. If serde still disagrees, that
//!   becomes a `(root)` field error instead of a surprise.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// 🏷️ Key used for errors about the value itself rather than one of its fields.
pub const ROOT_PATH: &str = "(root)";

/// 📋 Field path → human-readable messages. BTreeMap so the serialized form is stable.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// 🧬 A declared JSON shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// 🤷 anything goes. vibes-based typing.
    Any,
    String,
    /// 🔢 whole numbers only. 3.5 characters is not a thing.
    Integer,
    Number,
    Bool,
    /// 🕳️ the inner shape, or `null`
    Nullable(Box<Schema>),
    /// 📚 every element must match the inner shape
    Array(Box<Schema>),
    Object(Vec<Field>),
}

/// 🔑 One named field of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub schema: Schema,
    pub required: bool,
}

impl Field {
    pub fn required(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: true,
        }
    }

    /// 🎈 Missing is fine. Present-but-wrong is still wrong.
    pub fn optional(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: false,
        }
    }
}

impl Schema {
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Object(fields.into_iter().collect())
    }

    pub fn nullable(inner: Schema) -> Self {
        Schema::Nullable(Box::new(inner))
    }

    pub fn array(inner: Schema) -> Self {
        Schema::Array(Box::new(inner))
    }

    /// 🔍 Check a single value against this schema, collecting every violation.
    ///
    /// Empty map means the value fits. Used directly by the pipeline's diagnostic pass
    /// when it re-checks array elements one at a time to find the troublemakers.
    pub fn check(&self, value: &Value) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let mut path = Vec::new();
        check_into(self, value, &mut path, &mut errors);
        errors
    }

    fn type_name(&self) -> &'static str {
        match self {
            Schema::Any => "any",
            Schema::String => "string",
            Schema::Integer => "integer",
            Schema::Number => "number",
            Schema::Bool => "boolean",
            Schema::Nullable(inner) => inner.type_name(),
            Schema::Array(_) => "array",
            Schema::Object(_) => "object",
        }
    }
}

/// ✅ or 💀: the two possible moods of a validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(FieldErrors),
}

impl<T> Validation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    /// 🔄 Convert into a plain `Result`, for callers who want `?` back in their lives.
    pub fn into_result(self) -> Result<T, FieldErrors> {
        match self {
            Validation::Valid(data) => Ok(data),
            Validation::Invalid(errors) => Err(errors),
        }
    }
}

/// 🚪 Validate `json` against `schema` and decode into `T`.
///
/// If `json` is an array, each element is checked against `schema` (so `T` should be a
/// `Vec<_>` of the element type). Otherwise the value is checked as a single item.
pub fn validate<T: DeserializeOwned>(json: &Value, schema: &Schema) -> Validation<T> {
    let mut errors = FieldErrors::new();
    let mut path = Vec::new();
    match json {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                check_into(schema, item, &mut path, &mut errors);
                path.pop();
            }
        }
        single => check_into(schema, single, &mut path, &mut errors),
    }

    if !errors.is_empty() {
        return Validation::Invalid(errors);
    }

    // 🧪 Shape passed. serde gets the final word on whether it fits the struct.
    match serde_json::from_value::<T>(json.clone()) {
        Ok(data) => Validation::Valid(data),
        Err(decode_error) => {
            let mut errors = FieldErrors::new();
            errors.insert(
                ROOT_PATH.to_string(),
                vec![format!("Failed to decode: {decode_error}")],
            );
            Validation::Invalid(errors)
        }
    }
}

/// 🥇 The first (path, message) pair, in path order. Handy for one-line diagnostics.
pub fn first_error(errors: &FieldErrors) -> Option<(&str, &str)> {
    errors.iter().find_map(|(path, messages)| {
        messages
            .first()
            .map(|message| (path.as_str(), message.as_str()))
    })
}

/// 📝 Serialize field errors the way the boundary reports them: a compact JSON object.
pub fn describe(errors: &FieldErrors) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{errors:?}"))
}

fn check_into(schema: &Schema, value: &Value, path: &mut Vec<String>, errors: &mut FieldErrors) {
    let fits = match (schema, value) {
        (Schema::Any, _) => true,
        (Schema::String, Value::String(_)) => true,
        (Schema::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (Schema::Number, Value::Number(_)) => true,
        (Schema::Bool, Value::Bool(_)) => true,
        (Schema::Nullable(_), Value::Null) => true,
        (Schema::Nullable(inner), other) => {
            check_into(inner, other, path, errors);
            return;
        }
        (Schema::Array(inner), Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                check_into(inner, item, path, errors);
                path.pop();
            }
            return;
        }
        (Schema::Object(fields), Value::Object(map)) => {
            for field in fields {
                path.push(field.name.to_string());
                match map.get(field.name) {
                    Some(child) => check_into(&field.schema, child, path, errors),
                    None if field.required => push_error(errors, path, "Required".to_string()),
                    None => {}
                }
                path.pop();
            }
            return;
        }
        _ => false,
    };

    if !fits {
        push_error(
            errors,
            path,
            format!(
                "Expected {}, received {}",
                schema.type_name(),
                received_name(value)
            ),
        );
    }
}

fn push_error(errors: &mut FieldErrors, path: &[String], message: String) {
    let key = if path.is_empty() {
        ROOT_PATH.to_string()
    } else {
        path.join(".")
    };
    errors.entry(key).or_default().push(message);
}

fn received_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Portal {
        id: i64,
        label: String,
        destination: Option<String>,
    }

    fn portal_schema() -> Schema {
        Schema::object([
            Field::required("id", Schema::Integer),
            Field::required("label", Schema::String),
            Field::optional("destination", Schema::nullable(Schema::String)),
        ])
    }

    #[test]
    fn the_one_where_a_good_object_gets_typed() {
        let json = json!({"id": 137, "label": "C-137", "destination": null, "extra": true});
        let result: Validation<Portal> = validate(&json, &portal_schema());
        assert_eq!(
            result,
            Validation::Valid(Portal {
                id: 137,
                label: "C-137".into(),
                destination: None
            })
        );
        assert!(result.is_valid());
        assert_eq!(result.into_result().map(|portal| portal.id), Ok(137));
    }

    #[test]
    fn the_one_where_missing_and_wrong_fields_are_both_reported() {
        // 🧪 no label, and an id that floats. two crimes, two entries.
        let json = json!({"id": 1.5});
        let Validation::Invalid(errors) = validate::<Portal>(&json, &portal_schema()) else {
            panic!("💀 a floating id should not pass");
        };
        assert_eq!(errors["label"], vec!["Required".to_string()]);
        assert_eq!(errors["id"], vec!["Expected integer, received number".to_string()]);
    }

    #[test]
    fn the_one_where_arrays_are_checked_element_by_element() {
        let json = json!([
            {"id": 1, "label": "ok"},
            {"id": 2},
            {"id": "three", "label": "nope"}
        ]);
        let Validation::Invalid(errors) = validate::<Vec<Portal>>(&json, &portal_schema()) else {
            panic!("💀 two bad elements should fail the array");
        };
        assert!(errors.contains_key("1.label"));
        assert!(errors.contains_key("2.id"));
        assert!(!errors.keys().any(|k| k.starts_with("0.")));
        assert_eq!(first_error(&errors), Some(("1.label", "Required")));
    }

    #[test]
    fn the_one_where_a_scalar_is_not_an_object() {
        let errors = portal_schema().check(&json!("just a string"));
        assert_eq!(
            errors[ROOT_PATH],
            vec!["Expected object, received string".to_string()]
        );
    }

    #[test]
    fn the_one_where_nested_paths_are_dotted() {
        let schema = Schema::object([Field::required(
            "info",
            Schema::object([Field::required("next", Schema::nullable(Schema::String))]),
        )]);
        let errors = schema.check(&json!({"info": {"next": 2}}));
        assert_eq!(
            errors["info.next"],
            vec!["Expected string, received integer".to_string()]
        );
        assert!(schema.check(&json!({"info": {"next": null}})).is_empty());
    }

    #[test]
    fn the_one_where_serde_disagrees_after_the_shape_passes() {
        // 🧪 Any lets anything through; serde still wants a Portal.
        let Validation::Invalid(errors) = validate::<Portal>(&json!(42), &Schema::Any) else {
            panic!("💀 42 is not a portal, no matter how hard you squint");
        };
        assert!(errors[ROOT_PATH][0].starts_with("Failed to decode"));
    }

    #[test]
    fn the_one_where_errors_serialize_to_a_stable_json_object() {
        let mut errors = FieldErrors::new();
        errors.insert("b".into(), vec!["two".into()]);
        errors.insert("a".into(), vec!["one".into()]);
        assert_eq!(describe(&errors), r#"{"a":["one"],"b":["two"]}"#);
    }
}
