use super::VisitMut;
use crate::value::Value;

/// Recursively visit all string leaves mutably
///
/// The visitor receives the [Value] node holding the string so it may replace it with a value of another kind.
/// Replacements are not visited again.
pub trait VisitStringsMut {
    fn visit_strings_mut(&mut self, visitor: &mut dyn VisitMut<Value>);
}

impl VisitStringsMut for Value {
    fn visit_strings_mut(&mut self, visitor: &mut dyn VisitMut<Value>) {
        match self {
            Value::String(_) => visitor.visit_mut(self),
            Value::Array(array) => {
                for value in array {
                    value.visit_strings_mut(visitor);
                }
            }
            Value::Object(object) => {
                for value in object.values_mut() {
                    value.visit_strings_mut(visitor);
                }
            }
            Value::Null | Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn visits_nested_strings_only() {
        let mut value = Value::from_yaml_str("{ a: x, b: [y, 1, { c: z }], d: true }").unwrap();

        let mut seen = Vec::new();
        value.visit_strings_mut(&mut |node: &mut Value| {
            if let Value::String(text) = node {
                let length = text.len() as i64;
                seen.push(text.clone());
                *node = Value::Integer(length);
            }
        });

        assert_eq!(seen, ["x", "y", "z"]);
        assert_eq!(
            value,
            Value::from_yaml_str("{ a: 1, b: [1, 1, { c: 1 }], d: true }").unwrap()
        );
    }
}
