//! Synthetic force responses
//!
//! Produces a shallow, type-matched stand-in value for an action's schema so a
//! client's result handling can be exercised without a real backend. Only the
//! top-level `properties` and their `type` are looked at; `required`,
//! `format`, `enum` and friends are ignored.

use fake::faker::lorem::en::{Sentence, Word};
use fake::Fake;
use rand::Rng;
use serde_json::{Map, Value};

const MAX_NUMBER: i64 = 100;

pub struct SyntheticGenerator<R: Rng> {
    rng: R,
}

impl<R: Rng> SyntheticGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// One generated value per declared top-level property. A fragment
    /// without a `properties` object gets a single word/word pair.
    pub fn generate(&mut self, schema: &Value) -> Value {
        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            let mut fallback = Map::new();
            fallback.insert(self.word(), Value::String(self.word()));
            return Value::Object(fallback);
        };

        let data: Map<String, Value> = properties
            .iter()
            .map(|(name, property)| (name.clone(), self.value_for(property)))
            .collect();
        Value::Object(data)
    }

    fn value_for(&mut self, property: &Value) -> Value {
        match property.get("type").and_then(Value::as_str) {
            Some("string") => Value::String(self.sentence()),
            Some("number") => Value::from(self.rng.gen_range(0..=MAX_NUMBER)),
            Some("boolean") => Value::Bool(self.rng.gen_bool(0.5)),
            _ => Value::String(self.word()),
        }
    }

    fn word(&mut self) -> String {
        Word().fake_with_rng(&mut self.rng)
    }

    /// Two to five words of lorem ipsum
    fn sentence(&mut self) -> String {
        Sentence(2..6).fake_with_rng(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn generator() -> SyntheticGenerator<StdRng> {
        SyntheticGenerator::new(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_values_match_declared_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "height": {"type": "number"},
                "crouch": {"type": "boolean"},
                "target": {"type": "array"},
                "untyped": {}
            }
        });

        let value = generator().generate(&schema);
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 5);
        assert!(!object["name"].as_str().unwrap().is_empty());
        let height = object["height"].as_i64().unwrap();
        assert!((0..=MAX_NUMBER).contains(&height));
        assert!(object["crouch"].is_boolean());
        assert!(!object["target"].as_str().unwrap().is_empty());
        assert!(!object["untyped"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_integer_type_falls_back_to_word() {
        let schema = json!({"properties": {"count": {"type": "integer"}}});
        let value = generator().generate(&schema);
        assert!(value["count"].is_string());
    }

    #[test]
    fn test_no_properties_gives_single_pair() {
        for schema in [json!({}), json!({"type": "object"}), json!({"properties": 5})] {
            let value = generator().generate(&schema);
            let object = value.as_object().unwrap();
            assert_eq!(object.len(), 1);
            let (key, value) = object.iter().next().unwrap();
            assert!(!key.is_empty());
            assert!(!value.as_str().unwrap().is_empty());
        }
    }

    #[test]
    fn test_empty_properties_gives_empty_object() {
        let value = generator().generate(&json!({"properties": {}}));
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_sentence_is_prose() {
        let mut generator = generator();
        let sentence = generator.sentence();
        let words = sentence.split_whitespace().count();
        assert!((2..=5).contains(&words), "unexpected sentence {:?}", sentence);
    }

    #[test]
    fn test_same_seed_same_values() {
        let schema = json!({"properties": {"name": {"type": "string"}, "height": {"type": "number"}}});
        assert_eq!(generator().generate(&schema), generator().generate(&schema));
    }
}
