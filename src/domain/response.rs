use std::collections::BTreeMap;

use serde::Serialize;

/// Score returned for the admin login without any computation.
pub const ADMIN_SCORE: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Score {
    Fixed(u64),
    Computed(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
/// Method-specific payload placed under `"response"` on success.
pub enum MethodResponse {
    Score { score: Score },
    Interests(BTreeMap<String, Vec<String>>),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn score_serializes_as_bare_number() {
        let fixed = MethodResponse::Score {
            score: Score::Fixed(ADMIN_SCORE),
        };
        assert_eq!(serde_json::to_value(fixed).unwrap(), json!({"score": 42}));

        let computed = MethodResponse::Score {
            score: Score::Computed(3.0),
        };
        assert_eq!(serde_json::to_value(computed).unwrap(), json!({"score": 3.0}));
    }

    #[test]
    fn interests_serialize_as_id_keyed_map() {
        let interests = MethodResponse::Interests(BTreeMap::from([(
            "0".to_owned(),
            vec!["a".to_owned(), "b".to_owned()],
        )]));
        assert_eq!(
            serde_json::to_value(interests).unwrap(),
            json!({"0": ["a", "b"]})
        );
    }
}
