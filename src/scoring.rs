//! Score and interests computations on top of the cache port.

use std::time::Duration;

use md5::{Digest, Md5};

use crate::domain::{Gender, OnlineScoreRequest};
use crate::store::{Store, StoreError};

/// How long a computed score stays cached.
pub const SCORE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
/// Inputs of [`get_score`]; `None` and empty text both mean "not supplied".
pub struct ScoreInput<'a> {
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub birthday: Option<&'a str>,
    pub gender: Option<Gender>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

impl<'a> From<&'a OnlineScoreRequest> for ScoreInput<'a> {
    fn from(request: &'a OnlineScoreRequest) -> Self {
        Self {
            phone: request.phone().map(|phone| phone.as_str()),
            email: request.email().map(|email| email.as_str()),
            birthday: request.birthday().map(|birthday| birthday.as_str()),
            gender: request.gender(),
            first_name: Some(request.first_name().as_str()),
            last_name: Some(request.last_name().as_str()),
        }
    }
}

fn supplied(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

/// Cache key of a score. The concatenation order is part of the cache format.
pub fn score_key(input: &ScoreInput<'_>) -> String {
    let mut hasher = Md5::new();
    for part in [
        input.first_name,
        input.last_name,
        input.phone,
        input.birthday,
    ] {
        hasher.update(part.unwrap_or_default().as_bytes());
    }
    format!("uid:{}", hex::encode(hasher.finalize()))
}

/// The additive score, without any cache involvement.
pub fn compute_score(input: &ScoreInput<'_>) -> f64 {
    let mut score = 0.0;
    if supplied(input.phone) {
        score += 1.5;
    }
    if supplied(input.email) {
        score += 1.5;
    }
    if supplied(input.birthday) && input.gender.is_some() {
        score += 1.5;
    }
    if supplied(input.first_name) && supplied(input.last_name) {
        score += 0.5;
    }
    score
}

/// Score memoized through `store`.
///
/// A dead or failing cache never fails the call: reads degrade to a miss and
/// the write is skipped.
pub fn get_score(store: &dyn Store, input: &ScoreInput<'_>) -> f64 {
    let key = score_key(input);
    let online = store.available();

    if online {
        match store.get(&key) {
            Ok(Some(raw)) => match parse_score(&raw) {
                Some(score) => {
                    tracing::debug!(%key, score, "score cache hit");
                    return score;
                }
                None => tracing::warn!(%key, "ignoring unparsable cached score"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(%key, error = %err, "score cache read failed"),
        }
    } else {
        tracing::warn!(%key, "store unavailable, computing score without cache");
    }

    let score = compute_score(input);

    if online {
        if let Err(err) = store.set(&key, score.to_string().as_bytes(), SCORE_TTL) {
            tracing::warn!(%key, error = %err, "score cache write failed");
        }
    }
    score
}

fn parse_score(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

#[derive(Debug, thiserror::Error)]
/// Failures of [`get_interests`].
pub enum InterestsError {
    #[error("no interests cached for client {client_id}")]
    NotFound { client_id: i64 },
    #[error("cached interests for client {client_id} are malformed: {source}")]
    Malformed {
        client_id: i64,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn interests_key(client_id: i64) -> String {
    format!("i:{client_id}")
}

/// Interests of one client, read from `store` (never written).
///
/// An unavailable store reads as absent.
pub fn get_interests(store: &dyn Store, client_id: i64) -> Result<Vec<String>, InterestsError> {
    if !store.available() {
        tracing::warn!(client_id, "store unavailable, interests treated as absent");
        return Err(InterestsError::NotFound { client_id });
    }
    let raw = store
        .get(&interests_key(client_id))?
        .ok_or(InterestsError::NotFound { client_id })?;
    serde_json::from_slice(&raw).map_err(|source| InterestsError::Malformed { client_id, source })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug, Default)]
    struct RecordingState {
        cached: Option<Vec<u8>>,
        gets: u32,
        sets: u32,
        forbid_sets: bool,
        online: bool,
        fail: bool,
    }

    #[derive(Debug, Clone, Default)]
    struct RecordingStore {
        state: Arc<Mutex<RecordingState>>,
    }

    impl RecordingStore {
        fn online() -> Self {
            let store = Self::default();
            store.state.lock().unwrap().online = true;
            store
        }

        fn counts(&self) -> (u32, u32) {
            let state = self.state.lock().unwrap();
            (state.gets, state.sets)
        }
    }

    impl Store for RecordingStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            let mut state = self.state.lock().unwrap();
            state.gets += 1;
            if state.fail {
                return Err(StoreError::backend("boom"));
            }
            Ok(state.cached.clone())
        }

        fn set(&self, _key: &str, value: &[u8], _ttl: Duration) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            assert!(!state.forbid_sets, "score recomputed after a cache hit");
            state.sets += 1;
            if state.fail {
                return Err(StoreError::backend("boom"));
            }
            state.cached = Some(value.to_vec());
            Ok(())
        }

        fn available(&self) -> bool {
            self.state.lock().unwrap().online
        }
    }

    fn full_input() -> ScoreInput<'static> {
        ScoreInput {
            phone: Some("79175002040"),
            email: Some("stupnikov@otus.ru"),
            birthday: Some("01.01.2000"),
            gender: Some(Gender::Unknown),
            first_name: Some("a"),
            last_name: Some("b"),
        }
    }

    #[test]
    fn score_adds_contributions() {
        let contacts = ScoreInput {
            phone: Some("79175002040"),
            email: Some("a@b.ru"),
            ..ScoreInput::default()
        };
        assert_eq!(compute_score(&contacts), 3.0);
        assert_eq!(compute_score(&full_input()), 5.0);
        assert_eq!(compute_score(&ScoreInput::default()), 0.0);

        let no_gender = ScoreInput {
            gender: None,
            ..full_input()
        };
        assert_eq!(compute_score(&no_gender), 3.5);

        let half_name = ScoreInput {
            last_name: Some(""),
            ..full_input()
        };
        assert_eq!(compute_score(&half_name), 4.5);
    }

    #[test]
    fn score_key_is_stable_and_order_sensitive() {
        let input = full_input();
        let key = score_key(&input);
        assert!(key.starts_with("uid:"));
        assert_eq!(key.len(), "uid:".len() + 32);
        assert_eq!(key, score_key(&full_input()));

        let swapped = ScoreInput {
            first_name: Some("b"),
            last_name: Some("a"),
            ..full_input()
        };
        assert_ne!(key, score_key(&swapped));

        // Email and gender do not participate in the key.
        let other_email = ScoreInput {
            email: None,
            gender: None,
            ..full_input()
        };
        assert_eq!(key, score_key(&other_email));

        let empty = score_key(&ScoreInput::default());
        assert_eq!(empty, "uid:d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let store = RecordingStore::online();
        let input = ScoreInput {
            phone: Some("79175002040"),
            email: Some("a@b.ru"),
            ..ScoreInput::default()
        };

        assert_eq!(get_score(&store, &input), 3.0);
        assert_eq!(store.counts(), (1, 1));

        store.state.lock().unwrap().forbid_sets = true;
        assert_eq!(get_score(&store, &input), 3.0);
        assert_eq!(store.counts(), (2, 1));
    }

    #[test]
    fn cached_value_wins_over_computation() {
        let store = RecordingStore::online();
        store.state.lock().unwrap().cached = Some(b"43".to_vec());
        assert_eq!(get_score(&store, &full_input()), 43.0);
    }

    #[test]
    fn unavailable_store_is_skipped() {
        let store = RecordingStore::default();
        assert_eq!(get_score(&store, &full_input()), 5.0);
        assert_eq!(store.counts(), (0, 0));
    }

    #[test]
    fn failing_store_degrades_to_computation() {
        let store = RecordingStore::online();
        store.state.lock().unwrap().fail = true;
        assert_eq!(get_score(&store, &full_input()), 5.0);
        assert_eq!(store.counts(), (1, 1));
    }

    #[test]
    fn score_is_written_with_ttl_to_memory_store() {
        let store = MemoryStore::new();
        let input = full_input();
        get_score(&store, &input);
        assert_eq!(store.get(&score_key(&input)).unwrap(), Some(b"5".to_vec()));
    }

    #[test]
    fn interests_are_read_from_cache() {
        let store = MemoryStore::new();
        store.put("i:0", r#"["a","b"]"#);
        assert_eq!(get_interests(&store, 0).unwrap(), vec!["a", "b"]);
        assert!(store.get("i:1").unwrap().is_none());
    }

    #[test]
    fn missing_interests_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            get_interests(&store, 7),
            Err(InterestsError::NotFound { client_id: 7 })
        ));

        store.put("i:7", r#"["a"]"#);
        store.set_online(false);
        assert!(matches!(
            get_interests(&store, 7),
            Err(InterestsError::NotFound { client_id: 7 })
        ));
    }

    #[test]
    fn malformed_interests_and_backend_errors_are_distinct() {
        let store = MemoryStore::new();
        store.put("i:1", "not json");
        assert!(matches!(
            get_interests(&store, 1),
            Err(InterestsError::Malformed { client_id: 1, .. })
        ));

        let failing = RecordingStore::online();
        failing.state.lock().unwrap().fail = true;
        assert!(matches!(
            get_interests(&failing, 1),
            Err(InterestsError::Store(StoreError::Backend { .. }))
        ));
    }
}
