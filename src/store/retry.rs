use std::thread;
use std::time::Duration;

use super::{Store, StoreError};

#[derive(Debug, Clone)]
/// Store decorator that retries failed operations.
///
/// Every operation is attempted up to `max_retries` times (at least once),
/// sleeping `retry_delay` between failed attempts. The last error is returned
/// once attempts are exhausted.
pub struct RetryingStore<S> {
    inner: S,
    max_retries: u32,
    retry_delay: Duration,
}

impl<S: Store> RetryingStore<S> {
    pub fn new(inner: S, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            inner,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn attempt<T>(
        &self,
        operation: &'static str,
        mut call: impl FnMut(&S) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 1;
        loop {
            match call(&self.inner) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries => {
                    tracing::info!(
                        operation,
                        attempt,
                        error = %err,
                        "store attempt failed, retrying in {:?}",
                        self.retry_delay
                    );
                    thread::sleep(self.retry_delay);
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(operation, attempt, error = %err, "store attempts exhausted");
                    return Err(err);
                }
            }
        }
    }
}

impl<S: Store> Store for RetryingStore<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.attempt("get", |store| store.get(key))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.attempt("set", |store| store.set(key, value, ttl))
    }

    fn available(&self) -> bool {
        self.attempt("ping", |store| {
            if store.available() {
                Ok(())
            } else {
                Err(StoreError::unavailable("liveness probe failed"))
            }
        })
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone)]
    struct FlakyStore {
        state: Arc<Mutex<FlakyState>>,
    }

    #[derive(Debug)]
    struct FlakyState {
        failures_left: u32,
        calls: u32,
    }

    impl FlakyStore {
        fn failing(times: u32) -> Self {
            Self {
                state: Arc::new(Mutex::new(FlakyState {
                    failures_left: times,
                    calls: 0,
                })),
            }
        }

        fn calls(&self) -> u32 {
            self.state.lock().unwrap().calls
        }

        fn step(&self) -> Result<(), StoreError> {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            if state.failures_left > 0 {
                state.failures_left -= 1;
                return Err(StoreError::unavailable("timeout"));
            }
            Ok(())
        }
    }

    impl Store for FlakyStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.step().map(|()| Some(b"1.5".to_vec()))
        }

        fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), StoreError> {
            self.step()
        }

        fn available(&self) -> bool {
            self.step().is_ok()
        }
    }

    #[test]
    fn recovers_when_a_later_attempt_succeeds() {
        let flaky = FlakyStore::failing(2);
        let store = RetryingStore::new(flaky.clone(), 3, Duration::ZERO);
        assert_eq!(store.get("k").unwrap(), Some(b"1.5".to_vec()));
        assert_eq!(flaky.calls(), 3);
    }

    #[test]
    fn uses_every_attempt_before_giving_up() {
        let flaky = FlakyStore::failing(10);
        let store = RetryingStore::new(flaky.clone(), 4, Duration::ZERO);
        assert!(matches!(
            store.set("k", b"v", Duration::from_secs(1)),
            Err(StoreError::Unavailable { .. })
        ));
        assert_eq!(flaky.calls(), 4);
    }

    #[test]
    fn liveness_probe_is_retried() {
        let flaky = FlakyStore::failing(1);
        let store = RetryingStore::new(flaky.clone(), 2, Duration::ZERO);
        assert!(store.available());
        assert_eq!(flaky.calls(), 2);
    }

    #[test]
    fn zero_retries_still_attempts_once() {
        let flaky = FlakyStore::failing(0);
        let store = RetryingStore::new(flaky.clone(), 0, Duration::ZERO);
        assert!(store.get("k").is_ok());
        assert_eq!(flaky.calls(), 1);
    }
}
