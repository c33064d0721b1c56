//! The clock & RNG collaborator named in the crate's external interfaces:
//! `now()`, `random_bytes(n)`, `sleep(duration)`. Abstracted so the retry
//! loop and token cache renewal can be driven deterministically in tests.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use rand::RngCore;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
    fn random_bytes(&self, n: usize) -> Vec<u8>;
    async fn sleep(&self, duration: Duration);
}

/// The real wall clock, backed by a cryptographic RNG and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn random_bytes(&self, n: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; n];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        bytes
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Adapts a [`Clock`]'s `random_bytes` into an `RngCore` so it can feed
/// `p256`'s key/scalar generation, routing ephemeral-key and salt randomness
/// through the same collaborator as `now()`/`sleep()`.
pub(crate) struct ClockRng<'a>(pub &'a dyn Clock);

impl rand::RngCore for ClockRng<'_> {
    fn next_u32(&mut self) -> u32 {
        let bytes = self.0.random_bytes(4);
        u32::from_le_bytes(bytes.try_into().expect("random_bytes(4) returns 4 bytes"))
    }

    fn next_u64(&mut self) -> u64 {
        let bytes = self.0.random_bytes(8);
        u64::from_le_bytes(bytes.try_into().expect("random_bytes(8) returns 8 bytes"))
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.copy_from_slice(&self.0.random_bytes(dest.len()));
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand::CryptoRng for ClockRng<'_> {}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// A fake clock whose `now()` advances only when told to, and whose
    /// `sleep()` advances it immediately instead of waiting in real time.
    pub struct FakeClock {
        epoch: SystemTime,
        offset_millis: AtomicU64,
        slept: Mutex<Vec<Duration>>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            FakeClock {
                epoch: SystemTime::now(),
                offset_millis: AtomicU64::new(0),
                slept: Mutex::new(Vec::new()),
            }
        }

        pub fn advance(&self, duration: Duration) {
            self.offset_millis.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
        }

        pub fn slept_durations(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now(&self) -> SystemTime {
            self.epoch + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
        }

        fn random_bytes(&self, n: usize) -> Vec<u8> {
            vec![0x42; n]
        }

        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
            self.advance(duration);
        }
    }

    #[tokio::test]
    async fn fake_clock_advances_on_sleep() {
        let clock = FakeClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.now(), start + Duration::from_secs(5));
        assert_eq!(clock.slept_durations(), vec![Duration::from_secs(5)]);
    }
}
