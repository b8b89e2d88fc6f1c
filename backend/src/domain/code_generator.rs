//! Access code string generation.
//!
//! A code is the role prefix followed by eight upper-case base-36 characters:
//! the last four digits of the current millisecond timestamp, then four random
//! digits. Generation has no side effects and does not guarantee uniqueness;
//! [`crate::domain::CodeLifecycleService`] probes the store for collisions.

use std::sync::Arc;

use mockable::Clock;
use rand::Rng;

use super::CodeRole;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const FRAGMENT_LEN: u32 = 4;

/// Source of candidate access code strings.
#[cfg_attr(test, mockall::automock)]
pub trait CodeGenerator: Send + Sync {
    /// Propose a code for `role`. Uniqueness is not guaranteed.
    fn generate(&self, role: CodeRole) -> String;
}

/// Production generator: clock-derived fragment plus thread-local entropy.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use access_codes::domain::{CodeGenerator, CodeRole, RandomCodeGenerator};
/// use mockable::DefaultClock;
///
/// let generator = RandomCodeGenerator::new(Arc::new(DefaultClock));
/// let code = generator.generate(CodeRole::Viewer);
/// assert!(code.starts_with("VWR-"));
/// assert_eq!(code.len(), 12);
/// ```
#[derive(Clone)]
pub struct RandomCodeGenerator {
    clock: Arc<dyn Clock>,
}

impl RandomCodeGenerator {
    /// Build a generator reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, role: CodeRole) -> String {
        let millis = u64::try_from(self.clock.utc().timestamp_millis()).unwrap_or(0);
        let mut code = String::with_capacity(role.prefix().len() + 8);
        code.push_str(role.prefix());
        code.push_str(&time_fragment(millis));
        code.push_str(&random_fragment(&mut rand::thread_rng()));
        code
    }
}

/// Last four base-36 digits of `millis`, zero-padded.
fn time_fragment(millis: u64) -> String {
    let mut remaining = millis % 36_u64.pow(FRAGMENT_LEN);
    let mut digits = [b'0'; FRAGMENT_LEN as usize];
    for slot in digits.iter_mut().rev() {
        let index = usize::try_from(remaining % 36).unwrap_or(0);
        *slot = ALPHABET.get(index).copied().unwrap_or(b'0');
        remaining /= 36;
    }
    digits.iter().copied().map(char::from).collect()
}

fn random_fragment(rng: &mut impl Rng) -> String {
    (0..FRAGMENT_LEN)
        .map(|_| {
            let index = rng.gen_range(0..ALPHABET.len());
            char::from(ALPHABET.get(index).copied().unwrap_or(b'0'))
        })
        .collect()
}
