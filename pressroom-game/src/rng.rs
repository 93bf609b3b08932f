//! Seeded random streams for a session.
//!
//! Each concern draws from its own stream so adding a roll in one system
//! never shifts the outcomes of another. Stream positions are exported with
//! save state so a restored session continues the exact same sequence.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Independent RNG streams keyed off one user-visible seed.
#[derive(Debug, Clone)]
pub struct RngBundle {
    seed: u64,
    orders: CountingRng<ChaCha20Rng>,
    calendar: CountingRng<ChaCha20Rng>,
    managers: CountingRng<ChaCha20Rng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            orders: CountingRng::new(derive_stream_seed(seed, b"orders")),
            calendar: CountingRng::new(derive_stream_seed(seed, b"calendar")),
            managers: CountingRng::new(derive_stream_seed(seed, b"managers")),
        }
    }

    /// Rebuild the bundle at previously exported stream positions.
    #[must_use]
    pub fn restore(positions: &RngPositions) -> Self {
        let mut bundle = Self::from_user_seed(positions.seed);
        bundle.orders.seek(positions.orders);
        bundle.calendar.seek(positions.calendar);
        bundle.managers.seek(positions.managers);
        bundle
    }

    /// Current positions of every stream.
    #[must_use]
    pub fn positions(&self) -> RngPositions {
        RngPositions {
            seed: self.seed,
            orders: self.orders.word_pos(),
            calendar: self.calendar.word_pos(),
            managers: self.managers.word_pos(),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Stream used for order contents (rarity, reward, deadline, label).
    pub const fn orders(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.orders
    }

    /// Stream used for daily plans (rare-day roll, day multiplier).
    pub const fn calendar(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.calendar
    }

    /// Stream used for manager order picks.
    pub const fn managers(&mut self) -> &mut CountingRng<ChaCha20Rng> {
        &mut self.managers
    }
}

/// Serializable stream positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngPositions {
    pub seed: u64,
    pub orders: u64,
    pub calendar: u64,
    pub managers: u64,
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }

    fn word_pos(&self) -> u64 {
        u64::try_from(self.rng.get_word_pos()).unwrap_or(u64::MAX)
    }

    fn seek(&mut self, word_pos: u64) {
        self.rng.set_word_pos(u128::from(word_pos));
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
