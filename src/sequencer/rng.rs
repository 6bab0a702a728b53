//! Deterministic random draws for the audio thread.
//!
//! Probability rolls, mutation and the random/brownian directions all pull
//! from one Xorshift128+ generator owned by the sequencer. It never
//! allocates and is fully reproducible from a 64-bit seed, so a loop that
//! sounded good can be recalled by seed.

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    s0: u64,
    s1: u64,
}

impl Rng {
    /// Derive both state words from a single seed via splitmix64.
    pub fn from_seed(seed: u64) -> Self {
        let s0 = splitmix64(seed);
        let s1 = splitmix64(seed.wrapping_add(0x9e37_79b9_7f4a_7c15));
        // An all-zero state would lock the generator at zero forever
        if s0 == 0 && s1 == 0 {
            Self { s0: 1, s1: 0 }
        } else {
            Self { s0, s1 }
        }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);

        result
    }

    /// Uniform draw in [0.0, 1.0).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // Upper 24 bits fill the f32 mantissa exactly
        (self.next_u64() >> 40) as f32 * (1.0 / (1u32 << 24) as f32)
    }

    /// Uniform index in [0, len). Returns 0 for an empty range.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }

    /// Uniform signed integer in [-range, range].
    #[inline]
    pub fn next_signed(&mut self, range: i32) -> i32 {
        if range <= 0 {
            return 0;
        }
        let span = (range as u64) * 2 + 1;
        (self.next_u64() % span) as i32 - range
    }

    /// Fair coin flip.
    #[inline]
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}
