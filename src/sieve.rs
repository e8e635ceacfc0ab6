//! # Sieve — Candidate-Index Sieve of Eratosthenes
//!
//! Eliminates chain-origin multipliers that are guaranteed to produce a
//! composite link, before any primality test is spent on them.
//!
//! ## Algorithm: Weaving
//!
//! Trial origins are `F · m` where `F` is the fixed factor (fixed multiplier
//! times header hash) and `m = window_start + i` is the variable multiplier
//! for sieve index `i`. For a small prime `p` not dividing `F`, the k-th link
//! of each shape is divisible by `p` exactly on one residue class of `m`:
//!
//! ```text
//! F·m·2^k − 1 ≡ 0 (mod p)  ⇔  m ≡  F⁻¹·2⁻ᵏ (mod p)     Cunningham 1
//! F·m·2^k + 1 ≡ 0 (mod p)  ⇔  m ≡ −F⁻¹·2⁻ᵏ (mod p)     Cunningham 2
//! ```
//!
//! Link sequence number `seq = 2k` is the −1 form and `seq = 2k + 1` the +1
//! form; a bi-twin chain of length L consists of the first L of these
//! interleaved links. Weaving one prime costs one modular inverse followed by
//! fixed-stride sweeps over the index space, so the dominant cost is memory
//! bandwidth rather than arithmetic.
//!
//! The sieve never flags a multiplier whose link is not actually divisible by
//! a woven prime (no false positives). Stopping the weave early only leaves
//! composites unflagged, which the primality tester then catches.
//!
//! ## Memory
//!
//! The three composite bitmaps are packed `u64` words (a set bit means
//! composite), allocated once at construction and cleared in place by
//! [`Sieve::reset`] between rounds.

use rug::Integer;

use crate::chain::{ChainType, PerChain};
use crate::header::HeaderHash;
use crate::prime_table::PrimeTable;
use crate::target;

/// Upper bound on the number of candidate indices per sieve.
pub const MAX_SIEVE_SIZE: usize = 1_000_000;

/// Modular exponentiation: base^exp mod modulus.
/// Uses u128 intermediates to avoid overflow for moduli up to ~2^63.
pub fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut result: u64 = 1;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result as u128 * base as u128 % modulus as u128) as u64;
        }
        exp >>= 1;
        base = (base as u128 * base as u128 % modulus as u128) as u64;
    }
    result
}

/// Modular inverse via Fermat's little theorem: a^(p-2) mod p.
/// Returns None if a ≡ 0 (mod p). Requires p prime.
pub fn mod_inverse(a: u64, p: u64) -> Option<u64> {
    if a % p == 0 {
        return None;
    }
    if p == 2 {
        return Some(1);
    }
    Some(pow_mod(a, p - 2, p))
}

/// Packed bit array for composite flags.
///
/// Bit layout: bit `i` is stored in word `i / 64`, bit position `i % 64`.
/// A set bit (1) means the index is composite for the owning shape.
#[derive(Debug, Clone)]
pub struct BitSieve {
    words: Vec<u64>,
    len: usize,
}

impl BitSieve {
    /// Create a bitmap of `len` bits, all clear.
    pub fn new(len: usize) -> Self {
        BitSieve {
            words: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(
            index < self.len,
            "BitSieve index out of bounds: {} >= {}",
            index,
            self.len
        );
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    /// Set every `stride`-th bit starting at `start`.
    #[inline]
    pub fn set_stride(&mut self, start: usize, stride: usize) {
        let mut i = start;
        while i < self.len {
            self.words[i / 64] |= 1u64 << (i % 64);
            i += stride;
        }
    }

    /// Clear all bits without releasing the buffer.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Count the number of set bits using hardware POPCNT.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn words(&self) -> &[u64] {
        &self.words
    }
}

/// Composite-flag sieve over one window of variable multipliers.
pub struct Sieve<'t> {
    table: &'t PrimeTable,
    capacity: usize,
    target_bits: u32,
    fixed_factor: Integer,
    window_start: u64,
    composite: PerChain<BitSieve>,
    /// Table index of the next prime to weave.
    prime_seq: usize,
    weave_depth: usize,
    cursor: usize,
}

impl<'t> Sieve<'t> {
    /// Build an empty (unwoven) sieve for window 0. `capacity` is clamped to
    /// [`MAX_SIEVE_SIZE`]; the target word only sizes the weave.
    pub fn new(
        table: &'t PrimeTable,
        capacity: usize,
        target_bits: u32,
        header_hash: HeaderHash,
        fixed_multiplier: &Integer,
    ) -> Self {
        let capacity = capacity.min(MAX_SIEVE_SIZE);
        let fixed_factor = Integer::from(fixed_multiplier * header_hash.to_integer());
        Sieve {
            table,
            capacity,
            target_bits,
            fixed_factor,
            window_start: 0,
            composite: PerChain::from_fn(|_| BitSieve::new(capacity)),
            prime_seq: 0,
            weave_depth: table.len(),
            cursor: 0,
        }
    }

    /// Rekey the sieve to a new header, fixed multiplier and window, reusing
    /// the bitmaps. The weave depth is kept.
    pub fn reset(&mut self, header_hash: HeaderHash, fixed_multiplier: &Integer, window_start: u64) {
        self.fixed_factor = Integer::from(fixed_multiplier * header_hash.to_integer());
        self.window_start = window_start;
        for (_, bits) in self.composite.iter_mut() {
            bits.clear_all();
        }
        self.prime_seq = 0;
        self.cursor = 0;
    }

    /// Change the target word for subsequent weaves.
    pub fn set_target(&mut self, target_bits: u32) {
        self.target_bits = target_bits;
    }

    /// Number of table primes to weave before [`Sieve::weave`] reports done.
    pub fn set_weave_depth(&mut self, depth: usize) {
        self.weave_depth = depth.min(self.table.len());
    }

    pub fn weave_depth(&self) -> usize {
        self.weave_depth
    }

    /// Weave the next table prime into the bitmaps.
    ///
    /// Returns false once the weave depth or the end of the table is reached,
    /// or the next prime is at least the sieve capacity.
    pub fn weave(&mut self) -> bool {
        if self.prime_seq >= self.weave_depth {
            return false;
        }
        let p = match self.table.get(self.prime_seq) {
            Some(p) if (p as usize) < self.capacity => p,
            _ => return false,
        };
        self.prime_seq += 1;

        let fixed_mod = self.fixed_factor.mod_u(p) as u64;
        // p | F: origin ± 1 is never divisible by p
        let Some(mut fixed_inverse) = mod_inverse(fixed_mod, p as u64) else {
            return true;
        };

        let p = p as u64;
        let two_inverse = (p + 1) / 2;
        let window_offset = self.window_start % p;
        let length = target::decode_length(self.target_bits) as u64;
        let sequences = if p == 2 { (2 * length).min(2) } else { 2 * length };

        for seq in 0..sequences {
            let sign = if seq % 2 == 0 { 1 } else { p - 1 };
            let solved = fixed_inverse * sign % p;
            let start = ((solved + p - window_offset) % p) as usize;
            let shape = if seq % 2 == 0 {
                ChainType::Cunningham1
            } else {
                ChainType::Cunningham2
            };
            self.composite[shape].set_stride(start, p as usize);
            if seq < length {
                self.composite[ChainType::BiTwin].set_stride(start, p as usize);
            }
            if seq % 2 == 1 {
                fixed_inverse = fixed_inverse * two_inverse % p;
            }
        }
        true
    }

    /// Weave until [`Sieve::weave`] reports done; returns the primes consumed.
    pub fn weave_all(&mut self) -> usize {
        let mut woven = 0;
        while self.weave() {
            woven += 1;
        }
        woven
    }

    /// Indices with at least one shape not flagged composite.
    pub fn candidate_count(&self) -> usize {
        let c1 = self.composite[ChainType::Cunningham1].words();
        let c2 = self.composite[ChainType::Cunningham2].words();
        let twin = self.composite[ChainType::BiTwin].words();
        let full_words = self.capacity / 64;
        let mut count = 0;
        for w in 0..c1.len() {
            let mut open = !(c1[w] & c2[w] & twin[w]);
            if w == full_words {
                open &= (1u64 << (self.capacity % 64)) - 1;
            }
            count += open.count_ones() as usize;
        }
        count
    }

    /// Next unflagged `(variable multiplier, shape)` after the cursor.
    ///
    /// For each index the rarer shapes win: bi-twin, then Cunningham 1, then
    /// Cunningham 2. Returns `None` and rewinds the cursor once the window is
    /// exhausted. Multiplier 0 (a zero origin) is never returned.
    pub fn next_candidate(&mut self) -> Option<(u64, ChainType)> {
        loop {
            let index = self.cursor;
            if index >= self.capacity {
                self.cursor = 0;
                return None;
            }
            self.cursor += 1;
            if index == 0 && self.window_start == 0 {
                continue;
            }
            for chain_type in ChainType::SCAN_ORDER {
                if !self.composite[chain_type].get(index) {
                    return Some((self.window_start + index as u64, chain_type));
                }
            }
        }
    }

    pub fn is_composite(&self, chain_type: ChainType, index: usize) -> bool {
        index < self.capacity && self.composite[chain_type].get(index)
    }

    pub fn fixed_factor(&self) -> &Integer {
        &self.fixed_factor
    }

    /// Last prime woven, if any.
    pub fn weaved_prime(&self) -> Option<u32> {
        self.prime_seq.checked_sub(1).and_then(|i| self.table.get(i))
    }

    /// Number of table primes consumed so far.
    pub fn primes_woven(&self) -> usize {
        self.prime_seq
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn window_start(&self) -> u64 {
        self.window_start
    }
}
