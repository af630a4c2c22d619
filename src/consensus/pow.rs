// Proof of Work implementation

use crate::core::{Block, BlockCandidate, Hash256};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Largest meaningful difficulty: target 2^0 = 1, only the zero digest passes
pub const MAX_DIFFICULTY: u32 = 256;

/// Attempts between throughput log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("difficulty {0} is out of range (0..=256)")]
pub struct InvalidDifficulty(pub u32);

/// Difficulty target: a digest solves the puzzle iff, read as an unsigned
/// 256-bit big-endian integer, it is strictly below `2^(256 - difficulty)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    difficulty: u32,
    /// `None` stands for 2^256, which does not fit in 32 bytes
    threshold: Option<Hash256>,
}

impl Target {
    /// Compute the target for a difficulty given in bits
    pub fn from_difficulty(difficulty: u32) -> Result<Self, InvalidDifficulty> {
        if difficulty > MAX_DIFFICULTY {
            return Err(InvalidDifficulty(difficulty));
        }
        if difficulty == 0 {
            return Ok(Self { difficulty, threshold: None });
        }

        // Set the single bit at position 256 - difficulty
        let bit = (MAX_DIFFICULTY - difficulty) as usize;
        let mut bytes = [0u8; 32];
        bytes[31 - bit / 8] = 1 << (bit % 8);

        Ok(Self {
            difficulty,
            threshold: Some(Hash256::new(bytes)),
        })
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Target as 32 big-endian bytes, or `None` when it is 2^256
    pub fn threshold(&self) -> Option<&Hash256> {
        self.threshold.as_ref()
    }

    /// Check if a hash meets this target (hash < target)
    pub fn is_solved(&self, hash: &Hash256) -> bool {
        match &self.threshold {
            // Byte-wise ordering on fixed-width arrays is big-endian integer order
            Some(threshold) => hash.as_bytes() < threshold.as_bytes(),
            None => true,
        }
    }

    /// Mean number of attempts needed to solve a uniformly random puzzle
    pub fn expected_attempts(&self) -> f64 {
        2f64.powi(self.difficulty as i32)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.threshold {
            Some(threshold) => write!(f, "{}", threshold),
            None => write!(f, "1{}", "0".repeat(64)),
        }
    }
}

/// Why a search stopped before finding a solution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller flipped the cancel token
    Requested,
    /// The deadline passed
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancelled by caller"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("no valid nonce found after {attempts} attempts")]
    ExhaustedSearchSpace { attempts: u64 },
    #[error("mining stopped after {attempts} attempts: {reason}")]
    Cancelled { reason: CancelReason, attempts: u64 },
}

/// Shared flag another thread can use to stop a running search
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Optional stop conditions, checked once per nonce
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    cancel: Option<CancelToken>,
    deadline: Option<Instant>,
}

impl SearchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn interrupted(&self) -> Option<CancelReason> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Some(CancelReason::Requested);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Receives every attempted nonce and its digest
pub trait ProgressObserver {
    fn on_attempt(&mut self, nonce: u64, hash: &Hash256);
}

impl<F> ProgressObserver for F
where
    F: FnMut(u64, &Hash256),
{
    fn on_attempt(&mut self, nonce: u64, hash: &Hash256) {
        self(nonce, hash)
    }
}

/// Observer that ignores every attempt
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_attempt(&mut self, _nonce: u64, _hash: &Hash256) {}
}

/// Proof of Work miner
#[derive(Debug, Clone)]
pub struct Miner {
    target: Target,
    /// Last nonce tried before giving up (inclusive)
    max_nonce: u64,
    progress_interval: u64,
}

impl Miner {
    /// Create a new miner with fixed difficulty
    pub fn new(target: Target) -> Self {
        Self {
            target,
            max_nonce: u64::MAX,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce;
        self
    }

    /// Attempts between debug log lines; 0 disables them
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn max_nonce(&self) -> u64 {
        self.max_nonce
    }

    /// Mine a candidate with no stop conditions besides the nonce ceiling
    pub fn mine(&self, candidate: &BlockCandidate) -> Result<MiningResult, MiningError> {
        self.mine_with(candidate, &SearchControl::default(), &mut NoProgress)
    }

    /// Search nonces from 0 upward for one whose digest meets the target
    pub fn mine_with(
        &self,
        candidate: &BlockCandidate,
        control: &SearchControl,
        observer: &mut dyn ProgressObserver,
    ) -> Result<MiningResult, MiningError> {
        let start_time = Instant::now();
        let mut attempts = 0u64;

        for nonce in 0..=self.max_nonce {
            if let Some(reason) = control.interrupted() {
                log::warn!("Mining block {} {} after {} attempts", candidate.index, reason, attempts);
                return Err(MiningError::Cancelled { reason, attempts });
            }

            let hash = candidate.digest(nonce);
            attempts += 1;
            observer.on_attempt(nonce, &hash);

            if self.target.is_solved(&hash) {
                return Ok(MiningResult {
                    nonce,
                    hash,
                    attempts,
                    duration: start_time.elapsed(),
                });
            }

            if self.progress_interval > 0 && attempts % self.progress_interval == 0 {
                let elapsed = start_time.elapsed();
                log::debug!("Mining attempts: {} ({:.1} KH/s)",
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }
        }

        log::warn!("Exhausted nonce space for block {} after {} attempts", candidate.index, attempts);
        Err(MiningError::ExhaustedSearchSpace { attempts })
    }

    /// Verify that a block's content hashes below the target
    pub fn verify(&self, block: &Block) -> bool {
        self.target.is_solved(&block.compute_hash())
    }
}

/// Mining result
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// The nonce that was found
    pub nonce: u64,
    /// The resulting hash
    pub hash: Hash256,
    /// Number of attempts
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.attempts as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> BlockCandidate {
        BlockCandidate::with_timestamp(1, "prev", "hello", "2024-01-01T00:00:00Z")
    }

    #[test]
    fn test_target_bytes() {
        let target = Target::from_difficulty(8).unwrap();
        let mut expected = [0u8; 32];
        expected[0] = 0x01; // 2^248
        assert_eq!(target.threshold().unwrap().as_bytes(), &expected);

        let target = Target::from_difficulty(18).unwrap();
        let mut expected = [0u8; 32];
        expected[2] = 0x40; // 2^238
        assert_eq!(target.threshold().unwrap().as_bytes(), &expected);

        let target = Target::from_difficulty(256).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 0x01;
        assert_eq!(target.threshold().unwrap().as_bytes(), &expected);
    }

    #[test]
    fn test_target_rejects_out_of_range() {
        assert_eq!(Target::from_difficulty(257), Err(InvalidDifficulty(257)));
    }

    #[test]
    fn test_target_validation() {
        let target = Target::from_difficulty(8).unwrap();

        // Zero hash should always be valid (lowest possible)
        assert!(target.is_solved(&Hash256::zero()));
        // All 0xff hash should be invalid (highest possible)
        assert!(!target.is_solved(&Hash256::new([0xff; 32])));

        // Largest value below 2^248 passes, 2^248 itself does not
        let mut below = [0xffu8; 32];
        below[0] = 0;
        assert!(target.is_solved(&Hash256::new(below)));
        assert!(!target.is_solved(target.threshold().unwrap()));
    }

    #[test]
    fn test_difficulty_zero_accepts_everything() {
        let target = Target::from_difficulty(0).unwrap();
        assert!(target.threshold().is_none());
        assert!(target.is_solved(&Hash256::new([0xff; 32])));
        assert_eq!(target.to_string().len(), 65);
    }

    #[test]
    fn test_difficulty_zero_mines_at_nonce_zero() {
        let miner = Miner::new(Target::from_difficulty(0).unwrap());
        let result = miner.mine(&candidate()).unwrap();
        assert_eq!(result.nonce, 0);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn test_mined_hash_is_below_target() {
        let miner = Miner::new(Target::from_difficulty(8).unwrap());
        let result = miner.mine(&candidate()).unwrap();

        assert!(result.hash.leading_zeros() >= 8);
        assert_eq!(result.hash.as_bytes()[0], 0);
        assert_eq!(result.attempts, result.nonce + 1);
        assert!(miner.verify(&candidate().seal(&result)));
    }

    #[test]
    fn test_mining_is_deterministic() {
        let miner = Miner::new(Target::from_difficulty(6).unwrap());
        let a = miner.mine(&candidate()).unwrap();
        let b = miner.mine(&candidate()).unwrap();
        assert_eq!(a.nonce, b.nonce);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_exhausted_search_space() {
        // 2^-64 per attempt; 100 attempts will not succeed
        let miner = Miner::new(Target::from_difficulty(64).unwrap()).with_max_nonce(99);
        let err = miner.mine(&candidate()).unwrap_err();
        assert_eq!(err, MiningError::ExhaustedSearchSpace { attempts: 100 });
    }

    #[test]
    fn test_cancelled_before_first_attempt() {
        let token = CancelToken::new();
        token.cancel();
        let control = SearchControl::new().with_cancel(token);

        let miner = Miner::new(Target::from_difficulty(0).unwrap());
        let err = miner.mine_with(&candidate(), &control, &mut NoProgress).unwrap_err();
        assert_eq!(
            err,
            MiningError::Cancelled { reason: CancelReason::Requested, attempts: 0 }
        );
    }

    #[test]
    fn test_cancel_from_observer() {
        let token = CancelToken::new();
        let control = SearchControl::new().with_cancel(token.clone());
        let mut observer = |nonce: u64, _: &Hash256| {
            if nonce == 9 {
                token.cancel();
            }
        };

        let miner = Miner::new(Target::from_difficulty(128).unwrap());
        let err = miner.mine_with(&candidate(), &control, &mut observer).unwrap_err();
        assert_eq!(
            err,
            MiningError::Cancelled { reason: CancelReason::Requested, attempts: 10 }
        );
    }

    #[test]
    fn test_deadline_exceeded() {
        let control = SearchControl::new().with_deadline(Instant::now());
        let miner = Miner::new(Target::from_difficulty(128).unwrap());
        let err = miner.mine_with(&candidate(), &control, &mut NoProgress).unwrap_err();
        assert!(matches!(
            err,
            MiningError::Cancelled { reason: CancelReason::DeadlineExceeded, .. }
        ));
    }

    #[test]
    fn test_observer_sees_every_attempt() {
        let mut seen = Vec::new();
        let mut observer = |nonce: u64, hash: &Hash256| seen.push((nonce, *hash));

        let miner = Miner::new(Target::from_difficulty(4).unwrap());
        let result = miner
            .mine_with(&candidate(), &SearchControl::default(), &mut observer)
            .unwrap();

        assert_eq!(seen.len() as u64, result.attempts);
        assert_eq!(seen.last().unwrap(), &(result.nonce, result.hash));
        assert!(seen.iter().enumerate().all(|(i, (n, _))| *n == i as u64));
    }

    #[test]
    fn test_expected_attempts() {
        assert_eq!(Target::from_difficulty(0).unwrap().expected_attempts(), 1.0);
        assert_eq!(Target::from_difficulty(18).unwrap().expected_attempts(), 262144.0);
    }

    #[test]
    #[ignore] // Too slow for regular test runs
    fn test_pow_mining_default_difficulty() {
        let miner = Miner::new(Target::from_difficulty(18).unwrap());
        let result = miner.mine(&candidate()).unwrap();
        assert!(result.hash.leading_zeros() >= 18);
        println!("Mining took {} attempts in {:?}", result.attempts, result.duration);
    }
}
