//! End-to-end proof-of-work validation against a known block.
//!
//! The fixture header mined a bi-twin chain of length `04.2a3de0` with
//! multiplier `1681380 × 47#`. Every test here goes through the public
//! `check_proof_of_work` entry point the way a node would.

use primechain::chain::{ChainLengths, ChainType};
use primechain::primality::{grow_chain, PrimalityMode};
use primechain::prime_table::PrimeTable;
use primechain::validate::{check_block_header_integrity, chain_origin};
use primechain::{check_proof_of_work, ConsensusParams, HeaderHash, PowError};
use rug::Integer;

const FIXTURE_HASH: &str = "9e2feb89414c343c1027c4d1c386bbc4cd613e30d8f16adf91b7584a2265b1f5";
const FIXTURE_MULTIPLIER: &str = "1033863382648637686945800";
const FIXTURE_BITS: u32 = 0x042a3de0;

fn hash() -> HeaderHash {
    HeaderHash::from_hex(FIXTURE_HASH).unwrap()
}

fn multiplier() -> Integer {
    FIXTURE_MULTIPLIER.parse().unwrap()
}

fn testnet() -> ConsensusParams {
    ConsensusParams::testnet()
}

#[test]
fn fixture_multiplier_is_a_primorial_multiple() {
    let table = PrimeTable::global();
    assert_eq!(table.primorial(47) * 1_681_380u32, multiplier());
    assert_eq!(table.primorial_form(&multiplier()), "1681380*47#");
}

#[test]
fn fixture_accepted_in_both_modes() {
    for mode in [PrimalityMode::Strict, PrimalityMode::FermatOnly] {
        let proof = check_proof_of_work(&hash(), FIXTURE_BITS, &multiplier(), &testnet(), mode).unwrap();
        assert_eq!(proof.chain_type, ChainType::BiTwin);
        assert_eq!(proof.chain_length, FIXTURE_BITS);
        assert_eq!(proof.lengths, ChainLengths::new(0x022a3de0, 0x0282b697, 0x042a3de0));
        assert_eq!(proof.origin, chain_origin(&hash(), &multiplier()));
    }
}

#[test]
fn target_one_fraction_step_above_is_too_short() {
    let err = check_proof_of_work(&hash(), FIXTURE_BITS + 1, &multiplier(), &testnet(), PrimalityMode::Strict)
        .unwrap_err();
    match err {
        PowError::ChainTooShort { target, lengths } => {
            assert_eq!(target, "04.2a3de1");
            assert_eq!(lengths.longest(), FIXTURE_BITS);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn easier_targets_accept_with_selection_order() {
    // 02.000000: every shape qualifies, bi-twin is preferred
    let proof = check_proof_of_work(&hash(), 0x02000000, &multiplier(), &testnet(), PrimalityMode::Strict).unwrap();
    assert_eq!(proof.chain_type, ChainType::BiTwin);
    assert_eq!(proof.chain_name(), "TWN04.2a3de0");
}

#[test]
fn neighbouring_multiplier_is_rejected() {
    let table = PrimeTable::global();
    let tampered = multiplier() + table.primorial(47) * 2u32;
    let lengths = grow_chain(&chain_origin(&hash(), &tampered), PrimalityMode::Strict);
    assert_eq!(lengths, ChainLengths::new(0x009a7d5e, 0x0084919b, 0x009a7d5e));
    let err = check_proof_of_work(&hash(), FIXTURE_BITS, &tampered, &testnet(), PrimalityMode::Strict).unwrap_err();
    assert!(matches!(err, PowError::ChainTooShort { .. }));
    assert!(err.is_chain_failure());
}

#[test]
fn halved_fixture_origin_is_shorter() {
    let origin = chain_origin(&hash(), &multiplier());
    let halved = grow_chain(&Integer::from(&origin >> 1), PrimalityMode::Strict);
    assert_eq!(halved, ChainLengths::new(0x00088b9a, 0x003a5645, 0x00088b9a));
}

#[test]
fn mainnet_rejects_short_target() {
    let err = check_proof_of_work(&hash(), FIXTURE_BITS, &multiplier(), &ConsensusParams::mainnet(), PrimalityMode::Strict)
        .unwrap_err();
    assert_eq!(
        err,
        PowError::TargetOutOfRange {
            target: "04.2a3de0".into(),
            min: 6,
            max: 99
        }
    );
}

#[test]
fn origin_range_checked_before_primality() {
    let err = check_block_header_integrity(&hash(), FIXTURE_BITS, &Integer::from(0), &testnet()).unwrap_err();
    assert_eq!(err, PowError::OriginOutOfRange { bits: 0 });
    // 256-bit hash: 2^1744 is the largest power-of-two multiplier in range
    let huge = Integer::from(1) << 1745;
    let err = check_block_header_integrity(&hash(), FIXTURE_BITS, &huge, &testnet()).unwrap_err();
    assert_eq!(err, PowError::OriginOutOfRange { bits: 2001 });
    let largest = Integer::from(1) << 1744;
    assert!(check_block_header_integrity(&hash(), FIXTURE_BITS, &largest, &testnet()).is_ok());
}

#[test]
fn other_primorial_multiple_measures_short() {
    let table = PrimeTable::global();
    let other = table.primorial(47) * 1_000_001u32;
    let lengths = grow_chain(&chain_origin(&hash(), &other), PrimalityMode::Strict);
    assert_eq!(lengths, ChainLengths::new(0x008f3f54, 0x006dfc69, 0x008f3f54));
}
