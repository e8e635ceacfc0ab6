use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primechain::primality::{self, PrimalityMode};
use primechain::validate::chain_origin;
use primechain::{check_proof_of_work, ConsensusParams, HeaderHash};
use rug::Integer;

const FIXTURE_HASH: &str = "9e2feb89414c343c1027c4d1c386bbc4cd613e30d8f16adf91b7584a2265b1f5";
const FIXTURE_MULTIPLIER: &str = "1033863382648637686945800";

fn fixture() -> (HeaderHash, Integer) {
    (
        HeaderHash::from_hex(FIXTURE_HASH).unwrap(),
        FIXTURE_MULTIPLIER.parse().unwrap(),
    )
}

fn bench_fermat_link(c: &mut Criterion) {
    let (hash, multiplier) = fixture();
    let candidate = chain_origin(&hash, &multiplier) - 1u32;
    c.bench_function("fermat_test(fixture origin - 1)", |b| {
        b.iter(|| primality::fermat_test(black_box(&candidate)));
    });
}

fn bench_grow_chain(c: &mut Criterion) {
    let (hash, multiplier) = fixture();
    let origin = chain_origin(&hash, &multiplier);
    c.bench_function("grow_chain(fixture, strict)", |b| {
        b.iter(|| primality::grow_chain(black_box(&origin), PrimalityMode::Strict));
    });
    c.bench_function("grow_chain(fixture, fermat)", |b| {
        b.iter(|| primality::grow_chain(black_box(&origin), PrimalityMode::FermatOnly));
    });
}

fn bench_check_proof_of_work(c: &mut Criterion) {
    let (hash, multiplier) = fixture();
    let params = ConsensusParams::testnet();
    c.bench_function("check_proof_of_work(fixture)", |b| {
        b.iter(|| {
            check_proof_of_work(
                &hash,
                black_box(0x042a3de0),
                &multiplier,
                &params,
                PrimalityMode::Strict,
            )
        });
    });
}

criterion_group!(
    benches,
    bench_fermat_link,
    bench_grow_chain,
    bench_check_proof_of_work,
);
criterion_main!(benches);
