use criterion::{black_box, criterion_group, criterion_main, Criterion};
use primechain::prime_table::PrimeTable;
use primechain::sieve::{self, Sieve};
use primechain::{target, HeaderHash};

const FIXTURE_HASH: &str = "9e2feb89414c343c1027c4d1c386bbc4cd613e30d8f16adf91b7584a2265b1f5";

fn bench_prime_table_1m(c: &mut Criterion) {
    c.bench_function("PrimeTable::generate(1_000_000)", |b| {
        b.iter(|| PrimeTable::generate(black_box(1_000_000)));
    });
}

fn bench_pow_mod_large(c: &mut Criterion) {
    c.bench_function("pow_mod(large base, large exp)", |b| {
        b.iter(|| {
            sieve::pow_mod(
                black_box(123_456_789),
                black_box(987_654_321),
                black_box(1_000_000_007),
            )
        });
    });
}

fn bench_weave_round(c: &mut Criterion) {
    let table = PrimeTable::global();
    let hash = HeaderHash::from_hex(FIXTURE_HASH).unwrap();
    let multiplier = table.primorial(47);
    let mut sieve = Sieve::new(table, 100_000, target::from_length(10), hash, &multiplier);
    sieve.set_weave_depth(5_000);
    c.bench_function("weave 5000 primes, 100k window, length 10", |b| {
        b.iter(|| {
            sieve.reset(hash, &multiplier, black_box(0));
            sieve.weave_all();
            sieve.candidate_count()
        });
    });
}

fn bench_scan_candidates(c: &mut Criterion) {
    let table = PrimeTable::global();
    let hash = HeaderHash::from_hex(FIXTURE_HASH).unwrap();
    let multiplier = table.primorial(47);
    let mut sieve = Sieve::new(table, 100_000, target::from_length(10), hash, &multiplier);
    sieve.set_weave_depth(5_000);
    sieve.weave_all();
    c.bench_function("scan 100k window", |b| {
        b.iter(|| {
            let mut found = 0u64;
            while let Some((variable, _)) = sieve.next_candidate() {
                found = found.wrapping_add(variable);
            }
            found
        });
    });
}

criterion_group!(
    benches,
    bench_prime_table_1m,
    bench_pow_mod_large,
    bench_weave_round,
    bench_scan_candidates,
);
criterion_main!(benches);
