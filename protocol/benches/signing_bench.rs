// Signing & verification benchmarks for the Meridian protocol.
//
// Covers keypair generation, authentication key derivation, and the raw
// byte-slice verification path compliance signatures take.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use meridian_protocol::crypto::keys::MeridianKeypair;
use meridian_protocol::crypto::signatures::{sign, verify, verify_raw};
use meridian_protocol::encoding::to_canonical_bytes;
use meridian_protocol::identity::{AccountAddress, AuthenticationKey};

fn bench_keypair_generation(c: &mut Criterion) {
    c.bench_function("ed25519/keypair_generate", |b| {
        b.iter(MeridianKeypair::generate);
    });
}

fn bench_authentication_key(c: &mut Criterion) {
    let public_key = MeridianKeypair::generate().public_key();

    c.bench_function("identity/authentication_key", |b| {
        b.iter(|| AuthenticationKey::ed25519(&public_key).derived_address());
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let keypair = MeridianKeypair::generate();
    let message = b"pay 500 XUS; ref=42";
    let signature = sign(&keypair, message);
    let public_key = keypair.public_key();

    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| verify(&public_key, message, &signature));
    });
}

fn bench_verify_raw(c: &mut Criterion) {
    let mut group = c.benchmark_group("ed25519/verify_raw");
    let keypair = MeridianKeypair::generate();
    let public_key = keypair.public_key_bytes();
    let payer = AccountAddress::from_u64(0xA0);

    for metadata_len in [0usize, 64, 1024] {
        let mut message = vec![0xAB; metadata_len];
        message.extend(to_canonical_bytes(&(payer, 1_000_000u64)).unwrap());
        let signature = sign(&keypair, &message);

        group.throughput(Throughput::Bytes(message.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(metadata_len),
            &message,
            |b, message| {
                b.iter(|| verify_raw(&public_key, message, signature.as_bytes()));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_keypair_generation,
    bench_authentication_key,
    bench_verify_signature,
    bench_verify_raw,
);
criterion_main!(benches);
