// Signing, verification, and address-derivation benchmarks.
//
// Covers Ed25519 signing and verification of a single message, co-signer
// set verification at the sizes a policy allows, and program-derived
// address computation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use vault_gate_protocol::config::MAX_SIGNERS;
use vault_gate_protocol::crypto::{sign, verify, verify_all, Address, Keypair};

const MESSAGE: &[u8] = b"vault-gate/instruction/v1 propose withdraw 500 seq=42";

fn bench_sign_message(c: &mut Criterion) {
    let keypair = Keypair::generate();

    c.bench_function("ed25519/sign_message", |b| {
        b.iter(|| sign(&keypair, MESSAGE));
    });
}

fn bench_verify_signature(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let signature = sign(&keypair, MESSAGE);
    let address = keypair.address();

    c.bench_function("ed25519/verify_signature", |b| {
        b.iter(|| verify(&address, MESSAGE, &signature));
    });
}

fn bench_verify_cosigners(c: &mut Criterion) {
    let mut group = c.benchmark_group("ed25519/verify_cosigners");

    for size in [1, 4, MAX_SIGNERS] {
        let set: Vec<_> = (0..size)
            .map(|_| {
                let kp = Keypair::generate();
                (kp.address(), sign(&kp, MESSAGE))
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter(|| verify_all(MESSAGE, set).unwrap());
        });
    }

    group.finish();
}

fn bench_derive_address(c: &mut Criterion) {
    let owner = Keypair::generate().address();

    c.bench_function("address/derive_vault", |b| {
        b.iter(|| Address::derive(&[b"vault", owner.as_ref(), &7u64.to_le_bytes()]));
    });
}

criterion_group!(
    benches,
    bench_sign_message,
    bench_verify_signature,
    bench_verify_cosigners,
    bench_derive_address
);
criterion_main!(benches);
