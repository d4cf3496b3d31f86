//! Benchmark suite for omerta crypto operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use omerta_crypto::{generate_nonce, hash_blake3, KeyPair};

fn benchmark_keypair_generation(c: &mut Criterion) {
    c.bench_function("keypair_generation", |b| {
        b.iter(|| {
            let _keypair = KeyPair::generate().unwrap();
        })
    });
}

fn benchmark_signing(c: &mut Criterion) {
    let keypair = KeyPair::generate().unwrap();
    let message = b"omerta benchmark message for performance testing";

    c.bench_function("signing", |b| {
        b.iter(|| {
            let _signature = keypair.sign(black_box(message)).unwrap();
        })
    });
}

fn benchmark_verification(c: &mut Criterion) {
    let keypair = KeyPair::generate().unwrap();
    let message = b"omerta benchmark message for performance testing";
    let signature = keypair.sign(message).unwrap();

    c.bench_function("verification", |b| {
        b.iter(|| {
            let _result = keypair.verify(black_box(&signature), black_box(message)).unwrap();
        })
    });
}

fn benchmark_encryption(c: &mut Criterion) {
    let alice = KeyPair::generate().unwrap();
    let bob = KeyPair::generate().unwrap();
    let plaintext = b"omerta encryption benchmark data for performance testing";
    let associated_data = b"omerta-v1.0";

    c.bench_function("encryption", |b| {
        b.iter(|| {
            let _ciphertext = alice
                .encrypt_for(black_box(&bob.public_key), black_box(plaintext), black_box(associated_data))
                .unwrap();
        })
    });
}

fn benchmark_decryption(c: &mut Criterion) {
    let alice = KeyPair::generate().unwrap();
    let bob = KeyPair::generate().unwrap();
    let plaintext = b"omerta encryption benchmark data for performance testing";
    let associated_data = b"omerta-v1.0";
    let ciphertext = alice.encrypt_for(&bob.public_key, plaintext, associated_data).unwrap();

    c.bench_function("decryption", |b| {
        b.iter(|| {
            let _plaintext = bob
                .decrypt_from(black_box(&alice.public_key), black_box(&ciphertext), black_box(associated_data))
                .unwrap();
        })
    });
}

fn benchmark_hashing(c: &mut Criterion) {
    let data = b"omerta hashing benchmark data for performance testing with various data sizes";

    c.bench_function("blake3_hashing", |b| {
        b.iter(|| {
            let _hash = hash_blake3(black_box(data));
        })
    });
}

fn benchmark_nonce_generation(c: &mut Criterion) {
    c.bench_function("nonce_generation", |b| {
        b.iter(|| {
            let _nonce = generate_nonce();
        })
    });
}

fn benchmark_peer_id_derivation(c: &mut Criterion) {
    let keypair = KeyPair::generate().unwrap();

    c.bench_function("peer_id_derivation", |b| {
        b.iter(|| {
            let _id = black_box(&keypair.public_key).peer_id();
        })
    });
}

criterion_group!(
    benches,
    benchmark_keypair_generation,
    benchmark_signing,
    benchmark_verification,
    benchmark_encryption,
    benchmark_decryption,
    benchmark_hashing,
    benchmark_nonce_generation,
    benchmark_peer_id_derivation
);

criterion_main!(benches);
