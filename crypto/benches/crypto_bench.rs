use blaze_types::{MicroAmount, NetworkId, Principal};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blaze_crypto::{Domain, TransferMessage};

fn message() -> TransferMessage {
    TransferMessage {
        token: Principal::parse("SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token")
            .unwrap(),
        to: Principal::parse("SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS").unwrap(),
        amount: MicroAmount::new(1_000_000),
        nonce: 42,
    }
}

fn ed25519_sign_bench(c: &mut Criterion) {
    let kp = blaze_crypto::generate_keypair();
    let msg = [42u8; 128];

    c.bench_function("ed25519_sign_128B", |b| {
        b.iter(|| blaze_crypto::sign_message(black_box(&msg), &kp.private))
    });
}

fn structured_hash_bench(c: &mut Criterion) {
    let domain = Domain::blaze(NetworkId::Mainnet);
    let value = message().to_clarity().unwrap();

    c.bench_function("structured_data_hash", |b| {
        b.iter(|| blaze_crypto::structured_data_hash(&domain, black_box(&value)))
    });
}

fn sign_transfer_bench(c: &mut Criterion) {
    let kp = blaze_crypto::generate_keypair();
    let domain = Domain::blaze(NetworkId::Mainnet);
    let msg = message();

    c.bench_function("sign_transfer", |b| {
        b.iter(|| blaze_crypto::sign_transfer(black_box(&msg), &domain, &kp.private))
    });
}

fn verify_transfer_bench(c: &mut Criterion) {
    let kp = blaze_crypto::generate_keypair();
    let domain = Domain::blaze(NetworkId::Mainnet);
    let msg = message();
    let signer = blaze_crypto::derive_principal(&kp.public, NetworkId::Mainnet);
    let sig = blaze_crypto::sign_transfer(&msg, &domain, &kp.private).unwrap();

    c.bench_function("verify_transfer_signature", |b| {
        b.iter(|| {
            blaze_crypto::verify_transfer_signature(black_box(&sig), &signer, &msg, &domain)
        })
    });
}

fn hash160_bench(c: &mut Criterion) {
    let kp = blaze_crypto::generate_keypair();

    c.bench_function("blake2b_160_pubkey", |b| {
        b.iter(|| blaze_crypto::hash160(black_box(&kp.public)))
    });
}

criterion_group!(
    benches,
    ed25519_sign_bench,
    structured_hash_bench,
    sign_transfer_bench,
    verify_transfer_bench,
    hash160_bench,
);
criterion_main!(benches);
