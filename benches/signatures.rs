use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;
use tdss::{
    CurveEngine, DssConfig, FieldParams, FiniteFieldEngine, NamedCurve, SignatureScheme,
};

const MESSAGE: &[u8] = b"The quick brown fox jumps over the lazy dog";

fn bench_finite_field(c: &mut Criterion) {
    let config = DssConfig::default().with_bit_length(256);
    let mut rng = StdRng::seed_from_u64(1);
    let params = FieldParams::generate_with(&mut rng, 256, &config).expect("parameters");
    let mut engine = FiniteFieldEngine::with_params(params, config);
    let (private_key, public_key) = engine.generate_key_pair_with(&mut rng).expect("key pair");
    let signature = engine.sign(MESSAGE, &private_key).expect("signature");

    c.bench_function("ff_sign_256", |b| {
        b.iter(|| engine.sign(black_box(MESSAGE), &private_key))
    });
    c.bench_function("ff_verify_256", |b| {
        b.iter(|| engine.verify(black_box(MESSAGE), &signature, &public_key))
    });
}

fn bench_elliptic_curve(c: &mut Criterion) {
    let mut engine = CurveEngine::named(NamedCurve::P256, DssConfig::default());
    let (private_key, public_key) = engine.generate_key_pair().expect("key pair");
    let signature = engine.sign(MESSAGE, &private_key).expect("signature");

    c.bench_function("ec_sign_p256", |b| {
        b.iter(|| engine.sign(black_box(MESSAGE), &private_key))
    });
    c.bench_function("ec_verify_p256", |b| {
        b.iter(|| engine.verify(black_box(MESSAGE), &signature, &public_key))
    });
}

criterion_group!(benches, bench_finite_field, bench_elliptic_curve);
criterion_main!(benches);
