use rand::SeedableRng;
use rand::rngs::StdRng;
use std::thread;
use tdss::metrics::HASH_OPS_PER_SIGN;
use tdss::{
    CurveEngine, CurveParams, DssConfig, FieldParams, FiniteFieldEngine, NamedCurve,
    SignatureScheme,
};

#[test]
fn test_hash_counter_grows_per_sign() {
    let mut rng = StdRng::seed_from_u64(8);
    let config = DssConfig::default().with_min_subgroup_bits(16);
    let params = FieldParams::generate_with(&mut rng, 64, &config).unwrap();
    let mut engine = FiniteFieldEngine::with_params(params, config);
    let (private, _) = engine.generate_key_pair_with(&mut rng).unwrap();

    let before = engine.metrics_snapshot().hashes;
    let n = 7;
    for i in 0..n {
        let message = format!("message {i}");
        engine.sign_with(&mut rng, message.as_bytes(), &private).unwrap();
    }
    assert_eq!(engine.metrics_snapshot().hashes - before, n * HASH_OPS_PER_SIGN);
}

#[test]
fn test_per_call_operation_counts() {
    let mut engine = CurveEngine::new(CurveParams::search(97, 2, 3).unwrap(), DssConfig::default());
    let mut rng = StdRng::seed_from_u64(9);
    let (private, public, keygen) = engine.generate_key_pair_traced_with(&mut rng).unwrap();
    assert_eq!(keygen.ops.point_multiplications, 2);
    engine.metrics().reset();

    let (signature, sign) = engine.sign_traced_with(&mut rng, b"hello", &private).unwrap();
    assert_eq!(sign.ops.hashes, 1);
    assert_eq!(sign.ops.point_multiplications, 2);

    let verification = engine.verify(b"hello", &signature, &public).unwrap();
    let ops = verification.diagnostics.ops;
    assert_eq!(ops.hashes, 1);
    assert_eq!(ops.point_multiplications, 4);
    assert_eq!(ops.point_additions, 1);

    let total = engine.metrics_snapshot();
    assert_eq!(total.hashes, 2);
    assert_eq!(total.resamples, sign.ops.resamples);

    engine.metrics().reset();
    assert_eq!(engine.metrics_snapshot().total(), 0);
}

#[test]
fn test_keygen_is_counted() {
    let mut rng = StdRng::seed_from_u64(10);
    let config = DssConfig::default().with_min_subgroup_bits(16);
    let params = FieldParams::generate_with(&mut rng, 64, &config).unwrap();
    let mut field = FiniteFieldEngine::with_params(params, config);
    field.generate_key_pair_with(&mut rng).unwrap();
    let counts = field.metrics_snapshot();
    assert_eq!(counts.exponentiations, 2);
    assert_eq!(counts.inversions, 1);

    let mut curve = CurveEngine::named(NamedCurve::P256, DssConfig::default());
    curve.generate_key_pair_with(&mut rng).unwrap();
    let counts = curve.metrics_snapshot();
    assert_eq!(counts.point_multiplications, 2);
    assert_eq!(counts.hashes, 0);
}

#[test]
fn test_engine_shared_across_threads() {
    let mut engine = CurveEngine::new(CurveParams::search(97, 2, 3).unwrap(), DssConfig::default());
    let (private, public) = engine.generate_key_pair().unwrap();
    let engine = &engine;

    thread::scope(|scope| {
        for t in 0..4 {
            let private = private.clone();
            let public = public.clone();
            scope.spawn(move || {
                let message = format!("thread {t}");
                for _ in 0..5 {
                    let signature = engine.sign(message.as_bytes(), &private).unwrap();
                    assert!(engine.verify(message.as_bytes(), &signature, &public).unwrap().valid);
                }
            });
        }
    });

    assert_eq!(engine.metrics_snapshot().hashes, 40);
}
