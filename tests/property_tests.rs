use num_bigint::BigUint;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use once_cell::sync::Lazy;
use tdss::modular::{mod_exp, mod_inv, mod_mul};
use tdss::{
    CurveEngine, CurveParams, CurvePrivateKey, DssConfig, FieldParams, FiniteFieldEngine,
    NamedCurve, Point, SignatureScheme,
};

static FIELD_PARAMS: Lazy<FieldParams> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(2024);
    FieldParams::generate_with(&mut rng, 256, &DssConfig::default()).unwrap()
});

static TOY_CURVE: Lazy<CurveParams> = Lazy::new(|| CurveParams::search(97, 2, 3).unwrap());

fn field_params() -> &'static FieldParams {
    &FIELD_PARAMS
}

fn toy_curve() -> &'static CurveParams {
    &TOY_CURVE
}

prop_compose! {
    fn message()(bytes in proptest::collection::vec(any::<u8>(), 1..64)) -> Vec<u8> {
        bytes
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn finite_field_roundtrip_and_bit_flip(msg in message(), seed in any::<u64>(), flip in any::<usize>()) {
        let mut engine = FiniteFieldEngine::with_params(field_params().clone(), DssConfig::default());
        let mut rng = StdRng::seed_from_u64(seed);
        let (private, public) = engine.generate_key_pair_with(&mut rng).unwrap();

        let signature = engine.sign_with(&mut rng, &msg, &private).unwrap();
        prop_assert!(engine.verify(&msg, &signature, &public).unwrap().valid);

        let mut tampered = msg.clone();
        let i = flip % tampered.len();
        tampered[i] ^= 1;
        prop_assert!(!engine.verify(&tampered, &signature, &public).unwrap().valid);
    }

    #[test]
    fn finite_field_incremented_component_fails(msg in message(), seed in any::<u64>()) {
        let mut engine = FiniteFieldEngine::with_params(field_params().clone(), DssConfig::default());
        let mut rng = StdRng::seed_from_u64(seed);
        let (private, public) = engine.generate_key_pair_with(&mut rng).unwrap();
        let signature = engine.sign_with(&mut rng, &msg, &private).unwrap();

        let mut bumped_r = signature.clone();
        bumped_r.r += 1u32;
        prop_assert!(!engine.verify(&msg, &bumped_r, &public).unwrap().valid);

        let mut bumped_s = signature.clone();
        bumped_s.s += 1u32;
        prop_assert!(!engine.verify(&msg, &bumped_s, &public).unwrap().valid);

        let mut bumped_z = signature.clone();
        bumped_z.z += 1u32;
        prop_assert!(!engine.verify(&msg, &bumped_z, &public).unwrap().valid);

        let mut shifted_s = signature;
        shifted_s.s += field_params().q();
        prop_assert!(!engine.verify(&msg, &shifted_s, &public).unwrap().valid);
    }

    #[test]
    fn curve_roundtrip_and_bit_flip(msg in message(), seed in any::<u64>(), flip in any::<usize>()) {
        let mut engine = CurveEngine::named(NamedCurve::P256, DssConfig::default());
        let mut rng = StdRng::seed_from_u64(seed);
        let (private, public) = engine.generate_key_pair_with(&mut rng).unwrap();

        let signature = engine.sign_with(&mut rng, &msg, &private).unwrap();
        prop_assert!(engine.verify(&msg, &signature, &public).unwrap().valid);

        let mut tampered = msg.clone();
        let i = flip % tampered.len();
        tampered[i] ^= 0x80;
        prop_assert!(!engine.verify(&tampered, &signature, &public).unwrap().valid);

        let mut bumped = signature.clone();
        bumped.s += 1u32;
        prop_assert!(!engine.verify(&msg, &bumped, &public).unwrap().valid);
    }

    #[test]
    fn toy_curve_sign_s_plus_one_fails(seed in any::<u64>(), s0 in prop_oneof![Just(1u32), Just(4u32)]) {
        let params = toy_curve();
        let engine = CurveEngine::new(params.clone(), DssConfig::default());
        let secret = params.scalar_mul(&BigUint::from(s0), params.generator());
        let private = CurvePrivateKey::new(secret);
        let public = engine.public_key_for(&private).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut signature = engine.sign_with(&mut rng, b"hello", &private).unwrap();
        prop_assert!(engine.verify(b"hello", &signature, &public).unwrap().valid);
        signature.s += 1u32;
        prop_assert!(!engine.verify(b"hello", &signature, &public).unwrap().valid);
    }

    #[test]
    fn toy_curve_multiples_on_curve(k in 0u64..200) {
        let params = toy_curve();
        let point = params.curve().mul_unreduced(&BigUint::from(k), params.generator());
        prop_assert!(point.is_infinity() || params.curve().is_on_curve(&point));
        prop_assert_eq!(point.is_infinity(), k % 5 == 0);
    }

    #[test]
    fn p256_scalar_mul_distributes(a in 1u64..10_000, b in 1u64..10_000) {
        let params = CurveParams::named(NamedCurve::P256);
        let g = params.generator();
        let lhs = params.curve().add(
            &params.scalar_mul(&BigUint::from(a), g),
            &params.scalar_mul(&BigUint::from(b), g),
        );
        let rhs = params.scalar_mul(&BigUint::from(a + b), g);
        prop_assert_eq!(lhs, rhs);
    }

    #[test]
    fn mod_inv_is_inverse(a in 1u64..1_000_000, m_index in 0usize..4) {
        let modulus = BigUint::from([97u64, 1_000_003, 2_147_483_647, 65_537][m_index]);
        let a = BigUint::from(a) % &modulus;
        prop_assume!(a != BigUint::from(0u32));
        let inverse = mod_inv(&a, &modulus).unwrap();
        prop_assert_eq!(mod_mul(&a, &inverse, &modulus), BigUint::from(1u32));
    }

    #[test]
    fn fermat_holds_for_generated_p(base in 2u64..1_000_000) {
        let p = field_params().p();
        let exponent = p - 1u32;
        prop_assert_eq!(mod_exp(&BigUint::from(base), &exponent, p), BigUint::from(1u32));
    }
}

#[test]
fn negation_cancels_on_p256() {
    let params = CurveParams::named(NamedCurve::P256);
    let g = params.generator();
    assert_eq!(params.curve().add(g, &params.curve().negate(g)), Point::Infinity);
}
