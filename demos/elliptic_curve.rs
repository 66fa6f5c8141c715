//! Curve signatures with a secret generator point
//!
//! Searches a base point on y^2 = x^3 + 2x + 3 over F_97, signs with fixed
//! nonces, then runs the same flow on P-256.

use tdss::{
    CurveEngine, CurveNonces, CurveParams, CurvePrivateKey, DssConfig, NamedCurve, SignatureScheme,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. Toy curve from a point-counting search
    let params = CurveParams::search(97, 2, 3)?;
    println!("Toy curve: {params}");
    let engine = CurveEngine::new(params, DssConfig::default());

    let private_key = CurvePrivateKey::new(engine.params().generator().clone());
    let public_key = engine.public_key_for(&private_key)?;
    println!("  G_s = {}, P = {}", private_key.point(), public_key.point());

    let (signature, diagnostics) =
        engine.sign_with_nonces(b"hello", &private_key, &CurveNonces::new(1, 2))?;
    println!("  signature {signature}");
    for (name, value) in diagnostics.trace.iter() {
        println!("    {name:<4} = {value}");
    }
    let verification = engine.verify(b"hello", &signature, &public_key)?;
    println!("  valid: {}\n", verification.valid);

    // 2. P-256 with random keys and nonces
    let mut engine = CurveEngine::named(NamedCurve::P256, DssConfig::default());
    let (private_key, public_key) = engine.generate_key_pair()?;
    println!("P-256 public key {}", public_key.point());

    let messages: [&[u8]; 3] = [b"first message", b"second message", b"third message"];
    for message in messages {
        let signature = engine.sign(message, &private_key)?;
        let verification = engine.verify(message, &signature, &public_key)?;
        println!(
            "  {:<16} valid: {}",
            String::from_utf8_lossy(message),
            verification.valid
        );
    }
    println!("  cumulative: {:?}", engine.metrics_snapshot());

    Ok(())
}
