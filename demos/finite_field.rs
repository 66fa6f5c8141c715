//! Finite-field signatures, step by step
//!
//! Starts from the textbook parameters p = 43, q = 7 with the private key
//! x = 3, then repeats the flow on freshly generated 256-bit parameters.

use tdss::forms::{self_power_table, solve_self_power};
use tdss::{
    DssConfig, FieldNonces, FieldParams, FieldPrivateKey, FiniteFieldEngine, SignatureScheme,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. Small parameters, fixed key and nonces
    println!("Small parameters p = 43, q = 7");
    let params = FieldParams::new(43u32.into(), 7u32.into())?;
    let engine = FiniteFieldEngine::with_params(params, DssConfig::default());
    let private_key = FieldPrivateKey::new(3u32.into());
    let public_key = engine.public_key_for(&private_key)?;
    println!("  x = 3, y = x^(-x) mod p = {}", public_key.value());
    println!(
        "  exponent modulus m = {}",
        engine.exponent_modulus(&private_key)?
    );

    let (signature, diagnostics) =
        engine.sign_with_nonces(b"test", &private_key, &FieldNonces::new(11, 2, 13))?;
    println!("  signature {signature}");
    for (name, value) in diagnostics.trace.iter() {
        println!("    {name:<12} = {value}");
    }
    let verification = engine.verify(b"test", &signature, &public_key)?;
    println!("  valid: {}\n", verification.valid);

    // 2. Why form 1.1 is only easy for tiny p
    println!("x^x mod 43 for the first few x:");
    for (x, y) in self_power_table(43, 6)? {
        println!("  {x}^{x} ≡ {y}");
    }
    let (found, attempts) = solve_self_power(27, 43)?;
    println!("  brute force for x^x ≡ 27: {found:?} after {attempts} candidates\n");

    // 3. Generated parameters and random nonces
    let config = DssConfig::default().with_bit_length(256);
    let mut engine = FiniteFieldEngine::new(config);
    let (private_key, public_key) = engine.generate_key_pair()?;
    if let Some(params) = engine.params() {
        println!("Generated {params}");
    }

    let message = b"The quick brown fox jumps over the lazy dog";
    let (signature, diagnostics) = engine.sign_traced(message, &private_key)?;
    println!("  sign ops:   {:?}", diagnostics.ops);
    let verification = engine.verify(message, &signature, &public_key)?;
    println!("  verify ops: {:?}", verification.diagnostics.ops);
    println!("  valid: {}", verification.valid);

    let other = b"The quick brown fox jumps over the lazy cat";
    let forged = engine.verify(other, &signature, &public_key)?;
    println!("  other message valid: {}", forged.valid);

    Ok(())
}
