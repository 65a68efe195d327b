use rand::Rng;

/// 32-bit string hash over UTF-16 code units: `h = h * 31 + unit`, wrapping.
pub fn hash_seed(seed: &str) -> i32 {
    seed.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Numeric seed handed to the simulation constructor.
pub fn derive_seed<R: Rng + ?Sized>(seed: Option<&str>, rng: &mut R) -> u32 {
    match seed {
        Some(seed) => hash_seed(seed) as u32,
        None => rng.gen(),
    }
}
