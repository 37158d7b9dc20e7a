//! Stateless coordinate hashing for procedural placement.

/// Deterministic value in `[0, 1)` for a world seed and tile coordinate.
///
/// The same inputs always give the same output regardless of visiting order,
/// so nothing about the generated map needs to be stored.
pub fn noise(seed: u64, x: i32, y: i32) -> f64 {
    let mut h = seed;
    h ^= (x as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h = mix64(h);
    h ^= (y as u32 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h = mix64(h);

    // Top 53 bits fill an f64 mantissa exactly
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// SplitMix64 finalizer
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_noise_is_deterministic() {
        assert_eq!(noise(42, 10, -3), noise(42, 10, -3));
        assert_ne!(noise(42, 10, -3), noise(43, 10, -3));
        assert_ne!(noise(42, 10, -3), noise(42, -3, 10));
    }

    #[test]
    fn test_noise_is_roughly_uniform() {
        let samples = 100 * 100;
        let below_half = (0..100)
            .flat_map(|x| (0..100).map(move |y| noise(7, x, y)))
            .filter(|v| *v < 0.5)
            .count();
        let ratio = below_half as f64 / samples as f64;
        assert!((0.45..0.55).contains(&ratio), "ratio was {}", ratio);
    }

    proptest! {
        #[test]
        fn prop_noise_in_unit_interval(seed: u64, x: i32, y: i32) {
            let v = noise(seed, x, y);
            prop_assert!((0.0..1.0).contains(&v));
        }
    }
}
