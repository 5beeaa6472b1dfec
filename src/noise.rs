//! Deterministic noise primitives shared by edge distortion and
//! terrain scattering.
//!
//! Nothing here holds state: identical inputs always give identical
//! outputs, which is what lets two polygons sharing an edge distort it
//! the same way.

/// Hash an integer lattice point to a value in [-1, 1].
pub fn hash_noise(ix: i32, iy: i32, seed: u32) -> f64 {
    let mut h = (ix as u32).wrapping_mul(374_761_393);
    h = h.wrapping_add((iy as u32).wrapping_mul(668_265_263));
    h = h.wrapping_add(seed.wrapping_mul(2_246_822_519));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    (h as f64 / u32::MAX as f64) * 2.0 - 1.0
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Value noise: lattice hashes blended bilinearly with smoothstep easing.
/// Result is in [-1, 1].
pub fn smooth_noise(x: f64, y: f64, seed: u32) -> f64 {
    let fx0 = x.floor();
    let fy0 = y.floor();
    // Lattice coordinates wrap into i32; canvas coordinates are far
    // below that range.
    let x0 = fx0 as i64 as i32;
    let y0 = fy0 as i64 as i32;
    let x1 = x0.wrapping_add(1);
    let y1 = y0.wrapping_add(1);

    // x - floor(x) rather than fract(), which keeps the sign for negatives.
    let sx = smoothstep(x - fx0);
    let sy = smoothstep(y - fy0);

    let n00 = hash_noise(x0, y0, seed);
    let n10 = hash_noise(x1, y0, seed);
    let n01 = hash_noise(x0, y1, seed);
    let n11 = hash_noise(x1, y1, seed);

    let n0 = n00 * (1.0 - sx) + n10 * sx;
    let n1 = n01 * (1.0 - sx) + n11 * sx;
    (n0 * (1.0 - sy) + n1 * sy).clamp(-1.0, 1.0)
}

/// Fast scalar pseudo-random value in [0, 1) from a float seed.
///
/// The classic sine-hash. The argument is reduced before `sin` so large
/// seeds keep their fractional entropy.
pub fn seeded_random(seed: f64) -> f64 {
    let arg = (seed * 12.9898 + 78.233) % 100_000.0;
    let v = arg.sin() * 43_758.545_3;
    let r = v - v.floor();
    if r >= 1.0 {
        0.0
    } else {
        r
    }
}

/// Stable 32-bit FNV-1a hash of a string.
pub fn hash_str(value: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in value.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}
