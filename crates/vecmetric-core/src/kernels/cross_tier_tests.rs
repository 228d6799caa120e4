//! SIMD tiers against the serial baseline.
//!
//! Only tiers whose capability bits the running CPU reports are exercised;
//! on a machine without them these tests check nothing beyond Serial.

use half::f16;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{serial, KernelFn};
use crate::detect::capabilities;
use crate::dispatch::Tier;
use crate::metric::{DataType, MetricKind};

/// Dimensions straddling every block width (2..64 lanes) and its tails.
const DIMS: [usize; 20] = [
    0, 1, 2, 3, 7, 8, 9, 15, 16, 17, 31, 32, 33, 63, 64, 65, 127, 129, 768, 1031,
];

const DENSE_KINDS: [MetricKind; 3] = [
    MetricKind::InnerProduct,
    MetricKind::Cosine,
    MetricKind::SquaredEuclidean,
];

fn simd_tiers(datatype: DataType) -> Vec<Tier> {
    let detected = capabilities();
    Tier::PREFERENCE
        .into_iter()
        .filter(|tier| *tier != Tier::Serial)
        .filter(|tier| tier.is_compiled() && detected.contains(tier.required(datatype)))
        .collect()
}

/// Element types a test can feed to a [`KernelFn`] of the matching variant.
trait Invoke: Sized {
    /// # Safety
    ///
    /// `kernel` belongs to a tier the running CPU supports and
    /// `a.len() == b.len()`.
    unsafe fn invoke(kernel: KernelFn, a: &[Self], b: &[Self]) -> f64;
}

macro_rules! impl_invoke {
    ($ty:ty, $variant:ident) => {
        impl Invoke for $ty {
            unsafe fn invoke(kernel: KernelFn, a: &[Self], b: &[Self]) -> f64 {
                match kernel {
                    KernelFn::$variant(f) => f64::from(f(a, b)),
                    _ => panic!("kernel does not take {}", stringify!($ty)),
                }
            }
        }
    };
}

impl_invoke!(f64, F64);
impl_invoke!(f32, F32);
impl_invoke!(f16, F16);
impl_invoke!(i8, I8);

impl Invoke for u8 {
    unsafe fn invoke(kernel: KernelFn, a: &[Self], b: &[Self]) -> f64 {
        match kernel {
            KernelFn::B1(f) => f64::from(f(a, b)),
            KernelFn::B1Count(f) => f(a, b) as f64,
            _ => panic!("kernel does not take u8"),
        }
    }
}

fn run<T: Invoke>(kernel: KernelFn, a: &[T], b: &[T]) -> f64 {
    assert_eq!(a.len(), b.len());
    // SAFETY: callers only pass kernels of tiers whose capabilities were
    // detected; lengths are checked above.
    unsafe { T::invoke(kernel, a, b) }
}

fn assert_close(tier: Tier, kind: MetricKind, dim: usize, got: f64, expected: f64) {
    if expected.is_nan() {
        assert!(got.is_nan(), "{tier} {kind} dim={dim}: expected NaN, got {got}");
        return;
    }
    let tolerance = 1e-3 * expected.abs().max(1.0) + 1e-5 * dim as f64;
    assert!(
        (got - expected).abs() <= tolerance,
        "{tier} {kind} dim={dim}: got {got}, expected {expected}"
    );
}

fn check_dense<T: Invoke>(datatype: DataType, gen: impl Fn(&mut StdRng) -> T) {
    let mut rng = StdRng::seed_from_u64(0x5eed_0000 + datatype.index() as u64);
    for tier in simd_tiers(datatype) {
        for dim in DIMS {
            let a: Vec<T> = (0..dim).map(|_| gen(&mut rng)).collect();
            let b: Vec<T> = (0..dim).map(|_| gen(&mut rng)).collect();
            for kind in DENSE_KINDS {
                let simd = tier.resolve(kind, datatype).expect("tier covers dense metrics");
                let baseline = serial::resolve(kind, datatype).expect("serial covers dense metrics");
                let got = run(simd, a.as_slice(), b.as_slice());
                let expected = run(baseline, a.as_slice(), b.as_slice());
                if dim == 0 && kind == MetricKind::Cosine {
                    assert!(got.is_nan() && expected.is_nan());
                    continue;
                }
                assert_close(tier, kind, dim, got, expected);
            }
        }
    }
}

// ============================================================================
// Dense
// ============================================================================

#[test]
fn test_f64_tiers_match_serial() {
    check_dense(DataType::F64, |rng| rng.gen_range(-1.0..1.0_f64));
}

#[test]
fn test_f32_tiers_match_serial() {
    check_dense(DataType::F32, |rng| rng.gen_range(-1.0..1.0_f32));
}

#[test]
fn test_f16_tiers_match_serial() {
    check_dense(DataType::F16, |rng| f16::from_f32(rng.gen_range(-1.0..1.0_f32)));
}

#[test]
fn test_i8_tiers_match_serial_exactly() {
    let mut rng = StdRng::seed_from_u64(42);
    for tier in simd_tiers(DataType::I8) {
        for dim in DIMS {
            let a: Vec<i8> = (0..dim).map(|_| rng.gen()).collect();
            let b: Vec<i8> = (0..dim).map(|_| rng.gen()).collect();
            for kind in DENSE_KINDS {
                let simd = tier.resolve(kind, DataType::I8).expect("tier covers i8");
                let baseline = serial::resolve(kind, DataType::I8).expect("serial covers i8");
                let got = run(simd, a.as_slice(), b.as_slice());
                let expected = run(baseline, a.as_slice(), b.as_slice());
                if expected.is_nan() {
                    assert!(got.is_nan());
                } else {
                    assert_eq!(got, expected, "{tier} {kind} dim={dim}");
                }
            }
        }
    }
}

#[test]
fn test_i8_long_vectors_do_not_overflow_lanes() {
    // Enough iterations to cross the spill interval on every tier, with the
    // largest possible products.
    let dim = 70_000;
    let a = vec![-128_i8; dim];
    let b = vec![127_i8; dim];
    for tier in simd_tiers(DataType::I8) {
        let dot = tier.resolve(MetricKind::InnerProduct, DataType::I8).expect("i8 dot");
        let l2sq = tier.resolve(MetricKind::SquaredEuclidean, DataType::I8).expect("i8 l2sq");

        let expected_dot = (-128.0 * 127.0 * dim as f64) as f32;
        let expected_l2sq = (255.0 * 255.0 * dim as f64) as f32;
        assert_eq!(run(dot, a.as_slice(), b.as_slice()), f64::from(expected_dot), "{tier}");
        assert_eq!(run(l2sq, a.as_slice(), b.as_slice()), f64::from(expected_l2sq), "{tier}");
    }
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_hamming_tiers_match_serial_exactly() {
    let mut rng = StdRng::seed_from_u64(7);
    for tier in simd_tiers(DataType::B1) {
        let simd = tier.resolve(MetricKind::Hamming, DataType::B1).expect("tier covers hamming");
        for dim in DIMS {
            let a: Vec<u8> = (0..dim).map(|_| rng.gen()).collect();
            let b: Vec<u8> = (0..dim).map(|_| rng.gen()).collect();
            assert_eq!(
                run(simd, a.as_slice(), b.as_slice()),
                serial::hamming_b1(&a, &b) as f64,
                "{tier} dim={dim}"
            );
        }
    }
}

#[test]
fn test_hamming_known_patterns_on_every_tier() {
    for tier in simd_tiers(DataType::B1) {
        let simd = tier.resolve(MetricKind::Hamming, DataType::B1).expect("tier covers hamming");
        for dim in [1, 31, 32, 33, 64, 65, 100] {
            let a = vec![0b1111_0000_u8; dim];
            let b = vec![0b0000_1111_u8; dim];
            assert_eq!(run(simd, a.as_slice(), b.as_slice()), 8.0 * dim as f64);
            assert_eq!(run(simd, a.as_slice(), a.as_slice()), 0.0);
        }
    }
}

#[test]
fn test_tanimoto_is_serial_only() {
    for tier in [Tier::Neon, Tier::Avx2, Tier::Avx512] {
        assert!(tier.resolve(MetricKind::Tanimoto, DataType::B1).is_none());
    }
}

// ============================================================================
// Length contract
// ============================================================================

#[cfg(debug_assertions)]
fn panics_on_short_b<T>(kernel: KernelFn, a: &[T], b: &[T]) -> bool
where
    T: Invoke + std::panic::RefUnwindSafe,
{
    std::panic::catch_unwind(|| {
        // SAFETY: the tier was detected; the kernel's length assertion fires
        // before any vector load.
        unsafe { T::invoke(kernel, a, b) }
    })
    .is_err()
}

#[cfg(debug_assertions)]
#[test]
fn test_simd_kernels_assert_equal_lengths() {
    let (long_f32, short_f32) = (vec![1.0_f32; 64], vec![1.0_f32; 8]);
    let (long_i8, short_i8) = (vec![1_i8; 64], vec![1_i8; 8]);
    let (long_b1, short_b1) = (vec![0xff_u8; 64], vec![0xff_u8; 8]);

    for kind in DENSE_KINDS {
        for tier in simd_tiers(DataType::F32) {
            let kernel = tier.resolve(kind, DataType::F32).expect("dense f32 kernel");
            assert!(panics_on_short_b(kernel, &long_f32, &short_f32), "{tier} {kind} f32");
        }
        for tier in simd_tiers(DataType::I8) {
            let kernel = tier.resolve(kind, DataType::I8).expect("dense i8 kernel");
            assert!(panics_on_short_b(kernel, &long_i8, &short_i8), "{tier} {kind} i8");
        }
    }
    for tier in simd_tiers(DataType::B1) {
        let kernel = tier.resolve(MetricKind::Hamming, DataType::B1).expect("hamming kernel");
        assert!(panics_on_short_b(kernel, &long_b1, &short_b1), "{tier} hamming");
    }
}
