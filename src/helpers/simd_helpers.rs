#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::{_mm256_add_pd, _mm256_loadu_pd, _mm256_setzero_pd, _mm256_storeu_pd};

/// Sum of a dense `f64` slice, AVX2-accelerated when the CPU supports it
pub fn sum_f64(values: &[f64]) -> f64 {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return unsafe { sum_f64_avx2_inner(values) };
        }
    }
    // scalar fallback
    values.iter().sum()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn sum_f64_avx2_inner(values: &[f64]) -> f64 {
    const LANES: usize = 4; // __m256d holds 4 f64s

    let chunks = values.chunks_exact(LANES);
    let remainder = chunks.remainder();

    let mut sum_arr = [0f64; LANES];
    unsafe {
        let mut sum = _mm256_setzero_pd();
        for chunk in chunks {
            let v = _mm256_loadu_pd(chunk.as_ptr());
            sum = _mm256_add_pd(sum, v);
        }
        _mm256_storeu_pd(sum_arr.as_mut_ptr(), sum);
    }

    // horizontal reduction
    let mut total: f64 = sum_arr.iter().sum();
    for &v in remainder {
        total += v;
    }
    total
}
