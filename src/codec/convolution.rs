//! FFT-accelerated linear convolution
//!
//! `y = IFFT(FFT(a) * FFT(b))` with both inputs zero-padded to the next power
//! of two at or above `len(a) + len(b) - 1`, so the circular product equals
//! the full linear convolution.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Full linear convolution of `a` and `b` (length `len(a) + len(b) - 1`)
///
/// Returns an empty vector if either input is empty.
pub fn fft_convolve(a: &[f32], b: &[f32]) -> Vec<f32> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let out_len = a.len() + b.len() - 1;
    let fft_size = out_len.next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);

    let mut fa = padded_complex(a, fft_size);
    let mut fb = padded_complex(b, fft_size);
    fft.process(&mut fa);
    fft.process(&mut fb);

    for (x, y) in fa.iter_mut().zip(&fb) {
        *x *= *y;
    }
    ifft.process(&mut fa);

    // rustfft leaves the inverse unscaled
    let scale = 1.0 / fft_size as f64;
    fa.iter()
        .take(out_len)
        .map(|c| (c.re * scale) as f32)
        .collect()
}

fn padded_complex(samples: &[f32], size: usize) -> Vec<Complex<f64>> {
    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&x| Complex::new(x as f64, 0.0))
        .collect();
    buffer.resize(size, Complex::new(0.0, 0.0));
    buffer
}
