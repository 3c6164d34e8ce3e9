//! Small numeric helpers shared by the grid, growth-curve and histogram modules.

/// `n` evenly spaced samples over `[start, stop]`, both ends included.
///
/// `n == 1` returns `[start]`, `n == 0` an empty vector. The last sample is exactly `stop`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// `n` samples `10^e` with `e` evenly spaced over `[start_exp, stop_exp]`.
pub fn logspace(start_exp: f64, stop_exp: f64, n: usize) -> Vec<f64> {
    linspace(start_exp, stop_exp, n)
        .into_iter()
        .map(|e| 10f64.powf(e))
        .collect()
}

/// `true` when every element is strictly larger than the previous one.
pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}
