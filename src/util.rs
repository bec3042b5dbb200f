pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Arithmetic mean of millisecond samples, rounded to the nearest integer.
pub fn rounded_mean_ms(data: &[u32]) -> Option<u32> {
    let as_f64: Vec<f64> = data.iter().map(|&ms| ms as f64).collect();
    mean(&as_f64).map(|m| m.round() as u32)
}
