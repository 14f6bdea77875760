/// Number of samples `input_len` samples become when converted between rates
pub fn output_len(input_len: usize, source_rate: u32, target_rate: u32) -> usize {
    (input_len as f64 * target_rate as f64 / source_rate as f64).round() as usize
}

/// Resample by linear interpolation between neighbouring input samples
///
/// Produces exactly `round(len * target_rate / source_rate)` samples.
pub fn resample_linear(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if samples.is_empty() || source_rate == target_rate {
        return samples.to_vec();
    }

    let out_len = output_len(samples.len(), source_rate, target_rate);
    let step = source_rate as f64 / target_rate as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = (position.floor() as usize).min(last);
            let next = (index + 1).min(last);
            let frac = position - index as f64;

            let current = samples[index] as f64;
            let value = current + (samples[next] as f64 - current) * frac;
            value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}
