//! Sign quantization with L1-mean scaling.
//!
//! Every surviving element is replaced by `scale * sign(x)`, where `scale`
//! is the mean absolute value over the quantized set. Combined with error
//! feedback (the residual carries the quantization error into the next
//! step), this is unbiased in expectation while shrinking each gradient to
//! one sign per element plus one shared scale.

use rand::seq::index::sample;

use crate::config::{TopKPolicy, TopKSelection, SIGN_EPSILON};

/// Result of quantizing one gradient tensor.
pub struct QuantizeOutput {
    /// Dense quantized gradient, same length as the input.
    pub quantized: Vec<f32>,
    /// Error-feedback residual: input minus quantized, element-wise.
    pub residual: Vec<f32>,
}

/// Sign-quantize every element of `input`.
///
/// The scale is the L1 norm divided by the element count. The tiny epsilon
/// added before taking the sign maps exact zeros to `+scale` rather than
/// zero, so the wire representation stays a pure sign vector.
pub fn sign_quantize(input: &[f32]) -> Vec<f32> {
    if input.is_empty() {
        return Vec::new();
    }
    let scale = input.iter().map(|v| v.abs()).sum::<f32>() / input.len() as f32;
    input
        .iter()
        .map(|&v| scale * (v + SIGN_EPSILON).signum())
        .collect()
}

/// Quantize `input` after adding the error-feedback `residual`, optionally
/// keeping only K elements per `policy`.
///
/// With a top-K policy, the scale is computed over the selected subset only
/// and unselected positions are zero. A subset whose mean magnitude is not
/// positive (all-zero gradient, or NaN contamination) produces an all-zero
/// quantized tensor; the full compensated gradient then flows into the
/// residual and is retried next step.
pub fn quantize(input: &[f32], residual: &[f32], policy: Option<&TopKPolicy>) -> QuantizeOutput {
    debug_assert_eq!(input.len(), residual.len());
    let n = input.len();
    let compensated: Vec<f32> = input.iter().zip(residual).map(|(a, b)| a + b).collect();

    let quantized = match policy {
        None => sign_quantize(&compensated),
        Some(policy) => {
            let k = policy.k_for(n);
            let selected = select_indices(&compensated, k, policy.selection);
            let scale =
                selected.iter().map(|&i| compensated[i].abs()).sum::<f32>() / k.max(1) as f32;
            let mut out = vec![0.0f32; n];
            if scale > 0.0 {
                for &i in &selected {
                    out[i] = scale * (compensated[i] + SIGN_EPSILON).signum();
                }
            }
            out
        }
    };

    let new_residual: Vec<f32> = compensated
        .iter()
        .zip(&quantized)
        .map(|(c, q)| c - q)
        .collect();

    QuantizeOutput {
        quantized,
        residual: new_residual,
    }
}

fn select_indices(values: &[f32], k: usize, selection: TopKSelection) -> Vec<usize> {
    let n = values.len();
    let k = k.min(n);
    match selection {
        TopKSelection::Largest => {
            let mut indices: Vec<usize> = (0..n).collect();
            indices.sort_unstable_by(|&a, &b| {
                values[b]
                    .abs()
                    .partial_cmp(&values[a].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            indices.truncate(k);
            indices
        }
        TopKSelection::Random => sample(&mut rand::thread_rng(), n, k).into_vec(),
    }
}
