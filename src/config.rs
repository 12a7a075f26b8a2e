//! Process-wide configuration for gradient synchronization.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `GRADIX_`) or by constructing a custom `GradixConfig`. The
//! configuration is read once at initialization and must be identical on
//! every rank: divergent settings change payload sizes and reduction
//! semantics, which the collective layer cannot detect locally.

use crate::compression::CodecKind;
use std::time::Duration;

/// Epsilon added inside `sign()` so that exact zeros quantize to +scale
/// instead of 0, keeping the payload two-valued.
pub const SIGN_EPSILON: f32 = 1e-13;

/// Floor added to divisors derived from runtime scalars (e.g. the optional
/// learning-rate post-scale) to avoid division by zero.
pub const DIV_EPSILON: f32 = 1e-5;

/// How top-K selects the surviving indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopKSelection {
    /// The K indices of largest absolute value.
    Largest,
    /// K indices chosen uniformly at random without replacement.
    Random,
}

/// Top-K sparsification policy for the quantizer.
#[derive(Debug, Clone)]
pub struct TopKPolicy {
    /// Hard cap on the number of selected elements. When non-zero,
    /// `k = min(cap, element_count)`. When zero, the cap is derived from
    /// `fraction` instead.
    pub cap: usize,
    /// Fraction of elements to keep, used only when `cap == 0`:
    /// `k = max(1, ceil(fraction * element_count))`.
    pub fraction: f64,
    pub selection: TopKSelection,
}

impl Default for TopKPolicy {
    fn default() -> Self {
        Self {
            cap: 1000,
            fraction: 0.001,
            selection: TopKSelection::Largest,
        }
    }
}

impl TopKPolicy {
    /// Number of elements to keep for a tensor of `element_count` elements.
    pub fn k_for(&self, element_count: usize) -> usize {
        if element_count == 0 {
            return 0;
        }
        if self.cap > 0 {
            self.cap.min(element_count)
        } else {
            ((element_count as f64 * self.fraction).ceil() as usize)
                .max(1)
                .min(element_count)
        }
    }
}

/// Tuning parameters for the synchronizer and collective layer.
#[derive(Debug, Clone)]
pub struct GradixConfig {
    /// Divide reduced gradients by world size (average) instead of summing.
    pub average: bool,

    /// Apply sign quantization to dense gradients. When false, dense
    /// gradients are reduced at full precision (codec still applies).
    pub quantization: bool,

    /// Carry compression error forward into the next step's quantizer input.
    pub error_feedback: bool,

    /// Top-K sparsification inside the quantizer. `None` = dense sign path.
    pub top_k: Option<TopKPolicy>,

    /// Secondary codec applied to the quantized payload before the wire.
    pub codec: CodecKind,

    /// Densify sparse gradients and send them down the dense path.
    pub sparse_as_dense: bool,

    /// Scale gradients by this factor before reduction and divide by
    /// `factor + DIV_EPSILON` after. Off by default; range management
    /// under quantization, not required for correctness.
    pub pre_scale: Option<f32>,

    /// Timeout for individual send/recv operations within collectives.
    pub collective_timeout: Duration,
}

impl Default for GradixConfig {
    fn default() -> Self {
        Self {
            average: true,
            quantization: true,
            error_feedback: true,
            top_k: None,
            codec: CodecKind::None,
            sparse_as_dense: false,
            pre_scale: None,
            collective_timeout: Duration::from_secs(30),
        }
    }
}

impl GradixConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `GRADIX_AVERAGE` (`true`/`false`)
    /// - `GRADIX_QUANTIZATION` (`true`/`false`)
    /// - `GRADIX_ERROR_FEEDBACK` (`true`/`false`)
    /// - `GRADIX_TOP_K` (`largest`/`random`, enables top-K)
    /// - `GRADIX_TOP_K_CAP`
    /// - `GRADIX_TOP_K_FRACTION`
    /// - `GRADIX_CODEC` (`none`/`fp16`)
    /// - `GRADIX_SPARSE_AS_DENSE` (`true`/`false`)
    /// - `GRADIX_COLLECTIVE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("GRADIX_AVERAGE") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.average = b;
            }
        }
        if let Ok(v) = std::env::var("GRADIX_QUANTIZATION") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.quantization = b;
            }
        }
        if let Ok(v) = std::env::var("GRADIX_ERROR_FEEDBACK") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.error_feedback = b;
            }
        }
        if let Ok(v) = std::env::var("GRADIX_TOP_K") {
            let selection = match v.as_str() {
                "largest" => Some(TopKSelection::Largest),
                "random" => Some(TopKSelection::Random),
                _ => None,
            };
            if let Some(selection) = selection {
                let mut policy = TopKPolicy {
                    selection,
                    ..TopKPolicy::default()
                };
                if let Ok(v) = std::env::var("GRADIX_TOP_K_CAP") {
                    if let Ok(n) = v.parse::<usize>() {
                        policy.cap = n;
                    }
                }
                if let Ok(v) = std::env::var("GRADIX_TOP_K_FRACTION") {
                    if let Ok(f) = v.parse::<f64>() {
                        policy.fraction = f;
                    }
                }
                cfg.top_k = Some(policy);
            }
        }
        if let Ok(v) = std::env::var("GRADIX_CODEC") {
            match v.as_str() {
                "none" => cfg.codec = CodecKind::None,
                "fp16" => cfg.codec = CodecKind::Fp16,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("GRADIX_SPARSE_AS_DENSE") {
            if let Ok(b) = v.parse::<bool>() {
                cfg.sparse_as_dense = b;
            }
        }
        if let Ok(v) = std::env::var("GRADIX_COLLECTIVE_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.collective_timeout = Duration::from_secs(s);
            }
        }

        cfg
    }
}
