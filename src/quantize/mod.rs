mod memory;
mod signq;

pub use memory::ErrorFeedbackMemory;
pub use signq::{quantize, sign_quantize, QuantizeOutput};
