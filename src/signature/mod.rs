pub mod codec;
pub mod extractor;

pub use codec::{ScaledCodec, DEFAULT_SCALING_FACTOR};
pub use extractor::{RawLocalModel, SignatureExtractor};
