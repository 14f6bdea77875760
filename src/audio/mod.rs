pub mod codec;
pub mod recorder;
pub mod resample;

pub use codec::{decode, decode_frame, encode, encode_frame, pcm_to_samples, samples_to_pcm};
pub use recorder::{CallRecorder, RecordingSummary};
pub use resample::resample_linear;
