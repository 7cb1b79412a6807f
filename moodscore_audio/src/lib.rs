// Moodscore audio front end.
//
// Everything the emotion profiler needs from raw recordings lives here, so the
// music crate never touches a codec or an FFT directly:
// - decode.rs: the `AudioDecoder` seam, a symphonia-backed implementation that
//   yields a mono f32 buffer at the file's native rate, and corpus file listing
// - features.rs: short-time signal descriptors (STFT magnitudes, onset
//   envelope, autocorrelation tempo estimate, chroma, RMS) and the per-file
//   `Descriptors` summary built from them
//
// Decoding is fallible per file; callers are expected to skip files that fail
// rather than abort a batch.

pub mod decode;
pub mod features;

pub use decode::{AUDIO_EXTENSIONS, AudioDecoder, DecodeError, DecodedAudio, SymphoniaDecoder};
pub use decode::{decode_audio, list_audio_files};
pub use features::{AnalysisParams, Descriptors, describe};
