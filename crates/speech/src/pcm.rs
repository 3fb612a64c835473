//! PCM16 sample handling shared by capture, playback and the hosted
//! speech services: base64 transport encoding, sample-rate conversion and
//! the ring buffer feeding the output stream.

use base64::Engine;
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree};

/// Creates a resampler converting between two sample rates, processing
/// `chunk_size` input frames at a time on a single channel.
pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

/// Splits samples into fixed-size chunks, zero-padding the final chunk so
/// every chunk satisfies the resampler's input size.
pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Heap-allocated ring buffer shared between the playback task and the
/// output stream callback.
pub fn shared_buffer(size: usize) -> HeapRb<f32> {
    HeapRb::new(size)
}

/// Encodes f32 samples as base64 little-endian PCM16, the wire format of
/// both hosted speech services.
pub fn encode_pcm16(samples: &[f32]) -> String {
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|&sample| {
            let v = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            v.to_le_bytes()
        })
        .collect();
    base64::engine::general_purpose::STANDARD.encode(&bytes)
}

/// Decodes base64 little-endian PCM16 into normalized f32 samples.
/// A malformed payload decodes to an empty vector and is logged, matching
/// the recover-and-continue handling of audio errors elsewhere.
pub fn decode_pcm16(base64_payload: &str) -> Vec<f32> {
    match base64::engine::general_purpose::STANDARD.decode(base64_payload) {
        Ok(bytes) => bytes
            .chunks_exact(2)
            .map(|chunk| {
                let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                (v as f32 / 32768.0).clamp(-1.0, 1.0)
            })
            .collect(),
        Err(e) => {
            tracing::error!("Failed to decode base64 audio payload: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubato::Resampler;

    #[test]
    fn pcm16_encoding_survives_a_round_trip() {
        let samples = vec![0.0_f32, 0.5, -0.5, 1.0, -1.0];
        let decoded = decode_pcm16(&encode_pcm16(&samples));
        assert_eq!(decoded.len(), samples.len());
        for (original, restored) in samples.iter().zip(decoded.iter()) {
            assert!((original - restored).abs() < 0.001, "{original} vs {restored}");
        }
    }

    #[test]
    fn malformed_payload_decodes_to_empty() {
        assert!(decode_pcm16("not base64 at all!").is_empty());
    }

    #[test]
    fn chunking_pads_the_tail_with_silence() {
        let samples = vec![1.0_f32; 5];
        let chunks = split_for_chunks(&samples, 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], vec![1.0; 4]);
        assert_eq!(chunks[1], vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn resampler_halves_the_sample_count() {
        let mut resampler = create_resampler(48000.0, 24000.0, 1024).unwrap();
        let input = vec![0.25_f32; 1024];
        let output = resampler.process(&[input.as_slice()], None).unwrap();
        let resampled = output.first().unwrap();
        assert!((resampled.len() as i64 - 512).abs() <= 8);
    }
}
