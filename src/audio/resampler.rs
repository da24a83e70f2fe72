use anyhow::{anyhow, bail, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Frames per channel handed to the sinc resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Sample-rate converter for interleaved 16-bit PCM
pub struct PcmResampler {
    resampler: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
}

impl PcmResampler {
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            bail!("Sample rates must be greater than 0");
        }
        if channels == 0 {
            bail!("Number of channels must be greater than 0");
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            2.0,
            params,
            CHUNK_FRAMES,
            channels as usize,
        )
        .map_err(|e| anyhow!("Failed to create resampler: {}", e))?;

        debug!(
            "Created resampler: {} Hz -> {} Hz, {} channels",
            input_rate, output_rate, channels
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels: channels as usize,
        })
    }

    /// Resample interleaved samples; the output stays interleaved
    pub fn resample(&mut self, input: &[i16]) -> Result<Vec<i16>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        if input.len() % self.channels != 0 {
            bail!(
                "{} samples do not divide into {} channels",
                input.len(),
                self.channels
            );
        }

        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let total_frames = input.len() / self.channels;
        let mut output =
            Vec::with_capacity((total_frames as f64 * ratio * 1.1) as usize * self.channels);

        let mut frame_offset = 0;
        while frame_offset < total_frames {
            let frames_remaining = total_frames - frame_offset;
            let frames_to_read = frames_remaining.min(CHUNK_FRAMES);

            // SincFixedIn takes exactly CHUNK_FRAMES per call; the tail stays zero-padded
            let mut planar = vec![vec![0.0f32; CHUNK_FRAMES]; self.channels];
            for frame_idx in 0..frames_to_read {
                let src = (frame_offset + frame_idx) * self.channels;
                for (ch, plane) in planar.iter_mut().enumerate() {
                    plane[frame_idx] = to_float(input[src + ch]);
                }
            }

            let resampled = self
                .resampler
                .process(&planar, None)
                .map_err(|e| anyhow!("Resampling failed: {}", e))?;

            let produced = resampled[0].len();
            let keep = if frames_remaining < CHUNK_FRAMES {
                ((frames_to_read as f64) * ratio).ceil() as usize
            } else {
                produced
            };

            for frame_idx in 0..keep.min(produced) {
                for plane in &resampled {
                    output.push(to_pcm(plane[frame_idx]));
                }
            }

            frame_offset += frames_to_read;
        }

        debug!(
            "Resampled {} frames -> {} frames",
            total_frames,
            output.len() / self.channels
        );

        Ok(output)
    }
}

/// Convert interleaved PCM between sample rates in one step
pub fn resample_pcm(
    input: &[i16],
    input_rate: u32,
    output_rate: u32,
    channels: u16,
) -> Result<Vec<i16>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }

    PcmResampler::new(input_rate, output_rate, channels)?.resample(input)
}

fn to_float(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

fn to_pcm(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(rate: u32, frames: usize) -> Vec<i16> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / rate as f32;
                ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0) as i16
            })
            .collect()
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(PcmResampler::new(0, 16000, 1).is_err());
        assert!(PcmResampler::new(44100, 0, 1).is_err());
        assert!(PcmResampler::new(44100, 16000, 0).is_err());
    }

    #[test]
    fn test_same_rate_is_unchanged() {
        let input = vec![1, -2, 3, -4];
        assert_eq!(resample_pcm(&input, 16000, 16000, 2).unwrap(), input);
    }

    #[test]
    fn test_downsample_non_integer_ratio() {
        let output = resample_pcm(&tone(44100, 44100), 44100, 16000, 1).unwrap();
        assert!(
            (output.len() as i64 - 16000).abs() <= 160,
            "one second should stay one second, got {} samples",
            output.len()
        );
    }

    #[test]
    fn test_upsample_doubles_length() {
        let output = resample_pcm(&tone(8000, 8000), 8000, 16000, 1).unwrap();
        assert!((output.len() as i64 - 16000).abs() <= 160);
        assert!(output.iter().any(|&s| s != 0), "signal should survive");
    }

    #[test]
    fn test_interleaved_channels_stay_paired() {
        // Left carries the tone, right is silent
        let left = tone(48000, 4800);
        let input: Vec<i16> = left.iter().flat_map(|&s| [s, 0]).collect();

        let output = resample_pcm(&input, 48000, 16000, 2).unwrap();

        assert_eq!(output.len() % 2, 0);
        assert!(output.chunks_exact(2).all(|pair| pair[1].abs() < 64));
        assert!(output.chunks_exact(2).any(|pair| pair[0].abs() > 1000));
    }

    #[test]
    fn test_rejects_ragged_interleaving() {
        let mut resampler = PcmResampler::new(48000, 16000, 2).unwrap();
        assert!(resampler.resample(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_empty_input() {
        let mut resampler = PcmResampler::new(8000, 16000, 1).unwrap();
        assert!(resampler.resample(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_pcm_conversion_clamps() {
        assert_eq!(to_pcm(to_float(i16::MIN)), i16::MIN);
        assert_eq!(to_pcm(1.5), i16::MAX);
        assert_eq!(to_pcm(to_float(1234)), 1234);
    }
}
