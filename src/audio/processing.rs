use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample planar channels between fixed rates. Used only for
/// sink-side adaptation when the output device does not run at the
/// clip's rate; decoded buffers themselves are never resampled.
pub fn resample(channels: &[Vec<f32>], from_rate: u32, to_rate: u32) -> Result<Vec<Vec<f32>>> {
    if from_rate == to_rate || channels.is_empty() || channels[0].is_empty() {
        return Ok(channels.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, params, channels[0].len(), channels.len())?;

    let input = channels.to_vec();
    let output = resampler.process(&input, None)?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_passthrough() {
        let channels = vec![vec![0.1f32, 0.2, 0.3]];
        let out = resample(&channels, 24000, 24000).unwrap();
        assert_eq!(out, channels);
    }

    #[test]
    fn doubling_the_rate_roughly_doubles_the_frames() {
        let channels = vec![vec![0.0f32; 2400], vec![0.0f32; 2400]];
        let out = resample(&channels, 24000, 48000).unwrap();
        assert_eq!(out.len(), 2);
        let frames = out[0].len();
        assert!(frames > 4000 && frames <= 5000, "got {frames} frames");
    }
}
