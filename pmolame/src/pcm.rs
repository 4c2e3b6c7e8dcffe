use bytes::Bytes;

use crate::{error::LameError, options::PcmLayout};

/// Input handed to [`crate::Lame::set_buffer`].
#[derive(Debug, Clone)]
pub enum PcmInput {
    /// Already encoded bytes (WAV, MP3, raw PCM...), written as-is.
    Bytes(Bytes),
    /// Normalized `[-1.0, 1.0]` samples, quantized with the option layout.
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl From<Vec<u8>> for PcmInput {
    fn from(data: Vec<u8>) -> Self {
        PcmInput::Bytes(Bytes::from(data))
    }
}

impl From<Bytes> for PcmInput {
    fn from(data: Bytes) -> Self {
        PcmInput::Bytes(data)
    }
}

impl From<&[u8]> for PcmInput {
    fn from(data: &[u8]) -> Self {
        PcmInput::Bytes(Bytes::copy_from_slice(data))
    }
}

impl From<Vec<f32>> for PcmInput {
    fn from(samples: Vec<f32>) -> Self {
        PcmInput::F32(samples)
    }
}

impl From<Vec<f64>> for PcmInput {
    fn from(samples: Vec<f64>) -> Self {
        PcmInput::F64(samples)
    }
}

impl PcmInput {
    /// Bytes to persist for the codec.
    pub fn into_bytes(self, layout: &PcmLayout) -> Result<Bytes, LameError> {
        match self {
            PcmInput::Bytes(data) => Ok(data),
            PcmInput::F32(samples) => {
                float_to_pcm(samples.iter().map(|s| f64::from(*s)), samples.len(), layout)
            }
            PcmInput::F64(samples) => float_to_pcm(samples.iter().copied(), samples.len(), layout),
        }
    }
}

/// Quantizes float samples to fixed-point PCM.
///
/// NaN becomes silence, everything else is clamped to `[-1.0, 1.0]` first.
/// Only 8-bit output may be unsigned.
pub fn float_to_pcm<I>(samples: I, len: usize, layout: &PcmLayout) -> Result<Bytes, LameError>
where
    I: IntoIterator<Item = f64>,
{
    let bits = layout.bitwidth;
    let signed = layout.is_signed();
    let big_endian = layout.is_big_endian();

    if !signed && bits != 8 {
        return Err(LameError::UnsupportedSampleFormat(format!(
            "Float PCM input only supports signed samples for bitwidth {bits}"
        )));
    }

    let width = match bits {
        8 => 1,
        16 => 2,
        24 => 3,
        32 => 4,
        other => {
            return Err(LameError::UnsupportedSampleFormat(format!(
                "Unsupported bitwidth {other} for float PCM input"
            )));
        }
    };

    let mut out = Vec::with_capacity(len * width);
    for sample in samples {
        if signed {
            let value = scale_signed(sample, bits);
            let bytes = if big_endian {
                value.to_be_bytes()
            } else {
                value.to_le_bytes()
            };
            // keep the low `width` bytes of the two's complement value
            if big_endian {
                out.extend_from_slice(&bytes[4 - width..]);
            } else {
                out.extend_from_slice(&bytes[..width]);
            }
        } else {
            out.push(scale_unsigned(sample, bits) as u8);
        }
    }

    Ok(Bytes::from(out))
}

fn clamp_sample(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

fn scale_signed(value: f64, bits: u8) -> i32 {
    let value = clamp_sample(value);
    let negative_scale = 2f64.powi(i32::from(bits) - 1);
    let positive_max = negative_scale - 1.0;

    let scaled = if value < 0.0 {
        (value * negative_scale).round().max(-negative_scale)
    } else {
        (value * positive_max).round().min(positive_max)
    };
    scaled as i32
}

fn scale_unsigned(value: f64, bits: u8) -> u32 {
    let value = clamp_sample(value);
    let max = 2f64.powi(i32::from(bits)) - 1.0;
    let scaled = ((value + 1.0) / 2.0 * max).round();
    scaled.clamp(0.0, max) as u32
}
