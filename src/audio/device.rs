//! ALSA PCM device wrappers for the capture and playback engines.
//!
//! Both directions use mono S16LE interleaved access. The requested
//! sample rate is a hint: `set_rate_near` lets the hardware substitute
//! its closest supported rate, and the negotiated value is reported
//! back so the engines can decide what to do about a mismatch.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};

use crate::error::AudioError;

/// Parameters actually negotiated with the hardware.
#[derive(Debug, Clone, Copy)]
pub struct PcmParams {
    /// Sample rate after negotiation; may differ from the request.
    pub sample_rate: u32,
    /// Period size in frames (mono, so frames == samples).
    pub period_size: usize,
}

/// Open a PCM device for microphone capture.
pub fn open_capture(device: &str, sample_rate: u32) -> Result<(PCM, PcmParams), AudioError> {
    open_pcm(device, Direction::Capture, sample_rate, None)
}

/// Open a PCM device for speaker playback.
pub fn open_playback(
    device: &str,
    sample_rate: u32,
    period_size: Option<usize>,
) -> Result<(PCM, PcmParams), AudioError> {
    open_pcm(device, Direction::Playback, sample_rate, period_size)
}

fn open_pcm(
    device: &str,
    direction: Direction,
    sample_rate: u32,
    period_size: Option<usize>,
) -> Result<(PCM, PcmParams), AudioError> {
    let acquisition = |source: alsa::Error| AudioError::Acquisition {
        device: device.to_string(),
        source,
    };

    let pcm = PCM::new(device, direction, false).map_err(acquisition)?;

    {
        let hwp = HwParams::any(&pcm).map_err(acquisition)?;
        hwp.set_access(Access::RWInterleaved).map_err(acquisition)?;
        hwp.set_format(Format::S16LE).map_err(acquisition)?;
        hwp.set_channels(1).map_err(acquisition)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)
            .map_err(acquisition)?;
        if let Some(ps) = period_size {
            hwp.set_period_size_near(ps as alsa::pcm::Frames, ValueOr::Nearest)
                .map_err(acquisition)?;
        }
        pcm.hw_params(&hwp).map_err(acquisition)?;
    }

    let params = {
        let hwp = pcm.hw_params_current().map_err(acquisition)?;
        PcmParams {
            sample_rate: hwp.get_rate().map_err(acquisition)?,
            period_size: hwp.get_period_size().map_err(acquisition)? as usize,
        }
    };

    tracing::debug!(
        device,
        direction = ?direction,
        rate = params.sample_rate,
        period = params.period_size,
        "opened PCM device"
    );

    Ok((pcm, params))
}
