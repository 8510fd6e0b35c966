//! FFmpeg audio filter chains, one per effect kind.

use afx_models::EffectParams;

/// Longest echo delay in milliseconds, reached at 100% reverb.
pub const MAX_ECHO_DELAY_MS: f64 = 3000.0;

/// Echo gains used by the slowed chain.
pub const SLOWED_ECHO_GAINS: (&str, &str) = ("0.8", "0.88");

/// Echo gains used by the combined chain.
pub const ALL_EFFECTS_ECHO_GAINS: (&str, &str) = ("0.8", "0.8");

/// Decay of the single echo tap.
pub const ECHO_DECAY: &str = "0.35";

/// Echo delay in milliseconds for a reverb amount in percent.
pub fn echo_delay_ms(reverb_amount: f64) -> u32 {
    (reverb_amount / 100.0 * MAX_ECHO_DELAY_MS).round().max(0.0) as u32
}

fn echo_stage((in_gain, out_gain): (&str, &str), delay_ms: u32) -> String {
    format!("aecho={in_gain}:{out_gain}:{delay_ms}:{ECHO_DECAY}")
}

/// Build the comma-joined `-af` value for a parameter set.
///
/// The echo stage appears only when the computed delay is non-zero, the
/// flanger only when its depth is positive.
pub fn filter_chain(params: &EffectParams) -> String {
    let mut stages: Vec<String> = Vec::with_capacity(6);

    match *params {
        EffectParams::Speedup { speed, volume } => {
            stages.push(format!("atempo={speed}"));
            stages.push(format!("volume={volume}"));
        }
        EffectParams::Slowed {
            speed,
            reverb_amount,
            volume,
        } => {
            stages.push(format!("atempo={speed}"));
            let delay = echo_delay_ms(reverb_amount);
            if delay > 0 {
                stages.push(echo_stage(SLOWED_ECHO_GAINS, delay));
            }
            stages.push(format!("volume={volume}"));
        }
        EffectParams::Nightcore {
            speed,
            pitch,
            volume,
        } => {
            stages.push(format!("rubberband=pitch={pitch}"));
            stages.push(format!("atempo={speed}"));
            stages.push(format!("volume={volume}"));
        }
        EffectParams::AllEffects {
            speed,
            pitch,
            reverb_amount,
            volume,
            bass_gain,
            flanger_mix,
        } => {
            stages.push(format!("rubberband=pitch={pitch}"));
            stages.push(format!("atempo={speed}"));
            let delay = echo_delay_ms(reverb_amount);
            if delay > 0 {
                stages.push(echo_stage(ALL_EFFECTS_ECHO_GAINS, delay));
            }
            if flanger_mix > 0.0 {
                stages.push(format!("flanger=delay=30:depth={flanger_mix}:speed=1"));
            }
            stages.push(format!("volume={volume}"));
            stages.push(format!("bass=g={bass_gain}"));
        }
    }

    stages.join(",")
}
