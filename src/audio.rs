//! Audio model
//!
//! Volume levels, sound cues and the mixing rule are platform independent.
//! On wasm32 a Web Audio sink synthesises the cues procedurally, so no
//! sound files are needed.

use serde::{Deserialize, Serialize};

/// Three-step volume setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VolumeLevel {
    Mute,
    Low,
    #[default]
    High,
}

impl VolumeLevel {
    pub fn gain(self) -> f32 {
        match self {
            VolumeLevel::Mute => 0.0,
            VolumeLevel::Low => 0.5,
            VolumeLevel::High => 1.0,
        }
    }

    /// Settings-button order: Low → High → Mute → Low
    pub fn next(self) -> Self {
        match self {
            VolumeLevel::Low => VolumeLevel::High,
            VolumeLevel::High => VolumeLevel::Mute,
            VolumeLevel::Mute => VolumeLevel::Low,
        }
    }

    pub fn is_muted(self) -> bool {
        self == VolumeLevel::Mute
    }
}

/// Sounds the game can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Looping music
    Background,
    /// Truck engine, from the warning until the round is scored
    Truck,
    /// Block picked up
    Take,
    /// Block dropped
    Pop,
    /// Two blocks locked together
    Magnet,
    Win,
    Lose,
}

impl SoundCue {
    /// Loudness offset relative to the governing volume
    pub fn offset(self) -> f32 {
        match self {
            SoundCue::Background => -0.3,
            SoundCue::Truck => -0.1,
            SoundCue::Take | SoundCue::Pop => 0.0,
            SoundCue::Magnet => -0.2,
            SoundCue::Win | SoundCue::Lose => 0.0,
        }
    }

    /// Loops until stopped
    pub fn is_looping(self) -> bool {
        matches!(self, SoundCue::Background | SoundCue::Truck)
    }
}

/// Effective volume for each cue given the player's two settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SoundMixer {
    pub main: VolumeLevel,
    pub background: VolumeLevel,
}

impl SoundMixer {
    pub fn new(main: VolumeLevel, background: VolumeLevel) -> Self {
        Self { main, background }
    }

    pub fn cycle_main(&mut self) -> VolumeLevel {
        self.main = self.main.next();
        log::info!("Main volume: {:?}", self.main);
        self.main
    }

    pub fn cycle_background(&mut self) -> VolumeLevel {
        self.background = self.background.next();
        log::info!("Background volume: {:?}", self.background);
        self.background
    }

    /// Final gain in [0, 1]. Music is silent if either setting is muted.
    pub fn cue_volume(&self, cue: SoundCue) -> f32 {
        if self.main.is_muted() {
            return 0.0;
        }
        let level = match cue {
            SoundCue::Background => {
                if self.background.is_muted() {
                    return 0.0;
                }
                self.main.gain().min(self.background.gain())
            }
            _ => self.main.gain(),
        };
        (level + cue.offset()).clamp(0.0, 1.0)
    }
}

#[cfg(target_arch = "wasm32")]
pub use web_audio::WebAudioSink;

#[cfg(target_arch = "wasm32")]
mod web_audio {
    use super::SoundCue;
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    /// Loops sit under the one-shot effects
    const LOOP_GAIN: f32 = 0.2;

    /// A running loop: oscillator plus its gain node
    struct Voice {
        osc: OscillatorNode,
        gain: GainNode,
    }

    /// Plays cues through the Web Audio API
    pub struct WebAudioSink {
        ctx: Option<AudioContext>,
        background: Option<Voice>,
        truck: Option<Voice>,
    }

    impl Default for WebAudioSink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WebAudioSink {
        pub fn new() -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                background: None,
                truck: None,
            }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        /// Play a one-shot cue, or (re)start a loop at `vol`
        pub fn play(&mut self, cue: SoundCue, vol: f32) {
            let Some(ctx) = self.ctx.clone() else { return };

            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            if cue.is_looping() {
                self.stop(cue);
                if vol <= 0.0 {
                    return;
                }
                let voice = match cue {
                    SoundCue::Background => Self::start_loop(&ctx, 220.0, OscillatorType::Triangle, vol * LOOP_GAIN),
                    _ => Self::start_loop(&ctx, 55.0, OscillatorType::Sawtooth, vol * LOOP_GAIN),
                };
                match cue {
                    SoundCue::Background => self.background = voice,
                    _ => self.truck = voice,
                }
                return;
            }

            if vol <= 0.0 {
                return;
            }
            match cue {
                SoundCue::Take => Self::play_take(&ctx, vol),
                SoundCue::Pop => Self::play_pop(&ctx, vol),
                SoundCue::Magnet => Self::play_magnet(&ctx, vol),
                SoundCue::Win => Self::play_arpeggio(&ctx, vol, &[500.0, 600.0, 800.0, 1000.0]),
                SoundCue::Lose => Self::play_arpeggio(&ctx, vol, &[400.0, 350.0, 300.0, 200.0]),
                SoundCue::Background | SoundCue::Truck => {}
            }
        }

        /// Stop a looping cue
        pub fn stop(&mut self, cue: SoundCue) {
            let voice = match cue {
                SoundCue::Background => self.background.take(),
                SoundCue::Truck => self.truck.take(),
                _ => None,
            };
            if let Some(voice) = voice {
                voice.osc.stop().ok();
            }
        }

        /// Retune a running loop after a volume change
        pub fn set_loop_volume(&self, cue: SoundCue, vol: f32) {
            let voice = match cue {
                SoundCue::Background => self.background.as_ref(),
                SoundCue::Truck => self.truck.as_ref(),
                _ => None,
            };
            if let Some(voice) = voice {
                voice.gain.gain().set_value(vol * LOOP_GAIN);
            }
        }

        // === Sound generators ===

        fn create_osc(ctx: &AudioContext, freq: f32, osc_type: OscillatorType) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn start_loop(ctx: &AudioContext, freq: f32, osc_type: OscillatorType, level: f32) -> Option<Voice> {
            let (osc, gain) = Self::create_osc(ctx, freq, osc_type)?;
            gain.gain().set_value(level);
            osc.start().ok()?;
            Some(Voice { osc, gain })
        }

        /// Take - short rising blip
        fn play_take(ctx: &AudioContext, vol: f32) {
            let Some((osc, gain)) = Self::create_osc(ctx, 300.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.4, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.08).ok();
            osc.frequency().exponential_ramp_to_value_at_time(500.0, t + 0.08).ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.1).ok();
        }

        /// Pop - soft falling thump
        fn play_pop(ctx: &AudioContext, vol: f32) {
            let Some((osc, gain)) = Self::create_osc(ctx, 250.0, OscillatorType::Triangle) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.12).ok();
            osc.frequency().exponential_ramp_to_value_at_time(90.0, t + 0.12).ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.15).ok();
        }

        /// Magnet - metallic clack with a hum tail
        fn play_magnet(ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();
            if let Some((osc, gain)) = Self::create_osc(ctx, 900.0, OscillatorType::Square) {
                gain.gain().set_value_at_time(vol * 0.15, t).ok();
                gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.05).ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.06).ok();
            }
            if let Some((osc, gain)) = Self::create_osc(ctx, 120.0, OscillatorType::Sine) {
                gain.gain().set_value_at_time(vol * 0.3, t).ok();
                gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.25).ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.3).ok();
            }
        }

        fn play_arpeggio(ctx: &AudioContext, vol: f32, notes: &[f32]) {
            for (i, freq) in notes.iter().enumerate() {
                let delay = i as f64 * 0.12;
                if let Some((osc, gain)) = Self::create_osc(ctx, *freq, OscillatorType::Triangle) {
                    let t = ctx.current_time() + delay;
                    gain.gain().set_value_at_time(vol * 0.3, t).ok();
                    gain.gain().exponential_ramp_to_value_at_time(0.01, t + 0.3).ok();
                    osc.start_with_when(t).ok();
                    osc.stop_with_when(t + 0.4).ok();
                }
            }
        }
    }
}
