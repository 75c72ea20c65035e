use tracing::debug;

pub(crate) const DEFAULT_FADE_SPEED: f32 = 550.0;
const OPAQUE: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadePhase {
    FadingOut,
    FadingIn,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeEvent {
    None,
    /// Screen is fully black; swap the world now.
    Midpoint,
    Finished,
}

/// Fade to black and back. Once started it runs both phases to the end.
#[derive(Debug, Clone)]
pub(crate) struct FadeTransition {
    speed: f32,
    alpha: f32,
    phase: FadePhase,
}

impl Default for FadeTransition {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_SPEED)
    }
}

impl FadeTransition {
    pub(crate) fn new(speed: f32) -> Self {
        Self {
            speed: speed.max(f32::EPSILON),
            alpha: 0.0,
            phase: FadePhase::Done,
        }
    }

    /// Starts a fade. Ignored while one is already running.
    pub(crate) fn start(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.alpha = 0.0;
        self.phase = FadePhase::FadingOut;
        debug!(speed = self.speed, "fade_started");
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        self.phase != FadePhase::Done
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> FadePhase {
        self.phase
    }

    pub(crate) fn alpha(&self) -> u8 {
        self.alpha.clamp(0.0, OPAQUE).round() as u8
    }

    pub(crate) fn update(&mut self, dt_seconds: f32) -> FadeEvent {
        match self.phase {
            FadePhase::FadingOut => {
                self.alpha += self.speed * dt_seconds;
                if self.alpha >= OPAQUE {
                    self.alpha = OPAQUE;
                    self.phase = FadePhase::FadingIn;
                    return FadeEvent::Midpoint;
                }
                FadeEvent::None
            }
            FadePhase::FadingIn => {
                self.alpha -= self.speed * dt_seconds;
                if self.alpha <= 0.0 {
                    self.alpha = 0.0;
                    self.phase = FadePhase::Done;
                    return FadeEvent::Finished;
                }
                FadeEvent::None
            }
            FadePhase::Done => FadeEvent::None,
        }
    }
}
