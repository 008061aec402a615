//! The stage contract and bypass routing.
//!
//! Every link of the mastering chain implements [`Stage`]: it processes an
//! [`AudioBuffer`] in place and takes its parameters through `update`, never
//! by being rebuilt. Stages with an on/off switch are wrapped in [`Routed`],
//! which selects between the active stage and a unity bypass without touching
//! the graph's topology.

use remaster_core::AudioBuffer;

/// Samples per control frame. Parameter ramps last one frame.
pub const CONTROL_FRAME: usize = 128;

/// One DSP transformation in the chain.
pub trait Stage {
    /// The parameter struct this stage is configured from.
    type Params: ?Sized;

    /// Process `buffer` in place.
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Apply new parameters. Changes ramp in rather than jump.
    fn update(&mut self, params: &Self::Params);

    /// Clear all signal state and land every ramp on its target.
    fn reset(&mut self);

    /// Processing latency in samples.
    fn latency_samples(&self) -> usize {
        0
    }
}

/// Which path an optional stage's signal takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the stage.
    Active,
    /// Around the stage, at unity gain.
    Bypass,
}

/// An optional stage and its current route.
///
/// A stage that could not be built is held as unavailable and stays on the
/// bypass route whatever its `enabled` flag says.
#[derive(Debug)]
pub struct Routed<S> {
    stage: Option<S>,
    route: Route,
}

impl<S: Stage> Routed<S> {
    /// Wrap a built stage.
    pub fn new(stage: S, enabled: bool) -> Self {
        Self {
            stage: Some(stage),
            route: if enabled { Route::Active } else { Route::Bypass },
        }
    }

    /// A slot whose stage failed to build.
    pub fn unavailable() -> Self {
        Self {
            stage: None,
            route: Route::Bypass,
        }
    }

    /// Current route.
    pub fn route(&self) -> Route {
        self.route
    }

    /// Whether a stage instance exists.
    pub fn is_available(&self) -> bool {
        self.stage.is_some()
    }

    /// Select the route. Re-entering the active route starts from clean state.
    pub fn set_enabled(&mut self, enabled: bool) {
        let next = match (&mut self.stage, enabled) {
            (Some(stage), true) => {
                if self.route == Route::Bypass {
                    stage.reset();
                }
                Route::Active
            }
            _ => Route::Bypass,
        };
        self.route = next;
    }

    /// The stage, if it is on the active route.
    pub fn active(&self) -> Option<&S> {
        match self.route {
            Route::Active => self.stage.as_ref(),
            Route::Bypass => None,
        }
    }

    /// The stage instance regardless of route.
    pub fn stage(&self) -> Option<&S> {
        self.stage.as_ref()
    }

    /// Install a stage into the slot, returning the previous instance.
    pub fn replace(&mut self, stage: S) -> Option<S> {
        self.stage.replace(stage)
    }

    /// Empty the slot and route around it, returning the removed instance.
    pub fn take(&mut self) -> Option<S> {
        self.route = Route::Bypass;
        self.stage.take()
    }

    /// Process through whichever route is selected.
    #[inline]
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        if let (Route::Active, Some(stage)) = (self.route, self.stage.as_mut()) {
            stage.process(buffer);
        }
    }

    /// Forward parameters to the stage even while bypassed.
    pub fn update(&mut self, params: &S::Params) {
        if let Some(stage) = self.stage.as_mut() {
            stage.update(params);
        }
    }

    /// Reset the stage.
    pub fn reset(&mut self) {
        if let Some(stage) = self.stage.as_mut() {
            stage.reset();
        }
    }

    /// Latency of the selected route.
    pub fn latency_samples(&self) -> usize {
        self.active().map_or(0, Stage::latency_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Doubler {
        resets: usize,
        gain: f32,
    }

    impl Stage for Doubler {
        type Params = f32;

        fn process(&mut self, buffer: &mut AudioBuffer) {
            for channel in buffer.channels_mut() {
                for s in channel.iter_mut() {
                    *s *= self.gain;
                }
            }
        }

        fn update(&mut self, params: &f32) {
            self.gain = *params;
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn ones() -> AudioBuffer {
        AudioBuffer::from_planar(vec![vec![1.0; 4]], 48000).unwrap()
    }

    #[test]
    fn test_bypass_is_unity() {
        let mut routed = Routed::new(Doubler { resets: 0, gain: 2.0 }, false);
        let mut buffer = ones();
        routed.process(&mut buffer);
        assert_eq!(buffer, ones());
    }

    #[test]
    fn test_active_processes() {
        let mut routed = Routed::new(Doubler { resets: 0, gain: 2.0 }, true);
        let mut buffer = ones();
        routed.process(&mut buffer);
        assert_eq!(buffer.channel(0), &[2.0; 4]);
    }

    #[test]
    fn test_unavailable_stays_bypassed() {
        let mut routed: Routed<Doubler> = Routed::unavailable();
        routed.set_enabled(true);
        assert_eq!(routed.route(), Route::Bypass);
        assert!(routed.active().is_none());
    }

    #[test]
    fn test_take_leaves_slot_unavailable() {
        let mut routed = Routed::new(Doubler { resets: 0, gain: 2.0 }, true);
        assert_eq!(routed.take().map(|d| d.gain), Some(2.0));
        assert!(!routed.is_available());
        routed.set_enabled(true);
        let mut buffer = ones();
        routed.process(&mut buffer);
        assert_eq!(buffer, ones());
    }

    #[test]
    fn test_reenable_resets_state() {
        let mut routed = Routed::new(Doubler::default(), true);
        routed.set_enabled(true);
        assert_eq!(routed.stage().unwrap().resets, 0);
        routed.set_enabled(false);
        routed.set_enabled(true);
        assert_eq!(routed.stage().unwrap().resets, 1);
    }

    #[test]
    fn test_update_reaches_bypassed_stage() {
        let mut routed = Routed::new(Doubler::default(), false);
        routed.update(&3.0);
        assert_eq!(routed.stage().unwrap().gain, 3.0);
    }
}
