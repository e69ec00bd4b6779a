//! Per-frame parameter drive loop
//!
//! `DriveLoop` owns everything the frame function reads: the pointer
//! tracker, the speech controller, the mouth estimator and the model handle.
//! Input handlers only mutate that state; `tick` is the single reader and the
//! only place parameters are pushed into the model.

use std::collections::HashSet;
use std::time::Duration;

use crate::avatar::{
    ExpressionSelector, ParamRange, ParameterBinding, ParameterSet, SpeechPhase, SpeechState,
};
use crate::config::{Config, MouthRelease};
use crate::error::{ModelError, Result};
use crate::input::{ModelLayout, PointerState, PointerTracker};
use crate::lipsync::{self, MouthEstimator, MouthFrame};
use crate::random::RandomSource;
use crate::runtime::{ModelRuntime, RenderHost};
use crate::speech::{
    Narrator, SpeechController, SpeechEvent, SpeechSynthesizer, StopReason, Transition,
    UtteranceId,
};

/// Hit area reported by a pointer-down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapTarget {
    Head,
    Body,
}

/// The animation-parameter drive loop
pub struct DriveLoop<M: ModelRuntime, H: RenderHost> {
    config: Config,
    model: Option<M>,
    host: H,
    rng: Box<dyn RandomSource>,
    estimator: Box<dyn MouthEstimator>,
    expressions: ExpressionSelector,
    pointer: PointerTracker,
    controller: SpeechController,
    speech: SpeechState,
    parameters: ParameterSet,
    clock: Duration,
    frames: u64,
    missing_model_logged: bool,
    rejected: HashSet<String>,
    bad_ranges: HashSet<String>,
}

impl<M: ModelRuntime, H: RenderHost> DriveLoop<M, H> {
    pub fn new(config: Config, model: Option<M>, host: H, rng: Box<dyn RandomSource>) -> Self {
        let layout = resolve_layout(&config, model.as_ref());
        let estimator = lipsync::build_estimator(&config.lipsync);
        tracing::info!(
            "Drive loop ready: {} bindings, {} lip sync, {:?} release",
            config.bindings.len(),
            estimator.name(),
            config.lipsync.release
        );

        Self {
            estimator,
            expressions: ExpressionSelector::new(&config.expression),
            pointer: PointerTracker::new(layout),
            controller: SpeechController::new(&config.speech, &config.lipsync),
            config,
            model,
            host,
            rng,
            speech: SpeechState::default(),
            parameters: ParameterSet::new(),
            clock: Duration::ZERO,
            frames: 0,
            missing_model_logged: false,
            rejected: HashSet::new(),
            bad_ranges: HashSet::new(),
        }
    }

    /// Attach (or replace) the model; returns the previous one
    pub fn attach_model(&mut self, model: M) -> Option<M> {
        let previous = self.model.replace(model);
        self.missing_model_logged = false;
        self.rejected.clear();
        self.bad_ranges.clear();
        self.relayout();
        tracing::info!("Model attached");
        previous
    }

    pub fn detach_model(&mut self) -> Option<M> {
        let model = self.model.take();
        if model.is_some() {
            tracing::info!("Model detached");
            self.relayout();
        }
        model
    }

    /// Viewport size changed
    pub fn resize(&mut self, width: f32, height: f32) {
        self.config.viewport.width = width;
        self.config.viewport.height = height;
        self.relayout();
    }

    /// Run one frame
    pub fn tick(&mut self, dt: Duration) {
        self.clock += dt;

        if let Some(transition) = self.controller.poll(self.clock) {
            self.on_transition(transition);
        }
        let revealed = self.controller.advance_caption(self.clock);
        if !revealed.is_empty() {
            tracing::debug!("Caption: +{}", revealed.join(" "));
        }

        let (x, y) = self.pointer.state().gaze();
        let mouth = self.next_mouth(dt);
        self.speech = self.speech.with_mouth_openness(mouth);

        let mut derived =
            ParameterSet::derive(&self.config.bindings, x, y, self.speech.mouth_openness());
        let bindings = &self.config.bindings;
        let model = self.model.as_ref();
        let bad_ranges = &mut self.bad_ranges;
        derived.retain(|id| match resolve_range(model, bindings, id) {
            Some(range) if !range.is_valid() => {
                if bad_ranges.insert(id.to_string()) {
                    tracing::warn!("Skipping {}: invalid range {:?}", id, range);
                }
                false
            }
            _ => true,
        });
        self.parameters = derived.clamped(|id| resolve_range(model, bindings, id));

        self.apply(dt);
        self.host.request_render();
        self.frames += 1;
    }

    /// Returns the hit area under the pointer, if any
    pub fn on_pointer_down(&mut self, x: f32, y: f32) -> Option<TapTarget> {
        self.pointer.pointer_down(x, y);

        let model = self.model.as_mut()?;
        let interaction = &self.config.interaction;
        if model.hit_test(&interaction.head_area, x, y) {
            let available = model.expression_ids();
            let expression = self.expressions.random(&available, self.rng.as_mut());
            tracing::info!("Head tapped, expression {}", expression);
            if let Err(e) = model.set_expression(&expression) {
                tracing::warn!("Could not set expression: {}", e);
            }
            Some(TapTarget::Head)
        } else if model.hit_test(&interaction.body_area, x, y) {
            let group = &interaction.tap_motion_group;
            tracing::info!("Body tapped, motion group {}", group);
            start_random_motion(model, group, self.rng.as_mut());
            Some(TapTarget::Body)
        } else {
            None
        }
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        self.pointer.pointer_move(x, y);
    }

    pub fn on_pointer_up(&mut self) {
        self.pointer.pointer_up();
    }

    /// Set an expression on the attached model
    pub fn set_expression(&mut self, id: &str) -> Result<()> {
        let model = self.model.as_mut().ok_or(ModelError::NotLoaded)?;
        model.set_expression(id)?;
        tracing::info!("Expression {}", id);
        Ok(())
    }

    /// Speak `text`, cancelling whatever is in flight first
    pub fn speak<S: SpeechSynthesizer>(
        &mut self,
        narrator: &mut Narrator<S>,
        text: &str,
    ) -> Result<UtteranceId> {
        narrator.cancel();

        let id = self.controller.allocate_id();
        let utterance = narrator.prepare(id, text);
        if let Some(transition) = self.controller.begin(&utterance, self.clock) {
            self.on_transition(transition);
        }

        if let Err(e) = narrator.speak(&utterance) {
            tracing::warn!("Could not speak {}: {}", id, e);
            self.controller.cancel();
            return Err(e.into());
        }
        tracing::info!("Requested {}: {:?}", id, text);
        Ok(id)
    }

    pub fn cancel_speech<S: SpeechSynthesizer>(&mut self, narrator: &mut Narrator<S>) {
        narrator.cancel();
        if let Some(transition) = self.controller.cancel() {
            self.on_transition(transition);
        }
    }

    /// Apply a lifecycle event from the synthesizer
    pub fn on_speech_event(&mut self, event: SpeechEvent) {
        if let Some(transition) = self.controller.handle(&event, self.clock) {
            self.on_transition(transition);
        }
    }

    /// PCM samples of the audio being played back
    pub fn feed_audio(&mut self, samples: &[f32]) {
        self.estimator.observe_audio(samples);
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn pointer(&self) -> PointerState {
        self.pointer.state()
    }

    pub fn speech(&self) -> SpeechState {
        self.speech
    }

    pub fn phase(&self) -> SpeechPhase {
        self.controller.phase()
    }

    /// Whether an utterance is pending or being spoken
    pub fn is_speech_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn caption(&self) -> Option<String> {
        self.controller.caption()
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn layout(&self) -> &ModelLayout {
        self.pointer.layout()
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn next_mouth(&mut self, dt: Duration) -> f32 {
        let current = self.speech.mouth_openness();
        match self.controller.phase() {
            SpeechPhase::Speaking => self.estimator.next_openness(MouthFrame {
                current,
                dt,
                words: self.controller.words(self.clock),
                rng: self.rng.as_mut(),
            }),
            SpeechPhase::Idle => lipsync::release(
                current,
                self.config.lipsync.release,
                self.config.lipsync.decay_factor,
            ),
        }
    }

    fn apply(&mut self, dt: Duration) {
        let Some(model) = self.model.as_mut() else {
            if !self.missing_model_logged {
                tracing::warn!("No model attached, skipping parameter updates");
                self.missing_model_logged = true;
            }
            return;
        };

        for (id, value) in self.parameters.iter() {
            if let Err(e) = model.set_parameter(id, value) {
                if self.rejected.insert(id.to_string()) {
                    tracing::warn!("Model rejected {}: {}", id, e);
                } else {
                    tracing::trace!("Model rejected {}: {}", id, e);
                }
            }
        }
        model.update(dt);
    }

    fn on_transition(&mut self, transition: Transition) {
        match transition {
            Transition::Started { id, text } => {
                tracing::info!("{} started speaking", id);
                self.speech = self.speech.with_active(true);
                self.estimator.reset();

                let Some(model) = self.model.as_mut() else {
                    return;
                };
                let available = model.expression_ids();
                if let Some(expression) =
                    self.expressions.select(&text, &available, self.rng.as_mut())
                {
                    tracing::debug!("Expression for {}: {}", id, expression);
                    if let Err(e) = model.set_expression(&expression) {
                        tracing::warn!("Could not set expression: {}", e);
                    }
                }
                if let Some(group) = &self.config.speech.gesture_group {
                    start_random_motion(model, group, self.rng.as_mut());
                }
            }
            Transition::Stopped { id, reason } => {
                match reason {
                    StopReason::Ended => tracing::info!("{} finished", id),
                    StopReason::Cancelled => tracing::info!("{} cancelled", id),
                    StopReason::TimedOut => tracing::warn!("{} timed out", id),
                }
                self.speech = self.speech.with_active(false);
                if self.config.lipsync.release == MouthRelease::Reset {
                    self.speech = self.speech.with_mouth_openness(0.0);
                }
                self.estimator.reset();

                if let Some(model) = self.model.as_mut() {
                    if let Err(e) = model.set_expression(self.expressions.neutral()) {
                        tracing::warn!("Could not restore neutral expression: {}", e);
                    }
                }
            }
        }
    }

    fn relayout(&mut self) {
        let layout = resolve_layout(&self.config, self.model.as_ref());
        tracing::debug!("Layout: center {:?}, size {:?}", layout.center, layout.size);
        self.pointer.set_layout(layout);
    }
}

fn resolve_layout<M: ModelRuntime>(config: &Config, model: Option<&M>) -> ModelLayout {
    let natural = model
        .and_then(|m| m.natural_size())
        .unwrap_or(config.placement.model_size);
    ModelLayout::resolve(&config.placement, &config.viewport, natural)
}

/// The model's declared range wins over the binding's
fn resolve_range<M: ModelRuntime>(
    model: Option<&M>,
    bindings: &[ParameterBinding],
    id: &str,
) -> Option<ParamRange> {
    model
        .and_then(|m| m.parameter_range(id))
        .or_else(|| bindings.iter().find(|b| b.id == id).map(|b| b.range()))
}

fn start_random_motion<M: ModelRuntime>(model: &mut M, group: &str, rng: &mut dyn RandomSource) {
    let Some(index) = rng.pick(model.motion_count(group)) else {
        tracing::debug!("No motions in group {}", group);
        return;
    };
    if let Err(e) = model.start_motion(group, index) {
        tracing::warn!("Could not start motion: {}", e);
    }
}
