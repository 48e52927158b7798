// Cosmetic animation events and the per-instance scheduler
//
// Events queue up as "ongoing"; the highest-priority one drives the pose and
// the rest wait until it completes.

use std::collections::HashMap;
use std::fmt;

use log::trace;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::model::CosmeticModel;

/// A bone animation clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Name of the animation (e.g., "idle", "wave", "flap")
    pub name: String,
    /// Duration of one loop in seconds
    pub length: f32,
}

impl AnimationClip {
    pub fn new(name: &str, length: f32) -> Self {
        Self {
            name: name.to_string(),
            length,
        }
    }
}

/// Runtime condition an event reacts to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationTrigger {
    Idle,
    Equip,
    Emote,
    TextureAnimationStart,
    Custom(String),
}

/// Who gets to see an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationTarget {
    /// Only the wearer
    SelfOnly,
    /// Everyone
    #[default]
    All,
    /// Everyone but the wearer
    Others,
}

/// Whose screen this scheduler animates for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerContext {
    Wearer,
    Observer,
}

impl AnimationTarget {
    pub fn includes(self, viewer: ViewerContext) -> bool {
        match self {
            Self::SelfOnly => viewer == ViewerContext::Wearer,
            Self::All => true,
            Self::Others => viewer == ViewerContext::Observer,
        }
    }
}

/// Declarative rule mapping a trigger to an animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationEvent {
    pub name: String,
    /// Animation clip to play
    pub animation: String,
    pub trigger: AnimationTrigger,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub target: AnimationTarget,
    #[serde(default = "default_probability")]
    pub probability: f32,
    /// Fire only on every Nth match (0 = every match)
    #[serde(default)]
    pub skips: u32,
    /// Loops before the event completes (0 = never completes)
    #[serde(default = "default_loops")]
    pub loops: u32,
    #[serde(default)]
    pub on_complete: Option<Box<AnimationEvent>>,
}

fn default_probability() -> f32 {
    1.0
}

fn default_loops() -> u32 {
    1
}

impl AnimationEvent {
    pub fn new(name: &str, animation: &str, trigger: AnimationTrigger, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            animation: animation.to_string(),
            trigger,
            priority,
            target: AnimationTarget::All,
            probability: 1.0,
            skips: 0,
            loops: 1,
            on_complete: None,
        }
    }

    pub fn with_target(mut self, target: AnimationTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_skips(mut self, skips: u32) -> Self {
        self.skips = skips;
        self
    }

    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops;
        self
    }

    pub fn then(mut self, next: AnimationEvent) -> Self {
        self.on_complete = Some(Box::new(next));
        self
    }

    /// This event or one chained after it, by name
    fn find(&self, name: &str) -> Option<&AnimationEvent> {
        if self.name == name {
            return Some(self);
        }
        self.on_complete.as_deref().and_then(|next| next.find(name))
    }
}

/// A queued event
#[derive(Debug, Clone)]
struct OngoingEvent {
    event: AnimationEvent,
    /// Declaration index, used to break priority ties
    order: usize,
}

/// What the model's pose is currently playing
#[derive(Debug, Clone, Default)]
struct Pose {
    event: Option<String>,
    animation: Option<String>,
    started_at: f32,
}

/// Callback notifying other viewers that an animation fired
pub type BroadcastFn = Box<dyn FnMut(&str) + Send>;

/// Chooses and advances the animation of one cosmetic instance
pub struct AnimationScheduler {
    events: Vec<AnimationEvent>,
    clips: HashMap<String, AnimationClip>,
    ongoing: Vec<OngoingEvent>,
    skip_counters: HashMap<String, u32>,
    pose: Pose,
    /// Scheduler clock in seconds
    lifetime: f32,
    viewer: ViewerContext,
    rng: ChaCha8Rng,
    on_broadcast: Option<BroadcastFn>,
}

impl fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("ongoing", &self.ongoing)
            .field("pose", &self.pose)
            .field("lifetime", &self.lifetime)
            .field("viewer", &self.viewer)
            .finish_non_exhaustive()
    }
}

impl AnimationScheduler {
    pub fn new(model: &CosmeticModel, viewer: ViewerContext) -> Self {
        Self::with_seed(model, viewer, rand::random())
    }

    /// Scheduler with a fixed probability seed
    pub fn with_seed(model: &CosmeticModel, viewer: ViewerContext, seed: u64) -> Self {
        Self {
            events: model.events.clone(),
            clips: model
                .animations
                .iter()
                .map(|clip| (clip.name.clone(), clip.clone()))
                .collect(),
            ongoing: Vec::new(),
            skip_counters: HashMap::new(),
            pose: Pose::default(),
            lifetime: 0.0,
            viewer,
            rng: ChaCha8Rng::seed_from_u64(seed),
            on_broadcast: None,
        }
    }

    /// Install the callback fired for events other viewers should see
    pub fn on_broadcast(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_broadcast = Some(Box::new(callback));
    }

    /// Queue every declared event matching `trigger` that passes its gates
    pub fn process_event(&mut self, trigger: &AnimationTrigger) {
        let current = self.active_priority();
        let mut added = false;

        for order in 0..self.events.len() {
            let event = &self.events[order];
            if event.trigger != *trigger || event.priority < current {
                continue;
            }
            if !event.target.includes(self.viewer) {
                continue;
            }
            if event.skips > 0 {
                let counter = self.skip_counters.entry(event.name.clone()).or_insert(0);
                *counter = counter.wrapping_add(1);
                if *counter % event.skips != 0 {
                    continue;
                }
            }
            if self.rng.random::<f32>() >= event.probability {
                continue;
            }

            let event = event.clone();
            let broadcasts = event.target != AnimationTarget::SelfOnly;
            let animation = event.animation.clone();
            if !self.push_ongoing(event, order) {
                continue;
            }
            added = true;
            if broadcasts {
                if let Some(broadcast) = self.on_broadcast.as_mut() {
                    broadcast(&animation);
                }
            }
        }

        if added {
            self.update_animation_state();
        }
    }

    /// Queue a declared event by exact name, bypassing its gates
    pub fn fire_trigger(&mut self, name: &str) {
        let found = self
            .events
            .iter()
            .enumerate()
            .find_map(|(order, event)| event.find(name).map(|e| (order, e.clone())));

        match found {
            Some((order, event)) => {
                if self.push_ongoing(event, order) {
                    self.update_animation_state();
                }
            }
            None => trace!("Ignoring trigger for unknown event {name}"),
        }
    }

    /// Advance the clock, then refresh the state
    pub fn update(&mut self, dt: f32) {
        self.advance(dt);
        self.update_animation_state();
    }

    pub fn advance(&mut self, dt: f32) {
        self.lifetime += dt.max(0.0);
    }

    /// Retire finished events, queue their follow-ups and pick what the pose plays
    pub fn update_animation_state(&mut self) {
        let now = self.lifetime;
        let mut follow_ups = Vec::new();

        let pose = &self.pose;
        let clips = &self.clips;
        self.ongoing.retain(|entry| {
            let playing = pose.event.as_deref() == Some(entry.event.name.as_str());
            let finished = playing
                && entry.event.loops > 0
                && clips.get(&entry.event.animation).map_or(false, |clip| {
                    now - pose.started_at > clip.length * entry.event.loops as f32
                });
            if finished {
                trace!("Animation event {} completed", entry.event.name);
                if let Some(next) = &entry.event.on_complete {
                    follow_ups.push(((**next).clone(), entry.order));
                }
            }
            !finished
        });

        let finished_active = self
            .pose
            .event
            .as_deref()
            .map_or(false, |name| !self.ongoing.iter().any(|e| e.event.name == name));

        for (event, order) in follow_ups {
            self.push_ongoing(event, order);
        }

        match self.select_active() {
            Some(index) => {
                let entry = &self.ongoing[index];
                let same_animation =
                    self.pose.animation.as_deref() == Some(entry.event.animation.as_str());
                if !same_animation || finished_active {
                    self.pose.started_at = now;
                }
                self.pose.animation = Some(entry.event.animation.clone());
                self.pose.event = Some(entry.event.name.clone());
            }
            None => self.pose = Pose::default(),
        }
    }

    /// Highest priority wins; ties go to the earliest declaration
    fn select_active(&self) -> Option<usize> {
        self.ongoing
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| (std::cmp::Reverse(entry.event.priority), entry.order))
            .map(|(index, _)| index)
    }

    fn active_priority(&self) -> i32 {
        self.select_active()
            .map_or(0, |index| self.ongoing[index].event.priority)
    }

    /// Returns false for unknown clips and events already queued
    fn push_ongoing(&mut self, event: AnimationEvent, order: usize) -> bool {
        if !self.clips.contains_key(&event.animation) {
            trace!(
                "Event {} references unknown animation {}",
                event.name,
                event.animation
            );
            return false;
        }
        if self.ongoing.iter().any(|e| e.event.name == event.name) {
            return false;
        }
        trace!("Animation event {} queued", event.name);
        self.ongoing.push(OngoingEvent { event, order });
        true
    }

    /// Animation the pose is playing
    pub fn active_animation(&self) -> Option<&str> {
        self.pose.animation.as_deref()
    }

    /// Event currently driving the pose
    pub fn active_event(&self) -> Option<&str> {
        self.pose.event.as_deref()
    }

    /// Seconds since the active animation started
    pub fn animation_time(&self) -> f32 {
        if self.pose.animation.is_some() {
            self.lifetime - self.pose.started_at
        } else {
            0.0
        }
    }

    pub fn is_ongoing(&self, event: &str) -> bool {
        self.ongoing.iter().any(|e| e.event.name == event)
    }

    pub fn ongoing_count(&self) -> usize {
        self.ongoing.len()
    }

    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }
}
