//! Random LoRA Stack Builder
//!
//! Each of three candidate LoRAs is applied with its own probability.
//! Randomization happens in [`RandomLoraStack::change_signal`], which the
//! host polls before deciding whether to re-run the node; `build` only reads
//! back what the last randomization picked.
//!
//! Protocol per session key:
//! - every signal call bumps the stride counter; while the counter is below
//!   `stride` (and a signal exists) the previous signal is returned as is;
//! - otherwise the counter resets and a new selection is drawn: one uniform
//!   value per slot, a slot is picked when active and its draw is at most its
//!   chance, exclusive mode keeps only the smallest draw;
//! - with forced re-diversification the draw repeats until the selection
//!   differs from the previous one, up to `max_attempts` tries.

use super::draw::DrawSource;
use crate::model::{is_none_name, LoraSelection, LoraStack, Switch};
use crate::session::{ChangeSignal, SessionKey, SessionState, SessionStore};
use chrono::Utc;
use log::{debug, warn};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Redraw cap used when none is configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// One candidate of the random stack
#[derive(Debug, Clone, PartialEq)]
pub struct RandomSlot {
    pub switch: Switch,
    pub name: String,
    pub model_strength: f64,
    pub encoder_strength: f64,
    /// Probability in `[0, 1]` that the slot is applied
    pub chance: f64,
}

impl RandomSlot {
    pub fn new(
        switch: Switch,
        name: impl Into<String>,
        model_strength: f64,
        encoder_strength: f64,
        chance: f64,
    ) -> Self {
        Self {
            switch,
            name: name.into(),
            model_strength,
            encoder_strength,
            chance,
        }
    }

    pub fn is_active(&self) -> bool {
        self.switch.is_on() && !is_none_name(&self.name)
    }

    /// Active with a non-zero chance of being picked
    pub fn is_eligible(&self) -> bool {
        self.is_active() && self.chance > 0.0
    }

    pub fn selection(&self) -> LoraSelection {
        LoraSelection::new(self.name.clone(), self.model_strength, self.encoder_strength)
    }
}

/// Inputs of one random stack invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RandomStackRequest {
    pub exclusive: Switch,
    pub stride: u32,
    pub force_rediversify: Switch,
    pub slots: [RandomSlot; 3],
    pub incoming: Option<LoraStack>,
}

impl RandomStackRequest {
    /// Session key derived from the candidate names only
    pub fn session_key(&self) -> SessionKey {
        SessionKey::from_names(self.slots.iter().map(|s| s.name.as_str()))
    }

    fn eligible_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_eligible()).count()
    }
}

/// Random stack node: draws through `draws`, remembers through `sessions`
pub struct RandomLoraStack {
    sessions: Arc<dyn SessionStore>,
    draws: Box<dyn DrawSource>,
    max_attempts: u32,
}

impl RandomLoraStack {
    pub fn new(sessions: Arc<dyn SessionStore>, draws: Box<dyn DrawSource>) -> Self {
        Self {
            sessions,
            draws,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Cap on draws per randomization when forcing a new selection
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Re-execution token for the host; randomizes when the stride is used up
    pub fn change_signal(&mut self, request: &RandomStackRequest) -> ChangeSignal {
        let key = request.session_key();
        let draws = &mut self.draws;
        let max_attempts = self.max_attempts;
        let mut signal = None;

        self.sessions.update(&key, &mut |state: &mut SessionState| {
            state.stride_count += 1;
            if request.stride > 1 && state.stride_count < request.stride {
                if let Some(previous) = &state.signal {
                    debug!(
                        "Session {} within stride ({}/{}), keeping selection",
                        key, state.stride_count, request.stride
                    );
                    signal = Some(previous.clone());
                    return;
                }
            }
            state.stride_count = 0;

            let selection = select(&mut **draws, request, &state.selection, max_attempts);
            let next = ChangeSignal::of(&selection);
            debug!("Session {} randomized: {:?}", key, selection);
            state.selection = selection;
            state.signal = Some(next.clone());
            state.randomizations += 1;
            state.randomized_at = Some(Utc::now());
            signal = Some(next);
        });

        signal.unwrap_or_else(|| ChangeSignal::of(&BTreeSet::new()))
    }

    /// Incoming stack plus the active slots the last randomization picked
    pub fn build(&self, request: &RandomStackRequest) -> LoraStack {
        let selected = self
            .sessions
            .get(&request.session_key())
            .map(|state| state.selection)
            .unwrap_or_default();

        let mut stack = LoraStack::seeded_from(request.incoming.as_ref());
        for slot in &request.slots {
            if slot.is_active() && selected.contains(&slot.name) {
                stack.push(slot.selection());
            }
        }
        stack
    }
}

/// Draw a selection, redrawing while forced diversity demands a change
fn select(
    draws: &mut dyn DrawSource,
    request: &RandomStackRequest,
    previous: &BTreeSet<String>,
    max_attempts: u32,
) -> BTreeSet<String> {
    let mut selection = draw_selection(draws, request);
    if request.force_rediversify.is_on() && !previous.is_empty() && request.eligible_count() > 1 {
        let mut attempts = 1;
        while &selection == previous && attempts < max_attempts {
            selection = draw_selection(draws, request);
            attempts += 1;
        }
        if &selection == previous {
            warn!(
                "No different LoRA selection after {} draws, keeping {:?}",
                attempts, selection
            );
        }
    }
    selection
}

/// One randomization attempt. Always takes one draw per slot, whether or not
/// the slot can be picked, so draw sequences line up across calls.
fn draw_selection(draws: &mut dyn DrawSource, request: &RandomStackRequest) -> BTreeSet<String> {
    let slots = &request.slots;
    let values: Vec<f64> = slots.iter().map(|_| draws.next_draw()).collect();

    let mut picked: Vec<usize> = (0..slots.len())
        .filter(|&i| slots[i].is_active() && values[i] <= slots[i].chance)
        .collect();

    if request.exclusive.is_on() && picked.len() > 1 {
        // lowest draw wins, first slot on ties
        let winner = picked
            .iter()
            .copied()
            .min_by(|&a, &b| values[a].total_cmp(&values[b]));
        picked = winner.into_iter().collect();
    }

    picked.into_iter().map(|i| slots[i].name.clone()).collect()
}
