use uuid::Uuid;

use crate::models::{ChatTurn, Delivery};

/// Generation token of a conversation. Advances on every reset; a dispatch
/// whose epoch no longer matches is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(&self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Append-only turn log of the active consultation.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
    epoch: Epoch,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Returns its id.
    pub fn push(&mut self, mut turn: ChatTurn) -> Uuid {
        if turn.is_user() {
            if let Some(ctx) = turn.medical_context.as_mut() {
                ctx.suggested_actions.clear();
            }
        }
        let id = turn.id;
        self.turns.push(turn);
        id
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Drop every turn and advance the epoch. Safe to call repeatedly.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.epoch = self.epoch.next();
    }

    /// Update the delivery status of a turn. `false` if the turn is gone.
    pub fn set_delivery(&mut self, turn_id: Uuid, delivery: Delivery) -> bool {
        match self.turns.iter_mut().find(|t| t.id == turn_id) {
            Some(turn) => {
                turn.delivery = delivery;
                true
            }
            None => false,
        }
    }
}
