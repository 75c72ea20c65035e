use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum GameState {
    #[default]
    Playing,
    Paused,
    InventoryOpen,
    DialogActive,
    Transitioning,
    DebugMenu,
}

impl GameState {
    pub(crate) fn allows_player_movement(self) -> bool {
        !matches!(
            self,
            Self::InventoryOpen | Self::DialogActive | Self::DebugMenu | Self::Paused
        )
    }
}

/// Current mode plus the modes it interrupted.
#[derive(Debug, Clone, Default)]
pub(crate) struct GameStateManager {
    current: GameState,
    stack: Vec<GameState>,
    changed: bool,
}

impl GameStateManager {
    pub(crate) fn current(&self) -> GameState {
        self.current
    }

    pub(crate) fn is(&self, state: GameState) -> bool {
        self.current == state
    }

    pub(crate) fn push(&mut self, state: GameState) {
        debug!(from = ?self.current, to = ?state, "game_state_pushed");
        self.stack.push(self.current);
        self.current = state;
        self.changed = true;
    }

    /// Returns to the interrupted mode. The base mode is never popped.
    pub(crate) fn pop(&mut self) -> Option<GameState> {
        let previous = self.stack.pop()?;
        debug!(from = ?self.current, to = ?previous, "game_state_popped");
        let popped = std::mem::replace(&mut self.current, previous);
        self.changed = true;
        Some(popped)
    }

    /// Replaces the current mode, leaving the stack alone.
    pub(crate) fn set(&mut self, state: GameState) {
        if self.current != state {
            self.current = state;
            self.changed = true;
        }
    }

    /// Swaps `from` for `to` whether it is the current mode or an
    /// interrupted one.
    pub(crate) fn replace(&mut self, from: GameState, to: GameState) {
        if self.current == from {
            self.set(to);
        } else if let Some(entry) = self.stack.iter_mut().rev().find(|state| **state == from) {
            debug!(from = ?from, to = ?to, "game_state_replaced_underneath");
            *entry = to;
        }
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub(crate) fn can_move_player(&self) -> bool {
        self.current.allows_player_movement()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_pop_restore_previous_state() {
        let mut states = GameStateManager::default();
        states.push(GameState::InventoryOpen);
        states.push(GameState::DebugMenu);
        assert_eq!(states.depth(), 2);
        assert_eq!(states.pop(), Some(GameState::DebugMenu));
        assert!(states.is(GameState::InventoryOpen));
        assert_eq!(states.pop(), Some(GameState::InventoryOpen));
        assert!(states.is(GameState::Playing));
    }

    #[test]
    fn pop_on_base_state_is_a_no_op() {
        let mut states = GameStateManager::default();
        assert_eq!(states.pop(), None);
        assert!(states.is(GameState::Playing));
        assert!(!states.take_changed());
    }

    #[test]
    fn replace_reaches_an_interrupted_mode() {
        let mut states = GameStateManager::default();
        states.set(GameState::Transitioning);
        states.push(GameState::DebugMenu);
        states.replace(GameState::Transitioning, GameState::Playing);
        assert!(states.is(GameState::DebugMenu));
        assert_eq!(states.pop(), Some(GameState::DebugMenu));
        assert!(states.is(GameState::Playing));

        states.replace(GameState::Paused, GameState::Playing);
        assert!(states.is(GameState::Playing));
        assert_eq!(states.depth(), 0);
    }

    #[test]
    fn changed_flag_is_taken_once() {
        let mut states = GameStateManager::default();
        states.set(GameState::Transitioning);
        assert!(states.take_changed());
        assert!(!states.take_changed());
        states.set(GameState::Transitioning);
        assert!(!states.take_changed());
    }

    #[test]
    fn movement_gating_per_state() {
        let mut states = GameStateManager::default();
        assert!(states.can_move_player());
        for blocked in [
            GameState::Paused,
            GameState::InventoryOpen,
            GameState::DialogActive,
            GameState::DebugMenu,
        ] {
            states.set(blocked);
            assert!(!states.can_move_player(), "{blocked:?} should block movement");
        }
        states.set(GameState::Transitioning);
        assert!(states.can_move_player());
    }
}
