use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    Confirm,
    Cancel,
    ToggleInventory,
    SkipDialog,
}

const ACTION_COUNT: usize = 9;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Interact,
        InputAction::Confirm,
        InputAction::Cancel,
        InputAction::ToggleInventory,
        InputAction::SkipDialog,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::Confirm => 5,
            InputAction::Cancel => 6,
            InputAction::ToggleInventory => 7,
            InputAction::SkipDialog => 8,
        }
    }
}

/// Held state plus a press edge per action. Edges live until the next tick snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_pressed(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }

    pub(crate) fn clear_all(&mut self) {
        *self = Self::default();
    }
}

/// Immutable per-tick view of the keyboard handed to the active scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    /// Raw directional intent from the four movement keys, not normalized.
    pub fn movement_axes(&self) -> Vec2 {
        let mut axes = Vec2::ZERO;
        if self.is_down(InputAction::MoveLeft) {
            axes.x -= 1.0;
        }
        if self.is_down(InputAction::MoveRight) {
            axes.x += 1.0;
        }
        if self.is_down(InputAction::MoveUp) {
            axes.y -= 1.0;
        }
        if self.is_down(InputAction::MoveDown) {
            axes.y += 1.0;
        }
        axes
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        if !is_down {
            self.actions.pressed[action.index()] = false;
        }
        self
    }

    /// Marks a fresh press: the action is down and its edge is set.
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.down[action.index()] = true;
        self.actions.pressed[action.index()] = true;
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }
}
