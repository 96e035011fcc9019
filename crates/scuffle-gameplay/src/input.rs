//! Per-tick control states for fighters.
//!
//! Raw device polling lives outside the simulation. Each tick the caller
//! hands the world an [`InputSource`] describing which buttons are held on
//! each port; [`Controller`] turns that into edge-aware [`ControlState`]s.

use serde::{Deserialize, Serialize};

/// Edge-aware state of one logical button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlState {
    /// Up, and was up last tick
    #[default]
    Released,
    /// Down this tick, up last tick
    JustPressed,
    /// Down, and was down last tick
    Pressed,
    /// Up this tick, down last tick
    Releasing,
}

impl ControlState {
    /// Advances the state given whether the button is held this tick.
    #[must_use]
    pub const fn advance(self, held: bool) -> Self {
        match (self.is_down(), held) {
            (false, true) => Self::JustPressed,
            (true, true) => Self::Pressed,
            (true, false) => Self::Releasing,
            (false, false) => Self::Released,
        }
    }

    /// Whether the button is held this tick.
    #[must_use]
    pub const fn is_down(self) -> bool {
        matches!(self, Self::JustPressed | Self::Pressed)
    }

    /// Whether the button went down this tick.
    #[must_use]
    pub const fn just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }
}

/// Logical buttons a fighter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    /// Stick/d-pad left
    Left,
    /// Stick/d-pad right
    Right,
    /// Stick/d-pad up
    Up,
    /// Stick/d-pad down
    Down,
    /// Melee attack
    Attack,
    /// Special move (reserved, no variants yet)
    Special,
    /// Projectile shot (reserved, no variants yet)
    Shot,
    /// Jump
    Jump,
    /// Dash
    Dash,
    /// Shield
    Shield,
}

impl Button {
    /// Number of logical buttons.
    pub const COUNT: usize = 10;

    /// All buttons in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
        Self::Attack,
        Self::Special,
        Self::Shot,
        Self::Jump,
        Self::Dash,
        Self::Shield,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Raw held-button snapshot for one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ButtonSet(u16);

impl ButtonSet {
    /// Nothing held.
    pub const EMPTY: Self = Self(0);

    /// Returns the set with a button held.
    #[must_use]
    pub const fn with(self, button: Button) -> Self {
        Self(self.0 | (1 << button.index()))
    }

    /// Marks a button held.
    pub fn press(&mut self, button: Button) {
        self.0 |= 1 << button.index();
    }

    /// Whether a button is held.
    #[must_use]
    pub const fn is_held(self, button: Button) -> bool {
        self.0 & (1 << button.index()) != 0
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<T: IntoIterator<Item = Button>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Supplies held buttons per controller port each tick.
pub trait InputSource {
    /// Returns the buttons held on a port; unknown ports hold nothing.
    fn buttons(&self, port: u8) -> ButtonSet;
}

impl InputSource for [ButtonSet] {
    fn buttons(&self, port: u8) -> ButtonSet {
        self.get(port as usize).copied().unwrap_or_default()
    }
}

impl<const N: usize> InputSource for [ButtonSet; N] {
    fn buttons(&self, port: u8) -> ButtonSet {
        self.as_slice().buttons(port)
    }
}

impl InputSource for Vec<ButtonSet> {
    fn buttons(&self, port: u8) -> ButtonSet {
        self.as_slice().buttons(port)
    }
}

/// No input on any port.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputSource for NoInput {
    fn buttons(&self, _port: u8) -> ButtonSet {
        ButtonSet::EMPTY
    }
}

/// Direction modifier chosen for an attack press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackDirection {
    /// No direction, or Up
    Neutral,
    /// Down held
    Down,
    /// Left or Right held
    Side,
}

/// Control states for one port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    states: [ControlState; Button::COUNT],
}

impl Controller {
    /// Creates a controller with every button released.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances every button from this tick's held snapshot.
    pub fn update(&mut self, held: ButtonSet) {
        for button in Button::ALL {
            let state = &mut self.states[button.index()];
            *state = state.advance(held.is_held(button));
        }
    }

    /// Returns the state of one button.
    #[must_use]
    pub fn state(&self, button: Button) -> ControlState {
        self.states[button.index()]
    }

    /// Whether a button is held this tick.
    #[must_use]
    pub fn is_down(&self, button: Button) -> bool {
        self.state(button).is_down()
    }

    /// Whether a button went down this tick.
    #[must_use]
    pub fn just_pressed(&self, button: Button) -> bool {
        self.state(button).just_pressed()
    }

    /// Horizontal stick value: -1, 0 or 1. Opposite directions cancel.
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        match (self.is_down(Button::Left), self.is_down(Button::Right)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    /// Picks the attack direction from held directions.
    ///
    /// Priority is Neutral > Down > Side: an untouched stick or a held Up
    /// gives Neutral, otherwise Down wins over a held side direction.
    #[must_use]
    pub fn attack_direction(&self) -> AttackDirection {
        let up = self.is_down(Button::Up);
        let down = self.is_down(Button::Down);
        let side = self.horizontal() != 0.0;

        if up || (!down && !side) {
            AttackDirection::Neutral
        } else if down {
            AttackDirection::Down
        } else {
            AttackDirection::Side
        }
    }

    /// Releases every button.
    pub fn reset(&mut self) {
        self.states = [ControlState::Released; Button::COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_state_cycle() {
        let mut state = ControlState::Released;
        state = state.advance(true);
        assert_eq!(state, ControlState::JustPressed);
        state = state.advance(true);
        assert_eq!(state, ControlState::Pressed);
        state = state.advance(false);
        assert_eq!(state, ControlState::Releasing);
        state = state.advance(false);
        assert_eq!(state, ControlState::Released);
    }

    #[test]
    fn test_releasing_then_pressed_again() {
        let state = ControlState::Releasing.advance(true);
        assert_eq!(state, ControlState::JustPressed);
        assert!(state.is_down());
        assert!(state.just_pressed());
    }

    #[test]
    fn test_button_set() {
        let set: ButtonSet = [Button::Left, Button::Attack].into_iter().collect();
        assert!(set.is_held(Button::Left));
        assert!(set.is_held(Button::Attack));
        assert!(!set.is_held(Button::Right));

        let mut other = ButtonSet::EMPTY;
        other.press(Button::Left);
        other.press(Button::Attack);
        assert_eq!(set, other);
    }

    #[test]
    fn test_controller_edges() {
        let mut controller = Controller::new();
        let attack = ButtonSet::EMPTY.with(Button::Attack);

        controller.update(attack);
        assert!(controller.just_pressed(Button::Attack));

        controller.update(attack);
        assert!(!controller.just_pressed(Button::Attack));
        assert!(controller.is_down(Button::Attack));

        controller.update(ButtonSet::EMPTY);
        assert_eq!(controller.state(Button::Attack), ControlState::Releasing);
    }

    #[test]
    fn test_attack_direction_priority() {
        let mut controller = Controller::new();

        controller.update(ButtonSet::EMPTY);
        assert_eq!(controller.attack_direction(), AttackDirection::Neutral);

        controller.update(ButtonSet::EMPTY.with(Button::Right));
        assert_eq!(controller.attack_direction(), AttackDirection::Side);

        controller.update(ButtonSet::EMPTY.with(Button::Right).with(Button::Down));
        assert_eq!(controller.attack_direction(), AttackDirection::Down);

        controller.update(ButtonSet::EMPTY.with(Button::Up).with(Button::Down));
        assert_eq!(controller.attack_direction(), AttackDirection::Neutral);
    }

    #[test]
    fn test_horizontal_cancels() {
        let mut controller = Controller::new();
        controller.update(ButtonSet::EMPTY.with(Button::Left).with(Button::Right));
        assert_eq!(controller.horizontal(), 0.0);

        controller.update(ButtonSet::EMPTY.with(Button::Left));
        assert_eq!(controller.horizontal(), -1.0);
    }

    #[test]
    fn test_slice_input_source() {
        let inputs = [ButtonSet::EMPTY, ButtonSet::EMPTY.with(Button::Jump)];
        assert!(inputs.buttons(1).is_held(Button::Jump));
        assert_eq!(inputs.buttons(5), ButtonSet::EMPTY);
        assert_eq!(NoInput.buttons(0), ButtonSet::EMPTY);
    }
}
