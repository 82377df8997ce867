//! Actuator outputs
//!
//! Maps a command byte onto four output pins. LEDs are wired active-low,
//! so a set bit drives the pin low; the buzzer is active-high. Every command
//! re-drives all four pins.

use embedded_hal::digital::{OutputPin, PinState};

use crate::protocol::{Actuator, CommandByte};

/// Pin levels for one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLevels {
    pub led1: PinState,
    pub led2: PinState,
    pub led3: PinState,
    pub buzzer: PinState,
}

impl OutputLevels {
    /// Levels demanded by `command`; bits 4-7 play no part
    pub fn for_command(command: CommandByte) -> Self {
        let active_low = |actuator| PinState::from(!command.is_set(actuator));
        Self {
            led1: active_low(Actuator::Led1),
            led2: active_low(Actuator::Led2),
            led3: active_low(Actuator::Led3),
            buzzer: PinState::from(command.is_set(Actuator::Buzzer)),
        }
    }
}

/// Owns the four actuator pins
pub struct ActuatorController<P> {
    led1: P,
    led2: P,
    led3: P,
    buzzer: P,
}

impl<P: OutputPin> ActuatorController<P> {
    /// Take the pins and drive them to the idle state (everything off)
    pub fn new(led1: P, led2: P, led3: P, buzzer: P) -> Self {
        let mut controller = Self {
            led1,
            led2,
            led3,
            buzzer,
        };
        controller.apply(CommandByte::new(0));
        controller
    }

    /// Drive all four outputs from `command`
    pub fn apply(&mut self, command: CommandByte) -> OutputLevels {
        let levels = OutputLevels::for_command(command);

        let results = [
            self.led1.set_state(levels.led1).is_ok(),
            self.led2.set_state(levels.led2).is_ok(),
            self.led3.set_state(levels.led3).is_ok(),
            self.buzzer.set_state(levels.buzzer).is_ok(),
        ];
        if results.contains(&false) {
            log::warn!("Actuator: pin write failed for command 0x{:02x}", command.raw());
        }

        levels
    }

    /// Give the pins back
    pub fn release(self) -> (P, P, P, P) {
        (self.led1, self.led2, self.led3, self.buzzer)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockPin;
    use super::*;
    use embedded_hal::digital::PinState::{High, Low};

    fn controller() -> ActuatorController<MockPin> {
        ActuatorController::new(MockPin::new(), MockPin::new(), MockPin::new(), MockPin::new())
    }

    fn pin_states(controller: ActuatorController<MockPin>) -> [Option<PinState>; 4] {
        let (l1, l2, l3, bz) = controller.release();
        [l1.state(), l2.state(), l3.state(), bz.state()]
    }

    #[test]
    fn test_idle_state_on_construction() {
        let c = controller();
        assert_eq!(pin_states(c), [Some(High), Some(High), Some(High), Some(Low)]);
    }

    #[test]
    fn test_command_0x05() {
        let mut c = controller();
        let levels = c.apply(CommandByte::new(0x05));

        assert_eq!(
            levels,
            OutputLevels {
                led1: Low,
                led2: High,
                led3: Low,
                buzzer: Low,
            }
        );
        assert_eq!(pin_states(c), [Some(Low), Some(High), Some(Low), Some(Low)]);
    }

    #[test]
    fn test_buzzer_polarity() {
        let levels = OutputLevels::for_command(CommandByte::new(0x08));
        assert_eq!(levels.buzzer, High);
        assert_eq!(levels.led1, High);

        let levels = OutputLevels::for_command(CommandByte::new(0x07));
        assert_eq!(levels.buzzer, Low);
        assert_eq!(levels.led3, Low);
    }

    #[test]
    fn test_all_commands() {
        for raw in 0..=u8::MAX {
            let levels = OutputLevels::for_command(CommandByte::new(raw));

            // LED low iff its bit is set, buzzer high iff bit 3 is set
            assert_eq!(levels.led1 == Low, raw & 0x01 != 0);
            assert_eq!(levels.led2 == Low, raw & 0x02 != 0);
            assert_eq!(levels.led3 == Low, raw & 0x04 != 0);
            assert_eq!(levels.buzzer == High, raw & 0x08 != 0);

            // Upper nibble never matters
            assert_eq!(levels, OutputLevels::for_command(CommandByte::new(raw & 0x0F)));
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut c = controller();
        let first = c.apply(CommandByte::new(0x0A));
        let second = c.apply(CommandByte::new(0x0A));
        assert_eq!(first, second);

        let (l1, _, _, bz) = c.release();
        // Idle drive plus two commands, every pin re-driven each time
        assert_eq!(l1.writes(), 3);
        assert_eq!(bz.writes(), 3);
        assert_eq!(bz.state(), Some(High));
    }
}
