//! Actuator state: wheel commands, indicator LEDs, and the per-cycle blinker.

use anyhow::Result;

use crate::gateway::DeviceGateway;

/// Number of indicator LEDs on the robot ring.
pub const INDICATOR_COUNT: u8 = 8;

/// Signed wheel speeds in rad/s.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotorCommand {
    pub left: f64,
    pub right: f64,
}

impl MotorCommand {
    pub const STOP: MotorCommand = MotorCommand {
        left: 0.0,
        right: 0.0,
    };

    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Clip both wheels to `[-max_speed, max_speed]`.
    pub fn clipped(self, max_speed: f64) -> Self {
        Self {
            left: self.left.clamp(-max_speed, max_speed),
            right: self.right.clamp(-max_speed, max_speed),
        }
    }
}

/// Bitmask over the indicator LEDs; bit `i` lights LED `i`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndicatorPattern(u8);

impl IndicatorPattern {
    pub const OFF: IndicatorPattern = IndicatorPattern(0);
    pub const ALL_ON: IndicatorPattern = IndicatorPattern(u8::MAX);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_lit(self, led: u8) -> bool {
        led < INDICATOR_COUNT && self.0 & (1 << led) != 0
    }
}

/// Pending actuator values for the current cycle. Written to the gateway by `apply`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActuatorState {
    pub motors: MotorCommand,
    pub indicators: IndicatorPattern,
}

impl ActuatorState {
    /// Back to neutral: wheels stopped, LEDs off.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Push the pending values to the gateway. Does not step the simulation.
    pub fn apply<G: DeviceGateway + ?Sized>(&self, gateway: &mut G) -> Result<()> {
        gateway.set_motor_speeds(self.motors)?;
        gateway.set_indicators(self.indicators)?;
        Ok(())
    }
}

/// Toggles the whole LED ring between lit and dark every `period` cycles.
#[derive(Clone, Debug)]
pub struct Blinker {
    period: u32,
    cycle: u64,
}

impl Blinker {
    pub fn new(period: u32) -> Self {
        Self {
            period: period.max(1),
            cycle: 0,
        }
    }

    /// Pattern for the current cycle, then advance.
    pub fn next_pattern(&mut self) -> IndicatorPattern {
        let lit = (self.cycle / self.period as u64) % 2 == 0;
        self.cycle += 1;
        if lit {
            IndicatorPattern::ALL_ON
        } else {
            IndicatorPattern::OFF
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping_bounds_both_wheels() {
        let cmd = MotorCommand::new(9.0, -12.5).clipped(6.28);
        assert_eq!(cmd, MotorCommand::new(6.28, -6.28));
    }

    #[test]
    fn blinker_toggles_every_period() {
        let mut blinker = Blinker::new(2);
        let seen: Vec<_> = (0..6).map(|_| blinker.next_pattern()).collect();
        assert_eq!(
            seen,
            vec![
                IndicatorPattern::ALL_ON,
                IndicatorPattern::ALL_ON,
                IndicatorPattern::OFF,
                IndicatorPattern::OFF,
                IndicatorPattern::ALL_ON,
                IndicatorPattern::ALL_ON,
            ]
        );
    }

    #[test]
    fn pattern_bits_map_to_leds() {
        let pattern = IndicatorPattern::from_bits(0b0000_0101);
        assert!(pattern.is_lit(0));
        assert!(!pattern.is_lit(1));
        assert!(pattern.is_lit(2));
        assert!(!pattern.is_lit(8));
        assert!(IndicatorPattern::ALL_ON.is_lit(7));
    }
}
