//! Mapping between fan level positions and a continuous slider value

use std::fmt;

use super::Position;

/// Slider value as [0-1] value
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub(crate) struct Fraction(typed_floats::PositiveFinite<f64>);

impl Fraction {
    /// Raw value
    pub(crate) fn get(self) -> f64 {
        self.0.get()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{:.3}", self.get())
    }
}

/// Highest position as float, slider denominator
#[expect(clippy::cast_precision_loss)]
const MAX_POSITION: f64 = (Position::COUNT - 1) as f64;

/// Slider value for a position
pub(crate) fn position_to_fraction(position: Position) -> Fraction {
    #[expect(clippy::cast_precision_loss)]
    let value = position.index() as f64 / MAX_POSITION;
    #[expect(clippy::unwrap_used)] // index is in [0; 8]
    let value = typed_floats::PositiveFinite::<f64>::new(value).unwrap();
    Fraction(value)
}

/// Snap a slider value to the nearest position
///
/// Values outside [0; 1] are clamped, NaN maps to automatic mode, and halfway values round up.
pub(crate) fn fraction_to_position(value: f64) -> Position {
    if value.is_nan() {
        return Position::AUTO;
    }
    let scaled = (value.clamp(0.0, 1.0) * MAX_POSITION).round();
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = scaled as usize;
    Position::new(index).unwrap_or(Position::MAX)
}
