use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds `value` down to `scale` decimal places. Used for formatting quantities to an
/// exchange's quantity precision without ever rounding a sell/buy quantity *up*.
pub fn round_down(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::ToZero)
}

/// Formats a [`Decimal`] the way a spot exchange expects prices/quantities on the wire:
/// a plain fixed-point string, never scientific notation.
pub fn format_wire(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_down_never_rounds_up() {
        assert_eq!(round_down(dec!(1.23456789), 4), dec!(1.2345));
        assert_eq!(round_down(dec!(1.0001), 2), dec!(1.00));
    }

    #[test]
    fn format_wire_strips_trailing_zeros() {
        assert_eq!(format_wire(dec!(1.500000)), "1.5");
    }
}
