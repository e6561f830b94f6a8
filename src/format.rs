use alloy::primitives::{
    Address,
    U256,
};

pub const ETHER_DECIMALS: u8 = 18;

/// Renders `amount` smallest units as a decimal with `decimals` places,
/// trimming trailing zeros.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let one_unit = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / one_unit;
    let fractional = amount % one_unit;
    if fractional.is_zero() {
        return whole.to_string();
    }
    let padded = format!("{:0>width$}", fractional.to_string(), width = decimals as usize);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

pub fn format_ether(wei: U256) -> String {
    format_units(wei, ETHER_DECIMALS)
}

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn remaining_attempts(max_attempts: u64, attempt_count: u64) -> u64 {
    max_attempts.saturating_sub(attempt_count)
}

pub fn parse_age(input: &str) -> crate::FaucetResult<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(crate::FaucetError::InvalidInput(String::from(
            "enter an age first",
        )));
    }
    trimmed.parse::<u64>().map_err(|_| {
        crate::FaucetError::InvalidInput(format!(
            "'{trimmed}' is not a non-negative whole number"
        ))
    })
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::address;
    use proptest::prelude::*;

    #[test]
    fn format_ether__one_ether_is_one() {
        let wei = U256::from(1_000_000_000_000_000_000u128);
        assert_eq!(format_ether(wei), "1");
    }

    #[test]
    fn format_ether__zero_is_zero() {
        assert_eq!(format_ether(U256::ZERO), "0");
    }

    #[test]
    fn format_ether__keeps_leading_fraction_zeros() {
        // given
        let deposit = U256::from(1_000_000_000_000_000u128);

        // when
        let rendered = format_ether(deposit);

        // then
        assert_eq!(rendered, "0.001");
    }

    #[test]
    fn format_units__trims_trailing_zeros_only() {
        assert_eq!(format_units(U256::from(1_500_000_000u64), 9), "1.5");
        assert_eq!(format_units(U256::from(1_000_000_001u64), 9), "1.000000001");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn short_address__keeps_prefix_and_suffix() {
        let addr = address!("0xECE91dE3036544FA603b5cDEA07d7B655c717Fed");
        assert_eq!(short_address(&addr), "0xECE9...7Fed");
    }

    #[test]
    fn parse_age__rejects_empty_and_negative_input() {
        assert!(matches!(parse_age(""), Err(crate::FaucetError::InvalidInput(_))));
        assert!(matches!(parse_age("-3"), Err(crate::FaucetError::InvalidInput(_))));
        assert!(matches!(parse_age("abc"), Err(crate::FaucetError::InvalidInput(_))));
        assert_eq!(parse_age(" 27 ").unwrap(), 27);
    }

    proptest! {
        #[test]
        fn format_ether__whole_ethers_render_as_integers(whole in any::<u64>()) {
            let wei = U256::from(whole) * U256::from(10u64).pow(U256::from(18u64));
            prop_assert_eq!(format_ether(wei), whole.to_string());
        }

        #[test]
        fn remaining_attempts__never_exceeds_max(max in 0u64..16, count in any::<u64>()) {
            let remaining = remaining_attempts(max, count);
            prop_assert!(remaining <= max);
            if count >= max {
                prop_assert_eq!(remaining, 0);
            } else {
                prop_assert_eq!(remaining, max - count);
            }
        }
    }
}
