/// Mod-10 check over the digits of `candidate`; separators are ignored.
///
/// Candidates with fewer than 13 or more than 19 digits never pass.
pub fn luhn_check(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let checksum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    checksum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_valid_numbers() {
        assert!(luhn_check("4111111111111111"));
        assert!(luhn_check("4111-1111-1111-1111"));
        assert!(luhn_check("5500 0000 0000 0004"));
        assert!(luhn_check("378282246310005"));
    }

    #[test]
    fn test_checksum_failure() {
        assert!(!luhn_check("1234-5678-9012-3456"));
        assert!(!luhn_check("4111111111111112"));
    }

    #[test]
    fn test_length_bounds() {
        assert!(!luhn_check("0000"));
        assert!(!luhn_check(""));
        // 20 digits, checksum-valid, still rejected
        assert!(!luhn_check("00000000000000000000"));
    }
}
