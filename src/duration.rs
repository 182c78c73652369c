//! Parser for SLURM duration strings
//!
//! sacct renders elapsed time and time limits as `[[days-]hours:]minutes:seconds`.
//! Only the digit groups matter: the separators are treated as noise, so
//! `1-02:03:04`, `1:02:03:04` and `02:03.04` all parse identically. Group
//! count selects the interpretation:
//!
//! | groups | meaning                          |
//! |--------|----------------------------------|
//! | 4      | days, hours, minutes, seconds    |
//! | 3      | hours, minutes, seconds          |
//! | 2      | minutes, seconds                 |
//! | other  | 0 seconds                        |
//!
//! Jobs that never started report placeholder durations like `INVALID` or an
//! empty string; those fold to zero seconds rather than failing the record.

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3_600;
const SECONDS_PER_DAY: u64 = 86_400;

/// Convert a scheduler duration string into total seconds.
///
/// # Examples
/// ```
/// use slurmstat::duration::parse_duration;
///
/// assert_eq!(parse_duration("00:10:00"), 600);
/// assert_eq!(parse_duration("2-00:00:01"), 172_801);
/// assert_eq!(parse_duration("05:30"), 330);
/// assert_eq!(parse_duration("UNLIMITED"), 0);
/// ```
pub fn parse_duration(raw: &str) -> u64 {
    let groups = digit_groups(raw);
    match groups[..] {
        [days, hours, minutes, seconds] => days * SECONDS_PER_DAY
            + hours * SECONDS_PER_HOUR
            + minutes * SECONDS_PER_MINUTE
            + seconds,
        [hours, minutes, seconds] => {
            hours * SECONDS_PER_HOUR + minutes * SECONDS_PER_MINUTE + seconds
        }
        [minutes, seconds] => minutes * SECONDS_PER_MINUTE + seconds,
        _ => 0,
    }
}

/// Extract all maximal runs of decimal digits, left to right.
fn digit_groups(raw: &str) -> Vec<u64> {
    let mut groups = Vec::new();
    let mut current: Option<u64> = None;

    for ch in raw.chars() {
        match ch.to_digit(10) {
            Some(digit) => {
                let value = current.unwrap_or(0);
                current = Some(value.saturating_mul(10).saturating_add(u64::from(digit)));
            }
            None => {
                if let Some(value) = current.take() {
                    groups.push(value);
                }
            }
        }
    }
    if let Some(value) = current {
        groups.push(value);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_groups() {
        assert_eq!(parse_duration("1-02:03:04"), 86_400 + 2 * 3_600 + 3 * 60 + 4);
        assert_eq!(parse_duration("7-00:00:00"), 604_800);
    }

    #[test]
    fn test_three_groups() {
        assert_eq!(parse_duration("01:00:00"), 3_600);
        assert_eq!(parse_duration("00:10:00"), 600);
        assert_eq!(parse_duration("23:59:59"), 86_399);
    }

    #[test]
    fn test_two_groups() {
        assert_eq!(parse_duration("05:30"), 330);
        assert_eq!(parse_duration("00:00"), 0);
    }

    #[test]
    fn test_separators_are_noise() {
        assert_eq!(parse_duration("1:02:03:04"), parse_duration("1-02:03:04"));
        assert_eq!(parse_duration("02.03"), parse_duration("02:03"));
    }

    #[test]
    fn test_unparsable_inputs_yield_zero() {
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("UNLIMITED"), 0);
        assert_eq!(parse_duration("INVALID"), 0);
        assert_eq!(parse_duration("42"), 0);
        assert_eq!(parse_duration("1:2:3:4:5"), 0);
    }

    #[test]
    fn test_no_sign_handling() {
        // the minus is just another separator
        assert_eq!(parse_duration("-01:30"), 90);
    }
}
