use crate::error::{Error, Result};

/// Normalizes a user supplied time to zero-padded `HH:MM:SS`.
///
/// Accepts a plain number of seconds (`"123"`, `"90.5"`) or a colon separated
/// `[[HH:]MM:]SS` value. Components that overflow (`"1:75"`) carry into the
/// next unit. `None` stays `None` so an absent bound stays open.
pub fn normalize_time(time: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = time else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    let seconds = if trimmed.contains(':') {
        colon_seconds(trimmed)
    } else {
        plain_seconds(trimmed)
    }
    .ok_or_else(|| Error::InvalidTime(raw.to_string()))?;

    Ok(Some(format_hms(seconds)))
}

fn colon_seconds(value: &str) -> Option<u64> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    parts
        .iter()
        .try_fold(0u64, |acc, part| {
            acc.checked_mul(60)?
                .checked_add(part.trim().parse::<u64>().ok()?)
        })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn plain_seconds(value: &str) -> Option<u64> {
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }
    let seconds = value.parse::<f64>().ok()?;
    if seconds.is_finite() && seconds >= 0.0 {
        Some(seconds.floor() as u64)
    } else {
        None
    }
}

fn format_hms(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(value: &str) -> String {
        normalize_time(Some(value)).unwrap().unwrap()
    }

    #[test]
    fn test_plain_seconds() {
        assert_eq!(norm("123"), "00:02:03");
        assert_eq!(norm("1234"), "00:20:34");
        assert_eq!(norm("12345"), "03:25:45");
        assert_eq!(norm("10"), "00:00:10");
        assert_eq!(norm("90.7"), "00:01:30");
    }

    #[test]
    fn test_partially_qualified() {
        assert_eq!(norm("13:55"), "00:13:55");
        assert_eq!(norm("00:13:55"), "00:13:55");
        assert_eq!(norm("1:30"), "00:01:30");
        assert_eq!(norm("1:2:3"), "01:02:03");
        assert_eq!(norm("1:75"), "00:02:15");
    }

    #[test]
    fn test_absent_time_stays_absent() {
        assert_eq!(normalize_time(None).unwrap(), None);
    }

    #[test]
    fn test_garbage_is_rejected() {
        for bad in ["", "abc", "1:2:3:4", "-5", "1:xx", "999999999999999999:00:00"] {
            assert!(
                matches!(normalize_time(Some(bad)), Err(Error::InvalidTime(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
