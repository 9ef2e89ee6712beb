use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Today's date in `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is not recognised.
pub fn today_in(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use crate::{Error, timezone::today_in};

    #[test]
    fn today_in_utc_matches_utc_date() {
        let before = OffsetDateTime::now_utc().date();
        let today = today_in("Etc/UTC").unwrap();
        let after = OffsetDateTime::now_utc().date();

        assert!(today == before || today == after);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        assert_eq!(
            today_in("Not/AZone"),
            Err(Error::InvalidTimezoneError("Not/AZone".to_owned()))
        );
    }
}
