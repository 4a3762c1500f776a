//! Parsers for command line values.

use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};

use crate::error::Error;
use crate::record::Name;

pub fn parse_name(arg: &str) -> Result<Name, Error> {
    Name::from_str(arg)
}

/// Parse an NSEC3 salt given in hex, with `-` meaning no salt.
pub fn parse_salt(arg: &str) -> Result<Vec<u8>, Error> {
    if arg == "-" {
        return Ok(Vec::new());
    }
    let salt = hex::decode(arg).map_err(|err| Error::parse(format!("invalid salt: {err}")))?;
    if salt.len() > 255 {
        return Err(Error::parse("salt too long"));
    }
    Ok(salt)
}

//------------ Span ----------------------------------------------------------

/// A span of time given in calendar months plus a fixed number of seconds.
///
/// Years and months are calendar based: one month after January 31st is
/// the last day of February.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub months: u32,
    pub seconds: i64,
}

impl Span {
    pub const fn months(months: u32) -> Self {
        Self { months, seconds: 0 }
    }

    /// The instant this span after `start`.
    pub fn after(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start
            .checked_add_months(Months::new(self.months))?
            .checked_add_signed(Duration::try_seconds(self.seconds)?)
    }
}

impl FromStr for Span {
    type Err = Error;

    /// Parse a human readable span like `1 year 2 months` or `90d`.
    ///
    /// A number without a unit counts seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::config(format!("invalid duration '{s}': {reason}"));

        let mut span = Span::default();
        let mut rest = s.trim();
        if rest.is_empty() {
            return Err(invalid("empty"));
        }
        while !rest.is_empty() {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits == 0 {
                return Err(invalid("expected a number"));
            }
            let value: u32 = rest[..digits]
                .parse()
                .map_err(|_| invalid("number too large"))?;
            rest = rest[digits..].trim_start();

            let letters = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            let unit = rest[..letters].to_ascii_lowercase();
            rest = rest[letters..].trim_start_matches([' ', ',']);

            let seconds_per = match unit.as_str() {
                "y" | "yr" | "yrs" | "year" | "years" => {
                    span.months = value
                        .checked_mul(12)
                        .and_then(|m| span.months.checked_add(m))
                        .ok_or_else(|| invalid("too long"))?;
                    continue;
                }
                "mo" | "month" | "months" => {
                    span.months = span
                        .months
                        .checked_add(value)
                        .ok_or_else(|| invalid("too long"))?;
                    continue;
                }
                "w" | "week" | "weeks" => 604_800,
                "d" | "day" | "days" => 86_400,
                "h" | "hour" | "hours" => 3_600,
                "m" | "min" | "mins" | "minute" | "minutes" => 60,
                "" | "s" | "sec" | "secs" | "second" | "seconds" => 1,
                other => return Err(invalid(&format!("unknown unit '{other}'"))),
            };
            span.seconds += i64::from(value) * seconds_per;
        }
        Ok(span)
    }
}

/// Parse a date in the `YYYYMMDD` format as midnight UTC.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, Error> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::config(format!(
            "invalid date '{s}': expected YYYYMMDD"
        )));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|time| time.and_utc())
        .ok_or_else(|| Error::config(format!("invalid date '{s}'")))
}
