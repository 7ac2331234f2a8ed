use crate::schedule::SimpleIntervalSchedule;

/// Unit of a shorthand duration such as `"30s"` or `"500ms"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    /// Accepts the full lowercase names: "milliseconds", "seconds", "minutes",
    /// "hours", "days". Shorthand like "5s" goes through `parse_duration`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "milliseconds" => Ok(TimeUnit::Milliseconds),
            "seconds" => Ok(TimeUnit::Seconds),
            "minutes" => Ok(TimeUnit::Minutes),
            "hours" => Ok(TimeUnit::Hours),
            "days" => Ok(TimeUnit::Days),
            _ => Err(format!("Invalid time unit: {}", s)),
        }
    }
}

impl TimeUnit {
    pub fn to_millis(&self, value: u64) -> u64 {
        match self {
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value.saturating_mul(1000),
            TimeUnit::Minutes => value.saturating_mul(60_000),
            TimeUnit::Hours => value.saturating_mul(3_600_000),
            TimeUnit::Days => value.saturating_mul(86_400_000),
        }
    }

    /// Interval schedule with `value` in this unit and every other field zero.
    pub fn schedule(&self, value: u64) -> SimpleIntervalSchedule {
        let schedule = SimpleIntervalSchedule::default();
        match self {
            TimeUnit::Milliseconds => schedule.milliseconds(value),
            TimeUnit::Seconds => schedule.seconds(value),
            TimeUnit::Minutes => schedule.minutes(value),
            TimeUnit::Hours => schedule.hours(value),
            TimeUnit::Days => schedule.days(value),
        }
    }

    /// Parse a duration string like "5s", "10m", "2h", "3d", "500ms".
    ///
    /// Strict rules:
    /// - lowercase suffixes only ("s", "m", "h", "d", "ms")
    /// - `<number><suffix>` with no space in between
    /// - a bare number is read as milliseconds
    pub fn parse_duration(s: &str) -> Option<(u64, TimeUnit)> {
        let s = s.trim();

        let split_pos = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());

        if split_pos == 0 {
            return None;
        }

        let (num_str, unit_str) = s.split_at(split_pos);
        let value = num_str.parse::<u64>().ok()?;

        let time_unit = match unit_str {
            "" | "ms" => TimeUnit::Milliseconds,
            "s" => TimeUnit::Seconds,
            "m" => TimeUnit::Minutes,
            "h" => TimeUnit::Hours,
            "d" => TimeUnit::Days,
            _ => return None,
        };

        Some((value, time_unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_shorthand() {
        assert_eq!(TimeUnit::parse_duration("500ms"), Some((500, TimeUnit::Milliseconds)));
        assert_eq!(TimeUnit::parse_duration("30s"), Some((30, TimeUnit::Seconds)));
        assert_eq!(TimeUnit::parse_duration(" 5m "), Some((5, TimeUnit::Minutes)));
        assert_eq!(TimeUnit::parse_duration("2h"), Some((2, TimeUnit::Hours)));
        assert_eq!(TimeUnit::parse_duration("25d"), Some((25, TimeUnit::Days)));
        assert_eq!(TimeUnit::parse_duration("1500"), Some((1500, TimeUnit::Milliseconds)));
    }

    #[test]
    fn test_parse_duration_rejects_bad_input() {
        assert_eq!(TimeUnit::parse_duration("s"), None);
        assert_eq!(TimeUnit::parse_duration("5S"), None);
        assert_eq!(TimeUnit::parse_duration("5 s"), None);
        assert_eq!(TimeUnit::parse_duration("5sec"), None);
        assert_eq!(TimeUnit::parse_duration(""), None);
    }

    #[test]
    fn test_from_str_full_names() {
        assert_eq!("Seconds".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
        assert_eq!("days".parse::<TimeUnit>(), Ok(TimeUnit::Days));
        assert!("s".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_schedule_sets_single_field() {
        assert_eq!(TimeUnit::Minutes.schedule(5).to_millis(), 300_000);
        assert_eq!(TimeUnit::Days.schedule(1).to_millis(), TimeUnit::Days.to_millis(1));
        assert!(!TimeUnit::Seconds.schedule(1).run_immediately);
    }
}
