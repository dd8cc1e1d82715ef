use std::str::FromStr;
use std::time::Duration;

pub const STORE_KEY: &str = "news-store";
pub const DEFAULT_SECTIONS: &[&str] = &[
    "Breaking News",
    "News",
    "Politics",
    "Economy",
    "Sports",
    "Technology",
];
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_ARTICLE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const MAX_SAVED_ARTICLES: usize = 100;
pub const MAX_HEADLINE_ATTEMPTS: usize = 3;
pub const DEFAULT_MIN_HEADLINES: usize = 5;

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub sections: Vec<String>,
    /// A section older than this needs a refresh.
    pub freshness_window: Duration,
    pub article_cache_ttl: Duration,
    pub max_saved_articles: usize,
    pub max_headline_attempts: usize,
    pub min_headlines: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            article_cache_ttl: DEFAULT_ARTICLE_CACHE_TTL,
            max_saved_articles: MAX_SAVED_ARTICLES,
            max_headline_attempts: MAX_HEADLINE_ATTEMPTS,
            min_headlines: DEFAULT_MIN_HEADLINES,
        }
    }
}

impl NewsConfig {
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }
}

/// Durations written as `1h`, `30m`, `1d` or `1h15m30s`; a bare number means seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| "Invalid number in duration".to_string())?;
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| format!("Duration too large: {}", s))?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_duration_units() {
        assert_eq!("1h".parse::<HumanDuration>().unwrap().0, Duration::from_secs(3600));
        assert_eq!("30m".parse::<HumanDuration>().unwrap().0, Duration::from_secs(1800));
        assert_eq!("1h15m30s".parse::<HumanDuration>().unwrap().0, Duration::from_secs(4530));
        assert_eq!("90".parse::<HumanDuration>().unwrap().0, Duration::from_secs(90));
        assert_eq!("7d".parse::<HumanDuration>().unwrap().0, Duration::from_secs(7 * 86400));
    }

    #[test]
    fn test_human_duration_rejects_garbage() {
        assert!("".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
        assert!("5w".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_human_duration_overflow_is_an_error() {
        let err = "300000000000000d".parse::<HumanDuration>().unwrap_err();
        assert!(err.starts_with("Duration too large"));
        assert!(format!("{}s1s", u64::MAX).parse::<HumanDuration>().is_err());
        assert!(format!("{}", u64::MAX).parse::<HumanDuration>().is_ok());
        assert!("99999999999999999999999h".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = NewsConfig::default();
        assert_eq!(config.freshness_window, Duration::from_secs(3600));
        assert_eq!(config.max_headline_attempts, 3);
        assert_eq!(config.sections[0], "Breaking News");
    }
}
