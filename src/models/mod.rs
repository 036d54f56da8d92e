pub mod booking;
pub mod driver;
pub mod pricing;
pub mod profile;
pub mod stats;

/// Postgres `numeric` columns arrive either as JSON numbers or as strings.
pub(crate) mod numeric {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Number(f64),
        Text(String),
    }

    pub fn option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Loose>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Loose::Number(value)) => Ok(Some(value)),
            Some(Loose::Text(raw)) if raw.trim().is_empty() => Ok(None),
            Some(Loose::Text(raw)) => raw
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }

    pub fn or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        option(deserializer).map(|value| value.unwrap_or(0.0))
    }
}
