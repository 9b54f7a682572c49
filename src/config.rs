use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr};

use tracing::{info, warn};

use crate::error::FoodgramError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub domain: String,
    pub pool_size: u32,
    pub cooking_time_min: i16,
    pub cooking_time_max: i16,
}

impl Config {
    const DEFAULT_DOMAIN: &'static str = "http://localhost";
    const DEFAULT_POOL_SIZE: u32 = 5;
    const DEFAULT_COOKING_TIME_MIN: i16 = 1;
    const DEFAULT_COOKING_TIME_MAX: i16 = 32000;

    /// Reads `.env` when there is one, then the process environment.
    pub fn load() -> Result<Self, FoodgramError> {
        if let Err(error) = dotenvy::dotenv() {
            info!("No .env file loaded: {error}");
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FoodgramError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| FoodgramError::config("DATABASE_URL must be set"))?;

        let config = Self {
            database_url,
            domain: try_load(&lookup, "DOMAIN", Self::DEFAULT_DOMAIN.to_owned())?,
            pool_size: try_load(&lookup, "DATABASE_POOL_SIZE", Self::DEFAULT_POOL_SIZE)?,
            cooking_time_min: try_load(
                &lookup,
                "COOKING_TIME_MIN",
                Self::DEFAULT_COOKING_TIME_MIN,
            )?,
            cooking_time_max: try_load(
                &lookup,
                "COOKING_TIME_MAX",
                Self::DEFAULT_COOKING_TIME_MAX,
            )?,
        };

        if config.pool_size == 0 {
            return Err(FoodgramError::config("DATABASE_POOL_SIZE must be positive"));
        }
        if config.cooking_time_min < 1 || config.cooking_time_min > config.cooking_time_max {
            return Err(FoodgramError::config(format!(
                "invalid cooking time bounds {}..={}",
                config.cooking_time_min, config.cooking_time_max
            )));
        }

        Ok(config)
    }

    pub fn recipe_limits(&self) -> RecipeLimits {
        RecipeLimits {
            cooking_time: self.cooking_time_min..=self.cooking_time_max,
            ..RecipeLimits::default()
        }
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T, FoodgramError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|error| {
            warn!("Invalid {key} value: {error}");
            FoodgramError::config(format!("invalid {key} value {value:?}: {error}"))
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

/// Bounds enforced on every recipe write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLimits {
    pub cooking_time: RangeInclusive<i16>,
    pub amount: RangeInclusive<i16>,
    pub name_max_length: usize,
}

impl Default for RecipeLimits {
    fn default() -> Self {
        Self {
            cooking_time: Config::DEFAULT_COOKING_TIME_MIN..=Config::DEFAULT_COOKING_TIME_MAX,
            amount: 1..=i16::MAX,
            name_max_length: 256,
        }
    }
}
