//! Record builder: raw upstream data -> normalized country records
//!
//! Derivation per country:
//!
//! | currency list | rate lookup | `exchange_rate` | `estimated_gdp`              |
//! |---------------|-------------|-----------------|------------------------------|
//! | empty/absent  | -           | null            | `0`                          |
//! | first code    | miss        | null            | null                         |
//! | first code    | hit `r`     | `r`             | `population * m / r` or null |
//!
//! `m` is drawn from a [`MultiplierSource`] over the inclusive configured
//! range for every priced country, so repeated builds over the same input
//! yield different GDP figures.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

use crate::models::{NewCountry, RawCountry};
use crate::utils::error::BuildError;

/// Source of GDP multipliers
pub trait MultiplierSource: Send {
    /// Draw an integer in `min..=max`
    fn draw(&mut self, min: u32, max: u32) -> u32;
}

/// Uniform draws from a ChaCha RNG
pub struct RandomMultiplier {
    rng: ChaCha8Rng,
}

impl RandomMultiplier {
    /// Seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Deterministic sequence for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl MultiplierSource for RandomMultiplier {
    fn draw(&mut self, min: u32, max: u32) -> u32 {
        self.rng.gen_range(min..=max)
    }
}

/// Always returns the same multiplier, clamped into the requested range
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub u32);

impl MultiplierSource for FixedMultiplier {
    fn draw(&mut self, min: u32, max: u32) -> u32 {
        self.0.clamp(min, max)
    }
}

/// First currency code of the list, if any
pub fn pick_currency_code(country: &RawCountry) -> Option<String> {
    country
        .currencies
        .as_ref()?
        .first()?
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

/// `population * multiplier / rate`, or `None` when the division is undefined
pub fn estimate_gdp(population: i64, multiplier: u32, rate: f64) -> Option<f64> {
    if rate == 0.0 || !rate.is_finite() {
        return None;
    }
    let gdp = (population as f64 * f64::from(multiplier)) / rate;
    gdp.is_finite().then_some(gdp)
}

/// Builds [`NewCountry`] records for one refresh batch
pub struct RecordBuilder {
    min: u32,
    max: u32,
}

impl RecordBuilder {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Build records for every named country
    ///
    /// All records share `refreshed_at`. Entries without a name are skipped.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidRange` when the multiplier range is empty.
    pub fn build(
        &self,
        countries: &[RawCountry],
        rates: &HashMap<String, f64>,
        refreshed_at: &str,
        multipliers: &mut dyn MultiplierSource,
    ) -> Result<Vec<NewCountry>, BuildError> {
        if self.min > self.max {
            return Err(BuildError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }

        let mut records = Vec::with_capacity(countries.len());
        let mut skipped = 0usize;

        for raw in countries {
            let Some(name) = raw
                .name
                .as_ref()
                .map(|n| n.as_str().trim())
                .filter(|n| !n.is_empty())
            else {
                skipped += 1;
                continue;
            };

            records.push(self.build_one(name, raw, rates, refreshed_at, multipliers));
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Skipped upstream countries without a name");
        }
        tracing::debug!(count = records.len(), "Built country records");

        Ok(records)
    }

    fn build_one(
        &self,
        name: &str,
        raw: &RawCountry,
        rates: &HashMap<String, f64>,
        refreshed_at: &str,
        multipliers: &mut dyn MultiplierSource,
    ) -> NewCountry {
        let population = raw
            .population
            .filter(|p| p.is_finite() && *p > 0.0)
            .map(|p| p as i64)
            .unwrap_or(0);

        let currency_code = pick_currency_code(raw);

        let (exchange_rate, estimated_gdp) = match currency_code.as_deref() {
            None => (None, Some(0.0)),
            Some(code) => match rates.get(code) {
                None => (None, None),
                Some(&rate) => {
                    let multiplier = multipliers.draw(self.min, self.max);
                    (Some(rate), estimate_gdp(population, multiplier, rate))
                }
            },
        };

        let flag_url = raw.flag.clone().or_else(|| {
            raw.flags
                .as_ref()
                .and_then(|f| f.svg.clone().or_else(|| f.png.clone()))
        });

        NewCountry {
            name: name.to_string(),
            capital: raw.capital.as_ref().and_then(|c| c.first()).map(str::to_string),
            region: raw.region.clone(),
            population,
            currency_code,
            exchange_rate,
            estimated_gdp,
            flag_url,
            last_refreshed_at: refreshed_at.to_string(),
        }
    }
}
