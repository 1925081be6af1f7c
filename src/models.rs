// Core data structures for country-atlas

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

// ============================================================================
// Upstream shapes
// ============================================================================

/// One entry of the countries source
///
/// Every field is optional and decoded leniently: a value of the wrong type
/// reads as absent, so one malformed field never rejects the whole entry.
/// The record builder applies the coercion rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCountry {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<RawName>,
    #[serde(default, deserialize_with = "lenient")]
    pub capital: Option<RawCapital>,
    #[serde(default, deserialize_with = "lenient")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub population: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub flag: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: Option<RawFlags>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub currencies: Option<Vec<RawCurrency>>,
}

impl RawCountry {
    /// Decode one list item; anything that is not an object becomes a
    /// nameless entry, which the builder skips.
    pub fn from_value(value: Value) -> Self {
        Self::deserialize(value).unwrap_or_default()
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| T::deserialize(item).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}

/// Keep numeric rates and drop the rest; a non-object `rates` is an error.
fn lenient_rates<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(code, rate)| rate.as_f64().map(|rate| (code, rate)))
            .collect()),
        Value::Null => Ok(HashMap::new()),
        other => Err(D::Error::custom(format!(
            "expected a map of rates, found {other}"
        ))),
    }
}

/// Country name: plain string (v2 style) or `{ "common": ... }` object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawName {
    Plain(String),
    Detailed { common: String },
}

impl RawName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(name) => name,
            Self::Detailed { common } => common,
        }
    }
}

/// Capital: single string or list of strings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCapital {
    One(String),
    Many(Vec<String>),
}

impl RawCapital {
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(capital) => Some(capital.as_str()),
            Self::Many(list) => list.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFlags {
    #[serde(default, deserialize_with = "lenient")]
    pub svg: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub png: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCurrency {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
}

/// Body of the exchange-rate source; only `rates` is used
///
/// Non-numeric rate values are dropped and count as a rate miss.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatesResponse {
    #[serde(default, deserialize_with = "lenient_rates")]
    pub rates: HashMap<String, f64>,
}

// ============================================================================
// Records
// ============================================================================

/// A built record, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCountry {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: String,
}

/// A persisted country record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: String,
}

/// Entry of the top-by-GDP ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdpRanking {
    pub name: String,
    pub estimated_gdp: Option<f64>,
}

/// Aggregate store state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total_countries: u64,
    pub last_refreshed_at: Option<String>,
}

// ============================================================================
// Listing
// ============================================================================

/// Ordering for country listings
///
/// Entries with a null GDP always sort last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    GdpDesc,
    GdpAsc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GdpDesc => "gdp_desc",
            Self::GdpAsc => "gdp_asc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gdp_desc" => Ok(Self::GdpDesc),
            "gdp_asc" => Ok(Self::GdpAsc),
            other => Err(format!(
                "Unsupported sort '{other}', expected one of: gdp_desc, gdp_asc"
            )),
        }
    }
}

/// Filter for [`crate::storage::CountryRepository::list`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryFilter {
    /// Exact region match
    pub region: Option<String>,
    /// Exact currency code match
    pub currency: Option<String>,
    pub sort: Option<SortOrder>,
}
