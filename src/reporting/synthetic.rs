//! Synthetic dashboard data.
//!
//! Forecast, billing and regional figures for the operator dashboard
//! are generated here, not read from the ledger. Everything in this
//! module is presentation-layer noise behind one clearly marked source;
//! none of it feeds the aggregation data path.

use chrono::{Datelike, Duration, Timelike, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Seasonal consumption multipliers per calendar month, winter high.
const SEASONAL_FACTORS: [f64; 12] = [
    1.2, 1.15, 1.0, 0.9, 0.85, 0.9, 1.1, 1.15, 1.0, 0.95, 1.05, 1.15,
];

/// Base daily household consumption in kWh.
const BASE_DAILY_KWH: f64 = 35.0;

/// Demo-friendly rate per kWh, denominated in ether.
const RATE_PER_KWH_ETH: f64 = 0.000_000_4;

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub timestamp: i64,
    pub period: String,
    pub value_kwh: f64,
    pub confidence: f64,
    pub accuracy_score: f64,
    pub personalized: bool,
    pub breakdown: ForecastBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastBreakdown {
    pub base_load: f64,
    pub variable_load: f64,
    pub peak_load: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub bill_id: String,
    pub user_address: String,
    pub period: String,
    pub consumption_kwh: f64,
    pub rate_eth_per_kwh: f64,
    pub amount_eth: f64,
    pub issue_date: String,
    pub due_date: String,
    pub status: String,
    pub breakdown: BillBreakdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillBreakdown {
    pub energy_charges: f64,
    pub grid_charges: f64,
    pub taxes: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionReport {
    pub name: String,
    pub users: i64,
    pub avg_consumption_kwh: f64,
    pub peak_load_mwh: f64,
    pub grid_stability: f64,
    pub day_forecast_mwh: f64,
    pub efficiency: f64,
}

struct RegionBase {
    key: &'static str,
    name: &'static str,
    users: i64,
    avg_consumption: f64,
    peak_day_mwh: f64,
}

const REGIONS: [RegionBase; 4] = [
    RegionBase {
        key: "north",
        name: "North District",
        users: 1850,
        avg_consumption: 29.1,
        peak_day_mwh: 53.8,
    },
    RegionBase {
        key: "east",
        name: "East District",
        users: 1675,
        avg_consumption: 30.5,
        peak_day_mwh: 51.1,
    },
    RegionBase {
        key: "south",
        name: "South District",
        users: 1950,
        avg_consumption: 32.8,
        peak_day_mwh: 64.0,
    },
    RegionBase {
        key: "west",
        name: "West District",
        users: 2350,
        avg_consumption: 27.8,
        peak_day_mwh: 65.3,
    },
];

/// Generator for all synthetic dashboard figures.
#[derive(Debug, Default)]
pub struct SyntheticSource;

impl SyntheticSource {
    pub fn new() -> Self {
        Self
    }

    /// Consumption forecast for `24h`, `7d` or `30d`. Returns `None`
    /// for any other period string.
    pub fn forecast(&self, period: &str, user_address: Option<&str>) -> Option<Forecast> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        let base = match period {
            "24h" => {
                // Evening-peak daily shape
                let hour = now.hour() as f64;
                let daily_pattern =
                    0.8 + 0.4 * (2.0 * std::f64::consts::PI * (hour + 6.0) / 24.0).sin();
                BASE_DAILY_KWH * daily_pattern * (1.0 + rng.gen_range(-0.15..0.15))
            }
            "7d" => {
                let weekday_weighted = (1.0 * 5.0 + 0.85 * 2.0) / 7.0;
                BASE_DAILY_KWH * 7.0 * weekday_weighted * (1.0 + rng.gen_range(-0.12..0.12))
            }
            "30d" => {
                let seasonal = SEASONAL_FACTORS[now.month0() as usize];
                BASE_DAILY_KWH * 30.0 * seasonal * (1.0 + rng.gen_range(-0.10..0.10))
            }
            _ => return None,
        };

        let value = match user_address {
            Some(addr) => base * personal_factor(addr),
            None => base,
        };

        Some(Forecast {
            timestamp: now.timestamp(),
            period: period.to_string(),
            value_kwh: round2(value),
            confidence: round1(rng.gen_range(85.0..95.0)),
            accuracy_score: round1(rng.gen_range(88.0..96.0)),
            personalized: user_address.is_some(),
            breakdown: ForecastBreakdown {
                base_load: round2(value * 0.6),
                variable_load: round2(value * 0.3),
                peak_load: round2(value * 0.1),
            },
        })
    }

    /// Monthly bill for one user address.
    pub fn bill(&self, user_address: &str) -> Bill {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        let base_consumption = 200.0 + personal_factor(user_address) * 100.0;
        let consumption = round1(base_consumption + rng.gen_range(-30.0..50.0));

        let energy_charges = consumption * RATE_PER_KWH_ETH;
        let grid_charges = energy_charges * 0.125;
        let taxes = energy_charges * 0.128;

        Bill {
            bill_id: format!("BILL-{}-{}", now.timestamp(), address_bucket(user_address)),
            user_address: user_address.to_string(),
            period: now.format("%B %Y").to_string(),
            consumption_kwh: consumption,
            rate_eth_per_kwh: RATE_PER_KWH_ETH,
            amount_eth: round6(energy_charges + grid_charges + taxes),
            issue_date: now.to_rfc3339(),
            due_date: (now + Duration::days(15)).to_rfc3339(),
            status: "pending".to_string(),
            breakdown: BillBreakdown {
                energy_charges: round6(energy_charges),
                grid_charges: round6(grid_charges),
                taxes: round6(taxes),
            },
        }
    }

    /// Dashboard figures for one region, or all regions when `region`
    /// is absent or unknown.
    pub fn regional(&self, region: Option<&str>) -> Vec<(String, RegionReport)> {
        REGIONS
            .iter()
            .filter(|base| region.map_or(true, |r| r == base.key))
            .map(|base| (base.key.to_string(), self.region_report(base)))
            .collect()
    }

    fn region_report(&self, base: &RegionBase) -> RegionReport {
        let mut rng = rand::thread_rng();
        RegionReport {
            name: base.name.to_string(),
            users: base.users + rng.gen_range(-20..50),
            avg_consumption_kwh: round1(base.avg_consumption + rng.gen_range(-1.5..2.0)),
            peak_load_mwh: round1(base.peak_day_mwh * 1.2 + rng.gen_range(-2.0..3.0)),
            grid_stability: round1(99.5 + rng.gen_range(-0.5..0.3)),
            day_forecast_mwh: round1(base.peak_day_mwh + rng.gen_range(-3.0..3.0)),
            efficiency: (92.0_f64 + rng.gen_range(-2.0..3.0)).round(),
        }
    }
}

/// Stable per-address multiplier in [0.8, 1.2), so repeated queries for
/// one user stay in character.
fn personal_factor(address: &str) -> f64 {
    0.8 + (address_bucket(address) as f64 / 1000.0) * 0.4
}

fn address_bucket(address: &str) -> u16 {
    let digest = Sha256::digest(address.as_bytes());
    u16::from_be_bytes([digest[0], digest[1]]) % 1000
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round6(v: f64) -> f64 {
    (v * 1e6).round() / 1e6
}
