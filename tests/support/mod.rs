#![allow(dead_code)]

use std::collections::HashSet;

use chrono::NaiveDate;
use ecbrates::rates::{CurrencyCode, ExchangeRateRecord, RateObservation};
use serde_json::{json, Value};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn code(value: &str) -> CurrencyCode {
    CurrencyCode::parse(value).unwrap()
}

pub fn eur_rate(target: &str, day: NaiveDate, rate: f64) -> RateObservation {
    RateObservation::new(day, CurrencyCode::eur(), code(target), rate).unwrap()
}

/// SDMX-JSON body in the shape of the ECB `jsondata` format.
pub fn sdmx_body(points: &[(NaiveDate, f64)]) -> Value {
    let values: Vec<Value> = points
        .iter()
        .map(|(day, _)| {
            let id = day.format("%Y-%m-%d").to_string();
            json!({ "id": id, "name": id })
        })
        .collect();
    let observations: serde_json::Map<String, Value> = points
        .iter()
        .enumerate()
        .map(|(index, (_, rate))| (index.to_string(), json!([rate])))
        .collect();

    json!({
        "header": { "test": false },
        "dataSets": [{
            "action": "Replace",
            "series": { "0:0:0:0:0": { "observations": observations } }
        }],
        "structure": {
            "dimensions": {
                "series": [],
                "observation": [{ "id": "TIME_PERIOD", "values": values }]
            }
        }
    })
}

pub fn find_record<'a>(
    records: &'a [ExchangeRateRecord],
    day: NaiveDate,
    base: &str,
    target: &str,
) -> Option<&'a ExchangeRateRecord> {
    records
        .iter()
        .find(|r| r.date == day && r.base_currency == base && r.target_currency == target)
}

pub fn assert_unique_records(records: &[ExchangeRateRecord]) {
    let keys: HashSet<_> = records
        .iter()
        .map(|r| (r.date, r.base_currency.clone(), r.target_currency.clone()))
        .collect();
    assert_eq!(keys.len(), records.len(), "duplicate (date, base, target)");
}
