use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// One parsed response of the MójDomek account endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub active: bool,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: Option<String>,
    pub mainboard: Option<String>,
    pub software: Option<String>,
    pub max: Option<f64>,
    pub alarm: Option<f64>,
    pub direction: Option<String>,
    pub tank_type: Option<String>,
    pub address: Address,
    pub measurement: Measurement,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub street: Option<String>,
    pub town: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    pub percent: Option<f64>,
    pub cm: Option<f64>,
    pub temperature: Option<f64>,
    pub volts: Option<f64>,
    pub batt_level: Option<f64>,
    pub rssi: Option<f64>,
    pub next_full: Option<DateTime<Utc>>,
    pub last_empty: Option<DateTime<Utc>>,
    pub data_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("payload must be a JSON object")]
    InvalidPayloadType,
}

impl AccountSnapshot {
    pub fn display_name(&self) -> String {
        let first = self.firstname.as_deref().unwrap_or_default();
        let last = self.lastname.as_deref().unwrap_or_default();
        format!("{first} {last}")
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }
}

impl Location {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

pub fn parse_account(payload: &Value) -> Result<AccountSnapshot, ParseError> {
    let object = payload.as_object().ok_or(ParseError::InvalidPayloadType)?;

    let locations = match object.get("locations") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let location = parse_location(item);
                if location.is_none() {
                    tracing::warn!(index, "skipping location without a usable id");
                }
                location
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(AccountSnapshot {
        active: object.get("active").is_some_and(parse_flag),
        firstname: object.get("firstname").and_then(parse_text),
        lastname: object.get("lastname").and_then(parse_text),
        locations,
    })
}

fn parse_location(value: &Value) -> Option<Location> {
    let object = value.as_object()?;
    let id = object.get("id").and_then(parse_text)?;

    let address = object
        .get("address")
        .and_then(Value::as_object)
        .map(|address| Address {
            street: address.get("address").and_then(parse_text),
            town: address.get("town").and_then(parse_text),
        })
        .unwrap_or_default();

    let measurement = object
        .get("measurement")
        .and_then(Value::as_object)
        .map(parse_measurement)
        .unwrap_or_default();

    Some(Location {
        id,
        name: object.get("name").and_then(parse_text),
        mainboard: object.get("mainboard").and_then(parse_text),
        software: object.get("software").and_then(parse_text),
        max: object.get("max").and_then(parse_f64),
        alarm: object.get("alarm").and_then(parse_f64),
        direction: object.get("direction").and_then(parse_text),
        tank_type: object.get("tanktype").and_then(parse_text),
        address,
        measurement,
    })
}

fn parse_measurement(object: &Map<String, Value>) -> Measurement {
    let number = |key: &str| object.get(key).and_then(parse_f64);
    let timestamp = |key: &str| object.get(key).and_then(parse_timestamp);

    Measurement {
        percent: number("percent"),
        cm: number("cm"),
        temperature: number("temperature"),
        volts: number("volts"),
        batt_level: number("batt_level"),
        rssi: number("rssi"),
        next_full: timestamp("nextfull"),
        last_empty: timestamp("lastempty"),
        data_time: timestamp("datatime"),
    }
}

fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.trim(), "1" | "true"),
        _ => false,
    }
}

fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ParseError, parse_account};

    #[test]
    fn parses_full_location_payload() {
        let snapshot = parse_account(&json!({
            "active": true,
            "firstname": "Jan",
            "lastname": "Kowalski",
            "locations": [{
                "id": "A1",
                "name": "Szambo",
                "mainboard": "MD-2",
                "software": "1.4.2",
                "max": 10000,
                "alarm": "85",
                "direction": "down",
                "tanktype": 2,
                "address": { "address": "Polna 3", "town": "Kraków" },
                "measurement": {
                    "percent": 42,
                    "cm": "118.5",
                    "temperature": 7.25,
                    "volts": 3.61,
                    "batt_level": 88,
                    "rssi": 61,
                    "nextfull": "2026-11-02 06:00:00",
                    "lastempty": "2026-09-30",
                    "datatime": "2026-10-19T08:15:00+02:00"
                }
            }]
        }))
        .expect("payload should parse");

        assert!(snapshot.active);
        assert_eq!(snapshot.display_name(), "Jan Kowalski");

        let location = snapshot.location("A1").expect("location should exist");
        assert_eq!(location.display_name(), "Szambo");
        assert_eq!(location.max, Some(10000.0));
        assert_eq!(location.alarm, Some(85.0));
        assert_eq!(location.tank_type.as_deref(), Some("2"));
        assert_eq!(location.address.town.as_deref(), Some("Kraków"));
        assert_eq!(location.measurement.cm, Some(118.5));
        assert_eq!(
            location.measurement.next_full.map(|ts| ts.to_rfc3339()),
            Some("2026-11-02T06:00:00+00:00".to_string())
        );
        assert_eq!(
            location.measurement.last_empty.map(|ts| ts.to_rfc3339()),
            Some("2026-09-30T00:00:00+00:00".to_string())
        );
        assert_eq!(
            location.measurement.data_time.map(|ts| ts.to_rfc3339()),
            Some("2026-10-19T06:15:00+00:00".to_string())
        );
    }

    #[test]
    fn degrades_unexpected_measurement_types_to_none() {
        let snapshot = parse_account(&json!({
            "active": 1,
            "locations": [{
                "id": 17,
                "measurement": {
                    "percent": "n/a",
                    "cm": [1, 2],
                    "temperature": null,
                    "datatime": 1_700_000_000
                }
            }]
        }))
        .expect("payload should parse");

        assert!(snapshot.active);
        let location = snapshot.location("17").expect("numeric id should be normalized");
        assert_eq!(location.measurement.percent, None);
        assert_eq!(location.measurement.cm, None);
        assert_eq!(location.measurement.temperature, None);
        assert_eq!(location.measurement.data_time, None);
        assert_eq!(location.display_name(), "17");
    }

    #[test]
    fn skips_locations_without_id() {
        let snapshot = parse_account(&json!({
            "active": true,
            "locations": [{ "name": "orphan" }, { "id": "B2" }, "garbage"]
        }))
        .expect("payload should parse");

        assert_eq!(snapshot.locations.len(), 1);
        assert_eq!(snapshot.locations[0].id, "B2");
    }

    #[test]
    fn missing_fields_default_to_inactive_and_empty() {
        let snapshot = parse_account(&json!({})).expect("empty object should parse");

        assert!(!snapshot.active);
        assert!(snapshot.locations.is_empty());
        assert_eq!(snapshot.display_name(), " ");
    }

    #[test]
    fn rejects_non_object_payload() {
        assert_eq!(
            parse_account(&json!([1, 2, 3])),
            Err(ParseError::InvalidPayloadType)
        );
    }
}
