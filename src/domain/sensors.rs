use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::domain::account::{AccountSnapshot, Location};

pub const MANUFACTURER: &str = "MójDomek.eu";
const UNKNOWN_MODEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Percent,
    Centimeters,
    Celsius,
    Volts,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Centimeters => "cm",
            Self::Celsius => "°C",
            Self::Volts => "V",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    TankLevel,
    Distance,
    Temperature,
    Voltage,
    Battery,
    SignalStrength,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Timestamp(DateTime<Utc>),
    Unknown,
}

impl MetricValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Unknown, Self::Number)
    }
}

impl From<Option<DateTime<Utc>>> for MetricValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Unknown, Self::Timestamp)
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Timestamp(timestamp) => {
                f.write_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(number) => serializer.serialize_f64(*number),
            Self::Timestamp(_) | Self::Unknown => serializer.collect_str(self),
        }
    }
}

/// Static description of one per-location metric.
pub struct MetricDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<Unit>,
    pub category: MetricCategory,
    pub extract: fn(&Location) -> MetricValue,
}

impl std::fmt::Debug for MetricDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricDescriptor")
            .field("key", &self.key)
            .field("unit", &self.unit)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

pub static METRICS: &[MetricDescriptor] = &[
    MetricDescriptor {
        key: "percent",
        name: "Tank Level",
        unit: Some(Unit::Percent),
        category: MetricCategory::TankLevel,
        extract: tank_percent,
    },
    MetricDescriptor {
        key: "cm",
        name: "Tank Level (cm)",
        unit: Some(Unit::Centimeters),
        category: MetricCategory::Distance,
        extract: tank_cm,
    },
    MetricDescriptor {
        key: "temperature",
        name: "Temperature",
        unit: Some(Unit::Celsius),
        category: MetricCategory::Temperature,
        extract: temperature,
    },
    MetricDescriptor {
        key: "volts",
        name: "Battery Voltage",
        unit: Some(Unit::Volts),
        category: MetricCategory::Voltage,
        extract: battery_volts,
    },
    MetricDescriptor {
        key: "batt_level",
        name: "Battery Level",
        unit: Some(Unit::Percent),
        category: MetricCategory::Battery,
        extract: battery_level,
    },
    MetricDescriptor {
        key: "rssi",
        name: "Signal Strength",
        unit: Some(Unit::Percent),
        category: MetricCategory::SignalStrength,
        extract: signal_strength,
    },
    MetricDescriptor {
        key: "nextfull",
        name: "Predicted Full Date",
        unit: None,
        category: MetricCategory::Timestamp,
        extract: next_full,
    },
    MetricDescriptor {
        key: "lastempty",
        name: "Last Emptied",
        unit: None,
        category: MetricCategory::Timestamp,
        extract: last_empty,
    },
    MetricDescriptor {
        key: "datatime",
        name: "Last Update",
        unit: None,
        category: MetricCategory::Timestamp,
        extract: last_update,
    },
];

fn tank_percent(location: &Location) -> MetricValue {
    location.measurement.percent.into()
}

fn tank_cm(location: &Location) -> MetricValue {
    location.measurement.cm.into()
}

fn temperature(location: &Location) -> MetricValue {
    location.measurement.temperature.into()
}

fn battery_volts(location: &Location) -> MetricValue {
    location.measurement.volts.into()
}

fn battery_level(location: &Location) -> MetricValue {
    location.measurement.batt_level.into()
}

fn signal_strength(location: &Location) -> MetricValue {
    location.measurement.rssi.into()
}

fn next_full(location: &Location) -> MetricValue {
    location.measurement.next_full.into()
}

fn last_empty(location: &Location) -> MetricValue {
    location.measurement.last_empty.into()
}

fn last_update(location: &Location) -> MetricValue {
    location.measurement.data_time.into()
}

pub fn metric(key: &str) -> Option<&'static MetricDescriptor> {
    METRICS.iter().find(|descriptor| descriptor.key == key)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub unique_id: String,
    pub name: String,
    pub location_id: String,
    pub metric: &'static str,
    pub unit: Option<Unit>,
    pub category: MetricCategory,
    pub value: MetricValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
    pub sw_version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationAttributes {
    pub location_id: String,
    pub max_capacity: Option<f64>,
    pub alarm_level: Option<f64>,
    pub direction: Option<String>,
    pub tank_type: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationView {
    pub device: DeviceInfo,
    pub attributes: LocationAttributes,
}

pub fn unique_id(location_id: &str, metric_key: &str) -> String {
    format!("{location_id}_{metric_key}")
}

pub fn device_info(location: &Location) -> DeviceInfo {
    DeviceInfo {
        identifier: location.id.clone(),
        name: location.display_name().to_string(),
        manufacturer: MANUFACTURER,
        model: location
            .mainboard
            .clone()
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
        sw_version: location
            .software
            .clone()
            .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
    }
}

pub fn location_attributes(location: &Location) -> LocationAttributes {
    LocationAttributes {
        location_id: location.id.clone(),
        max_capacity: location.max,
        alarm_level: location.alarm,
        direction: location.direction.clone(),
        tank_type: location.tank_type.clone(),
        address: location.address.street.clone(),
        town: location.address.town.clone(),
    }
}

fn reading(location: &Location, descriptor: &'static MetricDescriptor) -> SensorReading {
    SensorReading {
        unique_id: unique_id(&location.id, descriptor.key),
        name: format!("{} {}", location.display_name(), descriptor.name),
        location_id: location.id.clone(),
        metric: descriptor.key,
        unit: descriptor.unit,
        category: descriptor.category,
        value: (descriptor.extract)(location),
    }
}

/// Every (location, metric) reading of a snapshot, in location order.
pub fn project(snapshot: &AccountSnapshot) -> Vec<SensorReading> {
    snapshot
        .locations
        .iter()
        .flat_map(|location| {
            METRICS
                .iter()
                .map(move |descriptor| reading(location, descriptor))
        })
        .collect()
}

pub fn resolve(
    snapshot: &AccountSnapshot,
    location_id: &str,
    metric_key: &str,
) -> Option<SensorReading> {
    let descriptor = metric(metric_key)?;
    let location = snapshot.location(location_id)?;
    Some(reading(location, descriptor))
}

pub fn describe_locations(snapshot: &AccountSnapshot) -> Vec<LocationView> {
    snapshot
        .locations
        .iter()
        .map(|location| LocationView {
            device: device_info(location),
            attributes: location_attributes(location),
        })
        .collect()
}

/// A sensor bound to a location id, resolved against whichever snapshot is current.
#[derive(Debug, Clone)]
pub struct Sensor {
    location_id: String,
    name: String,
    descriptor: &'static MetricDescriptor,
}

impl Sensor {
    /// Sensors for every location present in `snapshot`.
    pub fn discover(snapshot: &AccountSnapshot) -> Vec<Self> {
        snapshot
            .locations
            .iter()
            .flat_map(|location| {
                METRICS.iter().map(move |descriptor| Self {
                    location_id: location.id.clone(),
                    name: format!("{} {}", location.display_name(), descriptor.name),
                    descriptor,
                })
            })
            .collect()
    }

    pub fn unique_id(&self) -> String {
        unique_id(&self.location_id, self.descriptor.key)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> &'static MetricDescriptor {
        self.descriptor
    }

    pub fn value(&self, snapshot: &AccountSnapshot) -> MetricValue {
        snapshot
            .location(&self.location_id)
            .map_or(MetricValue::Unknown, |location| {
                (self.descriptor.extract)(location)
            })
    }
}
