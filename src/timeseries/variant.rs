//! Variant tag of a time series: what its space axis indexes.
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::labels::AxisRole;
use crate::sensors::SensorsType;

/// Closed set of time-series variants.
///
/// All variants share the same 4-D contract; the tag only decides the
/// default axis names and which collaborator (sensors, surface) is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TsType {
    #[default]
    Region,
    Surface,
    Volume,
    EegSensor,
    MegSensor,
    SeegSensor,
    Untyped,
}

impl TsType {
    pub fn from_sensors(sensors_type: SensorsType) -> Self {
        match sensors_type {
            SensorsType::Eeg => TsType::EegSensor,
            SensorsType::Meg => TsType::MegSensor,
            SensorsType::Seeg => TsType::SeegSensor,
        }
    }

    pub fn is_sensor(self) -> bool {
        matches!(self, TsType::EegSensor | TsType::MegSensor | TsType::SeegSensor)
    }

    /// Default axis names in physical order.
    pub fn axis_names(self) -> [String; 4] {
        let mut names = AxisRole::ALL.map(|r| r.default_name().to_string());
        match self {
            TsType::Volume => {
                names[1] = "X".into();
                names[2] = "Y".into();
                names[3] = "Z".into();
            }
            TsType::Region => names[2] = "Region".into(),
            TsType::Surface => names[2] = "Vertex".into(),
            TsType::EegSensor | TsType::MegSensor | TsType::SeegSensor => {
                names[2] = self.to_string();
            }
            TsType::Untyped => {}
        }
        names
    }

    pub fn default_title(self) -> String {
        match self {
            TsType::Untyped => "Time Series".into(),
            _ => format!("{self} Time Series"),
        }
    }
}

impl fmt::Display for TsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TsType::Region => "Region",
            TsType::Surface => "Surface",
            TsType::Volume => "Volume",
            TsType::EegSensor => "EEG sensor",
            TsType::MegSensor => "MEG sensor",
            TsType::SeegSensor => "SEEG sensor",
            TsType::Untyped => "",
        })
    }
}

impl FromStr for TsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(TsType::Region),
            "surface" => Ok(TsType::Surface),
            "volume" => Ok(TsType::Volume),
            "eeg sensor" | "eeg" => Ok(TsType::EegSensor),
            "meg sensor" | "meg" => Ok(TsType::MegSensor),
            "seeg sensor" | "seeg" | "internal sensor" => Ok(TsType::SeegSensor),
            "" => Ok(TsType::Untyped),
            _ => Err(Error::InvalidParameter(format!("unknown time series type {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_axis_name_follows_variant() {
        assert_eq!(TsType::Region.axis_names()[2], "Region");
        assert_eq!(TsType::Surface.axis_names()[2], "Vertex");
        assert_eq!(TsType::SeegSensor.axis_names()[2], "SEEG sensor");
        assert_eq!(TsType::Untyped.axis_names()[2], "Space");
        assert_eq!(TsType::Volume.axis_names(), ["Time", "X", "Y", "Z"].map(String::from));
    }

    #[test]
    fn parses_legacy_names() {
        assert_eq!("Internal sensor".parse::<TsType>().unwrap(), TsType::SeegSensor);
        assert_eq!("region".parse::<TsType>().unwrap(), TsType::Region);
        assert_eq!("".parse::<TsType>().unwrap(), TsType::Untyped);
        assert!("cortex".parse::<TsType>().is_err());
    }

    #[test]
    fn titles() {
        assert_eq!(TsType::EegSensor.default_title(), "EEG sensor Time Series");
        assert_eq!(TsType::Untyped.default_title(), "Time Series");
    }
}
