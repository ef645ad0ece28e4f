//! Physical button positions on the reference controller

use crate::ControlsError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One physical location on the reference controller (Switch layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionKey {
    FaceBottom,
    FaceRight,
    FaceLeft,
    FaceTop,
    ShoulderL,
    ShoulderR,
    TriggerL,
    TriggerR,
    Dpad,
    LeftStick,
    RightStick,
    L3, // Left stick click
    R3, // Right stick click
    Start,
    Select,
}

impl PositionKey {
    pub const ALL: [PositionKey; 15] = [
        PositionKey::FaceBottom,
        PositionKey::FaceRight,
        PositionKey::FaceLeft,
        PositionKey::FaceTop,
        PositionKey::ShoulderL,
        PositionKey::ShoulderR,
        PositionKey::TriggerL,
        PositionKey::TriggerR,
        PositionKey::Dpad,
        PositionKey::LeftStick,
        PositionKey::RightStick,
        PositionKey::L3,
        PositionKey::R3,
        PositionKey::Start,
        PositionKey::Select,
    ];

    /// Key as stored in JSON files and generation responses
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionKey::FaceBottom => "faceBottom",
            PositionKey::FaceRight => "faceRight",
            PositionKey::FaceLeft => "faceLeft",
            PositionKey::FaceTop => "faceTop",
            PositionKey::ShoulderL => "shoulderL",
            PositionKey::ShoulderR => "shoulderR",
            PositionKey::TriggerL => "triggerL",
            PositionKey::TriggerR => "triggerR",
            PositionKey::Dpad => "dpad",
            PositionKey::LeftStick => "leftStick",
            PositionKey::RightStick => "rightStick",
            PositionKey::L3 => "l3",
            PositionKey::R3 => "r3",
            PositionKey::Start => "start",
            PositionKey::Select => "select",
        }
    }

    /// Physical description used when explaining the controller
    pub fn description(&self) -> &'static str {
        match self {
            PositionKey::FaceBottom => "B button (bottom face button, red)",
            PositionKey::FaceRight => "A button (right face button, green)",
            PositionKey::FaceLeft => "Y button (left face button, yellow)",
            PositionKey::FaceTop => "X button (top face button, blue)",
            PositionKey::ShoulderL => "L bumper",
            PositionKey::ShoulderR => "R bumper",
            PositionKey::TriggerL => "ZL trigger",
            PositionKey::TriggerR => "ZR trigger",
            PositionKey::Dpad => "directional pad",
            PositionKey::LeftStick => "left analog stick",
            PositionKey::RightStick => "right analog stick",
            PositionKey::L3 => "left stick click",
            PositionKey::R3 => "right stick click",
            PositionKey::Start => "+ button",
            PositionKey::Select => "- button",
        }
    }

    /// Short name with the button printed on the controller, e.g.
    /// `faceBottom (B on controller)`
    pub fn friendly_name(&self) -> String {
        let printed = match self {
            PositionKey::FaceBottom => "B",
            PositionKey::FaceRight => "A",
            PositionKey::FaceLeft => "Y",
            PositionKey::FaceTop => "X",
            PositionKey::ShoulderL => "L",
            PositionKey::ShoulderR => "R",
            PositionKey::TriggerL => "ZL",
            PositionKey::TriggerR => "ZR",
            _ => return self.as_str().to_string(),
        };
        format!("{} ({} on controller)", self.as_str(), printed)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionKey {
    type Err = ControlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ControlsError::UnknownPosition(s.to_string()))
    }
}

/// Partial map from position to a short in-game action label.
///
/// Missing positions mean "unknown or unused".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerPositionMap(BTreeMap<PositionKey, String>);

impl ControllerPositionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep recognized keys whose value is a non-empty string
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .filter_map(|(key, value)| {
                let key = key.parse::<PositionKey>().ok()?;
                let label = value.as_str()?.trim();
                (!label.is_empty()).then(|| (key, label.to_string()))
            })
            .collect()
    }

    pub fn get(&self, key: PositionKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn insert(&mut self, key: PositionKey, label: impl Into<String>) -> Option<String> {
        self.0.insert(key, label.into())
    }

    pub fn remove(&mut self, key: PositionKey) -> Option<String> {
        self.0.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PositionKey, &str)> {
        self.0.iter().map(|(key, label)| (*key, label.as_str()))
    }
}

impl FromIterator<(PositionKey, String)> for ControllerPositionMap {
    fn from_iter<I: IntoIterator<Item = (PositionKey, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(PositionKey, &'a str)> for ControllerPositionMap {
    fn from_iter<I: IntoIterator<Item = (PositionKey, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, label)| (key, label.to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_names_round_trip() {
        for key in PositionKey::ALL {
            assert_eq!(key.as_str().parse::<PositionKey>().unwrap(), key);
            assert_eq!(
                serde_json::to_value(key).unwrap(),
                Value::String(key.as_str().to_string())
            );
        }
        assert!("FaceBottom".parse::<PositionKey>().is_err());
        assert!("home".parse::<PositionKey>().is_err());
    }

    #[test]
    fn test_friendly_name() {
        assert_eq!(
            PositionKey::FaceBottom.friendly_name(),
            "faceBottom (B on controller)"
        );
        assert_eq!(PositionKey::Start.friendly_name(), "start");
    }

    #[test]
    fn test_from_json_object_filters() {
        let value = json!({
            "faceBottom": "Jump",
            "home": "Menu",
            "start": "",
            "dpad": 3,
            "leftStick": " Move "
        });
        let map = ControllerPositionMap::from_json_object(value.as_object().unwrap());

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(PositionKey::FaceBottom), Some("Jump"));
        assert_eq!(map.get(PositionKey::LeftStick), Some("Move"));
        assert_eq!(map.get(PositionKey::Start), None);
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let map: ControllerPositionMap = [
            (PositionKey::Start, "Pause"),
            (PositionKey::FaceBottom, "Jump"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"faceBottom":"Jump","start":"Pause"}"#
        );
    }
}
