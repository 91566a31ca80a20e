use std::fmt;

use serde::{Deserialize, Serialize};

/// What an action does; decides how its payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Platform script (AppleScript on macOS).
    #[serde(rename = "applescript", alias = "script")]
    Script,
    #[serde(rename = "shell")]
    Shell,
    /// Payload is a seconds literal.
    #[serde(rename = "sleep")]
    Sleep,
    /// Payload is a JSON-encoded [`crate::MidiSendPayload`].
    #[serde(rename = "midi", alias = "midi-send")]
    MidiSend,
    /// A tag this build does not know. Loads fine; fails only when run.
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::Script,
        ActionType::Shell,
        ActionType::Sleep,
        ActionType::MidiSend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Script => "applescript",
            ActionType::Shell => "shell",
            ActionType::Sleep => "sleep",
            ActionType::MidiSend => "midi",
            ActionType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Script text, duration literal or MIDI JSON, depending on `action_type`.
    #[serde(rename = "code", default)]
    pub payload: String,
    /// Empty when the action sits at the root.
    #[serde(rename = "parent_group_id", default)]
    pub parent_id: String,
    #[serde(default)]
    pub order: usize,
    #[serde(default)]
    pub wait_for_completion: bool,
}

impl Action {
    pub fn new(name: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            action_type,
            payload: String::new(),
            parent_id: String::new(),
            order: 0,
            wait_for_completion: false,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }

    pub fn waiting(mut self, wait: bool) -> Self {
        self.wait_for_completion = wait;
        self
    }
}

/// A named, ordered container of actions and nested groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub id: String,
    pub name: String,
    #[serde(rename = "parent_group_id", default)]
    pub parent_id: String,
    #[serde(default)]
    pub order: usize,
}

impl ActionGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            parent_id: String::new(),
            order: 0,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = parent_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_actions_get_unique_ids() {
        let a = Action::new("One", ActionType::Shell);
        let b = Action::new("Two", ActionType::Shell);
        assert_ne!(a.id, b.id);
        assert!(a.parent_id.is_empty());
    }

    #[test]
    fn test_action_json_shape() {
        let json = r#"{
            "id": "x",
            "name": "Say hi",
            "type": "applescript",
            "code": "say \"hi\"",
            "parent_group_id": "",
            "order": 2,
            "wait_for_completion": true
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.action_type, ActionType::Script);
        assert_eq!(action.order, 2);
        assert!(action.wait_for_completion);

        let out = serde_json::to_value(&action).unwrap();
        assert_eq!(out["type"], "applescript");
        assert_eq!(out["code"], "say \"hi\"");
    }

    #[test]
    fn test_type_aliases() {
        let t: ActionType = serde_json::from_str("\"midi-send\"").unwrap();
        assert_eq!(t, ActionType::MidiSend);
        let t: ActionType = serde_json::from_str("\"script\"").unwrap();
        assert_eq!(t, ActionType::Script);
    }

    #[test]
    fn test_foreign_type_tag_loads_as_unknown() {
        let json = r#"{"id": "h", "name": "Webhook", "type": "http", "code": "GET /"}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.action_type, ActionType::Unknown);
        assert_eq!(action.payload, "GET /");
    }
}
