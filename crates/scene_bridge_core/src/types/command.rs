use crate::{Result, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Plain 3-component vector. Serialized as `[x, y, z]`; `{x, y, z}` is
/// accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vector3Repr", into = "[f32; 3]")]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Vector3Repr {
    Array([f32; 3]),
    Object { x: f32, y: f32, z: f32 },
}

impl From<Vector3Repr> for Vector3 {
    fn from(repr: Vector3Repr) -> Self {
        match repr {
            Vector3Repr::Array(a) => a.into(),
            Vector3Repr::Object { x, y, z } => Self { x, y, z },
        }
    }
}

/// The closed set of actions the host understands. The string forms are a
/// wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Create,
    Delete,
    DeleteAll,
    AddComponent,
    SetProperty,
    CallStatic,
    CallMethod,
    Batch,
    Screenshot,
    SaveScene,
    Ping,
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        Self::Create,
        Self::Delete,
        Self::DeleteAll,
        Self::AddComponent,
        Self::SetProperty,
        Self::CallStatic,
        Self::CallMethod,
        Self::Batch,
        Self::Screenshot,
        Self::SaveScene,
        Self::Ping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::DeleteAll => "delete_all",
            Self::AddComponent => "add_component",
            Self::SetProperty => "set_property",
            Self::CallStatic => "call_static",
            Self::CallMethod => "call_method",
            Self::Batch => "batch",
            Self::Screenshot => "screenshot",
            Self::SaveScene => "save_scene",
            Self::Ping => "ping",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TransportError::InvalidCommand(format!("unknown action '{s}'")))
    }
}

/// One request to the host. The JSON form is flat and tagged by `"action"`,
/// with the host's field names (`type`, `propertyName`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Create {
        /// Primitive kind understood by the host, e.g. `cube`, `sphere`, `empty`.
        #[serde(rename = "type")]
        kind: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Vector3>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rotation: Option<Vector3>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale: Option<Vector3>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent: Option<String>,
    },
    Delete {
        name: String,
    },
    DeleteAll {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
    AddComponent {
        name: String,
        #[serde(rename = "type")]
        component: String,
    },
    SetProperty {
        name: String,
        #[serde(rename = "type")]
        component: String,
        #[serde(rename = "propertyName")]
        property: String,
        value: Value,
    },
    CallStatic {
        #[serde(rename = "type")]
        type_name: String,
        #[serde(rename = "name")]
        method: String,
    },
    CallMethod {
        name: String,
        #[serde(rename = "type")]
        component: String,
        #[serde(rename = "value")]
        method: String,
    },
    Batch {
        batch: Vec<Command>,
    },
    Screenshot {
        filename: String,
    },
    SaveScene {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
    Ping,
}

impl Command {
    /// `create` with only the required fields; chain [`Command::at`] /
    /// [`Command::scaled`] / [`Command::under`] for the rest.
    pub fn create(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Create {
            kind: kind.into(),
            name: name.into(),
            position: None,
            rotation: None,
            scale: None,
            parent: None,
        }
    }

    pub fn at(mut self, at: impl Into<Vector3>) -> Self {
        if let Self::Create { position, .. } = &mut self {
            *position = Some(at.into());
        }
        self
    }

    pub fn rotated(mut self, euler: impl Into<Vector3>) -> Self {
        if let Self::Create { rotation, .. } = &mut self {
            *rotation = Some(euler.into());
        }
        self
    }

    pub fn scaled(mut self, by: impl Into<Vector3>) -> Self {
        if let Self::Create { scale, .. } = &mut self {
            *scale = Some(by.into());
        }
        self
    }

    pub fn under(mut self, parent_name: impl Into<String>) -> Self {
        if let Self::Create { parent, .. } = &mut self {
            *parent = Some(parent_name.into());
        }
        self
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::Delete { name: name.into() }
    }

    pub fn delete_all<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::DeleteAll {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_component(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self::AddComponent {
            name: name.into(),
            component: component.into(),
        }
    }

    pub fn set_property(
        name: impl Into<String>,
        component: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::SetProperty {
            name: name.into(),
            component: component.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn call_static(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::CallStatic {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    pub fn call_method(
        name: impl Into<String>,
        component: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self::CallMethod {
            name: name.into(),
            component: component.into(),
            method: method.into(),
        }
    }

    /// Wraps `commands` into a single `batch`. Fails if any of them is itself
    /// a batch.
    pub fn batch(commands: Vec<Command>) -> Result<Self> {
        let batch = Self::Batch { batch: commands };
        batch.validate()?;
        Ok(batch)
    }

    pub fn screenshot(filename: impl Into<String>) -> Self {
        Self::Screenshot {
            filename: filename.into(),
        }
    }

    pub fn save_scene(filename: Option<String>) -> Self {
        Self::SaveScene { filename }
    }

    pub fn action(&self) -> ActionKind {
        match self {
            Self::Create { .. } => ActionKind::Create,
            Self::Delete { .. } => ActionKind::Delete,
            Self::DeleteAll { .. } => ActionKind::DeleteAll,
            Self::AddComponent { .. } => ActionKind::AddComponent,
            Self::SetProperty { .. } => ActionKind::SetProperty,
            Self::CallStatic { .. } => ActionKind::CallStatic,
            Self::CallMethod { .. } => ActionKind::CallMethod,
            Self::Batch { .. } => ActionKind::Batch,
            Self::Screenshot { .. } => ActionKind::Screenshot,
            Self::SaveScene { .. } => ActionKind::SaveScene,
            Self::Ping => ActionKind::Ping,
        }
    }

    /// Name of the entity this command addresses, if any. Names are not
    /// unique on the host; which object a name resolves to is up to the host.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Create { name, .. }
            | Self::Delete { name }
            | Self::AddComponent { name, .. }
            | Self::SetProperty { name, .. }
            | Self::CallMethod { name, .. } => Some(name),
            Self::DeleteAll { .. }
            | Self::CallStatic { .. }
            | Self::Batch { .. }
            | Self::Screenshot { .. }
            | Self::SaveScene { .. }
            | Self::Ping => None,
        }
    }

    /// Shape check done before anything goes on the wire. Only batch nesting
    /// is checked; unknown types or properties are for the host to reject.
    pub fn validate(&self) -> Result<()> {
        if let Self::Batch { batch } = self {
            if let Some(pos) = batch.iter().position(|c| c.action() == ActionKind::Batch) {
                return Err(TransportError::InvalidCommand(format!(
                    "batch entry #{pos} is itself a batch; batches nest one level only"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_serializes_flat_with_host_field_names() {
        let cmd = Command::create("cube", "X")
            .at([0.0, 2.0, 0.0])
            .scaled(Vector3::ONE);

        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "action": "create",
                "type": "cube",
                "name": "X",
                "position": [0.0, 2.0, 0.0],
                "scale": [1.0, 1.0, 1.0]
            })
        );
    }

    #[test]
    fn test_set_property_field_names() {
        let cmd = Command::set_property("Sol", "Core.Star", "Mass", "1.0");
        let value = serde_json::to_value(&cmd).unwrap();
        assert_eq!(value["action"], "set_property");
        assert_eq!(value["type"], "Core.Star");
        assert_eq!(value["propertyName"], "Mass");
        assert_eq!(value["value"], "1.0");
    }

    #[test]
    fn test_call_static_uses_name_for_method() {
        let cmd = Command::call_static("EditorScripts.Bootstrap", "SetupScene");
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({"action": "call_static", "type": "EditorScripts.Bootstrap", "name": "SetupScene"})
        );
        assert_eq!(cmd.target(), None);
    }

    #[test]
    fn test_ping_is_action_only() {
        assert_eq!(serde_json::to_value(Command::Ping).unwrap(), json!({"action": "ping"}));
    }

    #[test]
    fn test_parses_script_style_payload() {
        let cmd: Command = serde_json::from_value(json!({
            "action": "create",
            "type": "sphere",
            "name": "Earth",
            "position": {"x": 200.0, "y": 0.0, "z": 0.0},
            "scale": [10, 10, 10],
            "parent": "Cosmos"
        }))
        .unwrap();

        match cmd {
            Command::Create { kind, name, position, scale, parent, rotation } => {
                assert_eq!(kind, "sphere");
                assert_eq!(name, "Earth");
                assert_eq!(position, Some(Vector3::new(200.0, 0.0, 0.0)));
                assert_eq!(scale, Some(Vector3::new(10.0, 10.0, 10.0)));
                assert_eq!(parent.as_deref(), Some("Cosmos"));
                assert!(rotation.is_none());
            }
            other => panic!("Expected Create, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_all_exclude_defaults_empty() {
        let cmd: Command = serde_json::from_value(json!({"action": "delete_all"})).unwrap();
        assert_eq!(cmd, Command::DeleteAll { exclude: vec![] });

        let keep = Command::delete_all(["Main Camera", "Directional Light"]);
        assert_eq!(
            serde_json::to_value(&keep).unwrap(),
            json!({"action": "delete_all", "exclude": ["Main Camera", "Directional Light"]})
        );
    }

    #[test]
    fn test_unknown_action_fails_to_parse() {
        let err = serde_json::from_value::<Command>(json!({"action": "explode"}));
        assert!(err.is_err());
    }

    #[test]
    fn test_action_kind_strings_are_stable() {
        let names: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();
        assert_eq!(
            names,
            vec![
                "create",
                "delete",
                "delete_all",
                "add_component",
                "set_property",
                "call_static",
                "call_method",
                "batch",
                "screenshot",
                "save_scene",
                "ping",
            ]
        );
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_action_and_target() {
        assert_eq!(Command::delete("Drone_1").action(), ActionKind::Delete);
        assert_eq!(Command::delete("Drone_1").target(), Some("Drone_1"));
        assert_eq!(
            Command::call_method("Ship", "Gameplay.ShipController", "Fire").target(),
            Some("Ship")
        );
        assert_eq!(Command::screenshot("shot.png").target(), None);
    }

    #[test]
    fn test_nested_batch_is_rejected() {
        let inner = Command::batch(vec![Command::Ping]).unwrap();
        let err = Command::batch(vec![Command::delete("a"), inner]).unwrap_err();
        match err {
            TransportError::InvalidCommand(message) => assert!(message.contains("#1")),
            other => panic!("Expected InvalidCommand, got {other:?}"),
        }
    }

    #[test]
    fn test_create_modifiers_ignore_other_variants() {
        let cmd = Command::delete("a").at([1.0, 2.0, 3.0]).under("root");
        assert_eq!(cmd, Command::delete("a"));
    }
}
