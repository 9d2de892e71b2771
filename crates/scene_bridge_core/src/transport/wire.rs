//! Protobuf schema and codec for the ZeroMQ transport.
//!
//! `CommandMsg` keeps the host's original slots (`action`, `target`,
//! `vector_payload`) and carries every other command field in `params` as
//! JSON-encoded text, so new fields never need a schema change. Both
//! directions are public: the client half is used by [`super::ZmqTransport`],
//! the host half is enough to stand up a stub host.

use crate::types::{Command, Entity, Reply, ReplyStatus, Vector3};
use crate::{Result, TransportError};
use prost::Message;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Copy, PartialEq, Message)]
pub struct Vector3Msg {
    #[prost(float, tag = "1")]
    pub x: f32,
    #[prost(float, tag = "2")]
    pub y: f32,
    #[prost(float, tag = "3")]
    pub z: f32,
}

#[derive(Clone, PartialEq, Message)]
pub struct CommandMsg {
    #[prost(string, tag = "1")]
    pub action: String,
    #[prost(string, tag = "2")]
    pub target: String,
    #[prost(message, optional, tag = "3")]
    pub vector_payload: Option<Vector3Msg>,
    #[prost(btree_map = "string, string", tag = "4")]
    pub params: BTreeMap<String, String>,
    #[prost(message, repeated, tag = "5")]
    pub batch: Vec<CommandMsg>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransformMsg {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub position: Option<Vector3Msg>,
    #[prost(message, optional, tag = "3")]
    pub rotation: Option<Vector3Msg>,
    #[prost(string, repeated, tag = "4")]
    pub components: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct GameStateMsg {
    #[prost(float, tag = "1")]
    pub timestamp: f32,
    /// `ok`, `ok: <message>`, `error` or `error: <message>`.
    #[prost(string, tag = "2")]
    pub status: String,
    #[prost(message, repeated, tag = "3")]
    pub entities: Vec<TransformMsg>,
}

impl From<Vector3> for Vector3Msg {
    fn from(v: Vector3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vector3Msg> for Vector3 {
    fn from(v: Vector3Msg) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

const NAME_FIELD: &str = "name";
const POSITION_FIELD: &str = "position";
const BATCH_FIELD: &str = "batch";

/// Actions whose JSON form always has a `name` field, even an empty one.
fn carries_name(action: &str) -> bool {
    matches!(
        action,
        "create" | "delete" | "add_component" | "set_property" | "call_static" | "call_method"
    )
}

pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    command.validate()?;
    Ok(command_to_msg(command)?.encode_to_vec())
}

/// Host side: parse a request frame back into a [`Command`].
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let msg = CommandMsg::decode(bytes)?;
    let value = msg_to_value(msg)?;
    let command: Command = serde_json::from_value(value)
        .map_err(|e| TransportError::Protocol(format!("command does not match schema: {e}")))?;
    command.validate()?;
    Ok(command)
}

/// Host side: serialize a [`Reply`] into a response frame.
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    GameStateMsg {
        timestamp: 0.0,
        status: status_text(reply),
        entities: reply.entities.iter().map(entity_to_msg).collect(),
    }
    .encode_to_vec()
}

pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    let msg = GameStateMsg::decode(bytes)?;
    let (status, message) = parse_status(&msg.status)?;
    Ok(Reply {
        status,
        message,
        entities: msg.entities.into_iter().map(entity_from_msg).collect(),
    })
}

fn command_to_msg(command: &Command) -> Result<CommandMsg> {
    let Value::Object(mut fields) = serde_json::to_value(command)? else {
        return Err(TransportError::Protocol(
            "command did not serialize to an object".into(),
        ));
    };

    fields.remove("action");

    let target = match fields.remove(NAME_FIELD) {
        Some(Value::String(name)) => name,
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let vector_payload = fields
        .remove(POSITION_FIELD)
        .map(serde_json::from_value::<Vector3>)
        .transpose()?
        .map(Vector3Msg::from);

    let batch = match command {
        Command::Batch { batch } => {
            fields.remove(BATCH_FIELD);
            batch.iter().map(command_to_msg).collect::<Result<Vec<_>>>()?
        }
        _ => Vec::new(),
    };

    Ok(CommandMsg {
        action: command.action().as_str().to_string(),
        target,
        vector_payload,
        params: fields
            .into_iter()
            .map(|(key, value)| (key, value.to_string()))
            .collect(),
        batch,
    })
}

fn msg_to_value(msg: CommandMsg) -> Result<Value> {
    let mut fields = Map::new();

    for (key, raw) in msg.params {
        let value = serde_json::from_str(&raw).map_err(|e| {
            TransportError::Protocol(format!("param '{key}' is not valid JSON: {e}"))
        })?;
        fields.insert(key, value);
    }

    if !msg.target.is_empty() || carries_name(&msg.action) {
        fields.insert(NAME_FIELD.to_string(), Value::String(msg.target));
    }

    if let Some(v) = msg.vector_payload {
        fields.insert(
            POSITION_FIELD.to_string(),
            serde_json::to_value(Vector3::from(v))?,
        );
    }

    if msg.action == "batch" {
        let inner = msg
            .batch
            .into_iter()
            .map(msg_to_value)
            .collect::<Result<Vec<_>>>()?;
        fields.insert(BATCH_FIELD.to_string(), Value::Array(inner));
    }

    fields.insert("action".to_string(), Value::String(msg.action));
    Ok(Value::Object(fields))
}

fn status_text(reply: &Reply) -> String {
    let head = match reply.status {
        ReplyStatus::Ok => "ok",
        ReplyStatus::Error => "error",
    };
    if reply.message.is_empty() {
        head.to_string()
    } else {
        format!("{head}: {}", reply.message)
    }
}

fn parse_status(raw: &str) -> Result<(ReplyStatus, String)> {
    let (head, message) = match raw.split_once(':') {
        Some((head, rest)) => (head, rest.strip_prefix(' ').unwrap_or(rest)),
        None => (raw, ""),
    };

    let status = match head.trim() {
        "ok" => ReplyStatus::Ok,
        "error" => ReplyStatus::Error,
        other => {
            return Err(TransportError::Protocol(format!(
                "unrecognized reply status '{other}'"
            )))
        }
    };
    Ok((status, message.to_string()))
}

fn entity_to_msg(entity: &Entity) -> TransformMsg {
    TransformMsg {
        name: entity.name.clone(),
        position: Some(entity.position.into()),
        rotation: Some(entity.rotation.into()),
        components: entity.components.iter().cloned().collect(),
    }
}

fn entity_from_msg(msg: TransformMsg) -> Entity {
    Entity {
        name: msg.name,
        position: msg.position.map(Vector3::from).unwrap_or_default(),
        rotation: msg.rotation.map(Vector3::from).unwrap_or_default(),
        components: msg.components.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_commands() -> Vec<Command> {
        vec![
            Command::create("cube", "X")
                .at([0.0, 2.0, 0.0])
                .scaled([1.0, 1.0, 1.0])
                .under("Cosmos"),
            Command::delete("Drone_Alpha_0"),
            Command::delete_all(["Main Camera", "Directional Light"]),
            Command::add_component("Physics", "Core.PhysicsEngine"),
            Command::set_property("Enemy_Drone", "Transform", "position", json!([0, 0, 100])),
            Command::call_static("EditorScripts.Bootstrap", "SetupScene"),
            Command::call_method("Ship", "Gameplay.ShipController", "Fire"),
            Command::screenshot("proof.png"),
            Command::save_scene(None),
            Command::save_scene(Some("Level1.unity".into())),
            Command::Ping,
            Command::batch(vec![
                Command::create("empty", "Cosmos").at([0.0, 0.0, 0.0]),
                Command::add_component("Cosmos", "Core.GameManager"),
                Command::save_scene(None),
            ])
            .unwrap(),
        ]
    }

    #[test]
    fn test_commands_survive_the_wire() {
        for command in sample_commands() {
            let bytes = encode_command(&command).unwrap();
            assert_eq!(decode_command(&bytes).unwrap(), command, "{command:?}");
        }
    }

    #[test]
    fn test_host_slots_are_filled() {
        let bytes = encode_command(&Command::create("cube", "X").at([1.0, 2.0, 3.0])).unwrap();
        let msg = CommandMsg::decode(bytes.as_slice()).unwrap();

        assert_eq!(msg.action, "create");
        assert_eq!(msg.target, "X");
        assert_eq!(msg.vector_payload, Some(Vector3Msg { x: 1.0, y: 2.0, z: 3.0 }));
        assert_eq!(msg.params.get("type").map(String::as_str), Some("\"cube\""));
        assert!(!msg.params.contains_key("name"));
    }

    #[test]
    fn test_replies_survive_the_wire() {
        let mut ship = Entity::new("PlayerShip");
        ship.position = Vector3::new(180.0, 20.0, 0.0);
        ship.rotation = Vector3::new(0.0, 90.0, 0.0);
        ship.components.insert("Rigidbody".into());
        ship.components.insert("GravityDrive".into());

        let replies = vec![
            Reply::ok(""),
            Reply::ok("universe generated").with_entities(vec![ship.clone(), ship]),
            Reply::error("not found"),
            Reply::error("timeout: host busy"),
        ];

        for reply in replies {
            let bytes = encode_reply(&reply);
            assert_eq!(decode_reply(&bytes).unwrap(), reply);
        }
    }

    #[test]
    fn test_host_status_strings() {
        assert_eq!(parse_status("ok").unwrap(), (ReplyStatus::Ok, String::new()));
        assert_eq!(
            parse_status("ok: test triggered").unwrap(),
            (ReplyStatus::Ok, "test triggered".to_string())
        );
        assert_eq!(
            parse_status("error: not found or invalid payload").unwrap(),
            (ReplyStatus::Error, "not found or invalid payload".to_string())
        );
        assert!(matches!(parse_status(""), Err(TransportError::Protocol(_))));
        assert!(matches!(parse_status("pending"), Err(TransportError::Protocol(_))));
    }

    #[test]
    fn test_garbage_reply_is_protocol_error() {
        let err = decode_reply(&[0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, TransportError::Protocol(_)), "{err:?}");
    }

    #[test]
    fn test_missing_transforms_default_to_zero() {
        let bytes = GameStateMsg {
            timestamp: 12.5,
            status: "ok".into(),
            entities: vec![TransformMsg {
                name: "GameRoot".into(),
                position: None,
                rotation: None,
                components: vec![],
            }],
        }
        .encode_to_vec();

        let reply = decode_reply(&bytes).unwrap();
        assert_eq!(reply.entities[0].position, Vector3::ZERO);
        assert_eq!(reply.entities[0].rotation, Vector3::ZERO);
    }

    #[test]
    fn test_unknown_action_is_protocol_error_on_host_side() {
        let bytes = CommandMsg {
            action: "generate_universe".into(),
            ..Default::default()
        }
        .encode_to_vec();
        assert!(matches!(decode_command(&bytes), Err(TransportError::Protocol(_))));
    }

    #[test]
    fn test_nested_batch_never_leaves_the_client() {
        let nested = Command::Batch {
            batch: vec![Command::Batch { batch: vec![] }],
        };
        assert!(matches!(
            encode_command(&nested),
            Err(TransportError::InvalidCommand(_))
        ));
    }
}
