use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
}

/// How a tool is dispatched.
///
/// Actions are side-effecting and get direct access to the session's
/// outbound channel; functions are pure and never see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Action,
    Function,
}

/// A structured request from the model to invoke a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default = "empty_object")]
    pub args: Value,
}

/// The result of a tool invocation, fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Map<String, Value>,
}

/// A message in the conversation.
///
/// Every message carries at least one part; the constructors below are the
/// only way the runtime builds them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Function => "function",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            "function" => Ok(Role::Function),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One part of a message, serialized in the backend's wire shape:
/// `{"text": ..}`, `{"functionCall": ..}` or `{"functionResponse": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, parts: vec![Part::Text(text.into())] }
    }
    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, parts: vec![Part::Text(text.into())] }
    }
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self { role, parts: vec![Part::Text(text.into())] }
    }
    pub fn function_call(call: FunctionCall) -> Self {
        Self { role: Role::Model, parts: vec![Part::FunctionCall(call)] }
    }
    pub fn function_response(name: impl Into<String>, response: Map<String, Value>) -> Self {
        Self {
            role: Role::Function,
            parts: vec![Part::FunctionResponse(FunctionResponse {
                name: name.into(),
                response,
            })],
        }
    }

    /// The text of the first part, if the first part is text.
    pub fn first_text(&self) -> Option<&str> {
        match self.parts.first() {
            Some(Part::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_use_backend_wire_shape() {
        let msg = Message::function_call(FunctionCall {
            name: "get_current_time".into(),
            args: serde_json::json!({"timezone": "Europe/London"}),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["parts"][0]["functionCall"]["name"], "get_current_time");

        let text = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(text["parts"][0]["text"], "hi");
    }

    #[test]
    fn first_text_ignores_non_text_parts() {
        let msg = Message::function_response("f", Map::new());
        assert!(msg.first_text().is_none());
        assert_eq!(Message::model("4").first_text(), Some("4"));
    }

    #[test]
    fn function_call_args_default_to_empty_object() {
        let call: FunctionCall = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(call.args, serde_json::json!({}));
    }

    #[test]
    fn role_parses_lowercase_names() {
        assert_eq!("model".parse::<Role>().unwrap(), Role::Model);
        assert!("assistant".parse::<Role>().is_err());
    }
}
