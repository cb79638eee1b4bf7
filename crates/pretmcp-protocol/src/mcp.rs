//! MCP payloads used by the compliance client
//!
//! Only the two methods the client issues are modeled: the `initialize`
//! handshake and `tools/call`. Results are kept lenient, since the server's
//! payloads are interpreted by the formatting layer above this crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// MCP protocol revision announced in the handshake
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Handshake method
pub const METHOD_INITIALIZE: &str = "initialize";

/// Tool invocation method
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Name and version of a client or server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    /// Implementation name
    pub name: String,

    /// Implementation version
    pub version: String,
}

impl Implementation {
    /// Create a new implementation descriptor
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Capability set announced by the client
///
/// Serialized as a raw object so callers can announce capabilities this crate
/// does not model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientCapabilities(pub Map<String, Value>);

impl ClientCapabilities {
    /// The `{"tools": {}}` capability set
    pub fn tools() -> Self {
        let mut map = Map::new();
        map.insert("tools".to_string(), json!({}));
        Self(map)
    }
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self::tools()
    }
}

/// Parameters of the `initialize` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol revision the client speaks
    pub protocol_version: String,

    /// Client capabilities
    pub capabilities: ClientCapabilities,

    /// Client identity
    pub client_info: Implementation,
}

impl InitializeParams {
    /// Handshake parameters for the given client identity
    pub fn new(client_info: Implementation) -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info,
        }
    }
}

/// Result of the `initialize` request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol revision the server selected
    #[serde(default)]
    pub protocol_version: Option<String>,

    /// Server capabilities, kept raw
    #[serde(default)]
    pub capabilities: Value,

    /// Server identity
    #[serde(default)]
    pub server_info: Option<Implementation>,

    /// Optional usage instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Parameters of a `tools/call` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name, e.g. `get-GLEIF-data`
    pub name: String,

    /// Tool arguments object
    pub arguments: Value,
}

impl CallToolParams {
    /// Create tool-call parameters
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// One content item of a tool result
///
/// The PRET server omits `type` on some replies, so every field is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentItem {
    /// Content kind (`text`, `image`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Text payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Any other members
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Successful `tools/call` payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content items, in server order
    #[serde(default)]
    pub content: Vec<ContentItem>,

    /// Set by servers that report tool failures in-band
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    /// Text of the first content item, if any
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|item| item.text.as_deref())
    }

    /// First text item parsed as a JSON document
    ///
    /// The compliance server embeds its registry payload as a JSON string in
    /// `content[0].text`.
    pub fn first_text_json(&self) -> Option<serde_json::Result<Value>> {
        self.first_text().map(serde_json::from_str)
    }
}
