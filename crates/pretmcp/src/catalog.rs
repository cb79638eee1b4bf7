//! Compliance tools exposed by the PRET server

use crate::session::Session;
use crate::tools::ToolCallOutcome;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// A tool the compliance server is known to expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplianceTool {
    /// Legal Entity Identifier lookup in the GLEIF registry
    Gleif,
    /// Export-Import compliance lookup
    Exim,
    /// Corporate registration lookup by CIN
    CorporateRegistration,
}

impl ComplianceTool {
    /// Every known tool, in catalog order
    pub const ALL: [ComplianceTool; 3] = [Self::Gleif, Self::Exim, Self::CorporateRegistration];

    /// Tool name on the wire
    pub fn name(self) -> &'static str {
        match self {
            Self::Gleif => "get-GLEIF-data",
            Self::Exim => "get-EXIM-data",
            Self::CorporateRegistration => "get-CorporateRegistration-data",
        }
    }

    /// Look a tool up by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// What the tool does
    pub fn description(self) -> &'static str {
        match self {
            Self::Gleif => {
                "Retrieve Legal Entity Identifier data from GLEIF registry for compliance verification"
            }
            Self::Exim => {
                "Fetch Export-Import compliance data for international trade finance verification"
            }
            Self::CorporateRegistration => {
                "Validate corporate registration details using Corporate Identification Number"
            }
        }
    }

    /// Name of the tool's single argument
    pub fn argument_name(self) -> &'static str {
        match self {
            Self::Gleif | Self::Exim => "companyName",
            Self::CorporateRegistration => "cin",
        }
    }

    fn argument_description(self) -> &'static str {
        match self {
            Self::Gleif => {
                "Company name for GLEIF search (e.g., 'SREE PALANI ANDAVAR AGROS PRIVATE LIMITED')"
            }
            Self::Exim => "Company name for EXIM compliance search",
            Self::CorporateRegistration => "Corporate Identification Number (CIN) for verification",
        }
    }

    /// Arguments object for a call with `value`
    pub fn arguments(self, value: &str) -> Value {
        let mut arguments = Map::new();
        arguments.insert(self.argument_name().to_string(), Value::String(value.to_string()));
        Value::Object(arguments)
    }

    /// JSON schema of the arguments object
    pub fn input_schema(self) -> Value {
        let mut properties = Map::new();
        properties.insert(
            self.argument_name().to_string(),
            json!({
                "type": "string",
                "description": self.argument_description(),
            }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": [self.argument_name()],
        })
    }

    /// Catalog entry for this tool
    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for ComplianceTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComplianceTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown compliance tool: {}", s))
    }
}

/// Name, description and input schema of one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name on the wire
    pub name: &'static str,
    /// What the tool does
    pub description: &'static str,
    /// JSON schema of the arguments object
    pub input_schema: Value,
}

/// Descriptors for every known compliance tool
pub fn catalog() -> Vec<ToolDescriptor> {
    ComplianceTool::ALL
        .into_iter()
        .map(ComplianceTool::descriptor)
        .collect()
}

impl Session {
    /// Call a compliance tool with its single argument
    pub async fn call_compliance_tool(&self, tool: ComplianceTool, value: &str) -> ToolCallOutcome {
        self.call_tool_default(tool.name(), tool.arguments(value)).await
    }

    /// Look up GLEIF Legal Entity Identifier data for a company
    pub async fn get_gleif_data(&self, company_name: &str) -> ToolCallOutcome {
        self.call_compliance_tool(ComplianceTool::Gleif, company_name).await
    }

    /// Look up Export-Import compliance data for a company
    pub async fn get_exim_data(&self, company_name: &str) -> ToolCallOutcome {
        self.call_compliance_tool(ComplianceTool::Exim, company_name).await
    }

    /// Look up corporate registration data by Corporate Identification Number
    pub async fn get_corporate_registration_data(&self, cin: &str) -> ToolCallOutcome {
        self.call_compliance_tool(ComplianceTool::CorporateRegistration, cin).await
    }
}
