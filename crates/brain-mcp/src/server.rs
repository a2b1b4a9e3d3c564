//! MCP Server implementation for WorldQuant Brain.

use std::sync::Arc;
use std::time::Duration;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::schemars::JsonSchema;
use rmcp::serde::{Deserialize, Serialize};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use brain_client::{
    BrainError, Neutralization, SettingsOverrides, SimulationClient, SimulationHandle,
    SimulationRequest,
};

use crate::{SERVER_NAME, SERVER_VERSION};

/// Failure of a tool call, rendered as text for the caller.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The Brain API call failed
    #[error("Brain API Error: {0}")]
    Brain(#[from] BrainError),

    /// Any other failure (bad arguments, encoding)
    #[error("Error: {0}")]
    Other(String),
}

type ToolResult<T> = Result<T, ToolError>;

/// MCP Server for WorldQuant Brain
#[derive(Clone)]
pub struct BrainMcpServer {
    /// Shared API client
    client: Arc<SimulationClient>,
    /// Tool router for MCP tools
    tool_router: ToolRouter<Self>,
}

impl BrainMcpServer {
    /// Create a new MCP server over an explicitly constructed client
    pub fn new(client: Arc<SimulationClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// The underlying API client
    pub fn client(&self) -> &Arc<SimulationClient> {
        &self.client
    }

    /// Render a tool outcome: pretty JSON (with optional preamble) or error text
    fn render(tool: &str, outcome: ToolResult<Value>, preamble: Option<&str>) -> CallToolResult {
        let rendered = outcome.and_then(|value| {
            serde_json::to_string_pretty(&value).map_err(|e| ToolError::Other(e.to_string()))
        });
        match rendered {
            Ok(json) => {
                let text = match preamble {
                    Some(preamble) => format!("{}\n\n{}", preamble, json),
                    None => json,
                };
                CallToolResult::success(vec![Content::text(text)])
            }
            Err(err) => {
                error!("{} failed: {}", tool, err);
                CallToolResult::error(vec![Content::text(err.to_string())])
            }
        }
    }

    async fn run_submit(&self, params: SubmitAlphaParams) -> ToolResult<Value> {
        let neutralization = params
            .neutralization
            .as_deref()
            .map(parse_neutralization)
            .transpose()?;

        let policy = match params.max_wait_secs {
            Some(0) => return Err(ToolError::Other("max_wait_secs must be positive".into())),
            Some(secs) => self.client.poll_policy().with_max_wait(Duration::from_secs(secs)),
            None => *self.client.poll_policy(),
        };

        let request = SimulationRequest::regular(&params.alpha_expression)
            .region(&params.region)
            .universe(&params.universe)
            .delay(params.delay)
            .with_overrides(SettingsOverrides {
                decay: params.decay,
                neutralization,
                truncation: params.truncation,
                ..Default::default()
            });

        info!("Submitting alpha: {}", params.alpha_expression);
        let handle = self.client.submit_simulation(&request).await?;
        info!("Simulation submitted: {}", handle);

        let result = self.client.wait_for_simulation_with(&handle, &policy).await?;
        let alpha_id = result.alpha_id().map(str::to_string);
        let alpha_details = match &alpha_id {
            Some(id) => serde_json::to_value(self.client.get_alpha(id).await?)
                .map_err(|e| ToolError::Other(e.to_string()))?,
            None => json!({}),
        };

        Ok(json!({
            "simulation_id": handle,
            "alpha_id": alpha_id,
            "status": result.status.status,
            "expression": params.alpha_expression,
            "region": params.region,
            "universe": params.universe,
            "delay": params.delay,
            "elapsed_secs": result.elapsed.as_secs_f64(),
            "alpha_details": alpha_details,
        }))
    }
}

fn parse_neutralization(raw: &str) -> ToolResult<Neutralization> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_uppercase())).map_err(|_| {
        ToolError::Other(format!(
            "unknown neutralization '{}' (expected NONE, MARKET, SECTOR, INDUSTRY or SUBINDUSTRY)",
            raw
        ))
    })
}

fn to_json<T: Serialize>(value: &T) -> ToolResult<Value> {
    serde_json::to_value(value).map_err(|e| ToolError::Other(e.to_string()))
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

fn default_region() -> String {
    "USA".to_string()
}

fn default_universe() -> String {
    "TOP3000".to_string()
}

fn default_delay() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// Submit alpha parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SubmitAlphaParams {
    /// The alpha expression to submit (e.g., 'rank(close)')
    pub alpha_expression: String,
    /// Region for simulation (e.g., 'USA', 'CHN', 'EUR')
    #[serde(default = "default_region")]
    pub region: String,
    /// Universe for simulation (e.g., 'TOP3000', 'TOP500')
    #[serde(default = "default_universe")]
    pub universe: String,
    /// Trading delay in days (0 or 1)
    #[serde(default = "default_delay")]
    pub delay: u32,
    /// Linear decay window (default 6)
    #[serde(default)]
    pub decay: Option<u32>,
    /// Neutralization: NONE, MARKET, SECTOR, INDUSTRY or SUBINDUSTRY (default)
    #[serde(default)]
    pub neutralization: Option<String>,
    /// Maximum weight of one instrument (default 0.08)
    #[serde(default)]
    pub truncation: Option<f64>,
    /// Seconds to wait for the simulation to finish (default 300)
    #[serde(default)]
    pub max_wait_secs: Option<u64>,
}

/// Alpha lookup parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AlphaIdParams {
    /// The ID of the alpha
    pub alpha_id: String,
}

/// List alphas parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListAlphasParams {
    /// Maximum number of alphas to return
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Number of alphas to skip
    #[serde(default)]
    pub offset: u32,
}

/// Simulation status parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SimulationStatusParams {
    /// Simulation ID returned by submit_alpha
    pub simulation_id: String,
}

/// Check expression parameters
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CheckExpressionParams {
    /// The alpha expression to validate
    pub expression: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl BrainMcpServer {
    /// Submit an alpha and wait for its simulation
    #[tool(
        description = "Submit an alpha expression to WorldQuant Brain for simulation. Returns simulation results including performance metrics."
    )]
    pub async fn submit_alpha(
        &self,
        Parameters(params): Parameters<SubmitAlphaParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.alpha_expression.trim().is_empty() {
            return Err(McpError::invalid_params(
                "alpha_expression must not be empty",
                None,
            ));
        }
        let outcome = self.run_submit(params).await;
        Ok(Self::render(
            "submit_alpha",
            outcome,
            Some("Alpha submitted successfully!"),
        ))
    }

    /// Get alpha details
    #[tool(description = "Get details about a specific alpha by its ID")]
    pub async fn get_alpha(
        &self,
        Parameters(params): Parameters<AlphaIdParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Getting alpha: {}", params.alpha_id);
        let outcome = match self.client.get_alpha(&params.alpha_id).await {
            Ok(alpha) => to_json(&alpha),
            Err(e) => Err(e.into()),
        };
        Ok(Self::render("get_alpha", outcome, None))
    }

    /// List alphas in the account
    #[tool(
        description = "List all alphas in your account with their status and performance metrics"
    )]
    pub async fn list_alphas(
        &self,
        Parameters(params): Parameters<ListAlphasParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Listing alphas (limit: {}, offset: {})", params.limit, params.offset);
        let outcome = match self.client.list_alphas(params.limit, params.offset).await {
            Ok(alphas) => to_json(&alphas).map(|alphas| {
                json!({
                    "count": alphas.as_array().map(Vec::len).unwrap_or(0),
                    "alphas": alphas,
                })
            }),
            Err(e) => Err(e.into()),
        };
        Ok(Self::render("list_alphas", outcome, None))
    }

    /// Get simulation results of an alpha
    #[tool(description = "Get simulation results for a specific alpha")]
    pub async fn get_simulation(
        &self,
        Parameters(params): Parameters<AlphaIdParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Getting details for alpha: {}", params.alpha_id);
        let outcome = match self.client.get_alpha(&params.alpha_id).await {
            Ok(alpha) => to_json(&alpha).map(|details| {
                json!({
                    "alpha_id": params.alpha_id,
                    "details": details,
                })
            }),
            Err(e) => Err(e.into()),
        };
        Ok(Self::render("get_simulation", outcome, None))
    }

    /// Get the raw status of a simulation
    #[tool(
        description = "Get the current status of a submitted simulation by its simulation ID, without waiting"
    )]
    pub async fn get_simulation_status(
        &self,
        Parameters(params): Parameters<SimulationStatusParams>,
    ) -> Result<CallToolResult, McpError> {
        let handle = SimulationHandle::new(params.simulation_id);
        info!("Getting status for simulation: {}", handle);
        let outcome = match self.client.get_simulation_status(&handle).await {
            Ok(status) => to_json(&status),
            Err(e) => Err(e.into()),
        };
        Ok(Self::render("get_simulation_status", outcome, None))
    }

    /// Check an expression
    #[tool(description = "Check if an alpha expression is valid without submitting it")]
    pub async fn check_expression(
        &self,
        Parameters(params): Parameters<CheckExpressionParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("Checking expression: {}", params.expression);
        let outcome = if params.expression.trim().is_empty() {
            Err(ToolError::Other("expression must not be empty".to_string()))
        } else {
            Ok(json!({
                "expression": params.expression,
                "note": "Expression validation requires submitting a simulation. \
                         Use submit_alpha to test the expression.",
            }))
        };
        Ok(Self::render("check_expression", outcome, None))
    }
}

#[tool_handler]
impl ServerHandler for BrainMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                title: Some("WorldQuant Brain Alpha Simulations".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "WorldQuant Brain MCP Server - submit alpha expressions for simulation, \
                 then inspect alphas and their performance metrics."
                    .to_string(),
            ),
        }
    }
}
