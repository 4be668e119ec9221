//! MCP server exposing document search as a tool.
//!
//! Serves one tool, `search_documents(query, limit = 5)`, over the MCP
//! streamable-HTTP transport at `/mcp`, plus a `/health` route. Every
//! internal failure — an unreachable engine, a missing index, a bad
//! argument — comes back as a descriptive tool-result text block; the
//! protocol boundary never surfaces a transport-level error for a search
//! failure.

use axum::{routing::get, Json, Router};
use rmcp::model::*;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::format::{render_protocol, MCP_TAG};
use crate::meili::SearchEngine;

const SEARCH_TOOL_NAME: &str = "search_documents";
const DEFAULT_TOOL_LIMIT: usize = 5;

/// MCP handler backed by the search-engine gateway. Cloned per session;
/// all sessions share the same engine client.
#[derive(Clone)]
pub struct DocumentSearchServer {
    engine: Arc<SearchEngine>,
}

impl DocumentSearchServer {
    pub fn new(engine: Arc<SearchEngine>) -> Self {
        Self { engine }
    }

    fn search_tool() -> Tool {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "検索クエリ（キーワードまたはフレーズ）"
                },
                "limit": {
                    "type": "integer",
                    "description": "取得する結果の最大数（デフォルト: 5）",
                    "default": DEFAULT_TOOL_LIMIT
                }
            },
            "required": ["query"]
        });
        let input_schema = match schema {
            serde_json::Value::Object(map) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        };

        Tool {
            name: Cow::Borrowed(SEARCH_TOOL_NAME),
            title: None,
            description: Some(Cow::Borrowed(
                "社内ドキュメント（Word、Excel、PNG、draw.io）を検索します。\
                 ユーザーの質問や意図から関連するキーワードを抽出して検索してください。\
                 例: 「コスト削減の方法」→「コスト削減」「経費削減」などで検索",
            )),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }

    async fn run_search_tool(&self, params: &serde_json::Value) -> CallToolResult {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if query.trim().is_empty() {
            return CallToolResult::error(vec![Content::text(
                "検索エラー: query を指定してください。",
            )]);
        }
        let limit = params
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_TOOL_LIMIT as u64) as usize;

        match self.engine.search(query, limit, MCP_TAG, MCP_TAG).await {
            Ok(hits) => {
                CallToolResult::success(vec![Content::text(render_protocol(query, &hits))])
            }
            Err(e) => {
                CallToolResult::error(vec![Content::text(format!("検索エラー: {}", e))])
            }
        }
    }
}

impl ServerHandler for DocumentSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "document-search".to_string(),
                title: Some("Document Search".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Full-text search over internal documents (Word, Excel, scanned PNG, \
                 draw.io). Use search_documents with keywords extracted from the user's \
                 question; results quote the matching lines with their position labels."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(vec![
            Self::search_tool(),
        ])))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        (name == SEARCH_TOOL_NAME).then(Self::search_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if request.name != SEARCH_TOOL_NAME {
            return Err(McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            ));
        }

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        Ok(self.run_search_tool(&params).await)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}


/// Starts the MCP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(SearchEngine::new(&config.engine)?);
    let handler = DocumentSearchServer::new(engine);

    let mcp_service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest_service("/mcp", mcp_service)
        .route("/health", get(handle_health))
        .layer(cors);

    println!("MCP server listening on http://{}/mcp", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
