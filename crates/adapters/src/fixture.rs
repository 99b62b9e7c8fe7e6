use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use veranda_core::query_service::{QueryService, ServiceError};
use veranda_core::raw_response::{ColumnMeta, RawResponse, RawValue};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse fixture file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize fixture document: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write fixture file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reply for `{command}` needs exactly one of `response` or `error`")]
    IncompleteReply { command: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureReply {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RawResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FixtureDocument {
    #[serde(default)]
    pub replies: Vec<FixtureReply>,
}

impl FixtureDocument {
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), FixtureError> {
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload).map_err(|source| FixtureError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replays recorded replies keyed by command text. Commands are compared
/// after trimming, collapsing whitespace and lower-casing.
#[derive(Debug, Clone, Default)]
pub struct FixtureService {
    replies: HashMap<String, Result<RawResponse, String>>,
}

impl FixtureService {
    pub fn from_document(document: FixtureDocument) -> Result<Self, FixtureError> {
        let mut replies = HashMap::with_capacity(document.replies.len());
        for reply in document.replies {
            let outcome = match (reply.response, reply.error) {
                (Some(response), None) => Ok(response),
                (None, Some(error)) => Err(error),
                _ => {
                    return Err(FixtureError::IncompleteReply {
                        command: reply.command,
                    })
                }
            };
            replies.insert(normalize_command(&reply.command), outcome);
        }
        Ok(Self { replies })
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        Self::from_document(FixtureDocument::load(path)?)
    }

    pub fn insert(&mut self, command: &str, response: RawResponse) {
        self.replies
            .insert(normalize_command(command), Ok(response));
    }

    pub fn insert_error(&mut self, command: &str, message: impl Into<String>) {
        self.replies
            .insert(normalize_command(command), Err(message.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.replies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    /// Small in-memory schema used when no fixture file is configured.
    #[must_use]
    pub fn demo() -> Self {
        let mut service = Self::default();

        service.insert("list all table", names(&["Users", "Orders", "OrderLines"]));
        service.insert("list all view", names(&["ActiveUsers"]));
        service.insert("list all procedure", names(&["usp_refresh_totals"]));
        service.insert("list all trigger", names(&["trg_orders_audit"]));
        service.insert("list all scalarfunction", names(&["fn_order_total"]));
        service.insert("list all tablefunction", names(&[]));

        service.insert("select top 100 * from [Users]", users());
        service.insert("select * from users", users());
        service.insert("select top 100 * from [Orders]", orders());
        service.insert(
            "select top 100 * from [OrderLines]",
            RawResponse::new(
                vec![
                    ColumnMeta::new("Int32", "order_id", 4),
                    ColumnMeta::new("Int32", "line", 4),
                    ColumnMeta::new("String", "sku", 32),
                ],
                "(iis)",
                vec![vec![
                    RawValue::Int(100),
                    RawValue::Int(1),
                    RawValue::Str("SKU-0042".to_string()),
                ]],
                vec![vec![false, false, false]],
            ),
        );

        service.insert(
            "get object view ActiveUsers",
            definition("CREATE VIEW ActiveUsers AS\nSELECT * FROM Users WHERE active = 1"),
        );
        service.insert(
            "get object procedure usp_refresh_totals",
            definition("-- nightly job\nCREATE PROCEDURE usp_refresh_totals AS\nSELECT 1"),
        );
        service.insert(
            "get object trigger trg_orders_audit",
            definition("CREATE TRIGGER trg_orders_audit ON Orders AFTER INSERT AS SELECT 1"),
        );
        service.insert(
            "get object scalarfunction fn_order_total",
            definition("create function fn_order_total(@id int) returns money as begin return 0 end"),
        );
        service
    }
}

impl QueryService for FixtureService {
    fn execute(&self, command: &str) -> Result<RawResponse, ServiceError> {
        let key = normalize_command(command);
        debug!(command = %key, "replaying fixture reply");
        match self.replies.get(&key) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(ServiceError::new(message.clone())),
            None => Err(ServiceError::new(format!(
                "Error: unknown command `{}`",
                command.trim()
            ))),
        }
    }
}

fn normalize_command(command: &str) -> String {
    command
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn names(values: &[&str]) -> RawResponse {
    RawResponse::new(
        vec![ColumnMeta::new("String", "name", 128)],
        "(s)",
        values
            .iter()
            .map(|value| vec![RawValue::Str((*value).to_string())])
            .collect(),
        values.iter().map(|_| vec![false]).collect(),
    )
}

fn definition(text: &str) -> RawResponse {
    RawResponse::new(
        vec![ColumnMeta::new("String", "text", -1)],
        "(s)",
        vec![vec![RawValue::Str(text.to_string())]],
        vec![vec![false]],
    )
}

fn users() -> RawResponse {
    RawResponse::new(
        vec![
            ColumnMeta::new("Int32", "id", 4),
            ColumnMeta::new("String", "name", 64),
            ColumnMeta::new("String", "email", 128),
            ColumnMeta::new("Boolean", "active", 1),
        ],
        "(issb)",
        vec![
            vec![
                RawValue::Int(1),
                RawValue::Str("Alice".to_string()),
                RawValue::Str("alice@example.com".to_string()),
                RawValue::Bool(true),
            ],
            vec![
                RawValue::Int(2),
                RawValue::Str("Bob".to_string()),
                RawValue::Str(String::new()),
                RawValue::Bool(false),
            ],
            vec![
                RawValue::Int(3),
                RawValue::Str("Carmen Delacroix-Villanueva".to_string()),
                RawValue::Str("carmen.delacroix-villanueva@example.com".to_string()),
                RawValue::Bool(true),
            ],
        ],
        vec![
            vec![false, false, false, false],
            vec![false, false, true, false],
            vec![false, false, false, false],
        ],
    )
}

fn orders() -> RawResponse {
    RawResponse::new(
        vec![
            ColumnMeta::new("Int64", "id", 8),
            ColumnMeta::new("Int32", "user_id", 4),
            ColumnMeta::new("Double", "total", 8),
        ],
        "(xid)",
        vec![
            vec![RawValue::Int(100), RawValue::Int(1), RawValue::Double(19.5)],
            vec![RawValue::Int(101), RawValue::Int(3), RawValue::Double(0.0)],
        ],
        vec![vec![false, false, false], vec![false, false, true]],
    )
}
