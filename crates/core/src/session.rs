use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::object_script::{
    object_definition_command, rewrite_create_as_alter, table_preview_sql, ObjectTarget,
};
use crate::query_service::{QueryService, ServiceError};
use crate::result_views::ResultViews;
use crate::settings::{ServiceSettings, ViewSettings};
use crate::tabular::{ParseError, TabularResult};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("query service failed: {0}")]
    Service(#[source] ServiceError),
    #[error("failed to parse service reply: {0}")]
    Parse(#[source] ParseError),
    #[error("definition of {kind} `{name}` is empty")]
    EmptyDefinition { kind: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub columns: usize,
    pub rows: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenedObject {
    /// A table preview query that has already run and replaced the views.
    TablePreview { sql: String, outcome: QueryOutcome },
    /// Editable source of a non-table object.
    Definition { text: String },
}

/// Host-side glue: runs commands through a [`QueryService`] and keeps one
/// [`ResultViews`] up to date.
#[derive(Debug)]
pub struct QuerySession<S: QueryService> {
    service: S,
    service_settings: ServiceSettings,
    views: ResultViews,
}

impl<S: QueryService> QuerySession<S> {
    #[must_use]
    pub fn new(service: S, service_settings: ServiceSettings, view_settings: ViewSettings) -> Self {
        Self {
            service,
            service_settings,
            views: ResultViews::new(view_settings),
        }
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub fn views(&self) -> &ResultViews {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ResultViews {
        &mut self.views
    }

    /// Executes and parses `command` without touching the views.
    pub fn fetch(&self, command: &str) -> Result<TabularResult, SessionError> {
        let raw = self.service.execute(command).map_err(|error| {
            warn!(%command, %error, "query service returned an error");
            SessionError::Service(error)
        })?;
        TabularResult::parse(&raw).map_err(|error| {
            warn!(%command, %error, "malformed reply from query service");
            SessionError::Parse(error)
        })
    }

    /// Executes `command` and replaces the views with its result. The views
    /// are left as they were when the command fails.
    pub fn run(&mut self, command: &str) -> Result<QueryOutcome, SessionError> {
        info!(%command, "running query");
        let started_at = Instant::now();
        let result = self.fetch(command)?;
        let outcome = QueryOutcome {
            columns: result.column_count(),
            rows: result.row_count(),
            elapsed: started_at.elapsed(),
        };
        self.views.update(result);
        debug!(
            rows = outcome.rows,
            columns = outcome.columns,
            elapsed_ms = outcome.elapsed.as_millis(),
            "query completed"
        );
        Ok(outcome)
    }

    /// Lists every configured object kind, one catalog category per kind,
    /// using the first column of each reply row as the item name.
    pub fn load_catalog(&self) -> Result<Catalog, SessionError> {
        let mut catalog = Catalog::default();
        for kind in &self.service_settings.object_kinds {
            let command = format!("{} {kind}", self.service_settings.list_all_command);
            let result = self.fetch(&command)?;
            let items = result
                .rows()
                .into_iter()
                .filter_map(|row| row.into_iter().next())
                .collect::<Vec<_>>();
            debug!(%kind, items = items.len(), "loaded catalog category");
            catalog.push(CatalogEntry::new(kind.clone(), items));
        }
        Ok(catalog)
    }

    /// Tables are previewed straight away; other objects come back as their
    /// definition with `CREATE` turned into `ALTER`.
    pub fn open_object(&mut self, target: &ObjectTarget) -> Result<OpenedObject, SessionError> {
        if target.is_table() {
            let sql = table_preview_sql(&target.name);
            let outcome = self.run(&sql)?;
            return Ok(OpenedObject::TablePreview { sql, outcome });
        }

        let command = object_definition_command(&self.service_settings.get_object_command, target);
        let result = self.fetch(&command)?;
        let definition = result
            .row(0)
            .and_then(|row| row.into_iter().next())
            .ok_or_else(|| SessionError::EmptyDefinition {
                kind: target.kind.clone(),
                name: target.name.clone(),
            })?;
        Ok(OpenedObject::Definition {
            text: rewrite_create_as_alter(&definition),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::{OpenedObject, QuerySession, SessionError};
    use crate::object_script::ObjectTarget;
    use crate::query_service::{QueryService, ServiceError};
    use crate::raw_response::{ColumnMeta, RawResponse, RawValue};
    use crate::result_views::{RenderedView, ViewKind};
    use crate::settings::{ServiceSettings, ViewSettings};

    #[derive(Debug, Default)]
    struct ScriptedService {
        replies: HashMap<String, RawResponse>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedService {
        fn with(mut self, command: &str, response: RawResponse) -> Self {
            self.replies.insert(command.to_string(), response);
            self
        }
    }

    impl QueryService for ScriptedService {
        fn execute(&self, command: &str) -> Result<RawResponse, ServiceError> {
            self.calls.borrow_mut().push(command.to_string());
            self.replies
                .get(command)
                .cloned()
                .ok_or_else(|| ServiceError::new(format!("Error: unknown command `{command}`")))
        }
    }

    fn names(column: &str, values: &[&str]) -> RawResponse {
        RawResponse::new(
            vec![ColumnMeta::new("String", column, 128)],
            "(s)",
            values
                .iter()
                .map(|value| vec![RawValue::Str((*value).to_string())])
                .collect(),
            values.iter().map(|_| vec![false]).collect(),
        )
    }

    fn service_settings(kinds: &[&str]) -> ServiceSettings {
        ServiceSettings {
            object_kinds: kinds.iter().map(|kind| (*kind).to_string()).collect(),
            ..ServiceSettings::default()
        }
    }

    #[test]
    fn run_updates_views_and_reports_shape() {
        let service = ScriptedService::default().with("select name from users", names("name", &["a", "b"]));
        let mut session =
            QuerySession::new(service, ServiceSettings::default(), ViewSettings::default());
        session.views_mut().select(ViewKind::Text);

        let outcome = session
            .run("select name from users")
            .expect("query should succeed");

        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.columns, 1);
        assert_eq!(session.views().current_kind(), ViewKind::Grid);
        let RenderedView::Grid(grid) = session.views().current_view() else {
            panic!("grid should be current after a run");
        };
        assert_eq!(grid.rows, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn failed_run_leaves_views_untouched() {
        let service = ScriptedService::default().with("ok", names("n", &["kept"]));
        let mut session =
            QuerySession::new(service, ServiceSettings::default(), ViewSettings::default());
        session.run("ok").expect("first query should succeed");

        let error = session.run("missing").expect_err("unknown command fails");
        assert!(matches!(error, SessionError::Service(_)));
        assert!(error.to_string().contains("Error"));

        let mut broken = names("n", &["x"]);
        broken.nulls.clear();
        let service = ScriptedService::default().with("broken", broken);
        let mut session =
            QuerySession::new(service, ServiceSettings::default(), ViewSettings::default());
        let error = session.run("broken").expect_err("malformed reply fails");
        assert!(matches!(error, SessionError::Parse(_)));
        assert!(session.views().result().is_none());
    }

    #[test]
    fn load_catalog_lists_each_kind_in_order() {
        let service = ScriptedService::default()
            .with("list all table", names("name", &["Users", "Orders"]))
            .with("list all view", names("name", &[]));
        let session = QuerySession::new(
            service,
            service_settings(&["table", "view"]),
            ViewSettings::default(),
        );

        let catalog = session.load_catalog().expect("catalog should load");

        assert_eq!(catalog.entries.len(), 2);
        assert_eq!(catalog.entries[0].category, "table");
        assert_eq!(catalog.entries[0].items, vec!["Users", "Orders"]);
        assert!(catalog.entries[1].items.is_empty());
        assert_eq!(
            *session.service().calls.borrow(),
            vec!["list all table".to_string(), "list all view".to_string()]
        );
    }

    #[test]
    fn opening_a_table_runs_a_preview() {
        let service = ScriptedService::default()
            .with("select top 100 * from [Users]", names("name", &["row"]));
        let mut session =
            QuerySession::new(service, ServiceSettings::default(), ViewSettings::default());
        let target = ObjectTarget::new("Table", "Users").expect("valid target");

        let opened = session.open_object(&target).expect("preview should run");
        let OpenedObject::TablePreview { sql, outcome } = opened else {
            panic!("tables open as previews");
        };
        assert_eq!(sql, "select top 100 * from [Users]");
        assert_eq!(outcome.rows, 1);
    }

    #[test]
    fn opening_a_procedure_returns_alter_script() {
        let service = ScriptedService::default().with(
            "get object procedure usp_sync",
            names("text", &["CREATE PROCEDURE usp_sync AS SELECT 1"]),
        );
        let mut session =
            QuerySession::new(service, ServiceSettings::default(), ViewSettings::default());
        let target = ObjectTarget::new("procedure", "usp_sync").expect("valid target");

        let opened = session.open_object(&target).expect("definition should load");
        assert_eq!(
            opened,
            OpenedObject::Definition {
                text: "ALTER PROCEDURE usp_sync AS SELECT 1".to_string()
            }
        );
        assert!(session.views().result().is_none());
    }

    #[test]
    fn empty_definition_is_reported() {
        let service =
            ScriptedService::default().with("get object view v_empty", names("text", &[]));
        let mut session =
            QuerySession::new(service, ServiceSettings::default(), ViewSettings::default());
        let target = ObjectTarget::new("view", "v_empty").expect("valid target");

        let error = session.open_object(&target).expect_err("no rows to open");
        assert!(matches!(error, SessionError::EmptyDefinition { .. }));
    }
}
