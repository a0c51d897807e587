//! Request entry point
//!
//! `Engine::execute` takes one raw request text and always produces a
//! [`Response`]: rendered rows on success, a status code and one-line
//! message on failure. Nothing is cached between requests.

use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::auth::{ContactUser, NoAuthUser, ServiceAuthorization, User};
use crate::core::CoreError;
use crate::observability::{log_event_with_fields, EngineMetrics, Event, ObservationScope};
use crate::output::{Response, ResponseHeader};
use crate::query::{sniff_response_header, Query, QueryError, QueryLimits, QueryResult, Request};
use crate::table::TableRegistry;

pub struct Engine {
    registry: TableRegistry,
    limits: QueryLimits,
    service_authorization: ServiceAuthorization,
    metrics: EngineMetrics,
}

impl Engine {
    pub fn new(registry: TableRegistry, limits: QueryLimits) -> Self {
        for name in registry.names() {
            log_event_with_fields(Event::TableRegistered, &[("table", name)]);
        }
        Self {
            registry,
            limits,
            service_authorization: ServiceAuthorization::default(),
            metrics: EngineMetrics::new(),
        }
    }

    /// Service rule applied to users named by `AuthUser:`
    pub fn with_service_authorization(
        mut self,
        service_authorization: ServiceAuthorization,
    ) -> Self {
        self.service_authorization = service_authorization;
        self
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// The user a request asks to run as: a contact for `AuthUser:`,
    /// unrestricted otherwise.
    pub fn user_for(&self, request: &Request) -> Box<dyn User> {
        match request.auth_user() {
            Some(name) => Box::new(
                ContactUser::new(name).with_service_authorization(self.service_authorization),
            ),
            None => Box::new(NoAuthUser),
        }
    }

    /// Answers `text` as the user named in its `AuthUser:` header
    pub fn handle(&self, text: &str) -> Response {
        match Request::parse(text) {
            Ok(request) => {
                let user = self.user_for(&request);
                self.execute_request(&request, user.as_ref())
            }
            Err(err) => self.reject(None, err, sniff_response_header(text)),
        }
    }

    /// Answers `text` as `user`, ignoring any `AuthUser:` header
    pub fn execute(&self, text: &str, user: &dyn User) -> Response {
        match Request::parse(text) {
            Ok(request) => self.execute_request(&request, user),
            Err(err) => self.reject(None, err, sniff_response_header(text)),
        }
    }

    fn execute_request(&self, request: &Request, user: &dyn User) -> Response {
        let header = request.response_header();
        let request_id = Uuid::new_v4().to_string();
        let scope = ObservationScope::with_fields(
            "QUERY",
            &[("request_id", request_id.as_str()), ("table", request.table.as_str())],
        );

        match self.answer(request, user) {
            Ok(mut query) => {
                self.metrics.increment_queries_executed();
                self.metrics.add_rows_returned(query.rows_returned() as u64);
                let body = query.take_output();
                scope.complete_with_fields(&[
                    ("rows_scanned", query.rows_scanned().to_string().as_str()),
                    ("rows_returned", query.rows_returned().to_string().as_str()),
                    ("bytes", body.len().to_string().as_str()),
                ]);
                Response::ok(body, header)
            }
            Err(err) => self.reject(Some(scope), err, header),
        }
    }

    fn answer(&self, request: &Request, user: &dyn User) -> QueryResult<Query> {
        let table = self.registry.get(&request.table)?;
        let mut query = Query::new(request, table.as_ref(), self.limits)?;
        log_event_with_fields(
            Event::QueryParsed,
            &[
                ("table", query.table_name()),
                ("filter", query.filter().to_string().as_str()),
                ("user", user.name().unwrap_or("-")),
            ],
        );

        let result = table.answer_query(&mut query, user);
        self.metrics.add_rows_scanned(query.rows_scanned() as u64);
        result.map(|()| query)
    }

    fn reject(
        &self,
        scope: Option<ObservationScope<'_>>,
        err: QueryError,
        header: ResponseHeader,
    ) -> Response {
        self.metrics.increment_queries_rejected();
        if let QueryError::Core(CoreError::LockTimeout(ms)) = &err {
            self.metrics.increment_lock_timeouts();
            log_event_with_fields(Event::LockTimeout, &[("waited_ms", ms.to_string().as_str())]);
        }

        let message = err.to_string();
        let status = err.status_code().to_string();
        match scope {
            Some(scope) => scope.fail_with_fields(
                &message,
                &[("code", err.code()), ("status", status.as_str())],
            ),
            None => log_event_with_fields(
                Event::QueryRejected,
                &[("code", err.code()), ("status", status.as_str()), ("reason", message.as_str())],
            ),
        }
        Response::error(err.status_code(), &message, header)
    }

    /// Parsed plan of `text` without scanning any row
    pub fn explain(&self, text: &str) -> QueryResult<JsonValue> {
        let request = Request::parse(text)?;
        let table = self.registry.get(&request.table)?;
        let query = Query::new(&request, table.as_ref(), self.limits)?;

        let pushdown: Vec<&str> = table
            .indexed_columns()
            .iter()
            .copied()
            .filter(|column| query.filter().string_value_restriction(column).is_some())
            .collect();

        let mut plan = query.to_plan();
        if let Some(object) = plan.as_object_mut() {
            object.insert("pushdown".into(), json!(pushdown));
            object.insert("limits".into(), json!(self.limits));
        }
        log_event_with_fields(Event::ExplainComplete, &[("table", query.table_name())]);
        Ok(plan)
    }
}
