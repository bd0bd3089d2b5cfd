//! Method and path routing onto [`TaskService`].
//!
//! Bodies are JSON in both directions. Callers that are not authenticated
//! are redirected to the login page with the requested path in `next`.
//!
//! | Method | Path                          | Success |
//! |--------|-------------------------------|---------|
//! | GET    | `/tasks/`                     | 200     |
//! | POST   | `/create-task/`               | 201     |
//! | POST   | `/update-task/{id}/`          | 200     |
//! | POST   | `/delete-task/{id}/`          | 204     |
//! | GET    | `/api/task/`                  | 200     |
//! | GET    | `/api/task/{id}/history/`     | 200     |
//! | POST   | `/update-email-pref/{user}`   | 200     |

use crate::api::{CreateTaskRequest, EmailPreferenceRequest, TaskService, UpdateTaskRequest};
use crate::digest::DigestStore;
use crate::error::{Error, Result};
use crate::tasks::models::{TaskId, User, UserId};
use crate::tasks::TaskStore;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Bytes escaped in the `next` parameter. Path separators stay readable.
const NEXT_PARAM: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A routed request's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// JSON body, empty for redirects and 204.
    pub body: String,
    /// Redirect target for 302 responses.
    pub location: Option<String>,
}

impl Response {
    fn json<T: Serialize>(status: u16, value: &T) -> Result<Self> {
        Ok(Self { status, body: serde_json::to_string(value)?, location: None })
    }

    const fn empty(status: u16) -> Self {
        Self { status, body: String::new(), location: None }
    }

    fn redirect(location: String) -> Self {
        Self { status: 302, body: String::new(), location: Some(location) }
    }

    fn error(err: &Error) -> Self {
        let status = status_for(err);
        if status >= 500 {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(status, error = %err, "request rejected");
        }
        let body = serde_json::json!({ "error": err.to_string() }).to_string();
        Self { status, body, location: None }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// HTTP status for an error.
#[must_use]
pub const fn status_for(err: &Error) -> u16 {
    match err {
        Error::Unauthenticated { .. } => 302,
        Error::Validation(_) | Error::Json(_) => 400,
        Error::Forbidden { .. } => 403,
        Error::TaskNotFound(_) | Error::UserNotFound(_) => 404,
        Error::Conflict { .. } => 503,
        Error::Io(_) | Error::Yaml(_) | Error::Database(_) | Error::Template(_) => 500,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    ListTasks,
    CreateTask,
    UpdateTask(TaskId),
    DeleteTask(TaskId),
    ApiTasks,
    TaskHistory(TaskId),
    UpdateEmailPreference(UserId),
}

impl Route {
    /// Match a method and path. Trailing slashes and query strings are ignored.
    fn parse(method: &str, path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or_default();
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let get = method.eq_ignore_ascii_case("GET");
        let post = method.eq_ignore_ascii_case("POST");

        match segments.as_slice() {
            ["tasks"] if get => Some(Self::ListTasks),
            ["create-task"] if post => Some(Self::CreateTask),
            ["update-task", id] if post => id.parse().ok().map(Self::UpdateTask),
            ["delete-task", id] if post => id.parse().ok().map(Self::DeleteTask),
            ["api", "task"] if get => Some(Self::ApiTasks),
            ["api", "task", id, "history"] if get => id.parse().ok().map(Self::TaskHistory),
            ["update-email-pref", user] if post => {
                user.parse().ok().map(Self::UpdateEmailPreference)
            }
            _ => None,
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}

/// Routes requests to a [`TaskService`].
#[derive(Debug, Clone)]
pub struct Router<S> {
    service: TaskService<S>,
    login_url: String,
}

impl<S> Router<S>
where
    S: TaskStore + DigestStore,
{
    /// Create a router redirecting anonymous callers to `login_url`.
    pub fn new(service: TaskService<S>, login_url: impl Into<String>) -> Self {
        Self { service, login_url: login_url.into() }
    }

    /// The wrapped service.
    pub const fn service(&self) -> &TaskService<S> {
        &self.service
    }

    /// Handle one request.
    ///
    /// `caller` is the authenticated user, or `None` for an anonymous request.
    pub fn dispatch(&self, method: &str, path: &str, caller: Option<&User>, body: &str) -> Response {
        let Some(route) = Route::parse(method, path) else {
            tracing::debug!(method, path, "no route");
            let body = serde_json::json!({ "error": format!("No route for {method} {path}") });
            return Response { status: 404, body: body.to_string(), location: None };
        };

        let Some(caller) = caller else {
            let err = Error::Unauthenticated { next: path.to_string() };
            tracing::debug!(error = %err, "redirecting to login");
            let next = utf8_percent_encode(path, NEXT_PARAM);
            return Response::redirect(format!("{}?next={next}", self.login_url));
        };

        tracing::debug!(method, path, caller = caller.id, "dispatching");
        self.handle(route, caller, body).unwrap_or_else(|e| Response::error(&e))
    }

    fn handle(&self, route: Route, caller: &User, body: &str) -> Result<Response> {
        match route {
            Route::ListTasks => Response::json(200, &self.service.list_tasks(caller)?),
            Route::CreateTask => {
                let request: CreateTaskRequest = parse_body(body)?;
                Response::json(201, &self.service.create_task(caller, request)?)
            }
            Route::UpdateTask(id) => {
                let request: UpdateTaskRequest =
                    if body.trim().is_empty() { UpdateTaskRequest::default() } else { parse_body(body)? };
                Response::json(200, &self.service.update_task(caller, id, request)?)
            }
            Route::DeleteTask(id) => {
                self.service.delete_task(caller, id)?;
                Ok(Response::empty(204))
            }
            Route::ApiTasks => Response::json(200, &self.service.api_tasks(caller)?),
            Route::TaskHistory(id) => Response::json(200, &self.service.task_history(caller, id)?),
            Route::UpdateEmailPreference(user_id) => {
                let request: EmailPreferenceRequest = parse_body(body)?;
                Response::json(200, &self.service.update_email_preference(caller, user_id, &request)?)
            }
        }
    }
}
