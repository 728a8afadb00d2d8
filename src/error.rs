//! Application error taxonomy.
//!
//! Every request-time failure is an [`AppError`] carrying an [`ErrorKind`].
//! A kind belongs to exactly one [`Namespace`], may carry one [`ErrorTrait`],
//! and maps to an HTTP status through a table built once per process.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use serde_json::json;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Grouping of related error kinds, used for logging and trace policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Database,
    Validation,
    NotFound,
    Unauthorized,
    Ineligible,
    Server,
    AuthorizationClient,
    AccountingClient,
    MerchantClient,
    Unauthenticated,
    Program,
    Websocket,
    Kafka,
    Maps,
    Http,
    Onde,
    MerchantPortal,
    Notification,
    Firebase,
    BadRequest,
    LoyaltyExchange,
    EFloat,
}

impl Namespace {
    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Database => "database error",
            Namespace::Validation => "validation error",
            Namespace::NotFound => "not found",
            Namespace::Unauthorized => "unauthorized",
            Namespace::Ineligible => "ineligible",
            Namespace::Server => "server error",
            Namespace::AuthorizationClient => "authorization client error",
            Namespace::AccountingClient => "accounting client error",
            Namespace::MerchantClient => "merchant client error",
            Namespace::Unauthenticated => "user authentication failed",
            Namespace::Program => "program error",
            Namespace::Websocket => "websocket error",
            Namespace::Kafka => "kafka error",
            Namespace::Maps => "maps error",
            Namespace::Http => "http error",
            Namespace::Onde => "onde request error",
            Namespace::MerchantPortal => "merchant portal error",
            Namespace::Notification => "notification channel error",
            Namespace::Firebase => "firebase error",
            Namespace::BadRequest => "bad request error",
            Namespace::LoyaltyExchange => "loyalty exchange error",
            Namespace::EFloat => "e-float error",
        }
    }

    /// Expected, common outcomes skip backtrace capture.
    pub fn omits_stack_trace(&self) -> bool {
        matches!(
            self,
            Namespace::Database
                | Namespace::Validation
                | Namespace::NotFound
                | Namespace::Unauthorized
                | Namespace::Ineligible
        )
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Orthogonal tag the authorization layer can test for without
/// enumerating concrete kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTrait {
    AccessDenied,
    Ineligible,
}

impl ErrorTrait {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorTrait::AccessDenied => "You are not authorized to perform the action",
            ErrorTrait::Ineligible => "You are not eligible to perform the action",
        }
    }
}

/// Closed catalogue of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnableToCreate,
    DataAlreadyExists,
    UnableToGet,
    UnableToUpdate,
    DbDeleteError,
    InvalidUserInput,
    InactiveUserStatus,
    TripDeviceChange,
    ResourceNotFound,
    NoRecordFound,
    AccessError,
    IneligibleError,
    InternalServerError,
    SsoError,
    AccountingError,
    UnexpectedError,
    SmsSend,
    MiniRideRequest,
    AuthClient,
    SsoAuthenticationFailed,
    InvalidAccessToken,
    AccountingClient,
    InsufficientBalance,
    MerchantClient,
    ProgramStatus,
    ProgramAmount,
    EventNotSupported,
    DeadlineTimedOut,
    SocketConnectionClosed,
    SocketConnectionBroken,
    SocketConnectionReset,
    SocketReadLimitExceeded,
    KafkaEventNotSupported,
    MapsRequest,
    MapsResponse,
    HttpRequestPrepareFailed,
    OndeRequest,
    MerchantPortalCashOut,
    NotificationChannel,
    FirebaseClient,
    FirebaseSendNotification,
    BadRequest,
    LoyaltyExchange,
    EFloatRequest,
}

impl ErrorKind {
    pub fn namespace(&self) -> Namespace {
        use ErrorKind::*;
        match self {
            UnableToCreate | DataAlreadyExists | UnableToGet | UnableToUpdate | DbDeleteError => {
                Namespace::Database
            }
            InvalidUserInput | InactiveUserStatus | TripDeviceChange => Namespace::Validation,
            ResourceNotFound | NoRecordFound => Namespace::NotFound,
            AccessError => Namespace::Unauthorized,
            IneligibleError => Namespace::Ineligible,
            InternalServerError | SsoError | AccountingError | UnexpectedError | SmsSend
            | MiniRideRequest => Namespace::Server,
            AuthClient => Namespace::AuthorizationClient,
            SsoAuthenticationFailed | InvalidAccessToken => Namespace::Unauthenticated,
            AccountingClient | InsufficientBalance => Namespace::AccountingClient,
            MerchantClient => Namespace::MerchantClient,
            ProgramStatus | ProgramAmount => Namespace::Program,
            EventNotSupported | DeadlineTimedOut | SocketConnectionClosed
            | SocketConnectionBroken | SocketConnectionReset | SocketReadLimitExceeded => {
                Namespace::Websocket
            }
            KafkaEventNotSupported => Namespace::Kafka,
            MapsRequest | MapsResponse => Namespace::Maps,
            HttpRequestPrepareFailed => Namespace::Http,
            OndeRequest => Namespace::Onde,
            MerchantPortalCashOut => Namespace::MerchantPortal,
            NotificationChannel => Namespace::Notification,
            FirebaseClient | FirebaseSendNotification => Namespace::Firebase,
            BadRequest => Namespace::BadRequest,
            LoyaltyExchange => Namespace::LoyaltyExchange,
            EFloatRequest => Namespace::EFloat,
        }
    }

    pub fn label(&self) -> &'static str {
        use ErrorKind::*;
        match self {
            UnableToCreate => "unable to create",
            DataAlreadyExists => "data already exists",
            UnableToGet => "unable to get",
            UnableToUpdate => "unable to update",
            DbDeleteError => "could not delete record",
            InvalidUserInput => "invalid user input",
            InactiveUserStatus => "inactive user status",
            TripDeviceChange => "user changed device",
            ResourceNotFound => "resource not found",
            NoRecordFound => "no record found",
            AccessError => "unauthorized",
            IneligibleError => "ineligible",
            InternalServerError => "internal server error",
            SsoError => "sso communication failed",
            AccountingError => "accounting error",
            UnexpectedError => "unexpected error occurred",
            SmsSend => "couldn't send sms",
            MiniRideRequest => "mini ride request failed",
            AuthClient => "authorization client error",
            SsoAuthenticationFailed => "user authentication failed",
            InvalidAccessToken => "invalid token",
            AccountingClient => "accounting client error",
            InsufficientBalance => "account insufficient balance error",
            MerchantClient => "merchant client error",
            ProgramStatus => "program status error",
            ProgramAmount => "spending limit error",
            EventNotSupported => "event type not supported",
            DeadlineTimedOut => "read or write deadline timed out",
            SocketConnectionClosed => "socket client connection closed",
            SocketConnectionBroken => "broken pipe",
            SocketConnectionReset => "connection reset by client",
            SocketReadLimitExceeded => "socket read limit exceeded",
            KafkaEventNotSupported => "event type not supported",
            MapsRequest => "couldn't make maps request",
            MapsResponse => "got error from maps",
            HttpRequestPrepareFailed => "couldn't prepare http request",
            OndeRequest => "onde request error",
            MerchantPortalCashOut => "merchant portal cash out error",
            NotificationChannel => "notification channel error",
            FirebaseClient => "firebase client error",
            FirebaseSendNotification => "firebase notification sending error",
            BadRequest => "bad request error",
            LoyaltyExchange => "loyalty exchange failed",
            EFloatRequest => "e-float request failed",
        }
    }

    pub fn error_trait(&self) -> Option<ErrorTrait> {
        match self {
            ErrorKind::AccessError => Some(ErrorTrait::AccessDenied),
            ErrorKind::IneligibleError => Some(ErrorTrait::Ineligible),
            _ => None,
        }
    }

    /// Token failures are routine even though their namespace keeps traces.
    pub fn omits_stack_trace(&self) -> bool {
        self.namespace().omits_stack_trace() || matches!(self, ErrorKind::InvalidAccessToken)
    }

    pub fn error(self, message: impl Into<String>) -> AppError {
        AppError::build(self, message.into(), None)
    }

    /// Build an error of this kind around an underlying cause.
    pub fn wrap(self, cause: impl Into<BoxError>, message: impl Into<String>) -> AppError {
        AppError::build(self, message.into(), Some(cause.into()))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace().label(), self.label())
    }
}

/// Ordered `(status, kind)` declarations the lookup table is built from.
/// Kinds missing here are taxonomy inconsistencies and classify as 500.
pub const STATUS_DECLARATIONS: &[(StatusCode, ErrorKind)] = &[
    (StatusCode::BAD_REQUEST, ErrorKind::InvalidUserInput),
    (StatusCode::FORBIDDEN, ErrorKind::AccessError),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::InternalServerError),
    (StatusCode::BAD_REQUEST, ErrorKind::AuthClient),
    (StatusCode::UNAUTHORIZED, ErrorKind::SsoAuthenticationFailed),
    (StatusCode::UNAUTHORIZED, ErrorKind::InvalidAccessToken),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::SsoError),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::UnableToGet),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::UnableToCreate),
    (StatusCode::NOT_FOUND, ErrorKind::ResourceNotFound),
    (StatusCode::BAD_REQUEST, ErrorKind::DataAlreadyExists),
    (StatusCode::NOT_FOUND, ErrorKind::NoRecordFound),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::DbDeleteError),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::AccountingClient),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::MerchantClient),
    (StatusCode::BAD_REQUEST, ErrorKind::EventNotSupported),
    (StatusCode::BAD_REQUEST, ErrorKind::KafkaEventNotSupported),
    (StatusCode::GONE, ErrorKind::SocketConnectionClosed),
    (StatusCode::GONE, ErrorKind::SocketConnectionReset),
    (StatusCode::GONE, ErrorKind::SocketConnectionBroken),
    (StatusCode::REQUEST_TIMEOUT, ErrorKind::DeadlineTimedOut),
    (StatusCode::BAD_REQUEST, ErrorKind::ProgramStatus),
    (StatusCode::BAD_REQUEST, ErrorKind::ProgramAmount),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::AccountingError),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::SmsSend),
    (StatusCode::BAD_GATEWAY, ErrorKind::MapsRequest),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::MapsResponse),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::UnableToUpdate),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::HttpRequestPrepareFailed),
    (StatusCode::FORBIDDEN, ErrorKind::TripDeviceChange),
    (StatusCode::BAD_REQUEST, ErrorKind::SocketReadLimitExceeded),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::OndeRequest),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::NotificationChannel),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::FirebaseClient),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::FirebaseSendNotification),
    (StatusCode::BAD_REQUEST, ErrorKind::InsufficientBalance),
    (StatusCode::BAD_REQUEST, ErrorKind::BadRequest),
    (StatusCode::CONFLICT, ErrorKind::LoyaltyExchange),
    (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::EFloatRequest),
];

static STATUS_TABLE: Lazy<HashMap<ErrorKind, StatusCode>> =
    Lazy::new(|| STATUS_DECLARATIONS.iter().map(|&(status, kind)| (kind, status)).collect());

/// What the HTTP boundary needs to know about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: StatusCode,
    pub error_trait: Option<ErrorTrait>,
}

pub fn classify(kind: ErrorKind) -> Classification {
    let status = match STATUS_TABLE.get(&kind) {
        Some(status) => *status,
        None => {
            tracing::warn!(kind = %kind, "error kind has no declared status, defaulting to 500");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    Classification {
        status,
        error_trait: kind.error_trait(),
    }
}

/// Resolve any error chain to the first [`AppError`] it contains.
pub fn classify_error(err: &(dyn StdError + 'static)) -> Classification {
    match find_app_error(err) {
        Some(app) => classify(app.kind),
        None => {
            tracing::warn!(
                error = %err,
                "unclassified error reached the boundary, defaulting to 500"
            );
            Classification {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error_trait: None,
            }
        }
    }
}

pub fn has_trait(err: &(dyn StdError + 'static), error_trait: ErrorTrait) -> bool {
    find_app_error(err).is_some_and(|app| app.has_trait(error_trait))
}

fn find_app_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a AppError> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(app) = e.downcast_ref::<AppError>() {
            return Some(app);
        }
        current = e.source();
    }
    None
}

/// A value of an [`ErrorKind`], optionally wrapping a cause.
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    cause: Option<BoxError>,
    context: BTreeMap<String, String>,
    backtrace: Option<Backtrace>,
}

impl AppError {
    fn build(kind: ErrorKind, message: String, cause: Option<BoxError>) -> Self {
        let backtrace = if kind.omits_stack_trace() {
            None
        } else {
            Some(Backtrace::capture())
        };
        Self {
            kind,
            message,
            cause,
            context: BTreeMap::new(),
            backtrace,
        }
    }

    /// Add a message layer without changing the kind.
    pub fn decorate(self, message: impl Into<String>) -> Self {
        Self {
            kind: self.kind,
            message: message.into(),
            cause: None,
            context: BTreeMap::new(),
            backtrace: None,
        }
        .caused_by(self)
    }

    fn caused_by(mut self, cause: AppError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// The innermost captured backtrace, if capture was enabled.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        let inner = self
            .cause
            .as_deref()
            .and_then(|c| c.downcast_ref::<AppError>())
            .and_then(AppError::backtrace);
        inner.or_else(|| {
            self.backtrace
                .as_ref()
                .filter(|bt| bt.status() == BacktraceStatus::Captured)
        })
    }

    pub fn has_trait(&self, error_trait: ErrorTrait) -> bool {
        self.kind.error_trait() == Some(error_trait)
    }

    pub fn classification(&self) -> Classification {
        classify(self.kind)
    }

    /// Message chain from this error down through its causes.
    pub fn chain_messages(&self) -> Vec<String> {
        let mut messages = vec![self.message.clone()];
        let mut current = self.source();
        while let Some(e) = current {
            match e.downcast_ref::<AppError>() {
                Some(app) => messages.push(app.message.clone()),
                None => messages.push(e.to_string()),
            }
            current = e.source();
        }
        messages
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let Classification { status, error_trait } = self.classification();
        let chain = self.chain_messages().join(": ");

        if self.kind.omits_stack_trace() {
            tracing::warn!(
                kind = %self.kind,
                status = status.as_u16(),
                context = ?self.context,
                "{}",
                chain
            );
        } else {
            tracing::error!(
                kind = %self.kind,
                status = status.as_u16(),
                context = ?self.context,
                backtrace = ?self.backtrace(),
                "{}",
                chain
            );
        }

        let message = match error_trait {
            Some(t) => t.message().to_string(),
            None => self.message.clone(),
        };
        let body = json!({
            "error": true,
            "code": status.as_u16(),
            "type": self.kind.to_string(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
