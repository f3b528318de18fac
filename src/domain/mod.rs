//! Domain layer: validated field kinds, request schemas and token checks (no I/O).

mod auth;
mod request;
mod response;
mod validation;
mod value;

pub use auth::{ADMIN_LOGIN, Authenticator, Clock, FixedClock, SystemClock};
pub use request::{
    CLIENTS_INTERESTS, ClientsInterestsRequest, EnvelopeError, MethodRequest, ONLINE_SCORE,
    OnlineScoreRequest,
};
pub use response::{ADMIN_SCORE, MethodResponse, Score};
pub use validation::ValidationError;
pub use value::{
    Arguments, BirthDay, CharText, ClientIds, Date, Email, FieldKind, FieldSpec, Gender, Phone,
};
