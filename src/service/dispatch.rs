use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::{
    ADMIN_SCORE, Authenticator, CLIENTS_INTERESTS, ClientsInterestsRequest, MethodRequest,
    MethodResponse, ONLINE_SCORE, OnlineScoreRequest, Score, ValidationError,
};
use crate::scoring::{ScoreInput, get_interests, get_score};
use crate::service::context::RequestContext;
use crate::service::error::ApiError;
use crate::store::Store;

/// Validate and authenticate `body`, then run the method it names.
///
/// `ctx` receives the diagnostic fields of whichever method ran.
pub fn method_handler(
    body: &Value,
    ctx: &mut RequestContext,
    store: &dyn Store,
    auth: &Authenticator,
) -> Result<MethodResponse, ApiError> {
    let request = MethodRequest::from_body(body, auth)?;
    match request.method().as_str() {
        ONLINE_SCORE => online_score(&request, ctx, store, auth),
        CLIENTS_INTERESTS => clients_interests(&request, ctx, store),
        other => Err(ValidationError::UnknownMethod {
            method: other.to_owned(),
        }
        .into()),
    }
}

fn online_score(
    request: &MethodRequest,
    ctx: &mut RequestContext,
    store: &dyn Store,
    auth: &Authenticator,
) -> Result<MethodResponse, ApiError> {
    if request.is_admin() {
        return Ok(MethodResponse::Score {
            score: Score::Fixed(ADMIN_SCORE),
        });
    }

    let now = auth.now().naive_local();
    let arguments = OnlineScoreRequest::from_arguments(request.arguments().as_map(), now)?;
    ctx.has = Some(request.arguments().keys());

    let score = get_score(store, &ScoreInput::from(&arguments));
    Ok(MethodResponse::Score {
        score: Score::Computed(score),
    })
}

fn clients_interests(
    request: &MethodRequest,
    ctx: &mut RequestContext,
    store: &dyn Store,
) -> Result<MethodResponse, ApiError> {
    let arguments = ClientsInterestsRequest::from_arguments(request.arguments().as_map())?;
    ctx.nclients = Some(arguments.client_ids().len());

    let mut interests = BTreeMap::new();
    for &client_id in arguments.client_ids().as_slice() {
        interests.insert(client_id.to_string(), get_interests(store, client_id)?);
    }
    Ok(MethodResponse::Interests(interests))
}
