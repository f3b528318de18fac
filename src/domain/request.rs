use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::domain::auth::{ADMIN_LOGIN, Authenticator};
use crate::domain::validation::ValidationError;
use crate::domain::value::{
    Arguments, BirthDay, CharText, ClientIds, Date, Email, FieldSpec, Gender, Phone,
};

pub const ONLINE_SCORE: &str = "online_score";
pub const CLIENTS_INTERESTS: &str = "clients_interests";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Reasons a request envelope is refused.
pub enum EnvelopeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("bad token for login {login:?}")]
    Forbidden { login: String },
}

#[derive(Debug, Clone, PartialEq)]
/// Authenticated request envelope.
///
/// Only obtainable through [`MethodRequest::from_body`], so holding one means
/// every field validated and the token matched.
pub struct MethodRequest {
    account: CharText,
    login: CharText,
    token: CharText,
    arguments: Arguments,
    method: CharText,
}

impl MethodRequest {
    pub const ACCOUNT: FieldSpec = FieldSpec::new("account", false, true);
    pub const LOGIN: FieldSpec = FieldSpec::new("login", true, true);
    pub const TOKEN: FieldSpec = FieldSpec::new("token", true, true);
    pub const ARGUMENTS: FieldSpec = FieldSpec::new("arguments", true, true);
    pub const METHOD: FieldSpec = FieldSpec::new("method", true, false);

    /// Validate the raw body, then check the token.
    pub fn from_body(body: &Value, auth: &Authenticator) -> Result<Self, EnvelopeError> {
        let body = body.as_object().ok_or_else(|| ValidationError::WrongType {
            field: "body",
            expected: "an object",
            input: body.to_string(),
        })?;

        let request = Self {
            account: Self::ACCOUNT.extract_text(body)?,
            login: Self::LOGIN.extract_text(body)?,
            token: Self::TOKEN.extract_text(body)?,
            arguments: Self::ARGUMENTS
                .extract::<Arguments>(body)?
                .unwrap_or_default(),
            method: Self::METHOD.extract_text(body)?,
        };

        if !auth.is_authenticated(&request) {
            return Err(EnvelopeError::Forbidden {
                login: request.login.as_str().to_owned(),
            });
        }
        Ok(request)
    }

    /// Borrow the account; empty when not sent.
    pub fn account(&self) -> &CharText {
        &self.account
    }

    /// Borrow the login.
    pub fn login(&self) -> &CharText {
        &self.login
    }

    /// Borrow the token that was checked.
    pub fn token(&self) -> &CharText {
        &self.token
    }

    /// Borrow the raw method arguments.
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Borrow the method name.
    pub fn method(&self) -> &CharText {
        &self.method
    }

    /// `true` when the caller logged in as [`ADMIN_LOGIN`].
    pub fn is_admin(&self) -> bool {
        self.login.as_str() == ADMIN_LOGIN
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Arguments of `online_score`.
///
/// Invariant: at least one of phone/email, first_name/last_name or
/// gender/birthday is fully present.
pub struct OnlineScoreRequest {
    first_name: CharText,
    last_name: CharText,
    email: Option<Email>,
    phone: Option<Phone>,
    birthday: Option<BirthDay>,
    gender: Option<Gender>,
}

impl OnlineScoreRequest {
    pub const FIRST_NAME: FieldSpec = FieldSpec::new("first_name", false, true);
    pub const LAST_NAME: FieldSpec = FieldSpec::new("last_name", false, true);
    pub const EMAIL: FieldSpec = FieldSpec::new("email", false, true);
    pub const PHONE: FieldSpec = FieldSpec::new("phone", false, true);
    pub const BIRTHDAY: FieldSpec = FieldSpec::new("birthday", false, true);
    pub const GENDER: FieldSpec = FieldSpec::new("gender", false, true);

    /// Validate `online_score` arguments; `now` bounds the birthday.
    pub fn from_arguments(
        args: &Map<String, Value>,
        now: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let birthday = Self::BIRTHDAY
            .extract::<Date>(args)?
            .map(|date| BirthDay::from_date(Self::BIRTHDAY.name, date, now))
            .transpose()?;

        let request = Self {
            first_name: Self::FIRST_NAME.extract_text(args)?,
            last_name: Self::LAST_NAME.extract_text(args)?,
            email: Self::EMAIL.extract(args)?,
            phone: Self::PHONE.extract(args)?,
            birthday,
            gender: Self::GENDER.extract(args)?,
        };

        let has_contacts = request.phone.is_some() && request.email.is_some();
        let has_name = !request.first_name.is_empty() && !request.last_name.is_empty();
        let has_demographics = request.gender.is_some() && request.birthday.is_some();
        if !(has_contacts || has_name || has_demographics) {
            return Err(ValidationError::NotEnoughArguments);
        }
        Ok(request)
    }

    /// Borrow the first name; empty when not sent.
    pub fn first_name(&self) -> &CharText {
        &self.first_name
    }

    /// Borrow the last name; empty when not sent.
    pub fn last_name(&self) -> &CharText {
        &self.last_name
    }

    /// Borrow the validated e-mail, if any.
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// Borrow the validated phone, if any.
    pub fn phone(&self) -> Option<&Phone> {
        self.phone.as_ref()
    }

    /// Borrow the validated birthday, if any.
    pub fn birthday(&self) -> Option<&BirthDay> {
        self.birthday.as_ref()
    }

    /// The gender, if sent.
    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Arguments of `clients_interests`.
pub struct ClientsInterestsRequest {
    client_ids: ClientIds,
    date: Option<Date>,
}

impl ClientsInterestsRequest {
    pub const CLIENT_IDS: FieldSpec = FieldSpec::new("client_ids", true, false);
    pub const DATE: FieldSpec = FieldSpec::new("date", false, true);

    /// Validate `clients_interests` arguments.
    ///
    /// ```
    /// use scoring_api::ClientsInterestsRequest;
    /// use serde_json::json;
    ///
    /// let args = json!({"client_ids": [1, 2], "date": "19.07.2017"});
    /// let request = ClientsInterestsRequest::from_arguments(args.as_object().unwrap()).unwrap();
    /// assert_eq!(request.client_ids().as_slice(), &[1_i64, 2]);
    /// assert_eq!(request.date().map(|date| date.as_str()), Some("19.07.2017"));
    ///
    /// let empty = json!({"client_ids": []});
    /// assert!(ClientsInterestsRequest::from_arguments(empty.as_object().unwrap()).is_err());
    /// ```
    pub fn from_arguments(args: &Map<String, Value>) -> Result<Self, ValidationError> {
        let client_ids = Self::CLIENT_IDS
            .extract::<ClientIds>(args)?
            .ok_or(ValidationError::Missing {
                field: Self::CLIENT_IDS.name,
            })?;
        Ok(Self {
            client_ids,
            date: Self::DATE.extract(args)?,
        })
    }

    /// Borrow the requested ids.
    pub fn client_ids(&self) -> &ClientIds {
        &self.client_ids
    }

    /// Borrow the request date, if any.
    pub fn date(&self) -> Option<&Date> {
        self.date.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn auth() -> Authenticator {
        Authenticator::new("Otus", "42")
    }

    fn body(account: &str, login: &str, token: &str) -> Value {
        json!({
            "account": account,
            "login": login,
            "method": ONLINE_SCORE,
            "token": token,
            "arguments": {},
        })
    }

    #[test]
    fn envelope_rejects_bad_tokens() {
        for (login, token) in [("h&f", ""), ("h&f", "sdd"), (ADMIN_LOGIN, "")] {
            let err = MethodRequest::from_body(&body("horns&hoofs", login, token), &auth())
                .unwrap_err();
            assert!(
                matches!(err, EnvelopeError::Forbidden { .. }),
                "{login}/{token}"
            );
        }
    }

    #[test]
    fn envelope_accepts_valid_user_token() {
        let auth = auth();
        let token = auth.user_token("horns&hoofs", "h&f");
        let request = MethodRequest::from_body(&body("horns&hoofs", "h&f", &token), &auth).unwrap();
        assert_eq!(request.method().as_str(), ONLINE_SCORE);
        assert!(!request.is_admin());
        assert!(request.arguments().as_map().is_empty());
    }

    #[test]
    fn envelope_account_is_optional() {
        let auth = auth();
        let token = auth.user_token("", "h&f");
        let raw = json!({"login": "h&f", "method": ONLINE_SCORE, "token": token, "arguments": {}});
        let request = MethodRequest::from_body(&raw, &auth).unwrap();
        assert!(request.account().is_empty());
    }

    #[test]
    fn envelope_validation_runs_before_auth() {
        let raw = json!({"login": "h&f", "method": "", "token": "", "arguments": {}});
        assert_eq!(
            MethodRequest::from_body(&raw, &auth()).unwrap_err(),
            EnvelopeError::Invalid(ValidationError::Empty { field: "method" })
        );

        let raw = json!({"login": "h&f", "method": ONLINE_SCORE, "token": ""});
        assert_eq!(
            MethodRequest::from_body(&raw, &auth()).unwrap_err(),
            EnvelopeError::Invalid(ValidationError::Missing { field: "arguments" })
        );

        let raw = json!(["not", "an", "object"]);
        assert!(matches!(
            MethodRequest::from_body(&raw, &auth()),
            Err(EnvelopeError::Invalid(ValidationError::WrongType { field: "body", .. }))
        ));
    }

    #[test]
    fn score_request_needs_a_complete_pair() {
        let ok = [
            json!({"phone": "79175002040", "email": "stupnikov@otus.ru"}),
            json!({"phone": 79175002040_u64, "email": "stupnikov@otus.ru"}),
            json!({"gender": 1, "birthday": "01.01.2000", "first_name": "a", "last_name": "b"}),
            json!({"gender": 0, "birthday": "01.01.2000"}),
            json!({"first_name": "a", "last_name": "b"}),
        ];
        for raw in ok {
            assert!(
                OnlineScoreRequest::from_arguments(&args(raw.clone()), now()).is_ok(),
                "{raw}"
            );
        }

        let sparse = [
            json!({}),
            json!({"phone": "79175002040"}),
            json!({"phone": "79175002040", "email": ""}),
            json!({"first_name": "a", "last_name": ""}),
            json!({"gender": 1, "birthday": null}),
        ];
        for raw in sparse {
            assert_eq!(
                OnlineScoreRequest::from_arguments(&args(raw.clone()), now()).unwrap_err(),
                ValidationError::NotEnoughArguments,
                "{raw}"
            );
        }
    }

    #[test]
    fn score_request_surfaces_field_errors() {
        let cases = [
            (json!({"phone": "89175002040", "email": "a@b.ru"}), "phone"),
            (json!({"phone": "79175002040", "email": "ab.ru"}), "email"),
            (json!({"gender": 4, "birthday": "01.01.2000"}), "gender"),
            (json!({"gender": 1, "birthday": "01.01.1890"}), "birthday"),
            (json!({"gender": 1, "birthday": "2000-01-01"}), "birthday"),
            (json!({"first_name": 1, "last_name": "b"}), "first_name"),
        ];
        for (raw, field) in cases {
            let err = OnlineScoreRequest::from_arguments(&args(raw.clone()), now()).unwrap_err();
            assert_eq!(err.field(), Some(field), "{raw}");
        }
    }

    #[test]
    fn interests_request_validates_ids_and_date() {
        let request = ClientsInterestsRequest::from_arguments(&args(
            json!({"client_ids": [1, 2], "date": "19.07.2017"}),
        ))
        .unwrap();
        assert_eq!(request.client_ids().as_slice(), &[1, 2]);
        assert_eq!(request.date().map(Date::as_str), Some("19.07.2017"));

        let request =
            ClientsInterestsRequest::from_arguments(&args(json!({"client_ids": [0]}))).unwrap();
        assert!(request.date().is_none());

        let cases = [
            (json!({}), ValidationError::Missing { field: "client_ids" }),
            (json!({"client_ids": []}), ValidationError::Empty { field: "client_ids" }),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                ClientsInterestsRequest::from_arguments(&args(raw)).unwrap_err(),
                expected
            );
        }
        assert!(matches!(
            ClientsInterestsRequest::from_arguments(&args(
                json!({"client_ids": [1], "date": "2017.07.19"})
            )),
            Err(ValidationError::InvalidDate { field: "date", .. })
        ));
        assert!(matches!(
            ClientsInterestsRequest::from_arguments(&args(json!({"client_ids": {"1": 2}}))),
            Err(ValidationError::WrongType { field: "client_ids", .. })
        ));
    }
}
