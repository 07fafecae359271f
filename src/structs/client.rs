use colorful::Color;
use colorful::Colorful;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{normalize_error, MeepleError};
use crate::structs::{
    CityCount, InviteCreated, InviteRedeemed, LoginSuccess, ProfileUpdate, Table, TableDetail,
    User,
};

/// Search results are capped at this many players unless the caller asks for
/// a different limit.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;

/// Meeple API client. Used to interact with the Meeple mobile API.
///
/// The client is stateless: every operation maps to exactly one HTTP request
/// and normalizes the response into a typed value or a [`MeepleError`]. It
/// never touches session state; authenticated operations take the bearer
/// token as a plain argument.
#[derive(Debug)]
pub struct Client {
    /// Base URL of the Meeple backend, without a trailing slash.
    pub base_url: String,
    /// Whether the client should print debug statements.
    pub debug: bool,
    http: reqwest::blocking::Client,
}

/// Meeple client options. Pass this into the `new()` function of the Client.
#[derive(Default, Debug)]
pub struct ClientOptions {
    /// Base URL of the Meeple backend, e.g. `https://meeple.example`.
    pub base_url: String,
    /// Whether the client should print debug statements.
    pub debug: bool,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Registration<'a> {
    username: &'a str,
    password: &'a str,
    confirm: &'a str,
}

#[derive(Serialize)]
struct TablePayload<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct MemberPayload<'a> {
    username: &'a str,
}

#[derive(Serialize)]
struct PollPayload<'a> {
    question: &'a str,
    options: &'a [String],
}

// The vote endpoint takes the full set of selected options under the
// singular `option` key.
#[derive(Serialize)]
struct VotePayload<'a> {
    option: &'a [String],
}

#[derive(Serialize)]
struct OptionPayload<'a> {
    option: &'a str,
}

#[derive(Serialize)]
struct EventPayload<'a> {
    day: &'a str,
    time: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct Empty {}

#[derive(Default, Deserialize)]
#[serde(default)]
struct Ack {
    #[allow(dead_code)]
    ok: bool,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct TablesEnvelope {
    tables: Vec<Table>,
}

#[derive(Deserialize)]
struct TableEnvelope {
    table: Table,
}

#[derive(Deserialize)]
struct CitiesEnvelope {
    cities: Vec<CityCount>,
}

#[derive(Deserialize)]
struct PlayersEnvelope {
    users: Vec<User>,
}

impl Client {
    /// Creates a new Meeple client.
    pub fn new(options: ClientOptions) -> Result<Self, MeepleError> {
        let base_url = options.base_url.trim_end_matches('/').to_string();
        let parsed = reqwest::Url::parse(&base_url).or(Err(MeepleError::InvalidBaseUrl))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MeepleError::InvalidBaseUrl);
        }

        Ok(Self {
            base_url,
            debug: options.debug,
            http: reqwest::blocking::Client::new(),
        })
    }

    // --- Auth ---

    /// Signs a user in. Returns the bearer token and the signed-in identity.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginSuccess, MeepleError> {
        self.post(
            "/api/mobile/auth/login",
            None,
            &Credentials { username, password },
        )
    }

    /// Registers a new account. The server is the sole authority on username
    /// uniqueness and password policy.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<LoginSuccess, MeepleError> {
        self.post(
            "/api/mobile/auth/register",
            None,
            &Registration {
                username,
                password,
                confirm,
            },
        )
    }

    /// Fetches the identity behind a bearer token.
    pub fn me(&self, token: &str) -> Result<User, MeepleError> {
        let data: UserEnvelope = self.get("/api/mobile/me", token)?;
        Ok(data.user)
    }

    // --- Tables ---

    /// Lists the tables the caller belongs to.
    pub fn list_tables(&self, token: &str) -> Result<Vec<Table>, MeepleError> {
        let data: TablesEnvelope = self.get("/api/mobile/tables", token)?;
        Ok(data.tables)
    }

    /// Creates a table. An empty description is omitted from the request.
    pub fn create_table(
        &self,
        token: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Table, MeepleError> {
        let data: TableEnvelope = self.post(
            "/api/mobile/tables",
            Some(token),
            &TablePayload {
                name,
                description: description.filter(|d| !d.is_empty()),
            },
        )?;
        Ok(data.table)
    }

    /// Fetches one table with its members, messages, polls (tallies
    /// included) and events.
    pub fn table_detail(&self, token: &str, table_id: i64) -> Result<TableDetail, MeepleError> {
        self.get(&format!("/api/mobile/tables/{table_id}"), token)
    }

    /// Renames a table and/or changes its description.
    pub fn edit_table(
        &self,
        token: &str,
        table_id: i64,
        name: &str,
        description: Option<&str>,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/edit"),
            Some(token),
            &TablePayload {
                name,
                description: description.filter(|d| !d.is_empty()),
            },
        )?;
        Ok(())
    }

    // --- Messages ---

    /// Posts a chat message on a table.
    pub fn post_message(
        &self,
        token: &str,
        table_id: i64,
        content: &str,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/messages"),
            Some(token),
            &MessagePayload { content },
        )?;
        Ok(())
    }

    // --- Members ---

    /// Adds a player to a table by username.
    pub fn add_member(&self, token: &str, table_id: i64, username: &str) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/members"),
            Some(token),
            &MemberPayload { username },
        )?;
        Ok(())
    }

    /// Removes a member from a table.
    pub fn remove_member(
        &self,
        token: &str,
        table_id: i64,
        user_id: i64,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/members/{user_id}/delete"),
            Some(token),
            &Empty {},
        )?;
        Ok(())
    }

    // --- Polls ---

    /// Opens a poll on a table.
    pub fn create_poll(
        &self,
        token: &str,
        table_id: i64,
        question: &str,
        options: &[String],
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/polls"),
            Some(token),
            &PollPayload { question, options },
        )?;
        Ok(())
    }

    /// Casts the caller's votes on a poll. Voting is multi-select: `options`
    /// replaces the caller's previous selection wholesale.
    pub fn vote_poll(
        &self,
        token: &str,
        table_id: i64,
        poll_id: i64,
        options: &[String],
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/polls/{poll_id}/vote"),
            Some(token),
            &VotePayload { option: options },
        )?;
        Ok(())
    }

    /// Appends an option to an existing poll.
    pub fn add_poll_option(
        &self,
        token: &str,
        table_id: i64,
        poll_id: i64,
        option: &str,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/polls/{poll_id}/add-option"),
            Some(token),
            &OptionPayload { option },
        )?;
        Ok(())
    }

    /// Deletes a poll.
    pub fn delete_poll(
        &self,
        token: &str,
        table_id: i64,
        poll_id: i64,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/polls/{poll_id}/delete"),
            Some(token),
            &Empty {},
        )?;
        Ok(())
    }

    // --- Events ---

    /// Schedules a meetup on a table.
    pub fn create_event(
        &self,
        token: &str,
        table_id: i64,
        day: &str,
        time: &str,
        location: Option<&str>,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/events"),
            Some(token),
            &EventPayload {
                day,
                time,
                location: location.filter(|l| !l.is_empty()),
            },
        )?;
        Ok(())
    }

    /// Reschedules or relocates a meetup.
    pub fn edit_event(
        &self,
        token: &str,
        table_id: i64,
        event_id: i64,
        day: &str,
        time: &str,
        location: Option<&str>,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/events/{event_id}/edit"),
            Some(token),
            &EventPayload {
                day,
                time,
                location: location.filter(|l| !l.is_empty()),
            },
        )?;
        Ok(())
    }

    /// Cancels a meetup.
    pub fn delete_event(
        &self,
        token: &str,
        table_id: i64,
        event_id: i64,
    ) -> Result<(), MeepleError> {
        self.post::<Ack, _>(
            &format!("/api/mobile/tables/{table_id}/events/{event_id}/delete"),
            Some(token),
            &Empty {},
        )?;
        Ok(())
    }

    // --- Players ---

    /// Lists every distinct city players have set, with how many players
    /// live there. Feeds the search screen's city filter.
    pub fn list_player_cities(&self, token: &str) -> Result<Vec<CityCount>, MeepleError> {
        let data: CitiesEnvelope = self.get("/api/mobile/players/cities", token)?;
        Ok(data.cities)
    }

    /// Searches players by free text and/or city. Empty filters are omitted
    /// from the query string; `exclude_table_id` drops a table's existing
    /// members and owner from the results.
    pub fn search_players(
        &self,
        token: &str,
        q: Option<&str>,
        city: Option<&str>,
        limit: Option<u32>,
        exclude_table_id: Option<i64>,
    ) -> Result<Vec<User>, MeepleError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(q) = q.filter(|s| !s.is_empty()) {
            query.push(("q", q.to_string()));
        }
        if let Some(city) = city.filter(|s| !s.is_empty()) {
            query.push(("city", city.to_string()));
        }
        query.push(("limit", limit.unwrap_or(DEFAULT_SEARCH_LIMIT).to_string()));
        if let Some(table_id) = exclude_table_id {
            query.push(("excludeTableId", table_id.to_string()));
        }

        let data: PlayersEnvelope = self.get_with_query("/api/mobile/players", token, &query)?;
        Ok(data.users)
    }

    // --- Profile ---

    /// Fetches the caller's own profile.
    pub fn my_profile(&self, token: &str) -> Result<User, MeepleError> {
        let data: UserEnvelope = self.get("/api/mobile/profile", token)?;
        Ok(data.user)
    }

    /// Updates the caller's profile. Unset and empty fields are left
    /// untouched on the server.
    pub fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<(), MeepleError> {
        let body = ProfileUpdate {
            city: update.city.clone().filter(|s| !s.is_empty()),
            favorite_games: update.favorite_games.clone().filter(|s| !s.is_empty()),
            description: update.description.clone().filter(|s| !s.is_empty()),
        };
        self.post::<Ack, _>("/api/mobile/profile", Some(token), &body)?;
        Ok(())
    }

    // --- Invites ---

    /// Creates a short-lived invite token for a table.
    pub fn create_invite(&self, token: &str, table_id: i64) -> Result<InviteCreated, MeepleError> {
        self.post_empty(&format!("/api/mobile/tables/{table_id}/invite/create"), token)
    }

    /// Redeems a scanned invite token, joining the caller to its table.
    pub fn redeem_invite(
        &self,
        token: &str,
        invite_token: &str,
    ) -> Result<InviteRedeemed, MeepleError> {
        self.post(
            "/api/mobile/invite/redeem",
            Some(token),
            &TokenPayload {
                token: invite_token,
            },
        )
    }

    // --- Transport ---

    fn get<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, MeepleError> {
        self.get_with_query(path, token, &[])
    }

    fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T, MeepleError> {
        self.debug_print(&format!("[API] GET {path}"));
        let mut request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().or(Err(MeepleError::RequestFailed))?;
        Self::handle(response)
    }

    fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, MeepleError> {
        self.debug_print(&format!("[API] POST {path}"));
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().or(Err(MeepleError::RequestFailed))?;
        Self::handle(response)
    }

    // The invite-create endpoint takes no body at all, not even `{}`.
    fn post_empty<T: DeserializeOwned>(&self, path: &str, token: &str) -> Result<T, MeepleError> {
        self.debug_print(&format!("[API] POST {path}"));
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .or(Err(MeepleError::RequestFailed))?;
        Self::handle(response)
    }

    fn handle<T: DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<T, MeepleError> {
        let status = response.status();
        let body = response.text().or(Err(MeepleError::RequestFailed))?;
        handle_parts(status, &body)
    }

    fn debug_print(&self, message: &str) {
        if !self.debug {
            return;
        }

        #[cfg(windows)]
        println!("{}", message);

        #[cfg(not(windows))]
        println!(
            "{}",
            message.gradient_with_color(Color::Cyan, Color::SpringGreen4)
        );
    }
}

/// Normalizes one HTTP response into a typed result.
///
/// The body is read as text first so empty bodies are tolerated, then parsed
/// as JSON, defaulting to an empty object when the parse fails. A non-success
/// status becomes [`MeepleError::Unauthorized`] for 401 and
/// [`MeepleError::Rejected`] otherwise, carrying the normalized server
/// reason. A success status decodes the body into the operation's declared
/// shape; a body that does not match it is [`MeepleError::FailedToDecode`].
fn handle_parts<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, MeepleError> {
    let payload: Value = if body.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::Object(Default::default()))
    };

    if !status.is_success() {
        if status == StatusCode::UNAUTHORIZED {
            return Err(MeepleError::Unauthorized);
        }
        return Err(MeepleError::Rejected {
            status: status.as_u16(),
            message: normalize_error(&payload, status.as_u16()),
        });
    }

    serde_json::from_value(payload).or(Err(MeepleError::FailedToDecode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_a_garbage_base_url() {
        let result = Client::new(ClientOptions {
            base_url: "not a url".to_string(),
            debug: false,
        });
        assert!(matches!(result, Err(MeepleError::InvalidBaseUrl)));
    }

    #[test]
    fn new_rejects_non_http_schemes() {
        let result = Client::new(ClientOptions {
            base_url: "ftp://meeple.example".to_string(),
            debug: false,
        });
        assert!(matches!(result, Err(MeepleError::InvalidBaseUrl)));
    }

    #[test]
    fn new_strips_the_trailing_slash() {
        let client = Client::new(ClientOptions {
            base_url: "http://meeple.example/".to_string(),
            debug: false,
        })
        .unwrap();
        assert_eq!(client.base_url, "http://meeple.example");
    }

    #[test]
    fn success_body_decodes_into_the_declared_shape() {
        let body = r#"{"ok":true,"token":"t1","user":{"id":7,"username":"alice"}}"#;
        let data: LoginSuccess = handle_parts(StatusCode::OK, body).unwrap();
        assert!(data.ok);
        assert_eq!(data.token, "t1");
        assert_eq!(data.user.id, 7);
        assert_eq!(data.user.username, "alice");
    }

    #[test]
    fn rejected_status_carries_the_normalized_reason() {
        let err = handle_parts::<LoginSuccess>(
            StatusCode::BAD_REQUEST,
            r#"{"error":"WRONG_PASSWORD"}"#,
        )
        .unwrap_err();
        match err {
            MeepleError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Mot de passe incorrect.");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn unauthorized_status_gets_its_own_variant() {
        let err = handle_parts::<LoginSuccess>(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"UNAUTHORIZED"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, MeepleError::Unauthorized));
    }

    #[test]
    fn error_status_with_unparseable_body_falls_back_to_http_status() {
        let err =
            handle_parts::<LoginSuccess>(StatusCode::BAD_GATEWAY, "<html>bad</html>").unwrap_err();
        match err {
            MeepleError::Rejected { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "HTTP 502");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn malformed_success_body_is_a_decode_error_not_a_panic() {
        let err = handle_parts::<LoginSuccess>(StatusCode::OK, "not json").unwrap_err();
        assert!(matches!(err, MeepleError::FailedToDecode));
    }

    #[test]
    fn empty_success_body_still_acks() {
        let ack: Ack = handle_parts(StatusCode::OK, "").unwrap();
        assert!(!ack.ok);
    }
}
