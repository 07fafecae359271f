use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub mod client;
pub mod session;

/// A player account. Profile fields are optional and only filled in once the
/// player has edited their profile.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub favorite_games: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A table: a named group of players with its own chat, polls and events.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner_id: i64,
}

/// A chat message posted on a table.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub content: String,
    /// ISO 8601 timestamp, server clock.
    pub created_at: String,
    pub user: MessageAuthor,
}

/// The author embedded in a [`Message`].
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: i64,
    pub username: String,
}

/// A scheduled meetup on a table.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableEvent {
    pub id: i64,
    pub date: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Ids of the members who confirmed attendance.
    #[serde(default)]
    pub confirmed: Vec<i64>,
}

/// A poll with its server-computed tally.
///
/// Votes are multi-select: `my_votes` holds every option the requesting user
/// picked, and `results` maps each option label to its vote count.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollWithResults {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub results: HashMap<String, u32>,
    #[serde(default)]
    pub my_votes: Vec<String>,
}

impl PollWithResults {
    /// Per-option vote percentages, in option order.
    ///
    /// Each percentage is `round(100 * count / total)` where total is the sum
    /// of all option counts. Every option renders 0 when nobody has voted.
    pub fn percentages(&self) -> Vec<(String, u32)> {
        let total: u32 = self.results.values().sum();
        self.options
            .iter()
            .map(|option| {
                let count = self.results.get(option).copied().unwrap_or(0);
                let pct = if total > 0 {
                    (f64::from(count) * 100.0 / f64::from(total)).round() as u32
                } else {
                    0
                };
                (option.clone(), pct)
            })
            .collect()
    }
}

/// Everything one table screen needs, in a single response.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct TableDetail {
    pub table: Table,
    pub members: Vec<User>,
    pub messages: Vec<Message>,
    pub polls: Vec<PollWithResults>,
    pub events: Vec<TableEvent>,
}

/// One entry of the distinct-cities listing used by player search.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct CityCount {
    pub city: String,
    pub count: u32,
}

/// Data returned by the server on a successful login or registration.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSuccess {
    #[serde(default)]
    pub ok: bool,
    /// Opaque bearer token to carry on every authenticated call.
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<String>,
    pub user: User,
}

/// Data returned by the server when creating a table invite.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCreated {
    #[serde(default)]
    pub ok: bool,
    /// Opaque invite token. Short-lived and single-purpose.
    pub token: String,
    pub expires_at: String,
}

/// Data returned by the server when redeeming a table invite.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRedeemed {
    #[serde(default)]
    pub ok: bool,
    pub table_id: i64,
    /// False when the caller was already a member of the table.
    pub joined: bool,
}

/// Profile fields to change. `None` leaves a field untouched; empty strings
/// are dropped before the request is sent.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_games: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(options: &[&str], counts: &[(&str, u32)]) -> PollWithResults {
        PollWithResults {
            id: 1,
            question: "Quel jeu ?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            results: counts
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            my_votes: Vec::new(),
        }
    }

    #[test]
    fn percentages_round_against_the_vote_total() {
        let poll = poll(&["A", "B"], &[("A", 3), ("B", 1)]);
        assert_eq!(
            poll.percentages(),
            vec![("A".to_string(), 75), ("B".to_string(), 25)]
        );
    }

    #[test]
    fn percentages_are_zero_when_nobody_voted() {
        let poll = poll(&["A", "B"], &[("A", 0), ("B", 0)]);
        assert_eq!(
            poll.percentages(),
            vec![("A".to_string(), 0), ("B".to_string(), 0)]
        );
    }

    #[test]
    fn options_missing_from_the_tally_count_as_zero() {
        let poll = poll(&["A", "B", "C"], &[("A", 2)]);
        assert_eq!(
            poll.percentages(),
            vec![
                ("A".to_string(), 100),
                ("B".to_string(), 0),
                ("C".to_string(), 0)
            ]
        );
    }

    #[test]
    fn rounding_matches_the_display_rule() {
        // 1/3 and 2/3 must render 33 / 67.
        let poll = poll(&["A", "B"], &[("A", 1), ("B", 2)]);
        assert_eq!(
            poll.percentages(),
            vec![("A".to_string(), 33), ("B".to_string(), 67)]
        );
    }

    #[test]
    fn table_detail_decodes_the_aggregate_shape() {
        let raw = serde_json::json!({
            "ok": true,
            "table": { "id": 42, "name": "Jeudi soir", "ownerId": 7 },
            "members": [{ "id": 7, "username": "alice" }],
            "messages": [{
                "id": 1,
                "content": "On joue ?",
                "createdAt": "2025-03-01T18:00:00Z",
                "user": { "id": 7, "username": "alice" }
            }],
            "polls": [{
                "id": 5,
                "question": "Quel jeu ?",
                "options": ["Catan", "Azul"],
                "results": { "Catan": 2, "Azul": 1 },
                "myVotes": ["Catan"]
            }],
            "events": [{ "id": 3, "date": "2025-03-07T19:00:00Z", "confirmed": [7] }]
        });
        let detail: TableDetail = serde_json::from_value(raw).unwrap();
        assert_eq!(detail.table.owner_id, 7);
        assert_eq!(detail.members[0].username, "alice");
        assert_eq!(detail.polls[0].my_votes, vec!["Catan"]);
        assert_eq!(detail.events[0].confirmed, vec![7]);
        assert!(detail.events[0].location.is_none());
    }

    #[test]
    fn profile_update_omits_unset_fields() {
        let update = ProfileUpdate {
            city: Some("Lyon".to_string()),
            favorite_games: None,
            description: None,
        };
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, serde_json::json!({ "city": "Lyon" }));
    }
}
