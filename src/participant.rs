use std::fmt;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Rendered in letters when a recipient left the wishlist blank
pub const NO_WISHES: &str = "No wishes";

const ID_LEN: usize = 16;

/// Opaque participant identity, assigned once at registration.
///
/// Always written as a string. Older data files used millisecond
/// timestamps as ids, so numbers are accepted on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

impl ParticipantId {
    pub fn random() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub wishlist: String,
    /// Who this participant gives a gift to
    #[serde(default)]
    pub assigned_to: Option<ParticipantId>,
    #[serde(default = "Utc::now")]
    pub registered_at: DateTime<Utc>,
}

/// Validated participant fields, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipant {
    pub name: String,
    pub email: String,
    pub wishlist: String,
}

impl Participant {
    pub fn new(id: ParticipantId, fields: NewParticipant) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            wishlist: fields.wishlist,
            assigned_to: None,
            registered_at: Utc::now(),
        }
    }

    pub fn has_wishes(&self) -> bool {
        !self.wishlist.trim().is_empty()
    }

    pub fn wishes_or_placeholder(&self) -> &str {
        if self.has_wishes() {
            self.wishlist.trim()
        } else {
            NO_WISHES
        }
    }

    /// Contact addresses compare case-insensitively
    pub fn same_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

/// Finds a participant by identity within a roster
pub fn find<'a>(roster: &'a [Participant], id: &ParticipantId) -> Option<&'a Participant> {
    roster.iter().find(|p| &p.id == id)
}

/// Rewrites recipient references that are not ids of this roster.
///
/// Older data files stored the recipient's display name. A reference that
/// names exactly one participant is rewritten to that participant's id,
/// anything else is dropped. Returns how many references were changed.
pub fn resolve_legacy_recipients(roster: &mut [Participant]) -> usize {
    let mut changed = 0;
    for i in 0..roster.len() {
        let Some(target) = roster[i].assigned_to.clone() else {
            continue;
        };
        if find(roster, &target).is_some() {
            continue;
        }
        let mut named = roster.iter().filter(|p| p.name == target.as_str());
        let resolved = match (named.next(), named.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        };
        roster[i].assigned_to = resolved;
        changed += 1;
    }
    changed
}

#[cfg(test)]
pub(crate) fn sample(id: &str, name: &str) -> Participant {
    Participant::new(
        ParticipantId::from(id),
        NewParticipant {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            wishlist: String::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_alphanumeric_and_distinct() {
        let a = ParticipantId::random();
        let b = ParticipantId::random();
        assert_eq!(a.as_str().len(), ID_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn blank_wishlist_renders_placeholder() {
        let mut p = sample("a", "Alice");
        p.wishlist = "   ".to_string();
        assert!(!p.has_wishes());
        assert_eq!(p.wishes_or_placeholder(), NO_WISHES);

        p.wishlist = " socks ".to_string();
        assert_eq!(p.wishes_or_placeholder(), "socks");
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let mut p = sample("a", "Alice");
        p.assigned_to = Some(ParticipantId::from("b"));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["id"], "a");
        assert_eq!(json["assignedTo"], "b");
        assert!(json.get("registeredAt").is_some());
    }

    #[test]
    fn missing_optional_fields_default_on_load() {
        let p: Participant =
            serde_json::from_str(r#"{"id":"x1","name":"Bob","email":"bob@example.com"}"#).unwrap();
        assert_eq!(p.wishlist, "");
        assert_eq!(p.assigned_to, None);
    }

    #[test]
    fn numeric_ids_load_as_strings() {
        let p: Participant = serde_json::from_str(
            r#"{"id":1700000000000,"name":"Bob","email":"bob@example.com","assignedTo":null}"#,
        )
        .unwrap();
        assert_eq!(p.id.as_str(), "1700000000000");
        assert_eq!(p.assigned_to, None);
        assert_eq!(serde_json::to_value(&p).unwrap()["id"], "1700000000000");
    }

    #[test]
    fn recipient_names_resolve_to_ids() {
        let mut roster: Vec<Participant> = serde_json::from_str(
            r#"[
                {"id":1,"name":"Alice","email":"alice@example.com","assignedTo":"Bob"},
                {"id":2,"name":"Bob","email":"bob@example.com","assignedTo":"1"},
                {"id":3,"name":"Carol","email":"carol@example.com","assignedTo":"Nobody"}
            ]"#,
        )
        .unwrap();

        assert_eq!(resolve_legacy_recipients(&mut roster), 2);
        assert_eq!(roster[0].assigned_to, Some(ParticipantId::from("2")));
        assert_eq!(roster[1].assigned_to, Some(ParticipantId::from("1")));
        assert_eq!(roster[2].assigned_to, None);
    }

    #[test]
    fn ambiguous_recipient_names_are_dropped() {
        let mut roster = vec![sample("a", "Sam"), sample("b", "Sam"), sample("c", "Carol")];
        roster[2].assigned_to = Some(ParticipantId::from("Sam"));
        assert_eq!(resolve_legacy_recipients(&mut roster), 1);
        assert_eq!(roster[2].assigned_to, None);
    }

    #[test]
    fn email_comparison_ignores_case_and_spaces() {
        let p = sample("a", "Alice");
        assert!(p.same_email(" ALICE@example.com "));
        assert!(!p.same_email("alice@example.org"));
    }
}
