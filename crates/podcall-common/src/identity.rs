use serde::{Deserialize, Serialize};

/// A participant as seen by everyone on the presence channel.
///
/// Issued by the presence authenticator when the participant subscribes and
/// never changes for the lifetime of that membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PresenceMember", into = "PresenceMember")]
pub struct ParticipantIdentity {
    pub id: String,
    pub display_name: String,
    pub is_guest: bool,
}

impl ParticipantIdentity {
    pub fn member(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_guest: false,
        }
    }

    pub fn guest(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_guest: true,
        }
    }
}

/// Presence member record as it travels over the channel service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMember {
    pub user_id: String,
    pub user_info: MemberInfo,
}

/// The `user_info` half of a presence member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    #[serde(rename = "isGuest", default)]
    pub is_guest: bool,
}

impl From<PresenceMember> for ParticipantIdentity {
    fn from(m: PresenceMember) -> Self {
        Self {
            id: m.user_id,
            display_name: m.user_info.name,
            is_guest: m.user_info.is_guest,
        }
    }
}

impl From<ParticipantIdentity> for PresenceMember {
    fn from(p: ParticipantIdentity) -> Self {
        Self {
            user_id: p.id,
            user_info: MemberInfo {
                name: p.display_name,
                is_guest: p.is_guest,
            },
        }
    }
}
