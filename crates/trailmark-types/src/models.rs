use serde::{Deserialize, Serialize};

/// State of a friendship row. A `Pending` row is an outstanding request from
/// `user_id` to `friend_id`; `Accepted` means both sides confirmed. There is
/// exactly one row per relation, never a mirrored pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
}

impl std::fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FriendStatus::Pending => "pending",
            FriendStatus::Accepted => "accepted",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for FriendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(FriendStatus::Pending),
            "accepted" => Ok(FriendStatus::Accepted),
            _ => Err(format!("invalid friend status: {s}")),
        }
    }
}
