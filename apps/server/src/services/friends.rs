//! Friend request lifecycle.
//!
//! The relationship between two users is a small state machine: no
//! relation, a pending request in one direction, or friends. Sending a
//! request while one is pending in the opposite direction accepts it.

use chat_store::{ChatStore, Relation};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

/// What sending a friend request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendOutcome {
    /// A new pending request was recorded.
    RequestSent,
    /// A mutual request was detected and both users are now friends.
    BecameFriends,
}

async fn require_user<S: ChatStore>(store: &S, id: Uuid) -> ServerResult<()> {
    if store.get_user(id).await?.is_none() {
        return Err(ServerError::InvalidRequest("User not found".to_string()));
    }
    Ok(())
}

/// Sends a friend request from `from` to `to`.
///
/// A request to oneself, to an existing friend, or a duplicate of an
/// already-pending request is rejected. A request answering a pending
/// request from the other side promotes both users to friends and clears
/// all pending edges between them.
pub async fn send_request<S: ChatStore>(
    store: &S,
    from: Uuid,
    to: Uuid,
) -> ServerResult<FriendOutcome> {
    if from == to {
        return Err(ServerError::InvalidRequest(
            "You cannot send a friend request to yourself".to_string(),
        ));
    }
    require_user(store, to).await?;

    match store.relation(from, to).await? {
        Relation::Friends => Err(ServerError::InvalidRequest(
            "You cannot send a friend request to a friend".to_string(),
        )),
        Relation::PendingOutgoing => Err(ServerError::InvalidRequest(
            "Request already sent".to_string(),
        )),
        Relation::PendingIncoming => {
            store.promote_to_friends(from, to).await?;
            tracing::info!(%from, %to, "Mutual friend request, users promoted to friends");
            Ok(FriendOutcome::BecameFriends)
        }
        Relation::None => {
            store.add_friend_request(from, to).await?;
            tracing::debug!(%from, %to, "Friend request sent");
            Ok(FriendOutcome::RequestSent)
        }
    }
}

/// Withdraws or rejects the pending request between `user` and `other`,
/// whichever direction it points. Fails when nothing is pending.
pub async fn reject_request<S: ChatStore>(store: &S, user: Uuid, other: Uuid) -> ServerResult<()> {
    require_user(store, other).await?;

    let removed = store.remove_friend_request(user, other).await?
        || store.remove_friend_request(other, user).await?;
    if !removed {
        return Err(ServerError::InvalidRequest(
            "No pending friend request".to_string(),
        ));
    }
    tracing::debug!(%user, %other, "Pending friend request removed");
    Ok(())
}

/// Removes the friendship between `user` and `other`, along with any
/// pending requests. Removing a non-friend succeeds without effect.
pub async fn remove_friend<S: ChatStore>(store: &S, user: Uuid, other: Uuid) -> ServerResult<()> {
    require_user(store, other).await?;
    store.remove_relationship(user, other).await?;
    Ok(())
}
