//! Auth state change notifications.
//!
//! Handlers publish an [AuthStateChange] whenever a user signs in, signs out
//! or deletes their account. Interested parts of the app subscribe with
//! [AuthEvents::subscribe] and stop listening with
//! [AuthSubscription::unsubscribe] (or by dropping the subscription).

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::user::UserID;

/// How many unread events a slow subscriber may fall behind by before it
/// starts missing events.
const EVENT_BUFFER_SIZE: usize = 64;

/// A change in a user's authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStateChange {
    /// The user signed up or logged in.
    SignedIn(UserID),
    /// The user logged out.
    SignedOut(UserID),
    /// The user deleted their account.
    AccountDeleted(UserID),
}

/// Publishes auth state changes to any number of subscribers.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthStateChange>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    /// Create a channel with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);

        Self { sender }
    }

    /// Notify every current subscriber of `change`.
    ///
    /// Publishing with no subscribers is not an error, the event is dropped.
    pub fn publish(&self, change: AuthStateChange) {
        if self.sender.send(change).is_err() {
            tracing::debug!("No subscribers for auth state change {change:?}");
        }
    }

    /// Start listening for auth state changes published from now on.
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

/// A live subscription to auth state changes.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    /// Wait for the next auth state change.
    ///
    /// Returns `None` once every [AuthEvents] handle has been dropped.
    pub async fn next(&mut self) -> Option<AuthStateChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Auth event subscriber fell behind, skipped {skipped} events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Stop listening for auth state changes.
    pub fn unsubscribe(self) {}
}

/// Spawn a task that logs every auth state change.
pub fn spawn_auth_event_logger(events: &AuthEvents) -> JoinHandle<()> {
    let mut subscription = events.subscribe();

    tokio::spawn(async move {
        while let Some(change) = subscription.next().await {
            match change {
                AuthStateChange::SignedIn(user_id) => tracing::info!("User {user_id} signed in"),
                AuthStateChange::SignedOut(user_id) => tracing::info!("User {user_id} signed out"),
                AuthStateChange::AccountDeleted(user_id) => {
                    tracing::info!("User {user_id} deleted their account")
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        auth::{AuthEvents, AuthStateChange},
        user::UserID,
    };

    #[tokio::test]
    async fn subscriber_receives_published_events_in_order() {
        let events = AuthEvents::new();
        let mut subscription = events.subscribe();
        let user_id = UserID::new_random();

        events.publish(AuthStateChange::SignedIn(user_id));
        events.publish(AuthStateChange::SignedOut(user_id));

        assert_eq!(
            subscription.next().await,
            Some(AuthStateChange::SignedIn(user_id))
        );
        assert_eq!(
            subscription.next().await,
            Some(AuthStateChange::SignedOut(user_id))
        );
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let events = AuthEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();
        let change = AuthStateChange::AccountDeleted(UserID::new_random());

        events.publish(change);

        assert_eq!(first.next().await, Some(change));
        assert_eq!(second.next().await, Some(change));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_fail() {
        let events = AuthEvents::new();
        let subscription = events.subscribe();
        subscription.unsubscribe();

        events.publish(AuthStateChange::SignedIn(UserID::new_random()));
    }

    #[tokio::test]
    async fn subscription_ends_when_publisher_is_dropped() {
        let events = AuthEvents::new();
        let mut subscription = events.subscribe();

        drop(events);

        assert_eq!(subscription.next().await, None);
    }

    #[tokio::test]
    async fn subscriber_only_sees_events_after_subscribing() {
        let events = AuthEvents::new();
        let mut early = events.subscribe();
        let before = AuthStateChange::SignedIn(UserID::new_random());
        let after = AuthStateChange::SignedOut(UserID::new_random());

        events.publish(before);
        let mut late = events.subscribe();
        events.publish(after);

        assert_eq!(early.next().await, Some(before));
        assert_eq!(late.next().await, Some(after));
    }
}
