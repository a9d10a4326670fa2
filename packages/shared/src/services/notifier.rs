use crate::models::events::DuelEvent;

/// Outbound side of the connection transport.
///
/// Implementations must not block: the coordinator calls these while it holds
/// its state lock so that events for one duel keep their order.
pub trait DuelNotifier: Send + Sync {
    /// Delivers an event to a single connection. Unknown connections are ignored.
    fn send(&self, connection_id: &str, event: &DuelEvent);

    /// Subscribes a connection to a duel channel.
    fn join_channel(&self, channel: &str, connection_id: &str);

    /// Delivers an event to every connection subscribed to the channel.
    fn broadcast(&self, channel: &str, event: &DuelEvent);

    /// Drops the channel and all of its subscriptions.
    fn close_channel(&self, channel: &str);
}
