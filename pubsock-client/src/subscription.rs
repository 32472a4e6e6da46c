//! Subscription registry
//!
//! The registry is the client's memory of what the caller wants to receive.
//! It is updated on every `subscribe`/`unsubscribe` call regardless of the
//! connection state, and replayed in full each time a connection opens, so
//! server-side subscriptions survive reconnects without caller involvement.

use std::collections::HashSet;

/// Desired set of channel subscriptions
#[derive(Debug, Clone, Default)]
pub(crate) struct SubscriptionRegistry {
    channels: HashSet<String>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record channels as wanted; returns how many were not already present
    pub(crate) fn add(&mut self, channels: &[String]) -> usize {
        channels
            .iter()
            .filter(|channel| self.channels.insert((*channel).clone()))
            .count()
    }

    /// Forget channels; returns how many were present
    pub(crate) fn remove(&mut self, channels: &[String]) -> usize {
        channels
            .iter()
            .filter(|channel| self.channels.remove(channel.as_str()))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.channels.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Snapshot of the registered channels, in no particular order
    pub(crate) fn channels(&self) -> Vec<String> {
        self.channels.iter().cloned().collect()
    }
}

/// Conversion into a list of channel names
///
/// Lets `subscribe` and `unsubscribe` take a single name or any list of
/// names.
///
/// ```rust
/// use pubsock_client::IntoChannels;
///
/// assert_eq!("a".into_channels(), vec!["a".to_string()]);
/// assert_eq!(["a", "b"].into_channels().len(), 2);
/// assert_eq!(vec!["a".to_string()].into_channels(), vec!["a".to_string()]);
/// ```
pub trait IntoChannels {
    fn into_channels(self) -> Vec<String>;
}

impl IntoChannels for &str {
    fn into_channels(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoChannels for String {
    fn into_channels(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoChannels for &String {
    fn into_channels(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<T: Into<String>> IntoChannels for Vec<T> {
    fn into_channels(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: AsRef<str>> IntoChannels for &[T] {
    fn into_channels(self) -> Vec<String> {
        self.iter().map(|channel| channel.as_ref().to_string()).collect()
    }
}

impl<T: Into<String>, const N: usize> IntoChannels for [T; N] {
    fn into_channels(self) -> Vec<String> {
        self.into_iter().map(Into::into).collect()
    }
}
