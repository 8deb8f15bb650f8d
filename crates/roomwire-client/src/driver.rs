//! Session driver task.
//!
//! One driver runs per open session. It feeds caller commands and async
//! completions into the sans-IO [`Session`] and executes the actions it
//! returns: REST calls run as subtasks reporting back through a completion
//! channel, publishes go to the active feed, and every observable change
//! is pushed through a watch channel.
//!
//! Completions carry the generation that requested them. The session
//! discards stale ones itself; the driver only has to keep stale feeds
//! from being installed.

use std::sync::Arc;

use chrono::Utc;
use roomwire_core::{Session, SessionAction, SessionEvent, SessionSnapshot};
use roomwire_proto::{ConversationKey, Message, Room, RoomId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::chat::{ChatServices, Command};
use crate::services::{DirectoryError, HistoryError};
use crate::transport::{FeedCommand, FeedEvent, LiveFeed, TransportError};

/// Buffer for completion reports from subtasks.
const COMPLETION_BUFFER: usize = 16;

/// Async result re-entering the loop, tagged with the generation that
/// requested it.
#[derive(Debug)]
enum Completion {
    Resolved { generation: u64, result: Result<Room, DirectoryError> },
    History { generation: u64, result: Result<Vec<Message>, HistoryError> },
    FeedReady { generation: u64, result: Result<LiveFeed, TransportError> },
}

/// A feed together with the generation it was activated for. Events from
/// it are tagged with this generation, not the session's current one, so
/// reports from a superseded feed cannot leak into a newer conversation.
struct ActiveFeed {
    generation: u64,
    live: LiveFeed,
}

/// Owns one session and performs its I/O.
pub(crate) struct SessionDriver {
    services: ChatServices,
    session: Session,
    completions_tx: mpsc::Sender<Completion>,
    completions: mpsc::Receiver<Completion>,
    feed: Option<ActiveFeed>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionDriver {
    pub(crate) fn new(
        services: ChatServices,
        key: ConversationKey,
        snapshots: watch::Sender<SessionSnapshot>,
    ) -> Self {
        let (completions_tx, completions) = mpsc::channel(COMPLETION_BUFFER);
        Self {
            services,
            session: Session::new(key),
            completions_tx,
            completions,
            feed: None,
            snapshots,
        }
    }

    /// Run until the session closes.
    ///
    /// A closed command channel means every handle was dropped; both that
    /// and an explicit close end the loop after teardown actions ran.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let actions = self.session.start();
        self.perform(actions);
        self.publish_snapshot();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let closing = matches!(command, Some(Command::Close) | None);
                    let event = match command {
                        Some(Command::Send { content, sender, kind }) => {
                            SessionEvent::SendRequested { content, sender, kind, at: Utc::now() }
                        }
                        Some(Command::Switch(key)) => SessionEvent::KeyChanged { key },
                        Some(Command::Close) | None => SessionEvent::SessionClosed,
                    };
                    self.apply(event);
                    if closing {
                        break;
                    }
                }

                Some(completion) = self.completions.recv() => {
                    self.handle_completion(completion);
                }

                event = next_feed_event(&mut self.feed) => {
                    self.handle_feed_event(event);
                }
            }
        }
        debug!("session driver stopped");
    }

    /// Apply one event to the session and execute the resulting actions.
    fn apply(&mut self, event: SessionEvent) {
        let actions = self.session.handle(event);
        self.perform(actions);
        self.publish_snapshot();
    }

    fn perform(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::ResolveRoom { generation, key } => {
                    self.spawn_resolve(generation, key);
                }
                SessionAction::FetchHistory { generation, room } => {
                    self.spawn_history(generation, room);
                }
                SessionAction::ActivateFeed { generation, room } => {
                    self.spawn_activate(generation, room);
                }
                SessionAction::Publish { destination, envelope } => {
                    self.publish(destination, &envelope);
                }
                SessionAction::DeactivateFeed => self.deactivate_feed(),
            }
        }
    }

    fn spawn_resolve(&self, generation: u64, key: ConversationKey) {
        let directory = Arc::clone(&self.services.directory);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = directory.resolve(&key).await;
            if completions.send(Completion::Resolved { generation, result }).await.is_err() {
                debug!("driver gone before room resolution finished");
            }
        });
    }

    fn spawn_history(&self, generation: u64, room: RoomId) {
        let history = Arc::clone(&self.services.history);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = history.list_messages(&room).await;
            if completions.send(Completion::History { generation, result }).await.is_err() {
                debug!("driver gone before history fetch finished");
            }
        });
    }

    fn spawn_activate(&self, generation: u64, room: RoomId) {
        let transport = Arc::clone(&self.services.transport);
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = transport.activate(&room).await;
            if completions.send(Completion::FeedReady { generation, result }).await.is_err() {
                debug!("driver gone before feed activation finished");
            }
        });
    }

    fn publish(&mut self, destination: String, envelope: &Message) {
        let Some(active) = &self.feed else {
            warn!("Publish requested without an active feed, dropping");
            return;
        };
        match envelope.to_json() {
            Ok(body) => {
                let command = FeedCommand::Publish { destination, body };
                if active.live.commands.try_send(command).is_err() {
                    warn!("Feed command queue unavailable, dropping publish");
                }
            }
            Err(e) => warn!("Failed to encode outbound envelope: {:?}", e),
        }
    }

    fn deactivate_feed(&mut self) {
        if let Some(active) = self.feed.take()
            && active.live.commands.try_send(FeedCommand::Deactivate).is_err()
        {
            debug!("feed already gone during deactivation");
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Resolved { generation, result } => match result {
                Ok(room) => self.apply(SessionEvent::RoomResolved { generation, room }),
                Err(e) => {
                    warn!("Failed to resolve room: {:?}", e);
                    self.apply(SessionEvent::RoomResolveFailed {
                        generation,
                        reason: e.to_string(),
                    });
                }
            },
            Completion::History { generation, result } => match result {
                Ok(messages) => self.apply(SessionEvent::HistoryLoaded { generation, messages }),
                Err(e) => {
                    warn!("Failed to fetch history: {:?}", e);
                    self.apply(SessionEvent::HistoryFailed { generation, reason: e.to_string() });
                }
            },
            Completion::FeedReady { generation, result } => self.install_feed(generation, result),
        }
    }

    fn install_feed(&mut self, generation: u64, result: Result<LiveFeed, TransportError>) {
        if generation != self.session.generation() {
            // The session moved on while the feed was connecting.
            if let Ok(live) = result
                && live.commands.try_send(FeedCommand::Deactivate).is_err()
            {
                debug!("stale feed already gone");
            }
            return;
        }
        match result {
            Ok(live) => {
                // The feed reports Up itself once its subscription is live.
                self.feed = Some(ActiveFeed { generation, live });
            }
            Err(e) => {
                warn!("Failed to activate live feed: {:?}", e);
                self.feed = None;
                self.apply(SessionEvent::FeedFailed { generation });
            }
        }
    }

    fn handle_feed_event(&mut self, event: Option<FeedEvent>) {
        let Some(generation) = self.feed.as_ref().map(|active| active.generation) else {
            return;
        };
        match event {
            Some(FeedEvent::Up) => self.apply(SessionEvent::FeedUp { generation }),
            Some(FeedEvent::Down) => self.apply(SessionEvent::FeedDown { generation }),
            Some(FeedEvent::Frame(body)) => match Message::from_json(&body) {
                Ok(message) => self.apply(SessionEvent::MessageArrived { generation, message }),
                Err(e) => warn!("Failed to parse broker frame: {:?}", e),
            },
            None => {
                // Feed task ended without a graceful deactivate.
                self.feed = None;
                self.apply(SessionEvent::FeedFailed { generation });
            }
        }
    }

    fn publish_snapshot(&self) {
        let next = self.session.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Next event from the active feed; pends forever while there is none.
async fn next_feed_event(feed: &mut Option<ActiveFeed>) -> Option<FeedEvent> {
    match feed {
        Some(active) => active.live.events.recv().await,
        None => std::future::pending().await,
    }
}
