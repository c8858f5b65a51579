//! Membership tracker: the authoritative local roster.
//!
//! A plain state machine. It performs no I/O; the session coordinator feeds
//! it channel events and acts on the membership events it returns.

use podcall_common::ParticipantIdentity;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Disconnected,
    Subscribing,
    Subscribed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MembershipEvent {
    PeerJoined(ParticipantIdentity),
    PeerLeft(ParticipantIdentity),
}

#[derive(Debug)]
pub struct MembershipTracker {
    state: TrackerState,
    me: Option<ParticipantIdentity>,
    /// Remote participants in join order. Never contains self.
    roster: Vec<ParticipantIdentity>,
}

impl Default for MembershipTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipTracker {
    pub fn new() -> Self {
        Self {
            state: TrackerState::Disconnected,
            me: None,
            roster: Vec::new(),
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn me(&self) -> Option<&ParticipantIdentity> {
        self.me.as_ref()
    }

    pub fn roster(&self) -> &[ParticipantIdentity] {
        &self.roster
    }

    pub fn contains(&self, id: &str) -> bool {
        self.roster.iter().any(|p| p.id == id)
    }

    /// A subscription request is in flight.
    pub fn begin(&mut self) {
        if self.state == TrackerState::Disconnected {
            self.state = TrackerState::Subscribing;
        }
    }

    /// Subscription confirmed: replace the roster with `members` minus self.
    /// No join events are raised; members already present initiate toward us.
    pub fn on_subscribed(&mut self, me: ParticipantIdentity, members: Vec<ParticipantIdentity>) {
        if self.state == TrackerState::Disconnected {
            debug!("Ignoring subscription after disconnect");
            return;
        }
        self.roster.clear();
        for member in members {
            if member.id != me.id && !self.contains(&member.id) {
                self.roster.push(member);
            }
        }
        debug!(me = %me.id, roster = self.roster.len(), "Roster initialized");
        self.me = Some(me);
        self.state = TrackerState::Subscribed;
    }

    pub fn on_member_added(&mut self, member: ParticipantIdentity) -> Option<MembershipEvent> {
        if self.state != TrackerState::Subscribed {
            return None;
        }
        if self.me.as_ref().is_some_and(|me| me.id == member.id) || self.contains(&member.id) {
            return None;
        }
        self.roster.push(member.clone());
        Some(MembershipEvent::PeerJoined(member))
    }

    /// Idempotent: an id that is not in the roster is a no-op.
    pub fn on_member_removed(&mut self, id: &str) -> Option<MembershipEvent> {
        if self.state != TrackerState::Subscribed {
            return None;
        }
        self.remove(id).map(MembershipEvent::PeerLeft)
    }

    /// Drop a participant locally, e.g. after kicking them.
    pub fn remove(&mut self, id: &str) -> Option<ParticipantIdentity> {
        let index = self.roster.iter().position(|p| p.id == id)?;
        Some(self.roster.remove(index))
    }

    /// Transport lost: everyone is gone until we resubscribe.
    pub fn on_connection_lost(&mut self) -> Vec<MembershipEvent> {
        if self.state != TrackerState::Subscribed {
            return Vec::new();
        }
        self.state = TrackerState::Subscribing;
        self.roster.drain(..).map(MembershipEvent::PeerLeft).collect()
    }

    /// Local disconnect. Later events are ignored.
    pub fn clear(&mut self) {
        self.roster.clear();
        self.state = TrackerState::Disconnected;
    }
}
