//! Protocol events for state change notifications.
//!
//! Events are appended only by committed operations; a failed call leaves
//! the log exactly as it was.

use serde::{Deserialize, Serialize};

use crate::core::amount::{NativeAmount, ShareAmount, TokenAmount};
use crate::core::share::ShareClass;
use crate::utils::address::{Address, Hash};
use crate::utils::constants::MAX_RETAINED_EVENTS;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All protocol event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolEvent {
    // Orchestrator Events
    /// Scale factor compounded forward
    ScaleFactorUpdated(ScaleFactorUpdatedEvent),
    /// Shares exchanged along the invariant curve
    SharesExchanged(SharesExchangedEvent),

    // Share Events
    /// Base shares minted at genesis, transferred or burned
    ShareTransfer(ShareTransferEvent),

    // Token Events
    /// Scaled tokens transferred or burned
    TokenTransfer(TokenTransferEvent),

    // Auction Events
    /// Bid accepted
    AuctionBid(AuctionBidEvent),
    /// Displaced bid returned to its bidder
    BidRefunded(BidRefundedEvent),
    /// Auction settled
    AuctionSettled(AuctionSettledEvent),
    /// Next auction opened
    AuctionCreated(AuctionCreatedEvent),
}

impl ProtocolEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScaleFactorUpdated(_) => "ScaleFactorUpdated",
            Self::SharesExchanged(_) => "SharesExchanged",
            Self::ShareTransfer(_) => "ShareTransfer",
            Self::TokenTransfer(_) => "TokenTransfer",
            Self::AuctionBid(_) => "AuctionBid",
            Self::BidRefunded(_) => "BidRefunded",
            Self::AuctionSettled(_) => "AuctionSettled",
            Self::AuctionCreated(_) => "AuctionCreated",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::ScaleFactorUpdated(e) => e.timestamp,
            Self::SharesExchanged(e) => e.timestamp,
            Self::ShareTransfer(e) => e.timestamp,
            Self::TokenTransfer(e) => e.timestamp,
            Self::AuctionBid(e) => e.timestamp,
            Self::BidRefunded(e) => e.timestamp,
            Self::AuctionSettled(e) => e.timestamp,
            Self::AuctionCreated(e) => e.timestamp,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORCHESTRATOR EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when the scale factor is compounded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleFactorUpdatedEvent {
    /// Account whose call triggered the update
    pub caller: Address,
    /// New scale factor
    pub scale_factor: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted for every curve exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesExchangedEvent {
    /// Account debited
    pub payer: Address,
    /// Account credited
    pub recipient: Address,
    /// Class burned
    pub input: ShareClass,
    /// Class minted
    pub output: ShareClass,
    /// Shares burned
    pub amount_in: ShareAmount,
    /// Shares minted
    pub amount_out: ShareAmount,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARE EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when base shares move outside an exchange or a settlement;
/// `from` is zero for a genesis mint and `to` is zero for a burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTransferEvent {
    /// Share class
    pub class: ShareClass,
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Shares moved
    pub amount: ShareAmount,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when scaled tokens move; `to` is zero for a burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferEvent {
    /// Token class
    pub class: ShareClass,
    /// Sender
    pub from: Address,
    /// Recipient
    pub to: Address,
    /// Token amount requested
    pub amount: TokenAmount,
    /// Shares actually moved
    pub shares: ShareAmount,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a bid is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionBidEvent {
    /// Auction number
    pub number: u64,
    /// Invariant amount on offer
    pub invariant_amount: u128,
    /// Bidder
    pub bidder: Address,
    /// Bid amount
    pub amount: NativeAmount,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a displaced bid is refunded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRefundedEvent {
    /// Auction number
    pub number: u64,
    /// Displaced bidder
    pub bidder: Address,
    /// Refunded amount
    pub amount: NativeAmount,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when an auction is settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionSettledEvent {
    /// Auction number
    pub number: u64,
    /// Invariant amount that was on offer
    pub invariant_amount: u128,
    /// Winner, if anyone bid
    pub winner: Option<Address>,
    /// Winning bid
    pub bid_amount: NativeAmount,
    /// mShares minted to the winner
    pub m_minted: ShareAmount,
    /// bShares minted to the winner
    pub b_minted: ShareAmount,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when an auction opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionCreatedEvent {
    /// Auction number
    pub number: u64,
    /// Invariant amount on offer
    pub invariant_amount: u128,
    /// Start time
    pub start_time: u64,
    /// End time
    pub end_time: u64,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Ordered log of committed events, pruned to a bounded window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProtocolEvent>,
    /// Events ever recorded, including pruned ones
    total: u64,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event to the log
    pub fn push(&mut self, event: ProtocolEvent) {
        self.events.push(event);
        self.total += 1;

        if self.events.len() > MAX_RETAINED_EVENTS {
            self.events.drain(0..self.events.len() - MAX_RETAINED_EVENTS);
        }
    }

    /// Append another log's events to this one
    pub fn merge(&mut self, other: EventLog) {
        for event in other.events {
            self.push(event);
        }
    }

    /// Get all retained events
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Get the most recent `n` events
    pub fn recent(&self, n: usize) -> &[ProtocolEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&ProtocolEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get the number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of events ever recorded
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Last event, if any
    pub fn last(&self) -> Option<&ProtocolEvent> {
        self.events.last()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn bid_event(number: u64) -> ProtocolEvent {
        ProtocolEvent::AuctionBid(AuctionBidEvent {
            number,
            invariant_amount: 1,
            bidder: Address::from_label("alice"),
            amount: NativeAmount::from_units(1),
            timestamp: number * 10,
        })
    }

    #[test]
    fn test_event_types() {
        let event = bid_event(1);
        assert_eq!(event.event_type(), "AuctionBid");
        assert_eq!(event.timestamp(), 10);
    }

    #[test]
    fn test_event_hash_distinguishes_events() {
        assert_eq!(bid_event(1).hash(), bid_event(1).hash());
        assert_ne!(bid_event(1).hash(), bid_event(2).hash());
    }

    #[test]
    fn test_event_log_filter() {
        let mut log = EventLog::new();
        log.push(bid_event(1));
        log.push(ProtocolEvent::ScaleFactorUpdated(ScaleFactorUpdatedEvent {
            caller: Address::ZERO,
            scale_factor: 1,
            timestamp: 0,
        }));
        log.push(bid_event(2));

        assert_eq!(log.len(), 3);
        assert_eq!(log.filter_by_type("AuctionBid").len(), 2);
        assert_eq!(log.recent(1), &[bid_event(2)]);
    }

    #[test]
    fn test_event_log_pruning() {
        let mut log = EventLog::new();
        for i in 0..(MAX_RETAINED_EVENTS as u64 + 5) {
            log.push(bid_event(i));
        }
        assert_eq!(log.len(), MAX_RETAINED_EVENTS);
        assert_eq!(log.total(), MAX_RETAINED_EVENTS as u64 + 5);
        assert_eq!(log.events()[0], bid_event(5));
    }
}
