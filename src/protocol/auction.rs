//! Auction house.
//!
//! Back-to-back timed auctions sell newly issued invariant for native
//! currency. Issuance halves every `auctions_per_halving` auctions, and an
//! auction that attracts no bid rolls its issuance into the next one.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::amount::{NativeAmount, ShareAmount, TokenAmount};
use crate::core::config::ProtocolParams;
use crate::core::share::ShareClass;
use crate::error::{Error, Result};
use crate::protocol::events::{
    AuctionBidEvent, AuctionSettledEvent, BidRefundedEvent, ProtocolEvent,
};
use crate::protocol::scaled::shares_to_tokens;
use crate::protocol::state::ProtocolState;
use crate::utils::address::{system, Address};
use crate::utils::math::{mul_div, safe_add};

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Lifecycle of the current auction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Accepting bids
    Open,
    /// Past its end time, waiting to be settled
    Ended,
}

/// The auction currently on offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    number: u64,
    start_time: u64,
    duration: u64,
    bid_amount: NativeAmount,
    bidder: Option<Address>,
    invariant_amount: u128,
}

impl Auction {
    /// Open a new auction with no bid
    pub fn open(number: u64, start_time: u64, duration: u64, invariant_amount: u128) -> Self {
        Self {
            number,
            start_time,
            duration,
            bid_amount: NativeAmount::ZERO,
            bidder: None,
            invariant_amount,
        }
    }

    /// Auction number, starting at 1
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Start time
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Duration in seconds
    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// End time; bids are accepted strictly before it
    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }

    /// Standing bid
    pub fn bid_amount(&self) -> NativeAmount {
        self.bid_amount
    }

    /// Standing bidder
    pub fn bidder(&self) -> Option<Address> {
        self.bidder
    }

    /// Invariant on offer
    pub fn invariant_amount(&self) -> u128 {
        self.invariant_amount
    }

    /// Whether bids are accepted at `now`
    pub fn is_open(&self, now: u64) -> bool {
        now < self.end_time()
    }

    /// Lifecycle status at `now`
    pub fn status(&self, now: u64) -> AuctionStatus {
        if self.is_open(now) {
            AuctionStatus::Open
        } else {
            AuctionStatus::Ended
        }
    }

    /// Smallest bid that would be accepted
    pub fn minimum_bid(&self, increment_percentage: u128) -> Result<NativeAmount> {
        if self.bidder.is_none() {
            return Ok(NativeAmount::new(1));
        }
        let prior = self.bid_amount.raw();
        let raised = safe_add(prior, mul_div(prior, increment_percentage, 100)?)?;
        Ok(NativeAmount::new(raised.max(safe_add(prior, 1)?)))
    }
}

/// Invariant issued by auction `number`: halves every `auctions_per_halving`
pub fn invariant_issuance(params: &ProtocolParams, number: u64) -> u128 {
    let halvings = number / params.auctions_per_halving;
    if halvings >= 128 {
        return 0;
    }
    params.initial_issuance >> halvings
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Shares and tokens the current auction would mint to a winner right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    /// mShares minted
    pub m_shares: ShareAmount,
    /// bShares minted
    pub b_shares: ShareAmount,
    /// mToken value of the mShares
    pub m_tokens: TokenAmount,
    /// bToken value of the bShares
    pub b_tokens: TokenAmount,
}

/// Outcome of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Settled auction number
    pub number: u64,
    /// Winner, if anyone bid
    pub winner: Option<Address>,
    /// Winning bid
    pub bid_amount: NativeAmount,
    /// mShares minted to the winner
    pub m_minted: ShareAmount,
    /// bShares minted to the winner
    pub b_minted: ShareAmount,
    /// The auction opened by the settlement
    pub next: Auction,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

impl ProtocolState {
    /// The auction currently on offer
    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    /// Invariant issued by auction `number` under this deployment's schedule
    pub fn invariant_issuance(&self, number: u64) -> u128 {
        invariant_issuance(&self.params, number)
    }

    /// Shares minted per class when `invariant_amount` is issued against current supplies.
    ///
    /// `None` once both supplies have been burned away.
    fn issuance_shares(
        &self,
        invariant_amount: u128,
    ) -> Result<Option<(ShareAmount, ShareAmount)>> {
        let current = self.shares.invariant()?;
        if current == 0 {
            return Ok(None);
        }
        let mint = |class| {
            let supply = self.shares.supply(class).raw();
            mul_div(supply, invariant_amount, current).map(ShareAmount::new)
        };
        Ok(Some((mint(ShareClass::M)?, mint(ShareClass::B)?)))
    }

    /// What the current auction would pay out if settled now
    pub fn prize_preview(&self) -> Result<Prize> {
        let (m_shares, b_shares) = self
            .issuance_shares(self.auction.invariant_amount)?
            .unwrap_or((ShareAmount::ZERO, ShareAmount::ZERO));
        let scale_factor = self.projected_scale_factor()?;
        Ok(Prize {
            m_shares,
            b_shares,
            m_tokens: shares_to_tokens(m_shares, scale_factor)?,
            b_tokens: shares_to_tokens(b_shares, scale_factor)?,
        })
    }

    fn refund(&mut self, number: u64, bidder: Address, amount: NativeAmount) -> Result<()> {
        self.native
            .transfer(system::auction_house(), bidder, amount)
            .map_err(|e| {
                warn!(number, bidder = %bidder.short(), error = %e, "refund rejected");
                Error::RefundFailed {
                    recipient: bidder.to_hex(),
                    amount: amount.raw(),
                }
            })?;
        self.emit(ProtocolEvent::BidRefunded(BidRefundedEvent {
            number,
            bidder,
            amount,
            timestamp: self.now,
        }));
        Ok(())
    }

    /// Place a bid, escrowing `amount` and refunding the displaced bidder
    pub fn bid(&mut self, bidder: Address, amount: NativeAmount) -> Result<()> {
        self.transact("bid", |state| state.bid_inner(bidder, amount))
    }

    fn bid_inner(&mut self, bidder: Address, amount: NativeAmount) -> Result<()> {
        self.refresh_scale_factor(bidder)?;

        let number = self.auction.number;
        if !self.auction.is_open(self.now) {
            return Err(Error::AuctionEnded { number });
        }
        if self.shares.invariant()? == 0 {
            return Err(Error::NoSharesOutstanding { number });
        }
        let minimum = self
            .auction
            .minimum_bid(self.params.min_bid_increment_percentage)?;
        if amount < minimum {
            return Err(Error::InsufficientBid {
                offered: amount.raw(),
                minimum: minimum.raw(),
            });
        }

        let escrow = system::auction_house();
        self.native.transfer(bidder, escrow, amount)?;

        // The standing bid is replaced before the refund goes out.
        let displaced = self.auction.bidder.map(|prior| (prior, self.auction.bid_amount));
        self.auction.bid_amount = amount;
        self.auction.bidder = Some(bidder);
        self.emit(ProtocolEvent::AuctionBid(AuctionBidEvent {
            number,
            invariant_amount: self.auction.invariant_amount,
            bidder,
            amount,
            timestamp: self.now,
        }));

        if let Some((prior, refund)) = displaced {
            self.refund(number, prior, refund)?;
        }

        info!(number, bidder = %bidder.short(), amount = %amount, "bid accepted");
        Ok(())
    }

    /// Settle the ended auction and open the next one
    pub fn settle_current_and_create_new_auction(&mut self, caller: Address) -> Result<Settlement> {
        self.transact("settle", |state| state.settle_inner(caller))
    }

    fn settle_inner(&mut self, caller: Address) -> Result<Settlement> {
        let ended = self.auction.clone();
        if ended.is_open(self.now) {
            return Err(Error::AuctionNotEnded {
                number: ended.number,
                end_time: ended.end_time(),
                now: self.now,
            });
        }

        self.refresh_scale_factor(caller)?;

        let next_number = ended.number.checked_add(1).ok_or(Error::Overflow {
            operation: "auction number".into(),
        })?;
        let next_issuance = self.invariant_issuance(next_number);

        let prize = match ended.bidder {
            Some(_) => self.issuance_shares(ended.invariant_amount)?,
            None => None,
        };
        let (winner, bid_amount, m_minted, b_minted, next_amount) = match (ended.bidder, prize) {
            (Some(winner), Some((m, b))) => {
                for (class, amount) in [(ShareClass::M, m), (ShareClass::B, b)] {
                    let capability = self.orchestrator.capability(class);
                    self.shares.ledger_mut(class).mint(capability, winner, amount)?;
                }
                (Some(winner), ended.bid_amount, m, b, next_issuance)
            }
            (bidder, _) => {
                // Nothing to mint against: the bid goes back and the issuance rolls forward
                if let Some(bidder) = bidder {
                    warn!(number = ended.number, bidder = %bidder.short(), "no shares outstanding");
                    self.refund(ended.number, bidder, ended.bid_amount)?;
                }
                (
                    None,
                    NativeAmount::ZERO,
                    ShareAmount::ZERO,
                    ShareAmount::ZERO,
                    safe_add(ended.invariant_amount, next_issuance)?,
                )
            }
        };

        self.emit(ProtocolEvent::AuctionSettled(AuctionSettledEvent {
            number: ended.number,
            invariant_amount: ended.invariant_amount,
            winner,
            bid_amount,
            m_minted,
            b_minted,
            timestamp: self.now,
        }));

        let duration = self.params.auction_duration;
        self.auction = Auction::open(next_number, self.now, duration, next_amount);
        self.emit_auction_created();

        info!(
            number = ended.number,
            winner = ?winner.map(|w| w.short()),
            bid = %bid_amount,
            m_minted = %m_minted,
            b_minted = %b_minted,
            next_invariant_amount = next_amount,
            "auction settled"
        );

        Ok(Settlement {
            number: ended.number,
            winner,
            bid_amount,
            m_minted,
            b_minted,
            next: self.auction.clone(),
        })
    }
}
