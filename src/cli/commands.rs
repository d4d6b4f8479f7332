//! CLI Commands.
//!
//! Every command operates on the protocol snapshot named by the CLI
//! configuration. Mutating commands write the snapshot back only when the
//! protocol accepted the operation.

use chrono::DateTime;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use super::output::{format_rate, format_scale_factor, format_timestamp};
use super::{CliApp, CliError, CliResult, CommandOutput, Executable};
use crate::core::amount::{format_units, NativeAmount, ShareAmount, TokenAmount};
use crate::core::config::ProtocolConfig;
use crate::core::share::{Asset, ShareClass};
use crate::error::Error;
use crate::protocol::exchange::TokenExchange;
use crate::protocol::orchestrator::ShareExchange;
use crate::protocol::simulation::{Simulation, SimulationConfig};
use crate::protocol::state::ProtocolState;
use crate::utils::address::Address;
use crate::utils::constants::DECIMALS;

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND ENUM
// ═══════════════════════════════════════════════════════════════════════════════

/// All available commands
#[derive(Debug, Clone)]
pub enum Command {
    /// Deploy a fresh protocol snapshot
    Init(InitCommand),
    /// Protocol overview
    Status(StatusCommand),
    /// Move the simulated clock
    Advance(AdvanceCommand),
    /// Credit native currency
    Fund(FundCommand),
    /// Account balances
    Balance(BalanceCommand),
    /// Bid on the current auction
    Bid(BidCommand),
    /// Settle the current auction
    Settle(SettleCommand),
    /// Exchange along the curve
    Exchange(ExchangeCommand),
    /// Transfer shares or tokens
    Transfer(TransferCommand),
    /// Burn shares or tokens
    Burn(BurnCommand),
    /// Recent events
    Events(EventsCommand),
    /// Seeded random workload
    Simulate(SimulateCommand),
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a decimal string such as `"1.5"` into an 18-decimal raw amount
pub fn parse_amount(input: &str) -> CliResult<u128> {
    let value = Decimal::from_str(input.trim())
        .map_err(|e| CliError::InvalidArgument(format!("amount {}: {}", input, e)))?
        .normalize();
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CliError::InvalidArgument(format!("amount {} is negative", input)));
    }
    let decimals = u32::from(DECIMALS);
    let scale = value.scale();
    if scale > decimals {
        return Err(CliError::InvalidArgument(format!(
            "amount {} has more than {} decimals",
            input, DECIMALS
        )));
    }
    let mantissa = value.mantissa().unsigned_abs();
    10u128
        .checked_pow(decimals - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| CliError::InvalidArgument(format!("amount {} is out of range", input)))
}

/// Parse a timestamp given as seconds or RFC 3339
pub fn parse_timestamp(input: &str) -> CliResult<u64> {
    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(seconds);
    }
    let parsed = DateTime::parse_from_rfc3339(input)
        .map_err(|e| CliError::InvalidArgument(format!("timestamp {}: {}", input, e)))?;
    u64::try_from(parsed.timestamp())
        .map_err(|_| CliError::InvalidArgument(format!("timestamp {} precedes the epoch", input)))
}

fn to_json<T: Serialize>(value: &T) -> CliResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| CliError::Protocol(Error::Serialization(e.to_string())))
}

/// Run a mutating operation against the snapshot and persist it on success
fn with_state<T, F>(app: &CliApp, op: F) -> CliResult<(ProtocolState, T)>
where
    F: FnOnce(&mut ProtocolState) -> crate::error::Result<T>,
{
    let mut state = app.load_state()?;
    let value = op(&mut state)?;
    app.save_state(&state)?;
    Ok((state, value))
}

// ═══════════════════════════════════════════════════════════════════════════════
// INIT / STATUS / CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Deploy a fresh snapshot
#[derive(Debug, Clone, Default)]
pub struct InitCommand {
    /// Overwrite an existing snapshot
    pub force: bool,
    /// Genesis holder, overriding the configuration
    pub holder: Option<String>,
    /// Genesis time, overriding the configuration
    pub time: Option<String>,
}

impl Executable for InitCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let path = &app.config().state_path;
        if path.exists() && !self.force {
            return Err(CliError::InvalidArgument(format!(
                "{} already exists; use --force to overwrite",
                path.display()
            )));
        }

        let mut config = match &app.config().protocol_config {
            Some(file) => ProtocolConfig::load(file)?,
            None => ProtocolConfig::from_env()?,
        };
        if let Some(holder) = &self.holder {
            config.genesis.holder = Address::parse(holder);
        }
        if let Some(time) = &self.time {
            config.genesis.time = parse_timestamp(time)?;
        }

        let state = ProtocolState::genesis(&config)?;
        app.save_state(&state)?;

        let data = serde_json::json!({
            "state_path": path.display().to_string(),
            "genesis_holder": config.genesis.holder.to_hex(),
            "m_supply": format_units(config.genesis.m_supply),
            "b_supply": format_units(config.genesis.b_supply),
            "genesis_time": format_timestamp(config.genesis.time),
            "state_hash": state.state_hash()?.to_hex(),
        });
        Ok(CommandOutput::success_with_data("Protocol deployed", data))
    }
}

/// Protocol overview
#[derive(Debug, Clone, Default)]
pub struct StatusCommand;

impl Executable for StatusCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let state = app.load_state()?;
        let status = state.status()?;
        let auction = &status.auction;
        let prize = state.prize_preview()?;

        let data = serde_json::json!({
            "protocol": crate::PROTOCOL_NAME,
            "version": crate::VERSION,
            "time": format_timestamp(status.now),
            "interest_rate": format_rate(status.interest_rate),
            "scale_factor": format_scale_factor(status.scale_factor),
            "supply": {
                "mShare": status.m_share_supply.to_string(),
                "bShare": status.b_share_supply.to_string(),
                "mToken": status.m_token_supply.to_string(),
                "bToken": status.b_token_supply.to_string(),
            },
            "invariant": format_units(status.invariant),
            "auction": {
                "number": auction.number(),
                "status": if status.auction_open { "open" } else { "ended" },
                "invariant_amount": format_units(auction.invariant_amount()),
                "ends": format_timestamp(auction.end_time()),
                "bid": auction.bid_amount().to_string(),
                "bidder": auction.bidder().map(|b| b.to_hex()),
                "prize_mToken": prize.m_tokens.to_string(),
                "prize_bToken": prize.b_tokens.to_string(),
            },
            "events_recorded": status.events_recorded,
            "state_hash": status.state_hash.to_hex(),
        });
        Ok(CommandOutput::success_with_data("Protocol status", data))
    }
}

/// Move the simulated clock
#[derive(Debug, Clone, Default)]
pub struct AdvanceCommand {
    /// Seconds to add
    pub seconds: Option<u64>,
    /// Absolute time, as seconds or RFC 3339
    pub to: Option<String>,
    /// Compound the scale factor afterwards on behalf of this account
    pub update_by: Option<String>,
}

impl Executable for AdvanceCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let target = self.to.as_deref().map(parse_timestamp).transpose()?;
        let seconds = self.seconds;
        let caller = self.update_by.as_deref().map(Address::parse);

        let (state, _) = with_state(app, |state| {
            match (seconds, target) {
                (Some(s), None) => {
                    state.advance_time(s)?;
                }
                (None, Some(t)) => state.set_time(t)?,
                _ => {
                    return Err(Error::InvalidParameter {
                        name: "advance".into(),
                        reason: "give exactly one of --seconds or --to".into(),
                    })
                }
            }
            if let Some(caller) = caller {
                state.update_scale_factor(caller)?;
            }
            Ok(())
        })?;

        let data = serde_json::json!({
            "time": format_timestamp(state.now()),
            "scale_factor": format_scale_factor(state.projected_scale_factor()?),
            "auction_open": state.auction().is_open(state.now()),
        });
        Ok(CommandOutput::success_with_data("Clock advanced", data))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Credit native currency
#[derive(Debug, Clone)]
pub struct FundCommand {
    /// Account to credit
    pub account: String,
    /// Decimal amount
    pub amount: String,
}

impl Executable for FundCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let account = Address::parse(&self.account);
        let amount = NativeAmount::new(parse_amount(&self.amount)?);
        let (state, _) = with_state(app, |state| state.fund(account, amount))?;

        Ok(CommandOutput::success(format!(
            "Funded {} with {} (balance {})",
            account.short(),
            amount,
            state.native_balance(&account)
        )))
    }
}

/// Account balances
#[derive(Debug, Clone)]
pub struct BalanceCommand {
    /// Account to inspect
    pub account: String,
}

impl Executable for BalanceCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let state = app.load_state()?;
        let account = Address::parse(&self.account);

        let data = serde_json::json!({
            "address": account.to_hex(),
            "mShare": state.share_balance(ShareClass::M, &account).to_string(),
            "bShare": state.share_balance(ShareClass::B, &account).to_string(),
            "mToken": state.token(ShareClass::M).balance_of(&account)?.to_string(),
            "bToken": state.token(ShareClass::B).balance_of(&account)?.to_string(),
            "native": state.native_balance(&account).to_string(),
        });
        Ok(CommandOutput::success_with_data(format!("Balances of {}", account.short()), data))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUCTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Bid on the current auction
#[derive(Debug, Clone)]
pub struct BidCommand {
    /// Bidder
    pub bidder: String,
    /// Decimal amount
    pub amount: String,
}

impl Executable for BidCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let bidder = Address::parse(&self.bidder);
        let amount = NativeAmount::new(parse_amount(&self.amount)?);
        let (state, _) = with_state(app, |state| state.bid(bidder, amount))?;

        let auction = state.auction();
        let minimum = auction.minimum_bid(state.params().min_bid_increment_percentage)?;
        let data = serde_json::json!({
            "auction": auction.number(),
            "bid": amount.to_string(),
            "next_minimum_bid": minimum.to_string(),
            "ends": format_timestamp(auction.end_time()),
        });
        Ok(CommandOutput::success_with_data(
            format!("Bid of {} placed by {}", amount, bidder.short()),
            data,
        ))
    }
}

/// Settle the ended auction and open the next
#[derive(Debug, Clone)]
pub struct SettleCommand {
    /// Caller
    pub caller: String,
}

impl Executable for SettleCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let caller = Address::parse(&self.caller);
        let (_, settlement) =
            with_state(app, |state| state.settle_current_and_create_new_auction(caller))?;

        let message = match settlement.winner {
            Some(winner) => format!("Auction {} won by {}", settlement.number, winner.short()),
            None => format!("Auction {} closed without bids", settlement.number),
        };
        let mut output = CommandOutput::success_with_data(message, to_json(&settlement)?);
        if settlement.winner.is_none() {
            output = output.with_warning(format!(
                "issuance rolled into auction {}",
                settlement.next.number()
            ));
        }
        Ok(output)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXCHANGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Which side of the trade is fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeMode {
    /// Fixed input, bounded minimum output
    ExactIn,
    /// Fixed output, bounded maximum input
    ExactOut,
}

/// Exchange along the curve
#[derive(Debug, Clone)]
pub struct ExchangeCommand {
    /// Payer
    pub payer: String,
    /// Asset given
    pub input: Asset,
    /// Asset received
    pub output: Asset,
    /// Fixed amount, interpreted per `mode`
    pub amount: String,
    /// Exact input or exact output
    pub mode: ExchangeMode,
    /// Slippage bound: minimum output or maximum input
    pub limit: Option<String>,
    /// Recipient; defaults to the payer
    pub recipient: Option<String>,
    /// Deadline; defaults to the current simulated time
    pub deadline: Option<String>,
}

impl Executable for ExchangeCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let payer = Address::parse(&self.payer);
        let recipient = self.recipient.as_deref().map(Address::parse).unwrap_or(payer);
        let amount = parse_amount(&self.amount)?;
        let limit = self.limit.as_deref().map(parse_amount).transpose()?;
        let deadline = self.deadline.as_deref().map(parse_timestamp).transpose()?;
        let (input, output, mode) = (self.input, self.output, self.mode);

        let (_, data) = with_state(app, |state| {
            let deadline = deadline.unwrap_or_else(|| state.now());
            let data = match (input.is_token(), mode) {
                (false, ExchangeMode::ExactIn) => {
                    share_exchange_json(&state.exchange_exact_shares_for_shares(
                        payer,
                        input,
                        output,
                        ShareAmount::new(amount),
                        ShareAmount::new(limit.unwrap_or(0)),
                        recipient,
                        deadline,
                    )?)
                }
                (false, ExchangeMode::ExactOut) => {
                    share_exchange_json(&state.exchange_shares_for_exact_shares(
                        payer,
                        input,
                        output,
                        ShareAmount::new(amount),
                        ShareAmount::new(limit.unwrap_or(u128::MAX)),
                        recipient,
                        deadline,
                    )?)
                }
                (true, ExchangeMode::ExactIn) => {
                    token_exchange_json(&state.exchange_exact_tokens_for_tokens(
                        payer,
                        input,
                        output,
                        TokenAmount::new(amount),
                        TokenAmount::new(limit.unwrap_or(0)),
                        recipient,
                        deadline,
                    )?)
                }
                (true, ExchangeMode::ExactOut) => {
                    token_exchange_json(&state.exchange_tokens_for_exact_tokens(
                        payer,
                        input,
                        output,
                        TokenAmount::new(amount),
                        TokenAmount::new(limit.unwrap_or(u128::MAX)),
                        recipient,
                        deadline,
                    )?)
                }
            };
            Ok(data)
        })?;

        Ok(CommandOutput::success_with_data(
            format!("Exchanged {} for {}", input, output),
            data,
        ))
    }
}

fn share_exchange_json(exchange: &ShareExchange) -> serde_json::Value {
    serde_json::json!({
        "input": exchange.input.share_symbol(),
        "output": exchange.output.share_symbol(),
        "amount_in": exchange.amount_in.to_string(),
        "amount_out": exchange.amount_out.to_string(),
    })
}

fn token_exchange_json(exchange: &TokenExchange) -> serde_json::Value {
    serde_json::json!({
        "input": exchange.shares.input.token_symbol(),
        "output": exchange.shares.output.token_symbol(),
        "amount_in": exchange.amount_in.to_string(),
        "amount_out": exchange.amount_out.to_string(),
        "shares": share_exchange_json(&exchange.shares),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFER / BURN
// ═══════════════════════════════════════════════════════════════════════════════

/// Transfer shares or tokens
#[derive(Debug, Clone)]
pub struct TransferCommand {
    /// Asset moved
    pub asset: Asset,
    /// Sender
    pub from: String,
    /// Recipient
    pub to: String,
    /// Decimal amount
    pub amount: String,
}

impl Executable for TransferCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let from = Address::parse(&self.from);
        let to = Address::parse(&self.to);
        let raw = parse_amount(&self.amount)?;
        let asset = self.asset;

        let (_, shares) = with_state(app, |state| match asset {
            Asset::Token(class) => state.transfer_tokens(class, from, to, TokenAmount::new(raw)),
            Asset::Share(class) => state
                .transfer_shares(class, from, to, ShareAmount::new(raw))
                .map(|_| ShareAmount::new(raw)),
        })?;

        Ok(CommandOutput::success(format!(
            "Transferred {} {} from {} to {} ({} shares)",
            format_units(raw),
            asset,
            from.short(),
            to.short(),
            shares
        )))
    }
}

/// Burn shares or tokens
#[derive(Debug, Clone)]
pub struct BurnCommand {
    /// Asset burned
    pub asset: Asset,
    /// Holder
    pub from: String,
    /// Decimal amount
    pub amount: String,
}

impl Executable for BurnCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let from = Address::parse(&self.from);
        let raw = parse_amount(&self.amount)?;
        let asset = self.asset;

        let (_, shares) = with_state(app, |state| match asset {
            Asset::Token(class) => state.burn_tokens(class, from, TokenAmount::new(raw)),
            Asset::Share(class) => state
                .burn_shares(class, from, ShareAmount::new(raw))
                .map(|_| ShareAmount::new(raw)),
        })?;

        Ok(CommandOutput::success(format!(
            "Burned {} {} held by {} ({} shares)",
            format_units(raw),
            asset,
            from.short(),
            shares
        )))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Recent events
#[derive(Debug, Clone)]
pub struct EventsCommand {
    /// Maximum events shown
    pub limit: usize,
    /// Only this event type
    pub event_type: Option<String>,
}

impl Executable for EventsCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let state = app.load_state()?;
        let log = state.events();

        let selected: Vec<_> = match &self.event_type {
            Some(kind) => {
                let matching = log.filter_by_type(kind);
                let start = matching.len().saturating_sub(self.limit);
                matching[start..].to_vec()
            }
            None => log.recent(self.limit).iter().collect(),
        };

        let rows: Vec<serde_json::Value> = selected
            .iter()
            .map(|event| -> CliResult<serde_json::Value> {
                Ok(serde_json::json!({
                    "type": event.event_type(),
                    "time": format_timestamp(event.timestamp()),
                    "hash": event.hash().to_hex(),
                    "event": to_json(event)?,
                }))
            })
            .collect::<CliResult<_>>()?;

        let data = serde_json::json!({
            "shown": rows.len(),
            "retained": log.len(),
            "total": log.total(),
            "events": rows,
        });
        Ok(CommandOutput::success_with_data("Events", data))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Seeded random workload over the snapshot
#[derive(Debug, Clone)]
pub struct SimulateCommand {
    /// RNG seed
    pub seed: u64,
    /// Operations to attempt
    pub steps: u64,
    /// Synthetic traders
    pub traders: usize,
    /// Persist the resulting state
    pub write: bool,
}

impl Executable for SimulateCommand {
    fn execute(&self, app: &CliApp) -> CliResult<CommandOutput> {
        let mut state = app.load_state()?;
        let config = SimulationConfig {
            seed: self.seed,
            steps: self.steps,
            traders: self.traders,
            ..SimulationConfig::default()
        };
        let mut simulation = Simulation::new(config)?;

        let progress = if app.output().format().is_json() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(self.steps)
        };
        let template = "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            progress.set_style(style.progress_chars("█░"));
        }
        progress.set_message("simulating");

        let report = simulation.run(&mut state, |step| progress.set_position(step));
        progress.finish_and_clear();
        let report = report?;

        if self.write {
            app.save_state(&state)?;
        }

        let mut output = CommandOutput::success_with_data(
            format!("Simulated {} steps with seed {}", report.steps, report.seed),
            to_json(&report)?,
        );
        if !self.write {
            output = output.with_warning("state not written; pass --write to keep it");
        }
        if report.invariant_increases > 0 {
            output = output.with_warning(format!(
                "{} exchanges raised the invariant",
                report.invariant_increases
            ));
        }
        Ok(output)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
