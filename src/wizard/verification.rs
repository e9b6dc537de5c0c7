//! Verification lifecycles for the two identity proofs. Each proof is an
//! explicit finite-state machine so the remediation rules (fresh challenge
//! after a wrong guess, reset on an edited tax ID) are enforced transitions
//! rather than incidental behavior.

use std::sync::Arc;

use tracing::{debug, info};

use super::api::{ChallengePuzzle, ChallengeService, GatewayError, IdentityLookup};
use super::validators;

/// Errors surfaced to the wizard from either verifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VerificationError {
    #[error("verification already completed for this session")]
    AlreadyVerified,
    #[error("a verification call is already in flight")]
    Busy,
    #[error("no active challenge; request one first")]
    NoActiveChallenge,
    #[error("challenge code did not match; a new challenge has been issued")]
    WrongGuess,
    #[error("tax id is incomplete; expected five letters, four digits, one letter")]
    IncompleteTaxId,
    #[error("name does not match records; registered holder is {registered}")]
    NameMismatch { registered: String },
    #[error("verification service unavailable: {0}")]
    Transport(String),
}

/// Challenge-code proof lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeState {
    Unrequested,
    Pending,
    Ready(ChallengePuzzle),
    Checking,
    Verified,
    Rejected,
}

/// Drives the challenge proof against a [`ChallengeService`].
pub struct ChallengeVerifier<C> {
    service: Arc<C>,
    state: ChallengeState,
}

impl<C> std::fmt::Debug for ChallengeVerifier<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeVerifier")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<C: ChallengeService> ChallengeVerifier<C> {
    pub fn new(service: Arc<C>) -> Self {
        Self {
            service,
            state: ChallengeState::Unrequested,
        }
    }

    pub fn state(&self) -> &ChallengeState {
        &self.state
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, ChallengeState::Verified)
    }

    /// Current puzzle awaiting a guess, if one is held.
    pub fn puzzle(&self) -> Option<&ChallengePuzzle> {
        match &self.state {
            ChallengeState::Ready(puzzle) => Some(puzzle),
            _ => None,
        }
    }

    /// Fetch a fresh puzzle. A transport failure keeps the verifier in
    /// `Pending` so the caller can retry manually.
    pub fn request(&mut self) -> Result<&ChallengePuzzle, VerificationError> {
        match self.state {
            ChallengeState::Verified => return Err(VerificationError::AlreadyVerified),
            ChallengeState::Checking => return Err(VerificationError::Busy),
            _ => {}
        }

        self.state = ChallengeState::Pending;
        match self.service.generate() {
            Ok(puzzle) => {
                debug!(challenge_id = %puzzle.id, "challenge issued");
                self.state = ChallengeState::Ready(puzzle);
                match &self.state {
                    ChallengeState::Ready(puzzle) => Ok(puzzle),
                    _ => unreachable!("state was just set to Ready"),
                }
            }
            Err(err) => Err(VerificationError::Transport(err.to_string())),
        }
    }

    /// Submit a guess for the held puzzle. The guess is uppercased before it
    /// is sent; comparison upstream is case-insensitive. A wrong guess
    /// invalidates the puzzle and a replacement is requested automatically.
    pub fn submit_guess(&mut self, guess: &str) -> Result<(), VerificationError> {
        let puzzle = match std::mem::replace(&mut self.state, ChallengeState::Checking) {
            ChallengeState::Ready(puzzle) => puzzle,
            other => {
                let restore_err = match other {
                    ChallengeState::Verified => VerificationError::AlreadyVerified,
                    ChallengeState::Checking => VerificationError::Busy,
                    _ => VerificationError::NoActiveChallenge,
                };
                self.state = other;
                return Err(restore_err);
            }
        };

        let normalized = guess.trim().to_ascii_uppercase();
        match self.service.check(&puzzle.id, &normalized) {
            Ok(true) => {
                info!(challenge_id = %puzzle.id, "challenge verified");
                self.state = ChallengeState::Verified;
                Ok(())
            }
            Ok(false) => {
                self.state = ChallengeState::Rejected;
                // A failed guess invalidates the puzzle; re-issue before the
                // next attempt is allowed.
                match self.service.generate() {
                    Ok(replacement) => {
                        debug!(challenge_id = %replacement.id, "replacement challenge issued");
                        self.state = ChallengeState::Ready(replacement);
                    }
                    Err(err) => {
                        debug!(error = %err, "replacement challenge fetch failed");
                        self.state = ChallengeState::Pending;
                    }
                }
                Err(VerificationError::WrongGuess)
            }
            Err(err) => {
                // The guess was never adjudicated; the held puzzle stays valid.
                self.state = ChallengeState::Ready(puzzle);
                Err(VerificationError::Transport(err.to_string()))
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = ChallengeState::Unrequested;
    }
}

/// Tax-ID proof lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxIdState {
    Unverified,
    Checking,
    Verified { holder: Option<String> },
    Rejected { reason: String },
}

/// Drives the tax-ID proof against an [`IdentityLookup`].
pub struct TaxIdVerifier<L> {
    lookup: Arc<L>,
    state: TaxIdState,
}

impl<L> std::fmt::Debug for TaxIdVerifier<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxIdVerifier")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<L: IdentityLookup> TaxIdVerifier<L> {
    pub fn new(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            state: TaxIdState::Unverified,
        }
    }

    pub fn state(&self) -> &TaxIdState {
        &self.state
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, TaxIdState::Verified { .. })
    }

    /// Drop any prior outcome. Called whenever the identifier is edited; a
    /// stale verification must never survive a changed tax ID.
    pub fn reset(&mut self) {
        self.state = TaxIdState::Unverified;
    }

    /// Look up the identifier and cross-check the registered holder against
    /// the optionally supplied name (case-insensitive, whitespace-normalized).
    /// No supplied name, or a service that cannot name a holder, passes
    /// leniently.
    pub fn verify(
        &mut self,
        tax_id: &str,
        supplied_name: Option<&str>,
    ) -> Result<(), VerificationError> {
        if matches!(self.state, TaxIdState::Checking) {
            return Err(VerificationError::Busy);
        }
        if self.is_verified() {
            return Ok(());
        }
        if !validators::tax_id(tax_id).complete {
            return Err(VerificationError::IncompleteTaxId);
        }

        self.state = TaxIdState::Checking;
        let record = match self.lookup.resolve(tax_id) {
            Ok(record) => record,
            Err(GatewayError::Declined(reason)) | Err(GatewayError::Transport(reason)) => {
                self.state = TaxIdState::Rejected {
                    reason: reason.clone(),
                };
                return Err(VerificationError::Transport(reason));
            }
        };

        let registered = record.holder_name.filter(|name| !name.trim().is_empty());
        let supplied = supplied_name.map(str::trim).filter(|name| !name.is_empty());

        match (registered, supplied) {
            (Some(registered), Some(supplied)) => {
                if names_match(&registered, supplied) {
                    info!("tax id verified with holder cross-check");
                    self.state = TaxIdState::Verified {
                        holder: Some(registered),
                    };
                    Ok(())
                } else {
                    let reason = format!("name does not match; registered holder is {registered}");
                    self.state = TaxIdState::Rejected { reason };
                    Err(VerificationError::NameMismatch { registered })
                }
            }
            (registered, _) => {
                // Lenient path: nothing to cross-check against.
                info!("tax id verified without holder cross-check");
                self.state = TaxIdState::Verified { holder: registered };
                Ok(())
            }
        }
    }
}

fn names_match(registered: &str, supplied: &str) -> bool {
    normalize_name(registered) == normalize_name(supplied)
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
