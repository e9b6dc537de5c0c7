//! The wizard orchestrator: owns the canonical snapshot, enforces step
//! gating, routes field edits through the validators, drives both
//! verification lifecycles, and feeds the sync engine and draft store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::api::{
    ChallengePuzzle, ChallengeService, IdentityLookup, RecordStore, SubmissionGateway,
};
use super::domain::{
    ApplicationSnapshot, ApplicationSummary, FieldKey, LoanCategory, Ternary, WizardStep,
};
use super::persistence::DraftStore;
use super::sync::SyncEngine;
use super::validators::{self, ValidationError};
use super::verification::{ChallengeVerifier, TaxIdVerifier, VerificationError};

/// Errors surfaced by wizard operations. None of these are fatal; every
/// variant has a retry or remediation path.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("{field} is not collected on the {step} step", field = .0.label(), step = .1.label())]
    FieldNotOnStep(FieldKey, WizardStep),
    #[error("{0} is not a valid loan category")]
    UnknownCategory(String),
    #[error("{0} is not a yes/no answer")]
    UnknownAnswer(String),
    #[error("cannot continue: {0}")]
    GateUnmet(&'static str),
    #[error("already at the first step")]
    AtFirstStep,
    #[error("step {requested} has not been reached yet", requested = .0.number())]
    StepNotReached(WizardStep),
    #[error("submission is only available from the final step")]
    NotAtFinalStep,
    #[error("the application has already been submitted")]
    AlreadySubmitted,
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
}

/// Gated four-step loan-application wizard.
///
/// All mutation goes through `&mut self` methods, so edits, verification
/// outcomes, and sync write-backs are serialized by construction.
pub struct LoanWizard<C, L, R, S, D> {
    snapshot: ApplicationSnapshot,
    challenge: ChallengeVerifier<C>,
    tax_id: TaxIdVerifier<L>,
    sync: SyncEngine<R>,
    submission: Arc<S>,
    draft: D,
    submitted: Option<ApplicationSummary>,
}

impl<C, L, R, S, D> std::fmt::Debug for LoanWizard<C, L, R, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoanWizard")
            .field("step", &self.snapshot.current_step)
            .field("submitted", &self.submitted.is_some())
            .finish_non_exhaustive()
    }
}

impl<C, L, R, S, D> LoanWizard<C, L, R, S, D>
where
    C: ChallengeService,
    L: IdentityLookup,
    R: RecordStore,
    S: SubmissionGateway,
    D: DraftStore,
{
    /// Build a wizard, resuming from the local draft when one is present.
    pub fn new(
        challenge_service: Arc<C>,
        identity_lookup: Arc<L>,
        record_store: Arc<R>,
        submission: Arc<S>,
        draft: D,
        sync_debounce: Duration,
    ) -> Self {
        let snapshot = match draft.load() {
            Some(saved) => {
                info!(step = saved.current_step.number(), "resuming saved draft");
                saved
            }
            None => ApplicationSnapshot::default(),
        };

        Self {
            snapshot,
            challenge: ChallengeVerifier::new(challenge_service),
            tax_id: TaxIdVerifier::new(identity_lookup),
            sync: SyncEngine::new(record_store, sync_debounce),
            submission,
            draft,
            submitted: None,
        }
    }

    pub fn snapshot(&self) -> &ApplicationSnapshot {
        &self.snapshot
    }

    pub fn current_step(&self) -> WizardStep {
        self.snapshot.current_step
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_some()
    }

    /// Read-only summary left behind by a successful submission.
    pub fn summary(&self) -> Option<&ApplicationSummary> {
        self.submitted.as_ref()
    }

    /// Current challenge puzzle awaiting a guess, if any.
    pub fn challenge_puzzle(&self) -> Option<&ChallengePuzzle> {
        self.challenge.puzzle()
    }

    /// Apply one raw field edit. The field must belong to the current step;
    /// the matching validator normalizes the input before it is merged.
    /// Every accepted edit is persisted locally and schedules a debounced sync.
    pub fn update_field(
        &mut self,
        key: FieldKey,
        raw: &str,
        now: Instant,
    ) -> Result<(), WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        if key.step() != self.snapshot.current_step {
            return Err(WizardError::FieldNotOnStep(key, self.snapshot.current_step));
        }

        match key {
            FieldKey::PhoneNumber => {
                self.snapshot.phone_number = validators::phone(raw).normalized;
            }
            FieldKey::PostalCode => {
                self.snapshot.postal_code = validators::postal_code(raw)?.normalized;
            }
            FieldKey::TaxId => {
                let normalized = validators::tax_id(raw).normalized;
                if normalized != self.snapshot.tax_id {
                    // An edited identifier invalidates any earlier outcome.
                    self.tax_id.reset();
                    self.snapshot.tax_id_verified = false;
                }
                self.snapshot.tax_id = normalized;
            }
            FieldKey::HolderName => {
                self.snapshot.holder_name = validators::free_text(raw).normalized;
            }
            FieldKey::LoanCategory => {
                self.snapshot.loan_category = LoanCategory::parse(raw)
                    .ok_or_else(|| WizardError::UnknownCategory(raw.to_string()))?;
            }
            FieldKey::AnnualIncome => {
                self.snapshot.annual_income = validators::amount(raw).normalized;
            }
            FieldKey::RequestedAmount => {
                self.snapshot.requested_amount = validators::amount(raw).normalized;
            }
            FieldKey::HasRetirementFund => {
                self.snapshot.has_retirement_fund = Self::parse_answer(raw)?;
            }
            FieldKey::JobTitle => {
                self.snapshot.job_title = validators::free_text(raw).normalized;
            }
            FieldKey::HasTaxRegistration => {
                self.snapshot.has_tax_registration = Self::parse_answer(raw)?;
            }
            FieldKey::HasBusinessProof => {
                self.snapshot.has_business_proof = Self::parse_answer(raw)?;
            }
        }

        self.save_draft();
        self.sync.schedule(&self.snapshot, now);
        Ok(())
    }

    fn parse_answer(raw: &str) -> Result<Ternary, WizardError> {
        Ternary::parse(raw).ok_or_else(|| WizardError::UnknownAnswer(raw.to_string()))
    }

    /// Fetch a challenge puzzle for the contact step.
    pub fn request_challenge(&mut self) -> Result<ChallengePuzzle, WizardError> {
        let puzzle = self.challenge.request()?;
        Ok(puzzle.clone())
    }

    /// Submit a guess for the held challenge. Success marks the proof for the
    /// rest of the session; a wrong guess re-issues the puzzle automatically.
    pub fn submit_challenge_guess(&mut self, guess: &str, now: Instant) -> Result<(), WizardError> {
        self.challenge.submit_guess(guess)?;
        self.snapshot.challenge_verified = true;
        self.save_draft();
        self.sync.schedule(&self.snapshot, now);
        Ok(())
    }

    /// Run the tax-ID lookup for the identity step, cross-checking the holder
    /// name when one has been supplied.
    pub fn verify_tax_id(&mut self, now: Instant) -> Result<(), WizardError> {
        let supplied = if self.snapshot.holder_name.is_empty() {
            None
        } else {
            Some(self.snapshot.holder_name.clone())
        };
        self.tax_id
            .verify(&self.snapshot.tax_id, supplied.as_deref())?;
        self.snapshot.tax_id_verified = true;
        self.save_draft();
        self.sync.schedule(&self.snapshot, now);
        Ok(())
    }

    /// Advance exactly one step if the current step's gate is satisfied.
    /// Returns the first unmet condition otherwise, leaving state unchanged.
    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        self.check_gate()?;

        let next = self
            .snapshot
            .current_step
            .next()
            .ok_or(WizardError::NotAtFinalStep)?;
        self.snapshot.current_step = next;
        self.save_draft();
        info!(step = next.number(), "advanced to next step");
        Ok(next)
    }

    fn check_gate(&self) -> Result<(), WizardError> {
        match self.snapshot.current_step {
            WizardStep::Contact => {
                if !self.snapshot.phone_complete() {
                    return Err(WizardError::GateUnmet("enter a valid 10-digit mobile number"));
                }
                if !self.snapshot.challenge_verified {
                    return Err(WizardError::GateUnmet("complete the verification challenge"));
                }
            }
            WizardStep::Identity => {
                if !self.snapshot.postal_code_complete() {
                    return Err(WizardError::GateUnmet("enter a valid 6-digit PIN code"));
                }
                if !self.snapshot.tax_id_verified {
                    return Err(WizardError::GateUnmet("verify your PAN details first"));
                }
            }
            WizardStep::Financial => {
                if self.snapshot.loan_category == LoanCategory::Unset {
                    return Err(WizardError::GateUnmet("select a loan category"));
                }
                if !self.snapshot.financial_complete() {
                    return Err(WizardError::GateUnmet("fill all mandatory fields"));
                }
            }
            WizardStep::Review => return Err(WizardError::NotAtFinalStep),
        }
        Ok(())
    }

    /// Step back for re-editing. Entered data is preserved.
    pub fn go_back(&mut self) -> Result<WizardStep, WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        let previous = self
            .snapshot
            .current_step
            .previous()
            .ok_or(WizardError::AtFirstStep)?;
        self.snapshot.current_step = previous;
        self.save_draft();
        Ok(previous)
    }

    /// Jump directly to an already-reached step. A step can never be reached
    /// before its predecessor gate has been satisfied at least once.
    pub fn navigate_to(&mut self, step: WizardStep) -> Result<WizardStep, WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        if step > self.snapshot.current_step {
            return Err(WizardError::StepNotReached(step));
        }
        self.snapshot.current_step = step;
        self.save_draft();
        Ok(step)
    }

    /// Send the completed application. Success clears the local draft and
    /// leaves a masked read-only summary; failure keeps snapshot and step
    /// intact so the user can correct and resubmit.
    pub fn submit(&mut self) -> Result<&ApplicationSummary, WizardError> {
        if self.is_submitted() {
            return Err(WizardError::AlreadySubmitted);
        }
        if self.snapshot.current_step != WizardStep::Review {
            return Err(WizardError::NotAtFinalStep);
        }

        match self.submission.submit(&self.snapshot) {
            Ok(receipt) => {
                info!(message = receipt.message.as_deref().unwrap_or(""), "application submitted");
                self.sync.cancel();
                if let Err(err) = self.draft.clear() {
                    warn!(error = %err, "draft clear failed after submission");
                }
                let summary = self.snapshot.summary();
                Ok(&*self.submitted.insert(summary))
            }
            Err(err) => Err(WizardError::SubmissionFailed(err.to_string())),
        }
    }

    /// Full teardown: default snapshot, verifiers back to their initial
    /// states, pending sync cancelled, local draft removed.
    pub fn reset(&mut self) {
        self.snapshot = ApplicationSnapshot::default();
        self.challenge.reset();
        self.tax_id.reset();
        self.sync.cancel();
        self.submitted = None;
        if let Err(err) = self.draft.clear() {
            warn!(error = %err, "draft clear failed during reset");
        }
    }

    /// Drive the debounce timer. Fires the scheduled sync when its quiet
    /// period has elapsed and merges any server-assigned address back into
    /// the snapshot; the most recent completion always wins.
    pub fn flush_sync(&mut self, now: Instant) {
        if let Some(address) = self.sync.flush_due(now) {
            self.snapshot.remote_row_id = Some(address.row_id);
            self.snapshot.remote_sheet_name = Some(address.sheet_name);
            self.save_draft();
        }
    }

    /// Whether a sync is scheduled and when it falls due.
    pub fn pending_sync_due(&self) -> Option<Instant> {
        self.sync.pending_due()
    }

    fn save_draft(&self) {
        if let Err(err) = self.draft.save(&self.snapshot) {
            warn!(error = %err, "draft save failed; continuing without local durability");
        }
    }
}
