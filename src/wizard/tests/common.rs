use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::wizard::api::{
    ChallengePuzzle, ChallengeService, GatewayError, IdentityLookup, IdentityRecord, RecordStore,
    RemoteAddress, SubmissionGateway, SubmissionReceipt,
};
use crate::wizard::domain::ApplicationSnapshot;
use crate::wizard::machine::LoanWizard;
use crate::wizard::persistence::MemoryDraftStore;

pub(super) const DEBOUNCE: Duration = Duration::from_millis(800);
pub(super) const CORRECT_CODE: &str = "7GX4K";

pub(super) type TestWizard = LoanWizard<
    ScriptedChallengeService,
    ScriptedIdentityLookup,
    MemoryRecordStore,
    ScriptedSubmission,
    MemoryDraftStore,
>;

/// Challenge service issuing sequentially numbered puzzles that all accept
/// the same code, so tests can tell one puzzle from the next.
#[derive(Debug, Default)]
pub(super) struct ScriptedChallengeService {
    issued: Mutex<Vec<String>>,
    sequence: AtomicUsize,
    fail_generate: AtomicBool,
    fail_check: AtomicBool,
}

impl ScriptedChallengeService {
    pub fn issued_ids(&self) -> Vec<String> {
        self.issued.lock().expect("issued lock").clone()
    }

    pub fn set_fail_generate(&self, fail: bool) {
        self.fail_generate.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_check(&self, fail: bool) {
        self.fail_check.store(fail, Ordering::SeqCst);
    }
}

impl ChallengeService for ScriptedChallengeService {
    fn generate(&self) -> Result<ChallengePuzzle, GatewayError> {
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("challenge service down".into()));
        }
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let puzzle = ChallengePuzzle {
            id: format!("ch-{n:03}"),
            challenge: CORRECT_CODE.to_string(),
        };
        self.issued.lock().expect("issued lock").push(puzzle.id.clone());
        Ok(puzzle)
    }

    fn check(&self, _id: &str, guess: &str) -> Result<bool, GatewayError> {
        if self.fail_check.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("challenge service down".into()));
        }
        Ok(guess == CORRECT_CODE)
    }
}

/// Identity lookup returning a fixed outcome per test.
#[derive(Debug)]
pub(super) enum IdentityOutcome {
    Holder(&'static str),
    NoHolder,
    Unavailable,
}

#[derive(Debug)]
pub(super) struct ScriptedIdentityLookup {
    outcome: Mutex<IdentityOutcome>,
    calls: AtomicUsize,
}

impl ScriptedIdentityLookup {
    pub fn with_outcome(outcome: IdentityOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_outcome(&self, outcome: IdentityOutcome) {
        *self.outcome.lock().expect("outcome lock") = outcome;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedIdentityLookup {
    fn default() -> Self {
        Self::with_outcome(IdentityOutcome::Holder("RAHUL KUMAR"))
    }
}

impl IdentityLookup for ScriptedIdentityLookup {
    fn resolve(&self, _tax_id: &str) -> Result<IdentityRecord, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.outcome.lock().expect("outcome lock") {
            IdentityOutcome::Holder(name) => Ok(IdentityRecord {
                holder_name: Some((*name).to_string()),
            }),
            IdentityOutcome::NoHolder => Ok(IdentityRecord { holder_name: None }),
            IdentityOutcome::Unavailable => {
                Err(GatewayError::Transport("identity service down".into()))
            }
        }
    }
}

/// In-memory record store logging every create and update.
#[derive(Debug, Default)]
pub(super) struct MemoryRecordStore {
    creates: Mutex<Vec<String>>,
    updates: Mutex<Vec<(RemoteAddress, ApplicationSnapshot)>>,
    sequence: AtomicUsize,
    readdress_to: Mutex<Option<RemoteAddress>>,
    fail: AtomicBool,
}

impl MemoryRecordStore {
    pub fn creates(&self) -> Vec<String> {
        self.creates.lock().expect("creates lock").clone()
    }

    pub fn updates(&self) -> Vec<(RemoteAddress, ApplicationSnapshot)> {
        self.updates.lock().expect("updates lock").clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make the next update respond with a moved row address.
    pub fn readdress_to(&self, address: RemoteAddress) {
        *self.readdress_to.lock().expect("readdress lock") = Some(address);
    }
}

impl RecordStore for MemoryRecordStore {
    fn create(&self, phone_number: &str) -> Result<RemoteAddress, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("record store down".into()));
        }
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.creates
            .lock()
            .expect("creates lock")
            .push(phone_number.to_string());
        Ok(RemoteAddress {
            row_id: format!("row-{n}"),
            sheet_name: "sheet1".to_string(),
        })
    }

    fn update(
        &self,
        address: &RemoteAddress,
        snapshot: &ApplicationSnapshot,
    ) -> Result<RemoteAddress, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("record store down".into()));
        }
        self.updates
            .lock()
            .expect("updates lock")
            .push((address.clone(), snapshot.clone()));
        let moved = self.readdress_to.lock().expect("readdress lock").take();
        Ok(moved.unwrap_or_else(|| address.clone()))
    }
}

/// Submission gateway with a scriptable outcome queue; once the queue is
/// empty every call succeeds.
#[derive(Debug, Default)]
pub(super) struct ScriptedSubmission {
    outcomes: Mutex<VecDeque<Result<SubmissionReceipt, GatewayError>>>,
    received: Mutex<Vec<ApplicationSnapshot>>,
}

impl ScriptedSubmission {
    pub fn fail_next(&self, reason: &str) {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .push_back(Err(GatewayError::Declined(reason.to_string())));
    }

    pub fn received(&self) -> Vec<ApplicationSnapshot> {
        self.received.lock().expect("received lock").clone()
    }
}

impl SubmissionGateway for ScriptedSubmission {
    fn submit(&self, snapshot: &ApplicationSnapshot) -> Result<SubmissionReceipt, GatewayError> {
        self.received
            .lock()
            .expect("received lock")
            .push(snapshot.clone());
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or(Ok(SubmissionReceipt {
                message: Some("Application received".to_string()),
            }))
    }
}

pub(super) struct Fixture {
    pub challenge: Arc<ScriptedChallengeService>,
    pub identity: Arc<ScriptedIdentityLookup>,
    pub records: Arc<MemoryRecordStore>,
    pub submission: Arc<ScriptedSubmission>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            challenge: Arc::new(ScriptedChallengeService::default()),
            identity: Arc::new(ScriptedIdentityLookup::default()),
            records: Arc::new(MemoryRecordStore::default()),
            submission: Arc::new(ScriptedSubmission::default()),
        }
    }

    pub fn wizard(&self) -> TestWizard {
        LoanWizard::new(
            self.challenge.clone(),
            self.identity.clone(),
            self.records.clone(),
            self.submission.clone(),
            MemoryDraftStore::default(),
            DEBOUNCE,
        )
    }

    pub fn wizard_with_draft(&self, draft: MemoryDraftStore) -> TestWizard {
        LoanWizard::new(
            self.challenge.clone(),
            self.identity.clone(),
            self.records.clone(),
            self.submission.clone(),
            draft,
            DEBOUNCE,
        )
    }
}

pub(super) fn after_debounce(start: Instant) -> Instant {
    start + DEBOUNCE + Duration::from_millis(1)
}

/// Drive a fresh wizard through the contact gate.
pub(super) fn pass_contact(wizard: &mut TestWizard, now: Instant) {
    wizard
        .update_field(crate::wizard::domain::FieldKey::PhoneNumber, "9876543210", now)
        .expect("phone accepted");
    wizard.request_challenge().expect("challenge issued");
    wizard
        .submit_challenge_guess(CORRECT_CODE, now)
        .expect("challenge verified");
    wizard.advance().expect("contact gate passes");
}

/// Drive a wizard sitting on the identity step through its gate.
pub(super) fn pass_identity(wizard: &mut TestWizard, now: Instant) {
    use crate::wizard::domain::FieldKey;
    wizard
        .update_field(FieldKey::PostalCode, "600001", now)
        .expect("postal code accepted");
    wizard
        .update_field(FieldKey::TaxId, "ABCDE1234F", now)
        .expect("tax id accepted");
    wizard.verify_tax_id(now).expect("tax id verified");
    wizard.advance().expect("identity gate passes");
}

/// Drive a wizard sitting on the financial step through the business path.
pub(super) fn pass_financial_business(wizard: &mut TestWizard, now: Instant) {
    use crate::wizard::domain::FieldKey;
    wizard
        .update_field(FieldKey::LoanCategory, "Business", now)
        .expect("category accepted");
    wizard
        .update_field(FieldKey::RequestedAmount, "500000", now)
        .expect("amount accepted");
    wizard
        .update_field(FieldKey::HasTaxRegistration, "Yes", now)
        .expect("gst answer accepted");
    wizard
        .update_field(FieldKey::HasBusinessProof, "Yes", now)
        .expect("proof answer accepted");
    wizard.advance().expect("financial gate passes");
}
