//! Loan-application wizard core: gated step progression, per-field
//! validation, challenge and tax-ID verification lifecycles, debounced
//! record-store synchronization, and local draft durability.

pub mod api;
pub mod domain;
pub mod machine;
pub mod masking;
pub mod persistence;
pub mod sync;
pub mod validators;
pub mod verification;

#[cfg(test)]
mod tests;

pub use api::{
    ApiClient, ChallengePuzzle, ChallengeService, GatewayError, IdentityLookup, IdentityRecord,
    RecordStore, RemoteAddress, SubmissionGateway, SubmissionReceipt,
};
pub use domain::{
    ApplicationSnapshot, ApplicationSummary, FieldKey, LoanCategory, Ternary, WizardStep,
};
pub use machine::{LoanWizard, WizardError};
pub use persistence::{DraftStore, DraftStoreError, FileDraftStore, MemoryDraftStore};
pub use sync::SyncEngine;
pub use validators::ValidationError;
pub use verification::{
    ChallengeState, ChallengeVerifier, TaxIdState, TaxIdVerifier, VerificationError,
};
