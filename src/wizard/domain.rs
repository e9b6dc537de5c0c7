use serde::{Deserialize, Serialize};

use super::masking;
use super::validators;

/// Applicant-declared loan category. Drives which financial fields are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanCategory {
    Salaried,
    Business,
    #[default]
    Unset,
}

impl LoanCategory {
    pub const fn label(self) -> &'static str {
        match self {
            LoanCategory::Salaried => "Salaried",
            LoanCategory::Business => "Business",
            LoanCategory::Unset => "",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            s if s.eq_ignore_ascii_case("salaried") => Some(Self::Salaried),
            s if s.eq_ignore_ascii_case("business") => Some(Self::Business),
            _ => None,
        }
    }
}

/// Yes/no answers that start out unanswered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ternary {
    Yes,
    No,
    #[default]
    Unset,
}

impl Ternary {
    pub const fn answered(self) -> bool {
        !matches!(self, Ternary::Unset)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            s if s.eq_ignore_ascii_case("yes") => Some(Self::Yes),
            s if s.eq_ignore_ascii_case("no") => Some(Self::No),
            _ => None,
        }
    }
}

/// Wizard steps in gate order. A step is only reachable once every
/// predecessor gate has been satisfied at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Contact,
    Identity,
    Financial,
    Review,
}

impl WizardStep {
    pub const fn number(self) -> u8 {
        match self {
            Self::Contact => 1,
            Self::Identity => 2,
            Self::Financial => 3,
            Self::Review => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Contact => "Contact",
            Self::Identity => "Location & Identity",
            Self::Financial => "Professional Details",
            Self::Review => "Review & Submit",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Contact => Some(Self::Identity),
            Self::Identity => Some(Self::Financial),
            Self::Financial => Some(Self::Review),
            Self::Review => None,
        }
    }

    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Contact => None,
            Self::Identity => Some(Self::Contact),
            Self::Financial => Some(Self::Identity),
            Self::Review => Some(Self::Financial),
        }
    }
}

/// Editable snapshot fields, each scoped to the step that collects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKey {
    PhoneNumber,
    PostalCode,
    TaxId,
    HolderName,
    LoanCategory,
    AnnualIncome,
    RequestedAmount,
    HasRetirementFund,
    JobTitle,
    HasTaxRegistration,
    HasBusinessProof,
}

impl FieldKey {
    pub const fn step(self) -> WizardStep {
        match self {
            FieldKey::PhoneNumber => WizardStep::Contact,
            FieldKey::PostalCode | FieldKey::TaxId | FieldKey::HolderName => WizardStep::Identity,
            FieldKey::LoanCategory
            | FieldKey::AnnualIncome
            | FieldKey::RequestedAmount
            | FieldKey::HasRetirementFund
            | FieldKey::JobTitle
            | FieldKey::HasTaxRegistration
            | FieldKey::HasBusinessProof => WizardStep::Financial,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FieldKey::PhoneNumber => "mobile number",
            FieldKey::PostalCode => "PIN code",
            FieldKey::TaxId => "PAN number",
            FieldKey::HolderName => "holder name",
            FieldKey::LoanCategory => "loan category",
            FieldKey::AnnualIncome => "annual income",
            FieldKey::RequestedAmount => "loan amount required",
            FieldKey::HasRetirementFund => "provident fund",
            FieldKey::JobTitle => "designation",
            FieldKey::HasTaxRegistration => "GST registration",
            FieldKey::HasBusinessProof => "business registration proof",
        }
    }
}

/// Canonical in-progress application state. The wizard owns the only mutable
/// copy; every other component receives a read and returns proposed deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSnapshot {
    pub phone_number: String,
    pub postal_code: String,
    pub tax_id: String,
    pub holder_name: String,
    pub loan_category: LoanCategory,
    pub annual_income: String,
    pub requested_amount: String,
    pub has_retirement_fund: Ternary,
    pub job_title: String,
    pub has_tax_registration: Ternary,
    pub has_business_proof: Ternary,
    pub challenge_verified: bool,
    pub tax_id_verified: bool,
    pub current_step: WizardStep,
    pub remote_row_id: Option<String>,
    pub remote_sheet_name: Option<String>,
}

impl Default for ApplicationSnapshot {
    fn default() -> Self {
        Self {
            phone_number: String::new(),
            postal_code: String::new(),
            tax_id: String::new(),
            holder_name: String::new(),
            loan_category: LoanCategory::Unset,
            annual_income: String::new(),
            requested_amount: String::new(),
            has_retirement_fund: Ternary::Unset,
            job_title: String::new(),
            has_tax_registration: Ternary::Unset,
            has_business_proof: Ternary::Unset,
            challenge_verified: false,
            tax_id_verified: false,
            current_step: WizardStep::Contact,
            remote_row_id: None,
            remote_sheet_name: None,
        }
    }
}

impl ApplicationSnapshot {
    pub fn phone_complete(&self) -> bool {
        self.phone_number.len() == validators::PHONE_DIGITS
            && self.phone_number.chars().all(|c| c.is_ascii_digit())
    }

    pub fn postal_code_complete(&self) -> bool {
        self.postal_code.len() == validators::POSTAL_DIGITS
            && self
                .postal_code
                .starts_with(validators::REGION_LEADING_DIGIT)
    }

    /// True once the category is chosen and all of its required fields hold values.
    pub fn financial_complete(&self) -> bool {
        match self.loan_category {
            LoanCategory::Salaried => {
                !self.annual_income.is_empty()
                    && !self.requested_amount.is_empty()
                    && self.has_retirement_fund.answered()
                    && !self.job_title.trim().is_empty()
            }
            LoanCategory::Business => {
                !self.requested_amount.is_empty()
                    && self.has_tax_registration.answered()
                    && self.has_business_proof.answered()
            }
            LoanCategory::Unset => false,
        }
    }

    /// Masked, read-only summary shown after submission. Sensitive fields are
    /// redacted for display; the canonical values stay untouched.
    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            phone_number: masking::mask_phone(&self.phone_number),
            postal_code: self.postal_code.clone(),
            tax_id: masking::mask_tax_id(&self.tax_id),
            holder_name: masking::mask_name(&self.holder_name),
            loan_category: self.loan_category,
            requested_amount: self.requested_amount.clone(),
        }
    }
}

/// Read-only view left behind once an application has been submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub phone_number: String,
    pub postal_code: String,
    pub tax_id: String,
    pub holder_name: String,
    pub loan_category: LoanCategory,
    pub requested_amount: String,
}
