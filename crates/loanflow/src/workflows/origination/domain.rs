use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::metrics::LoanMetrics;

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for the borrower owning an application or document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for uploaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub String);

/// Product the borrower is applying for; drives which loan-specific fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanType {
    PermanentAcquisition,
    PermanentRefinance,
    BridgeAcquisition,
    BridgeRefinance,
    Construction,
}

impl LoanType {
    pub const fn label(self) -> &'static str {
        match self {
            LoanType::PermanentAcquisition => "permanent-acquisition",
            LoanType::PermanentRefinance => "permanent-refinance",
            LoanType::BridgeAcquisition => "bridge-acquisition",
            LoanType::BridgeRefinance => "bridge-refinance",
            LoanType::Construction => "construction",
        }
    }

    pub const fn is_permanent(self) -> bool {
        matches!(
            self,
            LoanType::PermanentAcquisition | LoanType::PermanentRefinance
        )
    }

    pub const fn is_bridge(self) -> bool {
        matches!(self, LoanType::BridgeAcquisition | LoanType::BridgeRefinance)
    }

    pub const fn is_refinance(self) -> bool {
        matches!(self, LoanType::PermanentRefinance | LoanType::BridgeRefinance)
    }

    pub const fn is_construction(self) -> bool {
        matches!(self, LoanType::Construction)
    }
}

/// Asset class of the collateral property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Multifamily,
    Office,
    Retail,
    Industrial,
    MixedUse,
    SelfStorage,
    Land,
    OwnerOccupied,
}

/// Legal structure of the borrowing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorrowerType {
    Individual,
    Llc,
    Corporation,
    Trust,
    ForeignNational,
}

/// Declared source of the borrower's equity contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownPaymentSource {
    Cash,
    Securities,
    EquityPartner,
    Other,
}

/// Lifecycle state of an application. Transitions are monotone apart from
/// in-place draft edits; draft -> submitted is the one client-triggered move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    TermSheet,
    Underwriting,
    Closing,
    Closed,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::TermSheet => "term-sheet",
            ApplicationStatus::Underwriting => "underwriting",
            ApplicationStatus::Closing => "closing",
            ApplicationStatus::Closed => "closed",
        }
    }

    /// Position in the lifecycle; a new status may never rank below the old one.
    pub const fn rank(self) -> u8 {
        match self {
            ApplicationStatus::Draft => 0,
            ApplicationStatus::Submitted => 1,
            ApplicationStatus::TermSheet => 2,
            ApplicationStatus::Underwriting => 3,
            ApplicationStatus::Closing => 4,
            ApplicationStatus::Closed => 5,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One page of the application wizard, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    QuickStart,
    PropertyDetails,
    LoanSpecifics,
    FinancialSnapshot,
    PropertyPerformance,
    Documents,
    ReviewSubmit,
}

impl WizardStep {
    pub const ALL: [WizardStep; 7] = [
        WizardStep::QuickStart,
        WizardStep::PropertyDetails,
        WizardStep::LoanSpecifics,
        WizardStep::FinancialSnapshot,
        WizardStep::PropertyPerformance,
        WizardStep::Documents,
        WizardStep::ReviewSubmit,
    ];

    pub const FIRST: WizardStep = WizardStep::QuickStart;
    pub const FINAL: WizardStep = WizardStep::ReviewSubmit;

    pub const fn number(self) -> u8 {
        match self {
            WizardStep::QuickStart => 1,
            WizardStep::PropertyDetails => 2,
            WizardStep::LoanSpecifics => 3,
            WizardStep::FinancialSnapshot => 4,
            WizardStep::PropertyPerformance => 5,
            WizardStep::Documents => 6,
            WizardStep::ReviewSubmit => 7,
        }
    }

    pub fn from_number(number: u8) -> Option<WizardStep> {
        WizardStep::ALL
            .into_iter()
            .find(|step| step.number() == number)
    }

    pub const fn label(self) -> &'static str {
        match self {
            WizardStep::QuickStart => "quick-start",
            WizardStep::PropertyDetails => "property-details",
            WizardStep::LoanSpecifics => "loan-specifics",
            WizardStep::FinancialSnapshot => "financial-snapshot",
            WizardStep::PropertyPerformance => "property-performance",
            WizardStep::Documents => "documents",
            WizardStep::ReviewSubmit => "review-submit",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            WizardStep::QuickStart => "Quick Start",
            WizardStep::PropertyDetails => "Property Details",
            WizardStep::LoanSpecifics => "Loan Specifics",
            WizardStep::FinancialSnapshot => "Financial Snapshot",
            WizardStep::PropertyPerformance => "Property Performance",
            WizardStep::Documents => "Documents",
            WizardStep::ReviewSubmit => "Review & Submit",
        }
    }

    pub const fn next(self) -> WizardStep {
        match self {
            WizardStep::QuickStart => WizardStep::PropertyDetails,
            WizardStep::PropertyDetails => WizardStep::LoanSpecifics,
            WizardStep::LoanSpecifics => WizardStep::FinancialSnapshot,
            WizardStep::FinancialSnapshot => WizardStep::PropertyPerformance,
            WizardStep::PropertyPerformance => WizardStep::Documents,
            WizardStep::Documents => WizardStep::ReviewSubmit,
            WizardStep::ReviewSubmit => WizardStep::ReviewSubmit,
        }
    }

    pub const fn previous(self) -> WizardStep {
        match self {
            WizardStep::QuickStart => WizardStep::QuickStart,
            WizardStep::PropertyDetails => WizardStep::QuickStart,
            WizardStep::LoanSpecifics => WizardStep::PropertyDetails,
            WizardStep::FinancialSnapshot => WizardStep::LoanSpecifics,
            WizardStep::PropertyPerformance => WizardStep::FinancialSnapshot,
            WizardStep::Documents => WizardStep::PropertyPerformance,
            WizardStep::ReviewSubmit => WizardStep::Documents,
        }
    }
}

/// One row of the optional tenant roster on the property-performance step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSummary {
    pub name: String,
    pub unit: String,
    pub monthly_rent: String,
    pub lease_expiry: String,
}

/// Loan-term details whose required subset varies by loan type. Known fields
/// are typed; anything else round-trips through the extra map untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanSpecifics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amortization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_loan_balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_lender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_budget: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub construction_period: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepayment_penalty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recourse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_gross_income: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_operating_expenses: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LoanSpecifics {
    /// Drop blank strings and null scalars so cleared inputs read as absent.
    pub fn sanitized(mut self) -> Self {
        self.property_value = clean(self.property_value);
        self.interest_rate = clean(self.interest_rate);
        self.rate_type = clean(self.rate_type);
        self.loan_term = clean(self.loan_term);
        self.amortization = clean(self.amortization);
        self.exit_strategy = clean(self.exit_strategy);
        self.current_loan_balance = clean(self.current_loan_balance);
        self.current_lender = clean(self.current_lender);
        self.construction_budget = clean(self.construction_budget);
        self.construction_period = clean(self.construction_period);
        self.draw_schedule = clean(self.draw_schedule);
        self.prepayment_penalty = clean(self.prepayment_penalty);
        self.recourse = clean(self.recourse);
        self.annual_gross_income = clean(self.annual_gross_income);
        self.annual_operating_expenses = clean(self.annual_operating_expenses);
        self.extra.retain(|_, value| match value {
            Value::Null => false,
            Value::String(text) => !text.trim().is_empty(),
            _ => true,
        });
        self
    }
}

/// Client-editable slice of an application. Every field is optional so the
/// same type serves as wizard-step payload, accumulated form state, and
/// partial-update body. Unknown top-level fields are rejected outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ApplicationDraft {
    // Quick start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<LoanType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_state: Option<String>,

    // Property basics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<String>,

    // Borrower
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_type: Option<BorrowerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_completed: Option<String>,

    // Loan terms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_specifics: Option<LoanSpecifics>,

    // Financial snapshot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_worth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquid_assets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_payment_source: Option<DownPaymentSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_bankruptcy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_credit_pull: Option<bool>,

    // Property performance
    #[serde(rename = "annualNOI", skip_serializing_if = "Option::is_none")]
    pub annual_noi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_tenants: Option<Vec<TenantSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_improvements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_improvements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_management: Option<String>,

    // Lifecycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<WizardStep>,

    // Calculated metrics; accepted inbound for wire compatibility but always
    // re-derived server-side, never trusted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_interest: Option<String>,
}

impl ApplicationDraft {
    /// Canonical cleanup applied before any merge or persistence: blank and
    /// null scalars become absent, client-sent metric values are dropped.
    /// Explicit `false` and `"0"` survive untouched.
    pub fn sanitized(mut self) -> Self {
        self.loan_amount = clean(self.loan_amount);
        self.property_city = clean(self.property_city);
        self.property_state = clean(self.property_state);
        self.property_name = clean(self.property_name);
        self.property_address = clean(self.property_address);
        self.square_footage = clean(self.square_footage);
        self.units = clean(self.units);
        self.year_built = clean(self.year_built);
        self.occupancy = clean(self.occupancy);
        self.entity_name = clean(self.entity_name);
        self.contact_email = clean(self.contact_email);
        self.contact_phone = clean(self.contact_phone);
        self.years_experience = clean(self.years_experience);
        self.projects_completed = clean(self.projects_completed);
        self.net_worth = clean(self.net_worth);
        self.liquid_assets = clean(self.liquid_assets);
        self.credit_score = clean(self.credit_score);
        self.annual_noi = clean(self.annual_noi);
        self.recent_improvements = clean(self.recent_improvements);
        self.planned_improvements = clean(self.planned_improvements);
        self.property_management = clean(self.property_management);
        self.loan_specifics = self.loan_specifics.map(LoanSpecifics::sanitized);
        self.major_tenants = self.major_tenants.filter(|tenants| !tenants.is_empty());
        self.ltv = None;
        self.dscr = None;
        self.monthly_interest = None;
        self
    }

    /// Shallow per-field merge: a value present in `patch` wins, an absent one
    /// keeps the accumulated value. `loanSpecifics` is replaced as a unit.
    pub fn merged(self, patch: ApplicationDraft) -> ApplicationDraft {
        ApplicationDraft {
            loan_type: patch.loan_type.or(self.loan_type),
            loan_amount: patch.loan_amount.or(self.loan_amount),
            property_city: patch.property_city.or(self.property_city),
            property_state: patch.property_state.or(self.property_state),
            property_name: patch.property_name.or(self.property_name),
            property_address: patch.property_address.or(self.property_address),
            property_type: patch.property_type.or(self.property_type),
            square_footage: patch.square_footage.or(self.square_footage),
            units: patch.units.or(self.units),
            year_built: patch.year_built.or(self.year_built),
            occupancy: patch.occupancy.or(self.occupancy),
            entity_name: patch.entity_name.or(self.entity_name),
            borrower_type: patch.borrower_type.or(self.borrower_type),
            contact_email: patch.contact_email.or(self.contact_email),
            contact_phone: patch.contact_phone.or(self.contact_phone),
            years_experience: patch.years_experience.or(self.years_experience),
            projects_completed: patch.projects_completed.or(self.projects_completed),
            loan_specifics: patch.loan_specifics.or(self.loan_specifics),
            net_worth: patch.net_worth.or(self.net_worth),
            liquid_assets: patch.liquid_assets.or(self.liquid_assets),
            down_payment_source: patch.down_payment_source.or(self.down_payment_source),
            credit_score: patch.credit_score.or(self.credit_score),
            has_bankruptcy: patch.has_bankruptcy.or(self.has_bankruptcy),
            authorize_credit_pull: patch.authorize_credit_pull.or(self.authorize_credit_pull),
            annual_noi: patch.annual_noi.or(self.annual_noi),
            major_tenants: patch.major_tenants.or(self.major_tenants),
            recent_improvements: patch.recent_improvements.or(self.recent_improvements),
            planned_improvements: patch.planned_improvements.or(self.planned_improvements),
            property_management: patch.property_management.or(self.property_management),
            status: patch.status.or(self.status),
            current_step: patch.current_step.or(self.current_step),
            ltv: patch.ltv.or(self.ltv),
            dscr: patch.dscr.or(self.dscr),
            monthly_interest: patch.monthly_interest.or(self.monthly_interest),
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// One persisted loan application row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<LoanType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrower_type: Option<BorrowerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_completed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_specifics: Option<LoanSpecifics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_worth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquid_assets: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_payment_source: Option<DownPaymentSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_bankruptcy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_credit_pull: Option<bool>,
    #[serde(rename = "annualNOI", skip_serializing_if = "Option::is_none")]
    pub annual_noi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_tenants: Option<Vec<TenantSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_improvements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_improvements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_management: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dscr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_interest: Option<String>,
    pub status: ApplicationStatus,
    /// Wizard step the borrower last completed.
    pub current_step: WizardStep,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplication {
    /// Materialize a new row from a sanitized draft. `userId`, ids, and
    /// timestamps are exclusively server-set.
    pub fn from_draft(
        id: ApplicationId,
        user_id: UserId,
        draft: ApplicationDraft,
        metrics: LoanMetrics,
        now: DateTime<Utc>,
    ) -> Self {
        let status = draft.status.unwrap_or(ApplicationStatus::Draft);
        let current_step = draft.current_step.unwrap_or(WizardStep::FIRST);
        LoanApplication {
            id,
            user_id,
            loan_type: draft.loan_type,
            loan_amount: draft.loan_amount,
            property_city: draft.property_city,
            property_state: draft.property_state,
            property_name: draft.property_name,
            property_address: draft.property_address,
            property_type: draft.property_type,
            square_footage: draft.square_footage,
            units: draft.units,
            year_built: draft.year_built,
            occupancy: draft.occupancy,
            entity_name: draft.entity_name,
            borrower_type: draft.borrower_type,
            contact_email: draft.contact_email,
            contact_phone: draft.contact_phone,
            years_experience: draft.years_experience,
            projects_completed: draft.projects_completed,
            loan_specifics: draft.loan_specifics,
            net_worth: draft.net_worth,
            liquid_assets: draft.liquid_assets,
            down_payment_source: draft.down_payment_source,
            credit_score: draft.credit_score,
            has_bankruptcy: draft.has_bankruptcy,
            authorize_credit_pull: draft.authorize_credit_pull,
            annual_noi: draft.annual_noi,
            major_tenants: draft.major_tenants,
            recent_improvements: draft.recent_improvements,
            planned_improvements: draft.planned_improvements,
            property_management: draft.property_management,
            ltv: metrics.ltv,
            dscr: metrics.dscr,
            monthly_interest: metrics.monthly_interest,
            status,
            current_step,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable slice with a merged draft plus freshly computed
    /// metrics, keeping identity and creation time.
    pub fn with_draft(
        self,
        draft: ApplicationDraft,
        metrics: LoanMetrics,
        now: DateTime<Utc>,
    ) -> Self {
        let mut next = LoanApplication::from_draft(self.id, self.user_id, draft, metrics, now);
        next.status = next.status.max_by_rank(self.status);
        next.created_at = self.created_at;
        next
    }

    /// Project the editable slice back into draft form, e.g. as validation
    /// input or to reconcile client state with the stored row.
    pub fn draft(&self) -> ApplicationDraft {
        ApplicationDraft {
            loan_type: self.loan_type,
            loan_amount: self.loan_amount.clone(),
            property_city: self.property_city.clone(),
            property_state: self.property_state.clone(),
            property_name: self.property_name.clone(),
            property_address: self.property_address.clone(),
            property_type: self.property_type,
            square_footage: self.square_footage.clone(),
            units: self.units.clone(),
            year_built: self.year_built.clone(),
            occupancy: self.occupancy.clone(),
            entity_name: self.entity_name.clone(),
            borrower_type: self.borrower_type,
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            years_experience: self.years_experience.clone(),
            projects_completed: self.projects_completed.clone(),
            loan_specifics: self.loan_specifics.clone(),
            net_worth: self.net_worth.clone(),
            liquid_assets: self.liquid_assets.clone(),
            down_payment_source: self.down_payment_source,
            credit_score: self.credit_score.clone(),
            has_bankruptcy: self.has_bankruptcy,
            authorize_credit_pull: self.authorize_credit_pull,
            annual_noi: self.annual_noi.clone(),
            major_tenants: self.major_tenants.clone(),
            recent_improvements: self.recent_improvements.clone(),
            planned_improvements: self.planned_improvements.clone(),
            property_management: self.property_management.clone(),
            status: Some(self.status),
            current_step: Some(self.current_step),
            ltv: self.ltv.clone(),
            dscr: self.dscr.clone(),
            monthly_interest: self.monthly_interest.clone(),
        }
    }
}

impl ApplicationStatus {
    fn max_by_rank(self, other: ApplicationStatus) -> ApplicationStatus {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }
}

/// Upload lifecycle of a document row. A client-local "failed" marker exists
/// in the slot tracker but is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentStatus {
    Uploaded,
    Pending,
    Required,
}

impl DocumentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Pending => "pending",
            DocumentStatus::Required => "required",
        }
    }
}

/// One uploaded or placeholder file owned by an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
    pub status: DocumentStatus,
    /// Location in the external blob store; absent for placeholders with no
    /// bytes yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
