use serde::Serialize;

use super::domain::{ApplicationDraft, LoanType, PropertyType, WizardStep};

/// Predicate deciding whether a requirement applies to the current draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementCondition {
    Always,
    PermanentOrBridge,
    PermanentOnly,
    BridgeOnly,
    RefinanceOnly,
    ConstructionOnly,
    IncomeProducing,
}

impl RequirementCondition {
    fn applies(self, draft: &ApplicationDraft) -> bool {
        match self {
            RequirementCondition::Always => true,
            RequirementCondition::PermanentOrBridge => {
                loan_type_is(draft, |t| t.is_permanent() || t.is_bridge())
            }
            RequirementCondition::PermanentOnly => loan_type_is(draft, LoanType::is_permanent),
            RequirementCondition::BridgeOnly => loan_type_is(draft, LoanType::is_bridge),
            RequirementCondition::RefinanceOnly => loan_type_is(draft, LoanType::is_refinance),
            RequirementCondition::ConstructionOnly => {
                loan_type_is(draft, LoanType::is_construction)
            }
            RequirementCondition::IncomeProducing => is_income_producing(draft),
        }
    }
}

fn loan_type_is(draft: &ApplicationDraft, predicate: impl Fn(LoanType) -> bool) -> bool {
    draft.loan_type.map_or(false, predicate)
}

/// Performance figures only apply to properties that throw off income: not
/// raw land, not owner-occupied, and never for ground-up construction.
pub fn is_income_producing(draft: &ApplicationDraft) -> bool {
    let excluded_property = matches!(
        draft.property_type,
        Some(PropertyType::Land | PropertyType::OwnerOccupied)
    );
    let construction = matches!(draft.loan_type, Some(LoanType::Construction));
    !excluded_property && !construction
}

/// Typed lookup for one requirement's value, replacing runtime path traversal
/// with an explicit accessor per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRef {
    LoanType,
    LoanAmount,
    PropertyCity,
    PropertyState,
    PropertyName,
    PropertyType,
    EntityName,
    BorrowerType,
    ContactEmail,
    ContactPhone,
    PropertyValue,
    LoanTerm,
    Amortization,
    ExitStrategy,
    CurrentLoanBalance,
    ConstructionBudget,
    ConstructionPeriod,
    NetWorth,
    LiquidAssets,
    DownPaymentSource,
    AnnualGrossIncome,
    AnnualOperatingExpenses,
    Occupancy,
}

impl FieldRef {
    /// Absent values and blank strings are missing; a numeric zero is not.
    fn is_missing(self, draft: &ApplicationDraft) -> bool {
        let specifics = draft.loan_specifics.as_ref();
        match self {
            FieldRef::LoanType => draft.loan_type.is_none(),
            FieldRef::LoanAmount => blank(draft.loan_amount.as_deref()),
            FieldRef::PropertyCity => blank(draft.property_city.as_deref()),
            FieldRef::PropertyState => blank(draft.property_state.as_deref()),
            FieldRef::PropertyName => blank(draft.property_name.as_deref()),
            FieldRef::PropertyType => draft.property_type.is_none(),
            FieldRef::EntityName => blank(draft.entity_name.as_deref()),
            FieldRef::BorrowerType => draft.borrower_type.is_none(),
            FieldRef::ContactEmail => blank(draft.contact_email.as_deref()),
            FieldRef::ContactPhone => blank(draft.contact_phone.as_deref()),
            FieldRef::PropertyValue => {
                blank(specifics.and_then(|s| s.property_value.as_deref()))
            }
            FieldRef::LoanTerm => blank(specifics.and_then(|s| s.loan_term.as_deref())),
            FieldRef::Amortization => blank(specifics.and_then(|s| s.amortization.as_deref())),
            FieldRef::ExitStrategy => blank(specifics.and_then(|s| s.exit_strategy.as_deref())),
            FieldRef::CurrentLoanBalance => {
                blank(specifics.and_then(|s| s.current_loan_balance.as_deref()))
            }
            FieldRef::ConstructionBudget => {
                blank(specifics.and_then(|s| s.construction_budget.as_deref()))
            }
            FieldRef::ConstructionPeriod => {
                blank(specifics.and_then(|s| s.construction_period.as_deref()))
            }
            FieldRef::NetWorth => blank(draft.net_worth.as_deref()),
            FieldRef::LiquidAssets => blank(draft.liquid_assets.as_deref()),
            FieldRef::DownPaymentSource => draft.down_payment_source.is_none(),
            FieldRef::AnnualGrossIncome => {
                blank(specifics.and_then(|s| s.annual_gross_income.as_deref()))
            }
            FieldRef::AnnualOperatingExpenses => {
                blank(specifics.and_then(|s| s.annual_operating_expenses.as_deref()))
            }
            FieldRef::Occupancy => blank(draft.occupancy.as_deref()),
        }
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}

/// One entry of the declarative requirement table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRequirement {
    pub step: WizardStep,
    pub field: &'static str,
    pub label: &'static str,
    pub when: RequirementCondition,
    value: FieldRef,
}

const fn entry(
    step: WizardStep,
    field: &'static str,
    label: &'static str,
    when: RequirementCondition,
    value: FieldRef,
) -> FieldRequirement {
    FieldRequirement {
        step,
        field,
        label,
        when,
        value,
    }
}

static REQUIRED_FIELDS: &[FieldRequirement] = &[
    entry(
        WizardStep::QuickStart,
        "loanType",
        "Loan Type",
        RequirementCondition::Always,
        FieldRef::LoanType,
    ),
    entry(
        WizardStep::QuickStart,
        "loanAmount",
        "Loan Amount",
        RequirementCondition::Always,
        FieldRef::LoanAmount,
    ),
    entry(
        WizardStep::QuickStart,
        "propertyCity",
        "Property City",
        RequirementCondition::Always,
        FieldRef::PropertyCity,
    ),
    entry(
        WizardStep::QuickStart,
        "propertyState",
        "State",
        RequirementCondition::Always,
        FieldRef::PropertyState,
    ),
    entry(
        WizardStep::PropertyDetails,
        "propertyName",
        "Property Name",
        RequirementCondition::Always,
        FieldRef::PropertyName,
    ),
    entry(
        WizardStep::PropertyDetails,
        "propertyType",
        "Property Type",
        RequirementCondition::Always,
        FieldRef::PropertyType,
    ),
    entry(
        WizardStep::PropertyDetails,
        "entityName",
        "Entity Name",
        RequirementCondition::Always,
        FieldRef::EntityName,
    ),
    entry(
        WizardStep::PropertyDetails,
        "borrowerType",
        "Borrower Type",
        RequirementCondition::Always,
        FieldRef::BorrowerType,
    ),
    entry(
        WizardStep::PropertyDetails,
        "contactEmail",
        "Contact Email",
        RequirementCondition::Always,
        FieldRef::ContactEmail,
    ),
    entry(
        WizardStep::PropertyDetails,
        "contactPhone",
        "Contact Phone",
        RequirementCondition::Always,
        FieldRef::ContactPhone,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "propertyValue",
        "Property Value",
        RequirementCondition::Always,
        FieldRef::PropertyValue,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "loanTerm",
        "Loan Term",
        RequirementCondition::PermanentOrBridge,
        FieldRef::LoanTerm,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "amortization",
        "Amortization",
        RequirementCondition::PermanentOnly,
        FieldRef::Amortization,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "exitStrategy",
        "Exit Strategy",
        RequirementCondition::BridgeOnly,
        FieldRef::ExitStrategy,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "currentLoanBalance",
        "Current Loan Balance",
        RequirementCondition::RefinanceOnly,
        FieldRef::CurrentLoanBalance,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "constructionBudget",
        "Construction Budget",
        RequirementCondition::ConstructionOnly,
        FieldRef::ConstructionBudget,
    ),
    entry(
        WizardStep::LoanSpecifics,
        "constructionPeriod",
        "Construction Period",
        RequirementCondition::ConstructionOnly,
        FieldRef::ConstructionPeriod,
    ),
    entry(
        WizardStep::FinancialSnapshot,
        "netWorth",
        "Net Worth",
        RequirementCondition::Always,
        FieldRef::NetWorth,
    ),
    entry(
        WizardStep::FinancialSnapshot,
        "liquidAssets",
        "Liquid Assets",
        RequirementCondition::Always,
        FieldRef::LiquidAssets,
    ),
    entry(
        WizardStep::FinancialSnapshot,
        "downPaymentSource",
        "Down Payment Source",
        RequirementCondition::Always,
        FieldRef::DownPaymentSource,
    ),
    entry(
        WizardStep::PropertyPerformance,
        "annualGrossIncome",
        "Annual Gross Income",
        RequirementCondition::IncomeProducing,
        FieldRef::AnnualGrossIncome,
    ),
    entry(
        WizardStep::PropertyPerformance,
        "annualOperatingExpenses",
        "Annual Operating Expenses",
        RequirementCondition::IncomeProducing,
        FieldRef::AnnualOperatingExpenses,
    ),
    entry(
        WizardStep::PropertyPerformance,
        "occupancy",
        "Occupancy Rate",
        RequirementCondition::IncomeProducing,
        FieldRef::Occupancy,
    ),
];

/// The full requirement table, e.g. for rendering labels next to field names.
pub fn requirements() -> &'static [FieldRequirement] {
    REQUIRED_FIELDS
}

/// Missing-field summary for one wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidation {
    pub step: WizardStep,
    pub missing_fields: Vec<&'static str>,
    pub is_complete: bool,
}

/// Evaluate one step against the requirement table. Pure in its inputs; the
/// documents and review steps carry no field-level requirements.
pub fn step_validation(step: WizardStep, draft: &ApplicationDraft) -> StepValidation {
    let missing_fields: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .filter(|requirement| requirement.step == step)
        .filter(|requirement| requirement.when.applies(draft))
        .filter(|requirement| requirement.value.is_missing(draft))
        .map(|requirement| requirement.field)
        .collect();

    StepValidation {
        step,
        is_complete: missing_fields.is_empty(),
        missing_fields,
    }
}

/// Evaluate every step in order.
pub fn all_step_validations(draft: &ApplicationDraft) -> Vec<StepValidation> {
    WizardStep::ALL
        .into_iter()
        .map(|step| step_validation(step, draft))
        .collect()
}
