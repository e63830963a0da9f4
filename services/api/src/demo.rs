use crate::infra::{
    EmailNotificationGateway, InMemoryApplicationRepository, InMemoryDocumentRepository,
    InMemoryObjectStore,
};
use clap::Args;
use loanflow::config::EmailConfig;
use loanflow::error::AppError;
use loanflow::workflows::origination::{
    requirements, step_validation, ApplicationDraft, ApplicationId, AutoSaveTimer, BorrowerType,
    Document, DocumentError, DocumentId, DocumentSlots, DocumentStore, DownPaymentSource,
    DraftCoordinator, DraftStore, DraftStoreError, FilePayload, LoanApplication, LoanSpecifics,
    LoanType, OriginationService, PropertyType, UploadRequest, UserId, WizardSession, WizardStep,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Borrower id used for the walkthrough.
    #[arg(long, default_value = "demo-borrower")]
    pub(crate) borrower: String,
    /// Skip the auto-save portion of the demo (it waits out the debounce).
    #[arg(long)]
    pub(crate) skip_auto_save: bool,
}

type DemoService = OriginationService<
    InMemoryApplicationRepository,
    InMemoryDocumentRepository,
    InMemoryObjectStore,
    EmailNotificationGateway,
>;

/// In-process stand-in for the HTTP transport between the wizard client and
/// the service.
struct DemoStore {
    service: Arc<DemoService>,
    user: UserId,
}

impl DraftStore for DemoStore {
    fn create(&self, draft: &ApplicationDraft) -> Result<LoanApplication, DraftStoreError> {
        let payload = serde_json::to_value(draft)
            .map_err(|err| DraftStoreError::Rejected(err.to_string()))?;
        self.service
            .create(&self.user, payload)
            .map_err(|err| DraftStoreError::Rejected(err.to_string()))
    }

    fn update(
        &self,
        id: &ApplicationId,
        draft: &ApplicationDraft,
    ) -> Result<LoanApplication, DraftStoreError> {
        let payload = serde_json::to_value(draft)
            .map_err(|err| DraftStoreError::Rejected(err.to_string()))?;
        self.service
            .update(&self.user, id, payload)
            .map_err(|err| DraftStoreError::Unavailable(err.to_string()))
    }
}

impl DocumentStore for DemoStore {
    fn upload(
        &self,
        application: &ApplicationId,
        request: UploadRequest,
    ) -> Result<Document, DocumentError> {
        self.service
            .upload_document(&self.user, application, request)
            .map_err(|err| DocumentError::Rejected(err.to_string()))
    }

    fn remove(
        &self,
        application: &ApplicationId,
        document: &DocumentId,
    ) -> Result<(), DocumentError> {
        self.service
            .delete_document(&self.user, application, document)
            .map_err(|err| DocumentError::Unavailable(err.to_string()))
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let notifications = Arc::new(EmailNotificationGateway::new(EmailConfig {
        api_key: None,
        sender: "no-reply@loanflow.dev".to_string(),
        recipient: "intake@loanflow.dev".to_string(),
    }));
    let service: Arc<DemoService> = Arc::new(OriginationService::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(InMemoryDocumentRepository::default()),
        Arc::new(InMemoryObjectStore::default()),
        notifications.clone(),
    ));
    let user = UserId(args.borrower.clone());
    let store = Arc::new(DemoStore {
        service: service.clone(),
        user,
    });

    println!("Loan application wizard demo");
    println!(
        "started {}\n============================\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    );

    let mut session = WizardSession::new(store.clone());

    let steps: Vec<(WizardStep, ApplicationDraft)> = vec![
        (WizardStep::QuickStart, quick_start_payload()),
        (WizardStep::PropertyDetails, property_details_payload()),
        (WizardStep::LoanSpecifics, loan_specifics_payload()),
        (WizardStep::FinancialSnapshot, financial_snapshot_payload()),
        (
            WizardStep::PropertyPerformance,
            property_performance_payload(),
        ),
    ];

    for (step, payload) in steps {
        println!("Step {}: {}", step.number(), step.title());
        let saved = match session.continue_step(payload) {
            Ok(saved) => saved,
            Err(err) => {
                println!("  Save failed: {err}");
                return Ok(());
            }
        };
        print_validation(step, &saved);
        print_metrics(&saved);
        println!();
    }

    let Some(stored) = session.drafts().application().cloned() else {
        println!("no application was persisted; stopping the walkthrough");
        return Ok(());
    };
    let application_id = stored.id.clone();

    if !args.skip_auto_save {
        println!("Field edit with debounced auto-save");
        let coordinator = Arc::new(Mutex::new(DraftCoordinator::resume(store.clone(), stored)));
        let mut timer = AutoSaveTimer::new();
        coordinator
            .lock()
            .expect("coordinator mutex poisoned")
            .apply(ApplicationDraft {
                units: Some("26".to_string()),
                ..ApplicationDraft::default()
            });
        timer.schedule(coordinator.clone());
        println!("  edit applied; waiting out the 2s debounce...");
        sleep(Duration::from_millis(2_200)).await;
        let saved = coordinator
            .lock()
            .expect("coordinator mutex poisoned")
            .application()
            .and_then(|application| application.units.clone());
        println!("  stored unit count is now {:?}\n", saved);
        // Single logical writer: bring the wizard session in line with the
        // edit so its next save does not roll the field back.
        session.drafts_mut().apply(ApplicationDraft {
            units: Some("26".to_string()),
            ..ApplicationDraft::default()
        });
    }

    println!("Step 6: {}", WizardStep::Documents.title());
    let mut slots = DocumentSlots::for_application(store, application_id.clone());
    for (doc_type, file_name, body) in [
        (
            "financial-statements",
            "financial-statements-2025.pdf",
            "%PDF-1.4 demo financials",
        ),
        ("rent-roll", "rent-roll-august.pdf", "%PDF-1.4 demo rent roll"),
    ] {
        let content_type = mime_guess::from_path(file_name)
            .first_raw()
            .map(str::to_string);
        match slots.upload(
            doc_type,
            None,
            FilePayload {
                filename: file_name.to_string(),
                content_type,
                bytes: body.as_bytes().to_vec(),
            },
        ) {
            Ok(document) => println!(
                "  uploaded {} as {} ({})",
                document.name,
                document.doc_type,
                document.file_size.as_deref().unwrap_or("size unknown")
            ),
            Err(err) => println!("  upload failed: {err}"),
        }
    }
    if let Err(err) = session.continue_step(ApplicationDraft::default()) {
        println!("  save failed: {err}");
        return Ok(());
    }
    println!();

    println!("Step 7: {}", WizardStep::ReviewSubmit.title());
    let submitted = match session.submit() {
        Ok(submitted) => submitted,
        Err(err) => {
            println!("  submission failed: {err}");
            return Ok(());
        }
    };
    println!(
        "  application {} submitted with status `{}`",
        submitted.id.0,
        submitted.status.label()
    );
    print_metrics(&submitted);

    for notice in notifications.sent() {
        println!(
            "  notification dispatched for {} with {} attachment(s)",
            notice.application.id.0,
            notice.attachments.len()
        );
    }

    if let Ok(summary) = serde_json::to_string_pretty(&submitted.summary_view()) {
        println!("\nDashboard summary\n{summary}");
    }

    Ok(())
}

fn print_validation(step: WizardStep, saved: &LoanApplication) {
    let validation = step_validation(step, &saved.draft());
    if validation.is_complete {
        println!("  all required fields present");
        return;
    }
    let labels: Vec<&str> = requirements()
        .iter()
        .filter(|requirement| validation.missing_fields.contains(&requirement.field))
        .map(|requirement| requirement.label)
        .collect();
    println!("  missing: {}", labels.join(", "));
}

fn print_metrics(application: &LoanApplication) {
    if let Some(ltv) = application.ltv.as_deref() {
        println!("  LTV {ltv}%");
    }
    if let Some(monthly_interest) = application.monthly_interest.as_deref() {
        println!("  first-month interest ${monthly_interest}");
    }
    if let Some(dscr) = application.dscr.as_deref() {
        println!("  DSCR {dscr}");
    }
}

fn quick_start_payload() -> ApplicationDraft {
    ApplicationDraft {
        loan_type: Some(LoanType::PermanentAcquisition),
        loan_amount: Some("3000000".to_string()),
        property_city: Some("Des Moines".to_string()),
        property_state: Some("IA".to_string()),
        ..ApplicationDraft::default()
    }
}

fn property_details_payload() -> ApplicationDraft {
    ApplicationDraft {
        property_name: Some("Court Avenue Lofts".to_string()),
        property_address: Some("401 Court Ave".to_string()),
        property_type: Some(PropertyType::Multifamily),
        square_footage: Some("42000".to_string()),
        units: Some("24".to_string()),
        year_built: Some("2001".to_string()),
        entity_name: Some("Court Avenue Holdings LLC".to_string()),
        borrower_type: Some(BorrowerType::Llc),
        contact_email: Some("gp@courtavenue.example".to_string()),
        contact_phone: Some("515-555-0188".to_string()),
        years_experience: Some("12".to_string()),
        projects_completed: Some("9".to_string()),
        ..ApplicationDraft::default()
    }
}

fn loan_specifics_payload() -> ApplicationDraft {
    ApplicationDraft {
        loan_specifics: Some(LoanSpecifics {
            property_value: Some("4000000".to_string()),
            interest_rate: Some("5.5".to_string()),
            rate_type: Some("fixed".to_string()),
            loan_term: Some("10".to_string()),
            amortization: Some("30".to_string()),
            prepayment_penalty: Some("stepdown".to_string()),
            recourse: Some("non-recourse".to_string()),
            annual_gross_income: Some("720000".to_string()),
            annual_operating_expenses: Some("270000".to_string()),
            ..LoanSpecifics::default()
        }),
        ..ApplicationDraft::default()
    }
}

fn financial_snapshot_payload() -> ApplicationDraft {
    ApplicationDraft {
        net_worth: Some("8500000".to_string()),
        liquid_assets: Some("1200000".to_string()),
        down_payment_source: Some(DownPaymentSource::Cash),
        credit_score: Some("740-779".to_string()),
        has_bankruptcy: Some(false),
        authorize_credit_pull: Some(true),
        ..ApplicationDraft::default()
    }
}

fn property_performance_payload() -> ApplicationDraft {
    ApplicationDraft {
        annual_noi: Some("450000".to_string()),
        occupancy: Some("92.5".to_string()),
        ..ApplicationDraft::default()
    }
}
