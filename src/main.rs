use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use loan_intake::config::AppConfig;
use loan_intake::error::AppError;
use loan_intake::telemetry;
use loan_intake::wizard::{
    ApiClient, ApplicationSnapshot, DraftStore, FieldKey, FileDraftStore, LoanCategory, LoanWizard,
    WizardError, WizardStep,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "loan-intake",
    about = "Run the gated loan-application wizard from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through the application wizard interactively (default command)
    Run(RunArgs),
    /// Inspect or discard the locally saved draft
    Draft {
        #[command(subcommand)]
        command: DraftCommand,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Override the configured API base address
    #[arg(long)]
    api_url: Option<String>,
    /// Override the configured draft file path
    #[arg(long)]
    draft_path: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
enum DraftCommand {
    /// Print the saved draft as JSON
    Show,
    /// Remove the saved draft
    Clear,
}

type CliWizard = LoanWizard<ApiClient, ApiClient, ApiClient, ApiClient, FileDraftStore>;
type Lines<'a> = io::Lines<io::StdinLock<'a>>;

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => run_wizard(args),
        Command::Draft { command } => run_draft(command),
    }
}

fn run_draft(command: DraftCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = FileDraftStore::new(config.draft_path);

    match command {
        DraftCommand::Show => match store.load() {
            Some(snapshot) => {
                let rendered = serde_json::to_string_pretty(&snapshot)
                    .unwrap_or_else(|_| "<unrenderable draft>".to_string());
                println!("{rendered}");
            }
            None => println!("no saved draft"),
        },
        DraftCommand::Clear => {
            store
                .clear()
                .map_err(|err| AppError::Io(io::Error::other(err.to_string())))?;
            println!("draft cleared");
        }
    }
    Ok(())
}

fn run_wizard(mut args: RunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(api_url) = args.api_url.take() {
        config.api.base_url = api_url;
    }
    if let Some(path) = args.draft_path.take() {
        config.draft_path = path;
    }

    telemetry::init(&config.telemetry)?;
    info!(base_url = %config.api.base_url, "loan intake wizard starting");

    let client = Arc::new(ApiClient::new(config.api.base_url.clone())?);
    let draft = FileDraftStore::new(config.draft_path);
    let mut wizard: CliWizard = LoanWizard::new(
        client.clone(),
        client.clone(),
        client.clone(),
        client,
        draft,
        config.sync.debounce,
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        // Let any quiet-period sync fire between prompts.
        wizard.flush_sync(Instant::now());

        if wizard.is_submitted() {
            break;
        }

        let step = wizard.current_step();
        println!();
        println!("-- Step {} of 4: {} --", step.number(), step.label());

        let outcome = match step {
            WizardStep::Contact => contact_step(&mut wizard, &mut lines),
            WizardStep::Identity => identity_step(&mut wizard, &mut lines),
            WizardStep::Financial => financial_step(&mut wizard, &mut lines),
            WizardStep::Review => review_step(&mut wizard, &mut lines),
        };

        match outcome {
            Ok(true) => continue,
            Ok(false) => break,
            Err(err) => println!("  ! {err}"),
        }
    }

    if let Some(summary) = wizard.summary() {
        println!();
        println!("Application submitted. Summary:");
        println!("  mobile:    {}", summary.phone_number);
        println!("  PIN code:  {}", summary.postal_code);
        println!("  PAN:       {}", summary.tax_id);
        println!("  category:  {}", summary.loan_category.label());
        println!("  amount:    {}", summary.requested_amount);
    }

    Ok(())
}

fn apply_field(wizard: &mut CliWizard, key: FieldKey, value: &str) {
    if let Err(err) = wizard.update_field(key, value, Instant::now()) {
        println!("  ! {err}");
    }
}

fn contact_step(wizard: &mut CliWizard, lines: &mut Lines<'_>) -> Result<bool, WizardError> {
    let Some(mobile) = read_line(lines, "Mobile number") else {
        return Ok(false);
    };
    apply_field(wizard, FieldKey::PhoneNumber, &mobile);

    while !wizard.snapshot().challenge_verified {
        let puzzle = match wizard.challenge_puzzle() {
            Some(puzzle) => puzzle.clone(),
            None => match wizard.request_challenge() {
                Ok(puzzle) => puzzle,
                Err(err) => {
                    println!("  ! {err}");
                    if read_line(lines, "Press Enter to retry").is_none() {
                        return Ok(false);
                    }
                    continue;
                }
            },
        };
        println!("  challenge: {}", puzzle.challenge);
        let Some(guess) = read_line(lines, "Enter the code") else {
            return Ok(false);
        };
        if let Err(err) = wizard.submit_challenge_guess(&guess, Instant::now()) {
            println!("  ! {err}");
        }
    }

    wizard.advance()?;
    Ok(true)
}

fn identity_step(wizard: &mut CliWizard, lines: &mut Lines<'_>) -> Result<bool, WizardError> {
    let Some(pin) = read_line(lines, "PIN code") else {
        return Ok(false);
    };
    apply_field(wizard, FieldKey::PostalCode, &pin);

    let Some(pan) = read_line(lines, "PAN number") else {
        return Ok(false);
    };
    apply_field(wizard, FieldKey::TaxId, &pan);

    let Some(name) = read_line(lines, "Name as on PAN (optional)") else {
        return Ok(false);
    };
    if !name.is_empty() {
        apply_field(wizard, FieldKey::HolderName, &name);
    }

    if let Err(err) = wizard.verify_tax_id(Instant::now()) {
        println!("  ! {err}");
    }

    wizard.advance()?;
    Ok(true)
}

fn financial_step(wizard: &mut CliWizard, lines: &mut Lines<'_>) -> Result<bool, WizardError> {
    let Some(category) = read_line(lines, "Category (Salaried/Business)") else {
        return Ok(false);
    };
    apply_field(wizard, FieldKey::LoanCategory, &category);

    let fields: &[(FieldKey, &str)] = match wizard.snapshot().loan_category {
        LoanCategory::Salaried => &[
            (FieldKey::AnnualIncome, "Annual income"),
            (FieldKey::RequestedAmount, "Loan amount required"),
            (FieldKey::HasRetirementFund, "Do you have PF? (Yes/No)"),
            (FieldKey::JobTitle, "Designation"),
        ],
        LoanCategory::Business => &[
            (FieldKey::HasTaxRegistration, "Do you have GST? (Yes/No)"),
            (
                FieldKey::HasBusinessProof,
                "Business registration proof? (Yes/No)",
            ),
            (FieldKey::RequestedAmount, "Loan amount required"),
        ],
        LoanCategory::Unset => &[],
    };

    for &(key, label) in fields {
        let Some(value) = read_line(lines, label) else {
            return Ok(false);
        };
        apply_field(wizard, key, &value);
    }

    wizard.advance()?;
    Ok(true)
}

fn review_step(wizard: &mut CliWizard, lines: &mut Lines<'_>) -> Result<bool, WizardError> {
    print_review(wizard.snapshot());
    let Some(answer) = read_line(lines, "Submit now? (yes/back)") else {
        return Ok(false);
    };
    if answer.eq_ignore_ascii_case("back") {
        wizard.go_back()?;
        return Ok(true);
    }

    wizard.submit()?;
    Ok(true)
}

fn print_review(snapshot: &ApplicationSnapshot) {
    println!("  mobile:   {}", snapshot.phone_number);
    println!("  PIN code: {}", snapshot.postal_code);
    println!("  PAN:      {}", snapshot.tax_id);
    println!("  category: {}", snapshot.loan_category.label());
    println!("  amount:   {}", snapshot.requested_amount);
}

fn read_line(lines: &mut Lines<'_>, label: &str) -> Option<String> {
    print!("{label}: ");
    if io::stdout().flush().is_err() {
        return None;
    }
    match lines.next() {
        Some(Ok(line)) => Some(line.trim().to_string()),
        Some(Err(err)) => {
            eprintln!("input error: {err}");
            None
        }
        None => None,
    }
}
