use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::info;

use payoff_core::{Debt, LedgerEvent, PayoffObserver, PayoffService};

use super::{today, CliResult};
use crate::input;
use crate::store::JsonFileRepository;

/// Ledger file location shared by the mutating commands
#[derive(Args)]
pub struct LedgerArgs {
    /// JSON ledger file; created on first write
    #[arg(long, default_value = "ledger.json")]
    pub ledger: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    CreditCard,
    StudentLoan,
    AutoLoan,
    Mortgage,
    PersonalLoan,
    Medical,
    Other,
}

impl CategoryArg {
    fn as_str(self) -> &'static str {
        match self {
            CategoryArg::CreditCard => "credit_card",
            CategoryArg::StudentLoan => "student_loan",
            CategoryArg::AutoLoan => "auto_loan",
            CategoryArg::Mortgage => "mortgage",
            CategoryArg::PersonalLoan => "personal_loan",
            CategoryArg::Medical => "medical",
            CategoryArg::Other => "other",
        }
    }
}

/// Arguments for adding a debt to the ledger
#[derive(Args)]
pub struct AddDebtArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Path to a JSON/YAML debt object (flags override its fields)
    #[arg(long)]
    pub input: Option<String>,

    /// Unique debt id
    #[arg(long)]
    pub id: Option<String>,

    /// Display name (defaults to the id)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_enum)]
    pub category: Option<CategoryArg>,

    /// Balance owed today
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Balance when the debt was opened (defaults to --balance)
    #[arg(long)]
    pub original_balance: Option<Decimal>,

    /// Annual percentage rate as a decimal (0.2199 = 21.99%)
    #[arg(long)]
    pub apr: Option<Decimal>,

    /// Required monthly payment
    #[arg(long)]
    pub minimum_payment: Option<Decimal>,

    /// Day of month the payment is due
    #[arg(long)]
    pub due_day: Option<u32>,

    #[arg(long)]
    pub lender: Option<String>,

    /// Date the debt was opened (YYYY-MM-DD, default today)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

/// Arguments for removing a debt and its payment history
#[derive(Args)]
pub struct DeleteDebtArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Debt id to remove
    #[arg(long)]
    pub id: String,
}

/// Arguments for recording a payment against a debt
#[derive(Args)]
pub struct RecordPaymentArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Debt the payment applies to
    #[arg(long)]
    pub debt_id: String,

    /// Amount paid
    #[arg(long)]
    pub amount: Decimal,

    /// Payment date (YYYY-MM-DD, default today)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    #[arg(long)]
    pub notes: Option<String>,
}

/// Collects every ledger event the service publishes during one command.
#[derive(Default)]
struct EventLog {
    events: Rc<RefCell<Vec<LedgerEvent>>>,
}

impl PayoffObserver for EventLog {
    fn on_ledger_event(&mut self, event: &LedgerEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

fn open_service(
    args: &LedgerArgs,
) -> CliResult<(PayoffService<JsonFileRepository>, Rc<RefCell<Vec<LedgerEvent>>>)> {
    let mut service = PayoffService::new(JsonFileRepository::new(&args.ledger))?;
    let log = EventLog::default();
    let events = Rc::clone(&log.events);
    service.subscribe(Box::new(log));
    Ok((service, events))
}

fn events_value(events: &Rc<RefCell<Vec<LedgerEvent>>>) -> CliResult<Value> {
    Ok(serde_json::to_value(&*events.borrow())?)
}

pub fn run_add_debt(args: AddDebtArgs) -> CliResult<Value> {
    let doc = if args.input.is_some() {
        input::load_document(args.input.as_deref())?
    } else {
        json!({})
    };
    let original = args.original_balance.or(args.balance);
    let doc = input::apply_overrides(
        doc,
        vec![
            ("id", args.id.clone().map(Value::String)),
            ("name", args.name.or(args.id).map(Value::String)),
            ("category", args.category.map(|c| json!(c.as_str()))),
            ("current_balance", args.balance.map(|v| json!(v.to_string()))),
            ("original_balance", original.map(|v| json!(v.to_string()))),
            ("apr", args.apr.map(|v| json!(v.to_string()))),
            (
                "minimum_payment",
                args.minimum_payment.map(|v| json!(v.to_string())),
            ),
            ("due_day", args.due_day.map(|v| json!(v))),
            ("lender", args.lender.map(Value::String)),
            ("start_date", args.start_date.map(|d| json!(d.to_string()))),
        ],
    )?;
    let doc = default_field(doc, "start_date", json!(today().to_string()));
    let debt: Debt = input::into_input(doc)?;

    let (mut service, events) = open_service(&args.ledger)?;
    service.add_debt(debt)?;
    info!(ledger = %args.ledger.ledger, "debt added");
    Ok(json!({
        "ledger": args.ledger.ledger,
        "events": events_value(&events)?,
        "debts": service.ledger().debts().len(),
    }))
}

pub fn run_delete_debt(args: DeleteDebtArgs) -> CliResult<Value> {
    let (mut service, events) = open_service(&args.ledger)?;
    service.delete_debt(&args.id)?;
    Ok(json!({
        "ledger": args.ledger.ledger,
        "events": events_value(&events)?,
        "debts": service.ledger().debts().len(),
    }))
}

pub fn run_record_payment(args: RecordPaymentArgs) -> CliResult<Value> {
    let (mut service, events) = open_service(&args.ledger)?;
    let record = service.record_payment(
        &args.debt_id,
        args.amount,
        args.date.unwrap_or_else(today),
        args.notes,
    )?;
    Ok(json!({
        "ledger": args.ledger.ledger,
        "payment": record,
        "events": events_value(&events)?,
    }))
}

fn default_field(mut doc: Value, key: &str, value: Value) -> Value {
    if let Some(map) = doc.as_object_mut() {
        map.entry(key.to_string()).or_insert(value);
    }
    doc
}
