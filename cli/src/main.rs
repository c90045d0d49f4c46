pub mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::Instrument;
use uuid::Uuid;

use booking::{
    availability::SlotsState,
    config::AppConfig,
    db::Db,
    flow::{BookingFlow, SubmitOutcome, lookup::LookupOutcome},
    logger::{TraceId, annotate_span, init_tracing, root_span},
    model::{AddOn, Slot, Venue},
    payment::{CheckoutGateway, CheckoutOutcome, CheckoutRequest},
    pricing::{BalanceStatus, PriceSummary},
    repository::{
        BookingRepository, repository_rest::RestBookingRepository,
        repository_sqlx::SqlxBookingRepository,
    },
};
use cli::{BookArgs, Cli, Command, Extras};

/// Checkout stand-in for the terminal. The advance is collected out of band
/// and its reference passed on the command line.
struct ManualCheckout {
    payment_ref: Option<String>,
}

#[async_trait::async_trait]
impl CheckoutGateway for ManualCheckout {
    async fn open(&self, request: CheckoutRequest) -> anyhow::Result<CheckoutOutcome> {
        tracing::info!(
            order = %request.order_reference,
            amount_minor = request.amount_minor,
            currency = %request.currency,
            "checkout requested"
        );

        Ok(match &self.payment_ref {
            Some(r) => CheckoutOutcome::Completed {
                payment_ref: r.clone(),
            },
            None => CheckoutOutcome::Dismissed,
        })
    }
}

async fn connect_sql(cfg: &AppConfig) -> anyhow::Result<SqlxBookingRepository> {
    let db = Db::connect(&cfg.database_url)
        .await
        .with_context(|| format!("connect {}", cfg.database_url))?;
    db.migrate().await?;
    Ok(SqlxBookingRepository::new(db.pool))
}

async fn seed<R: BookingRepository>(repo: &R) -> anyhow::Result<Uuid> {
    let venue = Venue {
        id: Uuid::new_v4(),
        name: "Private Theatre".into(),
        price: 1_999,
        decoration_fee: 499,
        base_members: 6,
    };
    repo.insert_venue(&venue).await?;

    for (start, end) in [
        ("10:00", "13:00"),
        ("13:30", "16:30"),
        ("17:00", "20:00"),
        ("20:30", "23:30"),
    ] {
        let slot = Slot {
            id: Uuid::new_v4(),
            start_time: start.into(),
            end_time: end.into(),
        };
        repo.insert_slot(&venue.id, &slot).await?;
    }

    for (name, price) in [("Cake", 600), ("Fog entry", 400), ("Rose bouquet", 450)] {
        let add_on = AddOn {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
        };
        repo.insert_add_on(&add_on).await?;
    }

    Ok(venue.id)
}

fn apply_extras<R: BookingRepository>(flow: &BookingFlow<R>, extras: &Extras) -> anyhow::Result<()> {
    flow.set_decoration(extras.decoration);
    for id in &extras.add_ons {
        if !flow.toggle_add_on(*id)? {
            // listed twice on the command line; keep it selected
            flow.toggle_add_on(*id)?;
        }
    }
    Ok(())
}

fn print_summary(venue: &Venue, s: &PriceSummary, cfg: &AppConfig) {
    println!("{}", venue.name);
    println!("  venue price      {:>8}", s.base_price);
    if s.decoration_charge > 0 {
        println!("  decoration       {:>8}", s.decoration_charge);
    }
    if s.add_ons_total > 0 {
        println!("  add-ons          {:>8}", s.add_ons_total);
    }
    println!("  total            {:>8}", s.total);
    println!(
        "  advance          {:>8}  (includes {} convenience fee)",
        s.advance, cfg.convenience_fee
    );
    match s.balance_status() {
        BalanceStatus::Due(b) => println!("  balance          {b:>8}"),
        BalanceStatus::Settled => println!("  balance          settled"),
        BalanceStatus::AdvanceExceedsTotal(b) => {
            println!("  balance          {b:>8}  (advance exceeds total)")
        }
    }
    println!("  Final amount negotiable, to be paid at venue.");
}

fn print_slots<R: BookingRepository>(flow: &BookingFlow<R>) -> anyhow::Result<()> {
    match flow.slots_state() {
        SlotsState::Ready { .. } => {
            for view in flow.slot_views()? {
                println!("{}  {}", view.slot_id, view.label());
            }
        }
        SlotsState::Failed { message, .. } => println!("{message}"),
        other => {
            if let Some(hint) = other.hint() {
                println!("{hint}");
            }
        }
    }
    Ok(())
}

async fn slots<R: BookingRepository>(
    repo: Arc<R>,
    cfg: AppConfig,
    venue: Uuid,
    date: chrono::NaiveDate,
) -> anyhow::Result<()> {
    annotate_span(&venue, Some(&date));

    let flow = BookingFlow::open(repo, venue, cfg).await?;
    flow.select_date(date).await?;
    print_slots(&flow)
}

async fn quote<R: BookingRepository>(
    repo: Arc<R>,
    cfg: AppConfig,
    venue: Uuid,
    extras: Extras,
) -> anyhow::Result<()> {
    annotate_span(&venue, None);

    let flow = BookingFlow::open(repo, venue, cfg.clone()).await?;
    apply_extras(&flow, &extras)?;
    print_summary(flow.venue(), &flow.summary()?, &cfg);
    Ok(())
}

async fn book<R: BookingRepository>(
    repo: Arc<R>,
    cfg: AppConfig,
    args: BookArgs,
) -> anyhow::Result<()> {
    annotate_span(&args.venue, Some(&args.date));

    let flow = BookingFlow::open(repo, args.venue, cfg.clone()).await?;

    if let LookupOutcome::Applied(state) = flow.select_date(args.date).await? {
        if !matches!(state, SlotsState::Ready { .. }) {
            print_slots(&flow)?;
            anyhow::bail!("no slot can be booked on {}", args.date);
        }
    }
    if let Some(slot) = args.slot {
        flow.select_slot(slot)?;
    }

    flow.set_booking_name(args.name);
    flow.set_persons(args.persons);
    flow.set_whatsapp(args.whatsapp);
    flow.set_email(args.email);
    apply_extras(&flow, &args.extras)?;

    print_summary(flow.venue(), &flow.summary()?, &cfg);

    let checkout = ManualCheckout {
        payment_ref: args.payment_ref,
    };
    match flow.submit(&checkout).await {
        Ok(SubmitOutcome::Confirmed {
            booking_id,
            payment_ref,
        }) => {
            println!("Booking confirmed: {booking_id} (payment {payment_ref})");
        }
        Ok(SubmitOutcome::PendingPayment { booking_id }) => {
            println!("Booking {booking_id} saved; advance not yet paid, slot not held.");
        }
        Err(e) => {
            println!("{}", e.user_message());
            return Err(e.into());
        }
    }

    Ok(())
}

async fn run<R: BookingRepository>(repo: Arc<R>, cfg: AppConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::InitDb => {
            tracing::info!("schema ready");
        }
        Command::Seed => {
            let venue_id = seed(repo.as_ref()).await?;
            println!("{venue_id}");
        }
        Command::Slots { venue, date } => slots(repo, cfg, venue, date).await?,
        Command::Quote { venue, extras } => quote(repo, cfg, venue, extras).await?,
        Command::Book(args) => book(repo, cfg, args).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    let cfg = AppConfig::from_env();
    let span = root_span("venue-booking", &TraceId::default());

    async move {
        match cfg.remote_store() {
            Some((url, key)) => {
                if matches!(cli.command, Command::InitDb) {
                    anyhow::bail!("init-db applies to DATABASE_URL, not the remote store");
                }
                let repo = Arc::new(RestBookingRepository::new(url, key)?);
                run(repo, cfg, cli.command).await
            }
            None => {
                let repo = Arc::new(connect_sql(&cfg).await?);
                run(repo, cfg, cli.command).await
            }
        }
    }
    .instrument(span)
    .await
}
