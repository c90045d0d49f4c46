use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[clap(name = "venue-booking", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the SQL schema if it does not exist
    InitDb,

    /// Insert a demo venue with slots and add-ons; prints the venue id
    Seed,

    /// List slots still open for a date
    Slots {
        #[clap(long)]
        venue: Uuid,

        /// YYYY-MM-DD
        #[clap(long)]
        date: NaiveDate,
    },

    /// Price summary for a venue and selection
    Quote {
        #[clap(long)]
        venue: Uuid,

        #[clap(flatten)]
        extras: Extras,
    },

    /// Place a booking and collect the advance
    Book(BookArgs),
}

#[derive(Debug, Args)]
pub struct Extras {
    #[clap(long)]
    pub decoration: bool,

    /// Add-on id; repeat for several
    #[clap(long = "add-on")]
    pub add_ons: Vec<Uuid>,
}

#[derive(Debug, Args)]
pub struct BookArgs {
    #[clap(long)]
    pub venue: Uuid,

    #[clap(long)]
    pub date: NaiveDate,

    /// Slot id; defaults to the earliest open slot
    #[clap(long)]
    pub slot: Option<Uuid>,

    #[clap(long)]
    pub name: String,

    #[clap(long, default_value_t = 1)]
    pub persons: u32,

    #[clap(long)]
    pub whatsapp: String,

    #[clap(long)]
    pub email: String,

    #[clap(flatten)]
    pub extras: Extras,

    /// Reference of an advance already collected. Without it the booking is
    /// left pending.
    #[clap(long)]
    pub payment_ref: Option<String>,
}
