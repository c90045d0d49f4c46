use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Venues
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS venues (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  price BIGINT NOT NULL,
  decoration_fee BIGINT NOT NULL DEFAULT 0,
  base_members BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Slots; start/end are venue-local HH:MM[:SS]
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS slots (
  id TEXT PRIMARY KEY,
  venue_id TEXT NOT NULL,
  start_time TEXT NOT NULL,
  end_time TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Bookings
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS bookings (
  id TEXT PRIMARY KEY,
  venue_id TEXT NOT NULL,
  slot_id TEXT NOT NULL,
  booking_date TEXT NOT NULL,
  booking_name TEXT NOT NULL,
  persons BIGINT NOT NULL,
  whatsapp TEXT NOT NULL,
  email TEXT NOT NULL,
  decoration INTEGER NOT NULL DEFAULT 0 CHECK (decoration IN (0,1)),
  add_on_ids TEXT NOT NULL DEFAULT '[]',
  advance_paid INTEGER NOT NULL DEFAULT 0 CHECK (advance_paid IN (0,1)),
  payment_id TEXT,
  created_ms BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Add-ons
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS add_ons (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  price BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_slots_venue ON slots(venue_id, start_time);"#)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_bookings_venue_date ON bookings(venue_id, booking_date);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
