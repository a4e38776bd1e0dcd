//! SQLite implementation of the storage port — pool setup, migrations,
//! queries.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::models::{
    ContributionRecord, CycleRecord, EquityRecord, PotRecord, RefundRecord, CYCLE_ACTIVE,
    CYCLE_CLOSED, FREQ_RECURRING, POT_CLOSED, POT_OPEN,
};
use crate::store::Store;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Establish the connection pool and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite:{database_url}")
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied successfully");
        Ok(SqliteStore { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_pot(&self, pot: &PotRecord, first_cycle: &CycleRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO pots
                (id, slug, name, objective_cents, amount_mode, fixed_amount_cents, tiers,
                 frequency, cycle_duration_days, solidarity_threshold_cents,
                 solidarity_rate_bps, reserve_target_cents, reserve_balance_cents,
                 current_cycle, status, ends_at, closed_at, owner_token, pin, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20)
            "#,
        )
        .bind(&pot.id)
        .bind(&pot.slug)
        .bind(&pot.name)
        .bind(pot.objective_cents)
        .bind(&pot.amount_mode)
        .bind(pot.fixed_amount_cents)
        .bind(&pot.tiers)
        .bind(&pot.frequency)
        .bind(pot.cycle_duration_days)
        .bind(pot.solidarity_threshold_cents)
        .bind(pot.solidarity_rate_bps)
        .bind(pot.reserve_target_cents)
        .bind(pot.reserve_balance_cents)
        .bind(pot.current_cycle)
        .bind(&pot.status)
        .bind(pot.ends_at)
        .bind(pot.closed_at)
        .bind(&pot.owner_token)
        .bind(&pot.pin)
        .bind(pot.created_at)
        .execute(&mut *tx)
        .await?;

        insert_cycle(&mut tx, first_cycle).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_pot(&self, slug: &str) -> Result<Option<PotRecord>> {
        let row = sqlx::query_as::<_, PotRecord>("SELECT * FROM pots WHERE slug = ?1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn close_pot(&self, pot_id: &str, closed_at: i64) -> Result<bool> {
        let rows_affected = sqlx::query(
            "UPDATE pots SET status = ?1, closed_at = ?2 WHERE id = ?3 AND status = ?4",
        )
        .bind(POT_CLOSED)
        .bind(closed_at)
        .bind(pot_id)
        .bind(POT_OPEN)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected == 1)
    }

    async fn set_reserve_balance(&self, pot_id: &str, balance_cents: i64) -> Result<()> {
        sqlx::query("UPDATE pots SET reserve_balance_cents = ?1 WHERE id = ?2")
            .bind(balance_cents)
            .bind(pot_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn advance_current_cycle(&self, pot_id: &str, cycle_number: i64) -> Result<()> {
        sqlx::query("UPDATE pots SET current_cycle = ?1 WHERE id = ?2")
            .bind(cycle_number)
            .bind(pot_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_contribution(&self, contribution: &ContributionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contributions
                (id, pot_id, cycle_number, amount_suggested_cents, amount_paid_cents,
                 email, display_name, is_anonymous, contrib_token, paid_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&contribution.id)
        .bind(&contribution.pot_id)
        .bind(contribution.cycle_number)
        .bind(contribution.amount_suggested_cents)
        .bind(contribution.amount_paid_cents)
        .bind(&contribution.email)
        .bind(&contribution.display_name)
        .bind(contribution.is_anonymous)
        .bind(&contribution.contrib_token)
        .bind(contribution.paid_at)
        .bind(contribution.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_contributions(
        &self,
        pot_id: &str,
        cycle_number: i64,
    ) -> Result<Vec<ContributionRecord>> {
        let rows = sqlx::query_as::<_, ContributionRecord>(
            r#"
            SELECT * FROM contributions
            WHERE  pot_id = ?1 AND cycle_number = ?2
            ORDER  BY paid_at ASC, id ASC
            "#,
        )
        .bind(pot_id)
        .bind(cycle_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn open_cycle(&self, cycle: &CycleRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        insert_cycle(&mut tx, cycle).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn active_cycle(&self, pot_id: &str) -> Result<Option<CycleRecord>> {
        let row = sqlx::query_as::<_, CycleRecord>(
            "SELECT * FROM cycles WHERE pot_id = ?1 AND status = ?2",
        )
        .bind(pot_id)
        .bind(CYCLE_ACTIVE)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn close_cycle(&self, pot_id: &str, cycle_number: i64, ended_at: i64) -> Result<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE cycles SET status = ?1, ended_at = ?2
            WHERE  pot_id = ?3 AND cycle_number = ?4 AND status = ?5
            "#,
        )
        .bind(CYCLE_CLOSED)
        .bind(ended_at)
        .bind(pot_id)
        .bind(cycle_number)
        .bind(CYCLE_ACTIVE)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected == 1)
    }

    async fn insert_refunds(&self, refunds: &[RefundRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for refund in refunds {
            sqlx::query(
                r#"
                INSERT INTO refunds
                    (id, pot_id, contribution_id, cycle_number, amount_cents, status,
                     processed_at, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&refund.id)
            .bind(&refund.pot_id)
            .bind(&refund.contribution_id)
            .bind(refund.cycle_number)
            .bind(refund.amount_cents)
            .bind(&refund.status)
            .bind(refund.processed_at)
            .bind(refund.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_equity_entries(&self, entries: &[EquityRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO equity_ledger
                    (id, pot_id, contribution_id, cycle_number, balance_cents, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.pot_id)
            .bind(&entry.contribution_id)
            .bind(entry.cycle_number)
            .bind(entry.balance_cents)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn pots_with_expired_cycles(&self, now: i64) -> Result<Vec<PotRecord>> {
        let rows = sqlx::query_as::<_, PotRecord>(
            r#"
            SELECT p.* FROM pots p
            JOIN   cycles c ON c.pot_id = p.id AND c.status = ?1
            WHERE  p.status = ?2 AND p.frequency = ?3 AND c.ends_at <= ?4
            "#,
        )
        .bind(CYCLE_ACTIVE)
        .bind(POT_OPEN)
        .bind(FREQ_RECURRING)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn insert_cycle(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    cycle: &CycleRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cycles
            (id, pot_id, cycle_number, objective_cents, status, started_at, ends_at,
             ended_at, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&cycle.id)
    .bind(&cycle.pot_id)
    .bind(cycle.cycle_number)
    .bind(cycle.objective_cents)
    .bind(&cycle.status)
    .bind(cycle.started_at)
    .bind(cycle.ends_at)
    .bind(cycle.ended_at)
    .bind(cycle.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
