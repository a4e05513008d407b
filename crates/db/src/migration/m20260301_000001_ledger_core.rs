//! Ledger core migration.
//!
//! Creates the chart of accounts, general-ledger batches and entries,
//! exchange-rate observations and party settlements.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: GENERAL LEDGER
        // ============================================================
        db.execute_unprepared(GL_BATCHES_SQL).await?;
        db.execute_unprepared(GL_ENTRIES_SQL).await?;

        // ============================================================
        // PART 4: EXCHANGE RATES
        // ============================================================
        db.execute_unprepared(EXCHANGE_RATES_SQL).await?;

        // ============================================================
        // PART 5: SETTLEMENTS
        // ============================================================
        db.execute_unprepared(SETTLEMENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE account_class AS ENUM ('asset', 'liability', 'revenue', 'expense', 'equity');
CREATE TYPE party_kind AS ENUM ('customer', 'supplier', 'partner', 'employee');
CREATE TYPE rate_source AS ENUM ('manual', 'external');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    code            VARCHAR(32) PRIMARY KEY,
    name            VARCHAR(255) NOT NULL,
    class           account_class NOT NULL,
    parent_code     VARCHAR(32) REFERENCES accounts(code),
    is_active       BOOLEAN NOT NULL DEFAULT true
);

CREATE INDEX idx_accounts_parent ON accounts(parent_code) WHERE parent_code IS NOT NULL;
";

const GL_BATCHES_SQL: &str = r"
CREATE SEQUENCE gl_batch_code_seq;

CREATE TABLE gl_batches (
    id              BIGSERIAL PRIMARY KEY,
    source_type     VARCHAR(64) NOT NULL,
    source_id       BIGINT NOT NULL,
    purpose         VARCHAR(64) NOT NULL,
    currency        CHAR(3) NOT NULL,
    memo            TEXT NOT NULL DEFAULT '',
    entity_type     party_kind,
    entity_id       BIGINT,
    code            VARCHAR(32) NOT NULL UNIQUE,
    fx_audit        JSONB,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_gl_batches_source UNIQUE (source_type, source_id, purpose),
    CONSTRAINT chk_gl_batches_entity CHECK ((entity_type IS NULL) = (entity_id IS NULL))
);

CREATE INDEX idx_gl_batches_entity ON gl_batches(entity_type, entity_id)
    WHERE entity_type IS NOT NULL;
";

const GL_ENTRIES_SQL: &str = r"
CREATE TABLE gl_entries (
    id              BIGSERIAL PRIMARY KEY,
    batch_id        BIGINT NOT NULL REFERENCES gl_batches(id) ON DELETE CASCADE,
    account_code    VARCHAR(32) NOT NULL REFERENCES accounts(code),
    debit           NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit          NUMERIC(19, 4) NOT NULL DEFAULT 0,

    CONSTRAINT chk_gl_entries_non_negative CHECK (debit >= 0 AND credit >= 0),
    CONSTRAINT chk_gl_entries_one_side CHECK ((debit = 0) <> (credit = 0))
);

CREATE INDEX idx_gl_entries_batch ON gl_entries(batch_id);
CREATE INDEX idx_gl_entries_account ON gl_entries(account_code);
";

const EXCHANGE_RATES_SQL: &str = r"
CREATE TABLE exchange_rates (
    id              BIGSERIAL PRIMARY KEY,
    base_code       CHAR(3) NOT NULL,
    quote_code      CHAR(3) NOT NULL,
    rate            NUMERIC(19, 10) NOT NULL,
    valid_from      TIMESTAMPTZ NOT NULL,
    source          rate_source NOT NULL DEFAULT 'manual',
    is_active       BOOLEAN NOT NULL DEFAULT true,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_exchange_rates_positive CHECK (rate > 0),
    CONSTRAINT chk_exchange_rates_distinct CHECK (base_code <> quote_code)
);

CREATE INDEX idx_exchange_rates_lookup
    ON exchange_rates(base_code, quote_code, valid_from DESC)
    WHERE is_active;
";

const SETTLEMENTS_SQL: &str = r"
CREATE TABLE settlements (
    id                                  BIGSERIAL PRIMARY KEY,
    entity_type                         party_kind NOT NULL,
    entity_id                           BIGINT NOT NULL,
    previous_settlement_id              BIGINT REFERENCES settlements(id),
    period_start                        DATE NOT NULL,
    period_end                          DATE NOT NULL,
    opening_balance                     NUMERIC(19, 4) NOT NULL,
    rights_inventory                    NUMERIC(19, 4) NOT NULL DEFAULT 0,
    rights_sales_share                  NUMERIC(19, 4) NOT NULL DEFAULT 0,
    rights_pre_orders                   NUMERIC(19, 4) NOT NULL DEFAULT 0,
    rights_exchange                     NUMERIC(19, 4) NOT NULL DEFAULT 0,
    rights_services_rendered            NUMERIC(19, 4) NOT NULL DEFAULT 0,
    rights_returns                      NUMERIC(19, 4) NOT NULL DEFAULT 0,
    rights_total                        NUMERIC(19, 4) NOT NULL DEFAULT 0,
    obligations_sales                   NUMERIC(19, 4) NOT NULL DEFAULT 0,
    obligations_services                NUMERIC(19, 4) NOT NULL DEFAULT 0,
    obligations_damaged_goods           NUMERIC(19, 4) NOT NULL DEFAULT 0,
    obligations_expense_charge_backs    NUMERIC(19, 4) NOT NULL DEFAULT 0,
    obligations_returns                 NUMERIC(19, 4) NOT NULL DEFAULT 0,
    obligations_total                   NUMERIC(19, 4) NOT NULL DEFAULT 0,
    payments_in                         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    payments_out                        NUMERIC(19, 4) NOT NULL DEFAULT 0,
    payments_net                        NUMERIC(19, 4) NOT NULL DEFAULT 0,
    adjustments                         NUMERIC(19, 4) NOT NULL DEFAULT 0,
    closing_balance                     NUMERIC(19, 4) NOT NULL,
    is_approved                         BOOLEAN NOT NULL DEFAULT false,
    approved_by                         UUID,
    approved_at                         TIMESTAMPTZ,
    computed_at                         TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_settlements_period UNIQUE (entity_type, entity_id, period_start, period_end),
    CONSTRAINT chk_settlements_period CHECK (period_end >= period_start),
    CONSTRAINT chk_settlements_approval CHECK (
        is_approved = (approved_by IS NOT NULL AND approved_at IS NOT NULL)
    )
);

CREATE INDEX idx_settlements_entity ON settlements(entity_type, entity_id, period_end DESC);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS settlements;
DROP TABLE IF EXISTS exchange_rates;
DROP TABLE IF EXISTS gl_entries;
DROP TABLE IF EXISTS gl_batches;
DROP SEQUENCE IF EXISTS gl_batch_code_seq;
DROP TABLE IF EXISTS accounts;
DROP TYPE IF EXISTS rate_source;
DROP TYPE IF EXISTS party_kind;
DROP TYPE IF EXISTS account_class;
";
