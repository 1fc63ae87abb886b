//! Initial database migration.
//!
//! Creates tenants, documents, the append-only status history, share
//! tokens, and the code sequence counters.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        db.execute_unprepared(STATUS_HISTORY_SQL).await?;
        db.execute_unprepared(SHARE_TOKENS_SQL).await?;
        db.execute_unprepared(CODE_SEQUENCES_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id              UUID PRIMARY KEY,
    name            VARCHAR(255) NOT NULL,
    slug            VARCHAR(100) NOT NULL UNIQUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id                  UUID PRIMARY KEY,
    tenant_id           UUID NOT NULL REFERENCES tenants(id) ON DELETE RESTRICT,
    kind                VARCHAR(20) NOT NULL CHECK (kind IN ('budget', 'invoice', 'service')),
    code                VARCHAR(64) NOT NULL,
    status              VARCHAR(32) NOT NULL,
    title               VARCHAR(255) NOT NULL,
    total_amount        NUMERIC(19, 4) NOT NULL DEFAULT 0,
    customer_reference  VARCHAR(255),
    source_document_id  UUID REFERENCES documents(id) ON DELETE SET NULL,
    created_by          UUID,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_documents_tenant_code UNIQUE (tenant_id, code)
);

CREATE INDEX idx_documents_tenant_kind_status ON documents(tenant_id, kind, status);
CREATE INDEX idx_documents_tenant_created ON documents(tenant_id, created_at DESC);
";

const STATUS_HISTORY_SQL: &str = r"
CREATE TABLE document_status_history (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL REFERENCES tenants(id) ON DELETE RESTRICT,
    document_id     UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    from_status     VARCHAR(32) NOT NULL,
    to_status       VARCHAR(32) NOT NULL,
    actor_type      VARCHAR(16) NOT NULL CHECK (actor_type IN ('user', 'share', 'system')),
    actor_id        UUID,
    comment         TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_history_actor_id CHECK ((actor_type = 'system') = (actor_id IS NULL))
);

CREATE INDEX idx_status_history_document ON document_status_history(tenant_id, document_id, created_at, id);
";

const SHARE_TOKENS_SQL: &str = r"
CREATE TABLE share_tokens (
    id                  UUID PRIMARY KEY,
    tenant_id           UUID NOT NULL REFERENCES tenants(id) ON DELETE RESTRICT,
    resource_type       VARCHAR(20) NOT NULL,
    resource_id         UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    token_hash          CHAR(64) NOT NULL UNIQUE,
    recipient_email     VARCHAR(255),
    recipient_name      VARCHAR(255),
    message             TEXT,
    permissions         JSONB NOT NULL DEFAULT '[]'::jsonb,
    issued_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    expires_at          TIMESTAMPTZ,
    is_active           BOOLEAN NOT NULL DEFAULT TRUE,
    revoked_at          TIMESTAMPTZ,
    replaced_by         UUID REFERENCES share_tokens(id) ON DELETE SET NULL,
    access_count        BIGINT NOT NULL DEFAULT 0 CHECK (access_count >= 0),
    last_accessed_at    TIMESTAMPTZ,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_share_revoked_inactive CHECK (revoked_at IS NULL OR is_active = FALSE)
);

CREATE INDEX idx_share_tokens_resource ON share_tokens(tenant_id, resource_type, resource_id);
CREATE INDEX idx_share_tokens_expires ON share_tokens(expires_at) WHERE expires_at IS NOT NULL;
";

const CODE_SEQUENCES_SQL: &str = r"
CREATE TABLE code_sequences (
    tenant_id       UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    prefix          VARCHAR(10) NOT NULL,
    period          CHAR(7) NOT NULL,
    last_value      BIGINT NOT NULL CHECK (last_value > 0),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (tenant_id, prefix, period)
);
";

const TRIGGERS_SQL: &str = r"
-- History rows only disappear together with their document.
CREATE OR REPLACE FUNCTION prevent_status_history_mutation()
RETURNS TRIGGER AS $$
BEGIN
    IF TG_OP = 'DELETE' AND NOT EXISTS (
        SELECT 1 FROM documents WHERE id = OLD.document_id
    ) THEN
        RETURN OLD;
    END IF;

    RAISE EXCEPTION 'document_status_history is append-only'
        USING ERRCODE = 'restrict_violation';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_status_history_append_only
    BEFORE UPDATE OR DELETE ON document_status_history
    FOR EACH ROW EXECUTE FUNCTION prevent_status_history_mutation();

-- A revoked share stays revoked.
CREATE OR REPLACE FUNCTION prevent_share_reactivation()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.is_active = FALSE AND NEW.is_active = TRUE THEN
        RAISE EXCEPTION 'share token % cannot be reactivated', OLD.id
            USING ERRCODE = 'check_violation';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_share_tokens_no_reactivation
    BEFORE UPDATE ON share_tokens
    FOR EACH ROW EXECUTE FUNCTION prevent_share_reactivation();

-- Tenant and code never change after insert.
CREATE OR REPLACE FUNCTION prevent_document_identity_change()
RETURNS TRIGGER AS $$
BEGIN
    IF NEW.tenant_id <> OLD.tenant_id OR NEW.code <> OLD.code OR NEW.kind <> OLD.kind THEN
        RAISE EXCEPTION 'document % tenant, kind and code are immutable', OLD.id
            USING ERRCODE = 'check_violation';
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_documents_identity_immutable
    BEFORE UPDATE ON documents
    FOR EACH ROW EXECUTE FUNCTION prevent_document_identity_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_documents_identity_immutable ON documents;
DROP TRIGGER IF EXISTS trg_share_tokens_no_reactivation ON share_tokens;
DROP TRIGGER IF EXISTS trg_status_history_append_only ON document_status_history;
DROP FUNCTION IF EXISTS prevent_document_identity_change();
DROP FUNCTION IF EXISTS prevent_share_reactivation();
DROP FUNCTION IF EXISTS prevent_status_history_mutation();

DROP TABLE IF EXISTS code_sequences CASCADE;
DROP TABLE IF EXISTS share_tokens CASCADE;
DROP TABLE IF EXISTS document_status_history CASCADE;
DROP TABLE IF EXISTS documents CASCADE;
DROP TABLE IF EXISTS tenants CASCADE;
";
