/// Generate SQL migrations for the PostgreSQL protocol store
///
/// These migrations create the tables, constraints and indexes used by the
/// protocol store and the user directory. Each entry is applied once, in
/// order, and recorded in `schema_migrations`.
pub fn generate_migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "20250101000000_initial_schema",
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY,
                role TEXT NOT NULL CHECK (role IN ('admin', 'intake', 'funeral_home', 'notary', 'declarant')),
                group_id BIGINT,
                access_revoked BOOLEAN NOT NULL DEFAULT FALSE,
                revoked_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS protocols (
                id UUID PRIMARY KEY,
                status TEXT NOT NULL CHECK (status IN (
                    'creating', 'awaiting_validation', 'awaiting_attendance',
                    'awaiting_faf_signatures', 'parallel_execution', 'finalized',
                    'closed', 'cancelled'
                )),
                burial_status TEXT NOT NULL DEFAULT 'not_started'
                    CHECK (burial_status IN ('not_started', 'in_progress', 'done')),
                documentation_status TEXT NOT NULL DEFAULT 'not_started'
                    CHECK (documentation_status IN (
                        'not_started', 'awaiting_draft', 'awaiting_declarant_approval',
                        'awaiting_correction', 'draft_rejection_timeout',
                        'awaiting_certificate_issuance', 'awaiting_certificate_pickup', 'done'
                    )),
                deceased_full_name TEXT NOT NULL,
                deceased_birth_date DATE NOT NULL,
                deceased_mother_name TEXT,
                deceased_cpf TEXT,
                death_at TIMESTAMPTZ,
                burial_scheduled_at TIMESTAMPTZ,
                creator_id BIGINT NOT NULL,
                group_id BIGINT,
                funeral_home_id BIGINT,
                notary_id BIGINT,
                declarant_id BIGINT,
                draft_rejection_count INTEGER NOT NULL DEFAULT 0 CHECK (draft_rejection_count >= 0),
                draft_rejection_remarks TEXT,
                pickup_predicted_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                finalized_at TIMESTAMPTZ,
                closed_at TIMESTAMPTZ,
                documents_purged_at TIMESTAMPTZ
            );

            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                protocol_id UUID NOT NULL REFERENCES protocols(id) ON DELETE CASCADE,
                kind TEXT NOT NULL CHECK (kind IN (
                    'death_declaration', 'faf', 'draft', 'final_certificate', 'supporting'
                )),
                storage_ref TEXT NOT NULL,
                original_name TEXT NOT NULL,
                content_type TEXT NOT NULL,
                size_bytes BIGINT NOT NULL CHECK (size_bytes > 0),
                uploaded_at TIMESTAMPTZ NOT NULL
            );

            CREATE TABLE IF NOT EXISTS burial_progress (
                protocol_id UUID PRIMARY KEY REFERENCES protocols(id) ON DELETE CASCADE,
                body_retrieved_at TIMESTAMPTZ,
                body_removed BOOLEAN NOT NULL DEFAULT FALSE,
                wake_arrival_at TIMESTAMPTZ,
                burial_stage TEXT CHECK (burial_stage IN ('scheduled', 'in_progress', 'performed')),
                burial_completed_at TIMESTAMPTZ,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
        ),
        (
            "20250101000001_housekeeping_indexes",
            r#"
            CREATE INDEX IF NOT EXISTS idx_protocols_status ON protocols(status);
            CREATE INDEX IF NOT EXISTS idx_protocols_documentation_updated
                ON protocols(documentation_status, updated_at);
            CREATE INDEX IF NOT EXISTS idx_protocols_closed_at
                ON protocols(closed_at) WHERE closed_at IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_documents_protocol_id ON documents(protocol_id);
            "#,
        ),
        (
            "20250201000000_declarant_revocation_stamp",
            r#"
            ALTER TABLE protocols ADD COLUMN IF NOT EXISTS declarant_access_revoked_at TIMESTAMPTZ;
            "#,
        ),
    ]
}
