// SPDX-License-Identifier: MIT

//! Versioned schema migrations and the legacy family-grouping backfill.
//!
//! Migrations form an ordered, append-only list tracked in a
//! `schema_migrations` table; each pending migration runs exactly once in
//! its own transaction. After the schema is up to date, the (idempotent)
//! family backfill groups any user not yet linked to a family.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base_schema",
        sql: r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                google_id TEXT NOT NULL UNIQUE,
                email TEXT,
                name TEXT,
                picture TEXT,
                refresh_token TEXT,
                calendar_id TEXT,
                sync_enabled BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE families (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_by INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(created_by) REFERENCES users(id)
            );

            CREATE TABLE family_users (
                family_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                joined_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (family_id, user_id),
                FOREIGN KEY(family_id) REFERENCES families(id),
                FOREIGN KEY(user_id) REFERENCES users(id)
            );

            CREATE TABLE family_invites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                family_id INTEGER NOT NULL,
                email TEXT NOT NULL,
                token TEXT NOT NULL,
                invited_by INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(family_id) REFERENCES families(id)
            );

            CREATE TABLE family_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                family_id INTEGER,
                name TEXT NOT NULL,
                color TEXT NOT NULL DEFAULT '#3b82f6',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(family_id) REFERENCES families(id)
            );

            CREATE TABLE records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                member_id INTEGER,
                title TEXT NOT NULL,
                description TEXT,
                start_date TEXT NOT NULL,
                end_date TEXT,
                google_event_id TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(user_id) REFERENCES users(id),
                FOREIGN KEY(member_id) REFERENCES family_members(id) ON DELETE SET NULL
            );

            CREATE TABLE treatments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                type TEXT,
                dosage TEXT,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(record_id) REFERENCES records(id) ON DELETE CASCADE
            );

            CREATE TABLE attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_id INTEGER NOT NULL,
                filename TEXT NOT NULL,
                path TEXT NOT NULL,
                mime_type TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(record_id) REFERENCES records(id) ON DELETE CASCADE
            );

            CREATE TABLE vaccinations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL,
                vaccine_name TEXT NOT NULL,
                date_given TEXT NOT NULL,
                next_dose_date TEXT,
                batch_number TEXT,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(member_id) REFERENCES family_members(id) ON DELETE CASCADE
            );

            CREATE TABLE growth_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                member_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                height REAL,
                weight REAL,
                head_circumference REAL,
                notes TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY(member_id) REFERENCES family_members(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        name: "records_family_scope",
        sql: r#"
            ALTER TABLE records ADD COLUMN family_id INTEGER REFERENCES families(id);
        "#,
    },
    Migration {
        version: 3,
        name: "lookup_indexes",
        sql: r#"
            CREATE INDEX idx_records_family_start ON records(family_id, start_date);
            CREATE INDEX idx_family_members_family ON family_members(family_id);
            CREATE INDEX idx_treatments_record ON treatments(record_id);
            CREATE INDEX idx_attachments_record ON attachments(record_id);
            CREATE INDEX idx_vaccinations_member ON vaccinations(member_id);
            CREATE INDEX idx_growth_member ON growth_records(member_id);
        "#,
    },
];

/// Apply pending migrations, then run the family-grouping backfill.
///
/// Safe to call on every process start.
pub async fn run(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    group_legacy_users(pool).await?;
    Ok(())
}

/// Group every user without a family link into a family of their own.
///
/// Creates the family, adds the user as admin, and claims the user's
/// previously unscoped members and records. A user already linked to a
/// family is skipped, so re-running never creates duplicates.
pub async fn group_legacy_users(pool: &SqlitePool) -> anyhow::Result<()> {
    let ungrouped = sqlx::query(
        "SELECT u.id, u.name FROM users u
         LEFT JOIN family_users fu ON fu.user_id = u.id
         WHERE fu.user_id IS NULL",
    )
    .fetch_all(pool)
    .await?;

    for row in ungrouped {
        let user_id: i64 = row.get("id");
        let name: Option<String> = row.get("name");
        let display_name = name.unwrap_or_else(|| format!("user {user_id}"));

        tracing::info!(user_id, name = %display_name, "Grouping legacy user into a family");

        let mut tx = pool.begin().await?;

        let family = sqlx::query("INSERT INTO families (name, created_by) VALUES (?, ?)")
            .bind(format!("Rodina - {display_name}"))
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let family_id = family.last_insert_rowid();

        sqlx::query("INSERT INTO family_users (family_id, user_id, role) VALUES (?, ?, 'admin')")
            .bind(family_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE family_members SET family_id = ?
             WHERE user_id = ? AND (family_id IS NULL OR family_id = 0)",
        )
        .bind(family_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE records SET family_id = ? WHERE user_id = ? AND family_id IS NULL")
            .bind(family_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}
