// SPDX-License-Identifier: MIT

//! Typed queries over the relational schema.
//!
//! Every mutating operation is a single statement: it fully applies or
//! fully fails. Ownership scoping is by family id throughout, except the
//! suggestion queries which are deliberately per-user.

use super::Db;
use crate::error::Result;
use crate::models::{
    Attachment, Family, FamilyInvite, FamilyMember, FamilyUser, GrowthRecord, Record,
    RecordWithMember, Treatment, User, Vaccination,
};
use sqlx::Row;

// ─── Users ───────────────────────────────────────────────────

/// Fields stored for a brand-new user at first login.
pub struct NewUser<'a> {
    pub google_id: &'a str,
    pub email: Option<&'a str>,
    pub name: Option<&'a str>,
    pub picture: Option<&'a str>,
    pub refresh_token: Option<&'a str>,
}

impl Db {
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = ?")
            .bind(google_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    pub async fn create_user(&self, new: &NewUser<'_>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO users (google_id, email, name, picture, refresh_token)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(new.google_id)
        .bind(new.email)
        .bind(new.name)
        .bind(new.picture)
        .bind(new.refresh_token)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Google does not reissue the refresh token on every login; this is
    /// only called when a new one arrived.
    pub async fn update_refresh_token(&self, user_id: i64, refresh_token: &str) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(refresh_token)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn update_settings(
        &self,
        user_id: i64,
        calendar_id: Option<&str>,
        sync_enabled: Option<bool>,
    ) -> Result<()> {
        match (calendar_id, sync_enabled) {
            (Some(cal), Some(sync)) => {
                sqlx::query("UPDATE users SET calendar_id = ?, sync_enabled = ? WHERE id = ?")
                    .bind(cal)
                    .bind(sync)
                    .bind(user_id)
                    .execute(self.pool())
                    .await?;
            }
            (Some(cal), None) => {
                sqlx::query("UPDATE users SET calendar_id = ? WHERE id = ?")
                    .bind(cal)
                    .bind(user_id)
                    .execute(self.pool())
                    .await?;
            }
            (None, Some(sync)) => {
                sqlx::query("UPDATE users SET sync_enabled = ? WHERE id = ?")
                    .bind(sync)
                    .bind(user_id)
                    .execute(self.pool())
                    .await?;
            }
            (None, None) => {}
        }
        Ok(())
    }
}

// ─── Families ────────────────────────────────────────────────

impl Db {
    /// The family the user belongs to, if any. The current model allows at
    /// most one; the earliest link wins if the schema ever holds more.
    pub async fn family_id_for_user(&self, user_id: i64) -> Result<Option<i64>> {
        let family_id = sqlx::query_scalar::<_, i64>(
            "SELECT family_id FROM family_users WHERE user_id = ? ORDER BY joined_at LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(family_id)
    }

    /// Create a family with the user as its admin. Used at first login so
    /// every user always belongs to exactly one family.
    pub async fn create_family_for_user(&self, user_id: i64, family_name: &str) -> Result<i64> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query("INSERT INTO families (name, created_by) VALUES (?, ?)")
            .bind(family_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let family_id = result.last_insert_rowid();

        sqlx::query("INSERT INTO family_users (family_id, user_id, role) VALUES (?, ?, 'admin')")
            .bind(family_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(family_id)
    }

    pub async fn get_family(&self, family_id: i64) -> Result<Option<Family>> {
        let family = sqlx::query_as::<_, Family>("SELECT * FROM families WHERE id = ?")
            .bind(family_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(family)
    }

    pub async fn rename_family(&self, family_id: i64, name: &str) -> Result<()> {
        sqlx::query("UPDATE families SET name = ? WHERE id = ?")
            .bind(name)
            .bind(family_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn list_family_users(&self, family_id: i64) -> Result<Vec<FamilyUser>> {
        let users = sqlx::query_as::<_, FamilyUser>(
            "SELECT fu.user_id, u.name, u.email, fu.role, fu.joined_at
             FROM family_users fu JOIN users u ON u.id = fu.user_id
             WHERE fu.family_id = ? ORDER BY fu.joined_at",
        )
        .bind(family_id)
        .fetch_all(self.pool())
        .await?;
        Ok(users)
    }

    pub async fn user_role_in_family(&self, family_id: i64, user_id: i64) -> Result<Option<String>> {
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM family_users WHERE family_id = ? AND user_id = ?",
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(role)
    }

    pub async fn list_invites(&self, family_id: i64) -> Result<Vec<FamilyInvite>> {
        let invites = sqlx::query_as::<_, FamilyInvite>(
            "SELECT * FROM family_invites WHERE family_id = ? ORDER BY created_at",
        )
        .bind(family_id)
        .fetch_all(self.pool())
        .await?;
        Ok(invites)
    }

    pub async fn create_invite(
        &self,
        family_id: i64,
        email: &str,
        token: &str,
        invited_by: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO family_invites (family_id, email, token, invited_by)
             VALUES (?, ?, ?, ?)",
        )
        .bind(family_id)
        .bind(email)
        .bind(token)
        .bind(invited_by)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }
}

// ─── Family members ──────────────────────────────────────────

impl Db {
    pub async fn list_members(&self, family_id: i64) -> Result<Vec<FamilyMember>> {
        let members = sqlx::query_as::<_, FamilyMember>(
            "SELECT id, family_id, name, color, created_at
             FROM family_members WHERE family_id = ? ORDER BY created_at",
        )
        .bind(family_id)
        .fetch_all(self.pool())
        .await?;
        Ok(members)
    }

    /// Fetch a member only if it belongs to the given family.
    pub async fn get_member(&self, member_id: i64, family_id: i64) -> Result<Option<FamilyMember>> {
        let member = sqlx::query_as::<_, FamilyMember>(
            "SELECT id, family_id, name, color, created_at
             FROM family_members WHERE id = ? AND family_id = ?",
        )
        .bind(member_id)
        .bind(family_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(member)
    }

    pub async fn create_member(
        &self,
        family_id: i64,
        creator_id: i64,
        name: &str,
        color: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO family_members (user_id, family_id, name, color) VALUES (?, ?, ?, ?)",
        )
        .bind(creator_id)
        .bind(family_id)
        .bind(name)
        .bind(color)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Cascades to the member's vaccinations and growth entries.
    pub async fn delete_member(&self, member_id: i64, family_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM family_members WHERE id = ? AND family_id = ?")
            .bind(member_id)
            .bind(family_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ─── Records ─────────────────────────────────────────────────

/// Mutable fields of a record, shared by the create and update paths.
pub struct RecordFields<'a> {
    pub member_id: Option<i64>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub start_date: &'a str,
    pub end_date: Option<&'a str>,
    pub google_event_id: Option<&'a str>,
}

impl Db {
    pub async fn list_records(
        &self,
        family_id: i64,
        member_id: Option<i64>,
    ) -> Result<Vec<RecordWithMember>> {
        let base = "SELECT r.id, r.user_id, r.family_id, r.member_id, r.title, r.description,
                           r.start_date, r.end_date, r.google_event_id, r.created_at,
                           m.name AS member_name, m.color AS member_color
                    FROM records r
                    LEFT JOIN family_members m ON r.member_id = m.id
                    WHERE r.family_id = ?";

        let records = if let Some(member_id) = member_id {
            sqlx::query_as::<_, RecordWithMember>(&format!(
                "{base} AND r.member_id = ? ORDER BY r.start_date DESC"
            ))
            .bind(family_id)
            .bind(member_id)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, RecordWithMember>(&format!("{base} ORDER BY r.start_date DESC"))
                .bind(family_id)
                .fetch_all(self.pool())
                .await?
        };
        Ok(records)
    }

    /// Fetch a record only if it belongs to the given family.
    pub async fn get_record(&self, record_id: i64, family_id: i64) -> Result<Option<Record>> {
        let record =
            sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = ? AND family_id = ?")
                .bind(record_id)
                .bind(family_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(record)
    }

    pub async fn create_record(
        &self,
        user_id: i64,
        family_id: i64,
        fields: &RecordFields<'_>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO records
                 (user_id, family_id, member_id, title, description,
                  start_date, end_date, google_event_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(family_id)
        .bind(fields.member_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(fields.google_event_id)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Full-field replacement, scoped by family.
    pub async fn update_record(
        &self,
        record_id: i64,
        family_id: i64,
        fields: &RecordFields<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE records SET member_id = ?, title = ?, description = ?,
                 start_date = ?, end_date = ?, google_event_id = ?
             WHERE id = ? AND family_id = ?",
        )
        .bind(fields.member_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(fields.google_event_id)
        .bind(record_id)
        .bind(family_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cascades to the record's treatments and attachments.
    pub async fn delete_record(&self, record_id: i64, family_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE id = ? AND family_id = ?")
            .bind(record_id)
            .bind(family_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ─── Treatments & attachments ────────────────────────────────

impl Db {
    pub async fn list_treatments(&self, record_id: i64) -> Result<Vec<Treatment>> {
        let treatments = sqlx::query_as::<_, Treatment>(
            "SELECT * FROM treatments WHERE record_id = ? ORDER BY created_at",
        )
        .bind(record_id)
        .fetch_all(self.pool())
        .await?;
        Ok(treatments)
    }

    pub async fn create_treatment(
        &self,
        record_id: i64,
        name: &str,
        treatment_type: Option<&str>,
        dosage: Option<&str>,
        notes: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO treatments (record_id, name, type, dosage, notes)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record_id)
        .bind(name)
        .bind(treatment_type)
        .bind(dosage)
        .bind(notes)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_attachments(&self, record_id: i64) -> Result<Vec<Attachment>> {
        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM attachments WHERE record_id = ? ORDER BY created_at",
        )
        .bind(record_id)
        .fetch_all(self.pool())
        .await?;
        Ok(attachments)
    }

    pub async fn get_attachment(&self, attachment_id: i64) -> Result<Option<Attachment>> {
        let attachment =
            sqlx::query_as::<_, Attachment>("SELECT * FROM attachments WHERE id = ?")
                .bind(attachment_id)
                .fetch_optional(self.pool())
                .await?;
        Ok(attachment)
    }

    pub async fn create_attachment(
        &self,
        record_id: i64,
        filename: &str,
        path: &str,
        mime_type: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO attachments (record_id, filename, path, mime_type)
             VALUES (?, ?, ?, ?)",
        )
        .bind(record_id)
        .bind(filename)
        .bind(path)
        .bind(mime_type)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }
}

// ─── Vaccinations ────────────────────────────────────────────

/// Mutable fields of a vaccination, replaced wholesale on update.
pub struct VaccinationFields<'a> {
    pub vaccine_name: &'a str,
    pub date_given: &'a str,
    pub next_dose_date: Option<&'a str>,
    pub batch_number: Option<&'a str>,
    pub notes: Option<&'a str>,
}

impl Db {
    pub async fn list_vaccinations(&self, member_id: i64) -> Result<Vec<Vaccination>> {
        let vaccinations = sqlx::query_as::<_, Vaccination>(
            "SELECT * FROM vaccinations WHERE member_id = ? ORDER BY date_given DESC",
        )
        .bind(member_id)
        .fetch_all(self.pool())
        .await?;
        Ok(vaccinations)
    }

    pub async fn create_vaccination(
        &self,
        member_id: i64,
        fields: &VaccinationFields<'_>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO vaccinations
                 (member_id, vaccine_name, date_given, next_dose_date, batch_number, notes)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(fields.vaccine_name)
        .bind(fields.date_given)
        .bind(fields.next_dose_date)
        .bind(fields.batch_number)
        .bind(fields.notes)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Scoped through the member's family.
    pub async fn update_vaccination(
        &self,
        vaccination_id: i64,
        family_id: i64,
        fields: &VaccinationFields<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE vaccinations SET vaccine_name = ?, date_given = ?,
                 next_dose_date = ?, batch_number = ?, notes = ?
             WHERE id = ? AND member_id IN
                (SELECT id FROM family_members WHERE family_id = ?)",
        )
        .bind(fields.vaccine_name)
        .bind(fields.date_given)
        .bind(fields.next_dose_date)
        .bind(fields.batch_number)
        .bind(fields.notes)
        .bind(vaccination_id)
        .bind(family_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_vaccination(&self, vaccination_id: i64, family_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM vaccinations WHERE id = ? AND member_id IN
                (SELECT id FROM family_members WHERE family_id = ?)",
        )
        .bind(vaccination_id)
        .bind(family_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ─── Growth records ──────────────────────────────────────────

/// Mutable fields of a growth entry, replaced wholesale on update.
pub struct GrowthFields<'a> {
    pub date: &'a str,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub head_circumference: Option<f64>,
    pub notes: Option<&'a str>,
}

impl Db {
    pub async fn list_growth_records(&self, member_id: i64) -> Result<Vec<GrowthRecord>> {
        let entries = sqlx::query_as::<_, GrowthRecord>(
            "SELECT * FROM growth_records WHERE member_id = ? ORDER BY date DESC",
        )
        .bind(member_id)
        .fetch_all(self.pool())
        .await?;
        Ok(entries)
    }

    pub async fn create_growth_record(
        &self,
        member_id: i64,
        fields: &GrowthFields<'_>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO growth_records
                 (member_id, date, height, weight, head_circumference, notes)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(fields.date)
        .bind(fields.height)
        .bind(fields.weight)
        .bind(fields.head_circumference)
        .bind(fields.notes)
        .execute(self.pool())
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_growth_record(
        &self,
        growth_id: i64,
        family_id: i64,
        fields: &GrowthFields<'_>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE growth_records SET date = ?, height = ?, weight = ?,
                 head_circumference = ?, notes = ?
             WHERE id = ? AND member_id IN
                (SELECT id FROM family_members WHERE family_id = ?)",
        )
        .bind(fields.date)
        .bind(fields.height)
        .bind(fields.weight)
        .bind(fields.head_circumference)
        .bind(fields.notes)
        .bind(growth_id)
        .bind(family_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_growth_record(&self, growth_id: i64, family_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM growth_records WHERE id = ? AND member_id IN
                (SELECT id FROM family_members WHERE family_id = ?)",
        )
        .bind(growth_id)
        .bind(family_id)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ─── Suggestions ─────────────────────────────────────────────

impl Db {
    /// Top 20 most frequent titles among the caller's own records.
    pub async fn suggest_titles(&self, user_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT title, COUNT(*) AS count FROM records
             WHERE user_id = ?
             GROUP BY title ORDER BY count DESC LIMIT 20",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.iter().map(|r| r.get::<String, _>("title")).collect())
    }

    /// Top 20 most frequent non-empty descriptions among the caller's own
    /// records.
    pub async fn suggest_descriptions(&self, user_id: i64) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT description, COUNT(*) AS count FROM records
             WHERE user_id = ? AND description IS NOT NULL AND description != ''
             GROUP BY description ORDER BY count DESC LIMIT 20",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows
            .iter()
            .map(|r| r.get::<String, _>("description"))
            .collect())
    }
}
