//! Repository for CRUD operations on hubly entities

use std::path::Path;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use super::schema::{Schema, SCHEMA_VERSION};
use crate::error::{HublyError, PersistenceError, Result, StaffError};
use crate::message::{Message, MessageId};
use crate::settings::ChatbotSettings;
use crate::staff::{Staff, StaffId};
use crate::ticket::{format_ticket_number, StatusFilter, Ticket, TicketFilter, TicketId};

const TICKET_COLUMNS: &str = "id, ticket_number, customer_name, customer_email, customer_phone, \
     source, assigned_to, status, created_at, updated_at, resolved_at, first_message_at, \
     first_response_at, is_missed, missed_at, last_message_at, last_message_snippet, \
     last_message_from, version";

const STAFF_COLUMNS: &str =
    "id, first_name, last_name, email, phone, role, auth_token, created_at";

const MESSAGE_COLUMNS: &str = "id, ticket_id, text, sender_type, sender_id, created_at";

const TICKET_COUNTER: &str = "ticket_number";
const CHATBOT_SETTINGS_KEY: &str = "chatbot";

/// Lock wait for a second connection on the same database file
const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Repository for persisting hubly state
pub struct Repository {
    conn: Connection,
}

impl Repository {
    /// Create a new repository with the given database path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(PersistenceError::from)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Create an in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;

        let current_version = self.get_schema_version().unwrap_or(0);

        if current_version == 0 {
            self.conn.execute_batch(Schema::create_tables())?;
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                let migration = Schema::migration(version, version + 1).ok_or_else(|| {
                    PersistenceError::Migration(format!(
                        "No migration from schema {} to {}",
                        version,
                        version + 1
                    ))
                })?;
                self.conn.execute_batch(migration)?;
            }
            self.set_schema_version(SCHEMA_VERSION)?;
        } else if current_version > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                actual: current_version,
            }
            .into());
        }

        Ok(())
    }

    fn get_schema_version(&self) -> Option<u32> {
        self.conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .ok()
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
        Ok(())
    }

    // ==================== Staff Operations ====================

    /// Insert a new staff member
    ///
    /// Fails with [`StaffError::EmailTaken`] or
    /// [`StaffError::AdministratorExists`] when a uniqueness rule is hit.
    pub fn insert_staff(&self, staff: &Staff) -> Result<()> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO staff ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                STAFF_COLUMNS
            ),
            rusqlite::params![
                staff.id.to_string(),
                staff.first_name,
                staff.last_name,
                staff.email,
                staff.phone,
                staff.role.as_str(),
                staff.auth_token,
                format_timestamp(&staff.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                if msg.contains("staff.email") {
                    Err(StaffError::EmailTaken(staff.email.clone()).into())
                } else if msg.contains("staff.role") {
                    Err(StaffError::AdministratorExists.into())
                } else {
                    Err(PersistenceError::Database(msg).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a staff member by ID
    pub fn get_staff(&self, id: &StaffId) -> Result<Option<Staff>> {
        let staff = self
            .conn
            .query_row(
                &format!("SELECT {} FROM staff WHERE id = ?1", STAFF_COLUMNS),
                [id.to_string()],
                Self::row_to_staff,
            )
            .optional()?;
        Ok(staff)
    }

    /// Resolve a bearer token to its staff member
    pub fn get_staff_by_token(&self, token: &str) -> Result<Option<Staff>> {
        let staff = self
            .conn
            .query_row(
                &format!("SELECT {} FROM staff WHERE auth_token = ?1", STAFF_COLUMNS),
                [token],
                Self::row_to_staff,
            )
            .optional()?;
        Ok(staff)
    }

    /// All staff, ordered by first then last name
    pub fn list_staff(&self) -> Result<Vec<Staff>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM staff ORDER BY first_name COLLATE NOCASE, last_name COLLATE NOCASE, created_at",
            STAFF_COLUMNS
        ))?;

        let staff = stmt
            .query_map([], Self::row_to_staff)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(staff)
    }

    /// Every staff member holding the administrator role
    pub fn administrators(&self) -> Result<Vec<Staff>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM staff WHERE role = 'admin' ORDER BY created_at",
            STAFF_COLUMNS
        ))?;

        let staff = stmt
            .query_map([], Self::row_to_staff)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(staff)
    }

    /// Move every ticket owned by `from` to `to`; returns the number moved
    pub fn reassign_tickets(
        &mut self,
        from: &StaffId,
        to: &StaffId,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let moved = reassign_all(&tx, from, to, now)?;
        tx.commit()?;
        Ok(moved)
    }

    /// Delete a staff member after handing all of their tickets to `heir`,
    /// in one transaction; returns the number of tickets moved
    pub fn remove_staff(
        &mut self,
        id: &StaffId,
        heir: &StaffId,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let moved = reassign_all(&tx, id, heir, now)?;
        let deleted = tx.execute("DELETE FROM staff WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(HublyError::staff_not_found(id));
        }
        tx.commit()?;
        Ok(moved)
    }

    fn row_to_staff(row: &rusqlite::Row) -> rusqlite::Result<Staff> {
        Ok(Staff {
            id: StaffId(uuid_column(row, 0)?),
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            role: parsed_column(row, 5)?,
            auth_token: row.get(6)?,
            created_at: timestamp_column(row, 7)?,
        })
    }

    // ==================== Ticket Operations ====================

    /// Allocate the next ticket number and persist the ticket built for it,
    /// together with its opening messages, in one transaction
    pub fn create_ticket<F>(&mut self, build: F) -> Result<(Ticket, Vec<Message>)>
    where
        F: FnOnce(String) -> Result<(Ticket, Vec<Message>)>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sequence = next_sequence(&tx, TICKET_COUNTER)?;
        let (ticket, messages) = build(format_ticket_number(sequence))?;
        insert_ticket(&tx, &ticket)?;
        for message in &messages {
            insert_message(&tx, message)?;
        }
        tx.commit()?;
        Ok((ticket, messages))
    }

    /// Get a ticket by ID
    pub fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>> {
        let ticket = self
            .conn
            .query_row(
                &format!("SELECT {} FROM tickets WHERE id = ?1", TICKET_COLUMNS),
                [id.to_string()],
                Self::row_to_ticket,
            )
            .optional()?;
        Ok(ticket)
    }

    /// Tickets created at or after `since`
    pub fn tickets_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM tickets WHERE created_at >= ?1 ORDER BY created_at",
            TICKET_COLUMNS
        ))?;

        let tickets = stmt
            .query_map([format_timestamp(&since)], Self::row_to_ticket)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tickets)
    }

    /// Tickets visible under `scope` (all when `None`) matching `filter`,
    /// most recent conversation first
    pub fn list_tickets(
        &self,
        scope: Option<&StaffId>,
        filter: &TicketFilter,
    ) -> Result<Vec<Ticket>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(staff_id) = scope {
            values.push(staff_id.to_string());
            clauses.push(format!("assigned_to = ?{}", values.len()));
        }

        match filter.status {
            StatusFilter::All => {}
            StatusFilter::Resolved => clauses.push("status = 'resolved'".to_string()),
            StatusFilter::Unresolved => clauses.push("status <> 'resolved'".to_string()),
        }

        let mut sql = format!("SELECT {} FROM tickets", TICKET_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY last_message_at DESC, created_at DESC");

        // Search terms are matched on the decoded rows
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), Self::row_to_ticket)?;
        let mut tickets = Vec::new();
        for ticket in rows {
            let ticket = ticket?;
            if filter.matches_search(&ticket) {
                tickets.push(ticket);
            }
        }

        Ok(tickets)
    }

    /// Compare-and-swap write of a ticket's mutable fields
    ///
    /// Succeeds only if the stored version still equals `ticket.version`;
    /// on success the version is bumped in place. Returns false when a
    /// concurrent writer got there first.
    pub fn update_ticket(&self, ticket: &mut Ticket) -> Result<bool> {
        let changed = update_ticket_row(&self.conn, ticket)?;
        if changed {
            ticket.version += 1;
        }
        Ok(changed)
    }

    /// Append a message and write the ticket's derived fields atomically
    ///
    /// The ticket write is a compare-and-swap; when it loses, nothing is
    /// stored and false is returned.
    pub fn append_message(&mut self, ticket: &mut Ticket, message: &Message) -> Result<bool> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !update_ticket_row(&tx, ticket)? {
            return Ok(false);
        }
        insert_message(&tx, message)?;
        tx.commit()?;
        ticket.version += 1;
        Ok(true)
    }

    /// Raise the missed flag if the ticket still qualifies at `now`
    ///
    /// The qualification is re-checked by the update itself, so a reply or
    /// resolution that lands first wins. Returns whether the flag was raised.
    pub fn mark_missed(
        &self,
        id: &TicketId,
        threshold_seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let cutoff = now - Duration::seconds(i64::from(threshold_seconds));
        let changed = self.conn.execute(
            r#"
            UPDATE tickets SET is_missed = 1, missed_at = ?2, version = version + 1
            WHERE id = ?1
              AND is_missed = 0
              AND first_message_at IS NOT NULL
              AND first_message_at <= ?3
              AND first_response_at IS NULL
              AND status <> 'resolved'
            "#,
            rusqlite::params![
                id.to_string(),
                format_timestamp(&now),
                format_timestamp(&cutoff),
            ],
        )?;
        Ok(changed == 1)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        Ok(Ticket {
            id: TicketId(uuid_column(row, 0)?),
            ticket_number: row.get(1)?,
            customer_name: row.get(2)?,
            customer_email: row.get(3)?,
            customer_phone: row.get(4)?,
            source: parsed_column(row, 5)?,
            assigned_to: StaffId(uuid_column(row, 6)?),
            status: parsed_column(row, 7)?,
            created_at: timestamp_column(row, 8)?,
            updated_at: timestamp_column(row, 9)?,
            resolved_at: optional_timestamp_column(row, 10)?,
            first_message_at: optional_timestamp_column(row, 11)?,
            first_response_at: optional_timestamp_column(row, 12)?,
            is_missed: row.get(13)?,
            missed_at: optional_timestamp_column(row, 14)?,
            last_message_at: optional_timestamp_column(row, 15)?,
            last_message_snippet: row.get(16)?,
            last_message_from: row
                .get::<_, Option<String>>(17)?
                .map(|s| s.parse().map_err(|e| conversion_error(17, e)))
                .transpose()?,
            version: row.get(18)?,
        })
    }

    // ==================== Message Operations ====================

    /// Messages on a ticket in creation order
    pub fn list_messages(&self, ticket_id: &TicketId) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM messages WHERE ticket_id = ?1 ORDER BY created_at, rowid",
            MESSAGE_COLUMNS
        ))?;

        let messages = stmt
            .query_map([ticket_id.to_string()], Self::row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let sender = row
            .get::<_, Option<String>>(4)?
            .map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(4, e)))
            .transpose()?;

        Ok(Message {
            id: MessageId(uuid_column(row, 0)?),
            ticket_id: TicketId(uuid_column(row, 1)?),
            text: row.get(2)?,
            sender_type: parsed_column(row, 3)?,
            sender: sender.map(StaffId),
            created_at: timestamp_column(row, 5)?,
        })
    }

    // ==================== Settings Operations ====================

    /// Set a settings value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            [key, value],
        )?;
        Ok(())
    }

    /// Get a settings value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Load the widget settings record, if one has been stored
    pub fn load_chatbot_settings(&self) -> Result<Option<ChatbotSettings>> {
        match self.get_setting(CHATBOT_SETTINGS_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Store the widget settings record
    pub fn save_chatbot_settings(&self, settings: &ChatbotSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.set_setting(CHATBOT_SETTINGS_KEY, &json)
    }
}

// Statement helpers shared by plain and transactional callers. A
// `Transaction` derefs to `Connection`, so both go through here.

fn next_sequence(conn: &Connection, name: &str) -> Result<u64> {
    // The first allocation continues from however many tickets already exist
    let value: u64 = conn.query_row(
        r#"
        INSERT INTO counters (name, value)
        VALUES (?1, (SELECT COUNT(*) FROM tickets) + 1)
        ON CONFLICT(name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
        [name],
        |row| row.get(0),
    )?;
    Ok(value)
}

fn insert_ticket(conn: &Connection, ticket: &Ticket) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO tickets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            TICKET_COLUMNS
        ),
        rusqlite::params![
            ticket.id.to_string(),
            ticket.ticket_number,
            ticket.customer_name,
            ticket.customer_email,
            ticket.customer_phone,
            ticket.source.as_str(),
            ticket.assigned_to.to_string(),
            ticket.status.as_str(),
            format_timestamp(&ticket.created_at),
            format_timestamp(&ticket.updated_at),
            ticket.resolved_at.as_ref().map(format_timestamp),
            ticket.first_message_at.as_ref().map(format_timestamp),
            ticket.first_response_at.as_ref().map(format_timestamp),
            ticket.is_missed,
            ticket.missed_at.as_ref().map(format_timestamp),
            ticket.last_message_at.as_ref().map(format_timestamp),
            ticket.last_message_snippet,
            ticket.last_message_from.map(|s| s.as_str()),
            ticket.version,
        ],
    )?;
    Ok(())
}

fn update_ticket_row(conn: &Connection, ticket: &Ticket) -> Result<bool> {
    let changed = conn.execute(
        r#"
        UPDATE tickets SET
            assigned_to = ?3, status = ?4, updated_at = ?5, resolved_at = ?6,
            first_message_at = ?7, first_response_at = ?8, is_missed = ?9, missed_at = ?10,
            last_message_at = ?11, last_message_snippet = ?12, last_message_from = ?13,
            version = version + 1
        WHERE id = ?1 AND version = ?2
        "#,
        rusqlite::params![
            ticket.id.to_string(),
            ticket.version,
            ticket.assigned_to.to_string(),
            ticket.status.as_str(),
            format_timestamp(&ticket.updated_at),
            ticket.resolved_at.as_ref().map(format_timestamp),
            ticket.first_message_at.as_ref().map(format_timestamp),
            ticket.first_response_at.as_ref().map(format_timestamp),
            ticket.is_missed,
            ticket.missed_at.as_ref().map(format_timestamp),
            ticket.last_message_at.as_ref().map(format_timestamp),
            ticket.last_message_snippet,
            ticket.last_message_from.map(|s| s.as_str()),
        ],
    )?;
    Ok(changed == 1)
}

fn insert_message(conn: &Connection, message: &Message) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO messages ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            MESSAGE_COLUMNS
        ),
        rusqlite::params![
            message.id.to_string(),
            message.ticket_id.to_string(),
            message.text,
            message.sender_type.as_str(),
            message.sender.map(|id| id.to_string()),
            format_timestamp(&message.created_at),
        ],
    )?;
    Ok(())
}

fn reassign_all(
    conn: &Connection,
    from: &StaffId,
    to: &StaffId,
    now: DateTime<Utc>,
) -> Result<usize> {
    let moved = conn.execute(
        "UPDATE tickets SET assigned_to = ?2, updated_at = ?3, version = version + 1 WHERE assigned_to = ?1",
        rusqlite::params![from.to_string(), to.to_string(), format_timestamp(&now)],
    )?;
    Ok(moved)
}

/// Fixed-width UTC timestamps so that text order matches time order
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e))
}

fn parsed_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = HublyError>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| conversion_error(idx, e))
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_timestamp(idx, &s)
}

fn optional_timestamp_column(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| parse_timestamp(idx, &s))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SenderType;
    use crate::staff::{NewStaff, StaffRole};
    use crate::ticket::{Customer, TicketSource, TicketStatus};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    fn staff(first: &str, email: &str, role: StaffRole) -> Staff {
        Staff::new(
            NewStaff {
                first_name: first.to_string(),
                last_name: "Tester".to_string(),
                email: email.to_string(),
                phone: String::new(),
            },
            role,
            t0(),
        )
        .unwrap()
    }

    fn open_ticket(repo: &mut Repository, owner: &StaffId, name: &str) -> Ticket {
        let owner = *owner;
        let name = name.to_string();
        repo.create_ticket(|number| {
            let customer = Customer::new(&name, "555-0100", &format!("{}@example.com", name))?;
            Ok((
                Ticket::open(number, customer, owner, TicketSource::Widget, t0()),
                Vec::new(),
            ))
        })
        .unwrap()
        .0
    }

    #[test]
    fn test_repository_creation() {
        let repo = Repository::in_memory().unwrap();
        assert!(repo
            .list_tickets(None, &TicketFilter::default())
            .unwrap()
            .is_empty());
        assert!(repo.administrators().unwrap().is_empty());
    }

    #[test]
    fn test_staff_crud() {
        let repo = Repository::in_memory().unwrap();
        let admin = staff("Zoe", "zoe@example.com", StaffRole::Admin);
        let member = staff("Adam", "adam@example.com", StaffRole::Member);
        repo.insert_staff(&admin).unwrap();
        repo.insert_staff(&member).unwrap();

        let loaded = repo.get_staff(&member.id).unwrap().unwrap();
        assert_eq!(loaded.email, "adam@example.com");
        assert_eq!(loaded.role, StaffRole::Member);

        let by_token = repo.get_staff_by_token(&admin.auth_token).unwrap().unwrap();
        assert_eq!(by_token.id, admin.id);
        assert!(repo.get_staff_by_token("nope").unwrap().is_none());

        let names: Vec<_> = repo
            .list_staff()
            .unwrap()
            .into_iter()
            .map(|s| s.first_name)
            .collect();
        assert_eq!(names, vec!["Adam", "Zoe"]);
    }

    #[test]
    fn test_uniqueness_rules() {
        let repo = Repository::in_memory().unwrap();
        repo.insert_staff(&staff("A", "a@example.com", StaffRole::Admin))
            .unwrap();

        let dup_email = staff("B", "a@example.com", StaffRole::Member);
        assert!(matches!(
            repo.insert_staff(&dup_email),
            Err(HublyError::Staff(StaffError::EmailTaken(_)))
        ));

        let second_admin = staff("C", "c@example.com", StaffRole::Admin);
        assert!(matches!(
            repo.insert_staff(&second_admin),
            Err(HublyError::Staff(StaffError::AdministratorExists))
        ));
    }

    #[test]
    fn test_ticket_numbers_are_sequential() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        repo.insert_staff(&admin).unwrap();

        let first = open_ticket(&mut repo, &admin.id, "jane");
        let second = open_ticket(&mut repo, &admin.id, "joe");
        assert_eq!(first.ticket_number, "HUB-0001");
        assert_eq!(second.ticket_number, "HUB-0002");
    }

    #[test]
    fn test_failed_build_does_not_consume_number() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        repo.insert_staff(&admin).unwrap();

        let result = repo.create_ticket(|_| Err(HublyError::InvalidInput("bad".to_string())));
        assert!(result.is_err());

        let ticket = open_ticket(&mut repo, &admin.id, "jane");
        assert_eq!(ticket.ticket_number, "HUB-0001");
    }

    #[test]
    fn test_ticket_requires_existing_owner() {
        let mut repo = Repository::in_memory().unwrap();
        let ghost = StaffId::new();
        let result = repo.create_ticket(|number| {
            let customer = Customer::new("Jane", "1", "j@example.com")?;
            Ok((
                Ticket::open(number, customer, ghost, TicketSource::Widget, t0()),
                Vec::new(),
            ))
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_compare_and_swap() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        repo.insert_staff(&admin).unwrap();
        let ticket = open_ticket(&mut repo, &admin.id, "jane");

        let mut fresh = ticket.clone();
        let mut stale = ticket.clone();

        fresh.set_status(TicketStatus::InProgress, t0()).unwrap();
        assert!(repo.update_ticket(&mut fresh).unwrap());
        assert_eq!(fresh.version, 1);

        stale.set_status(TicketStatus::Resolved, t0()).unwrap();
        assert!(!repo.update_ticket(&mut stale).unwrap());

        let stored = repo.get_ticket(&ticket.id).unwrap().unwrap();
        assert_eq!(stored.status, TicketStatus::InProgress);
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_append_message_round_trip() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        repo.insert_staff(&admin).unwrap();
        let mut ticket = open_ticket(&mut repo, &admin.id, "jane");

        let first = Message::customer(ticket.id, "hi", t0()).unwrap();
        ticket.record_customer_message(&first);
        assert!(repo.append_message(&mut ticket, &first).unwrap());

        let reply = Message::staff(ticket.id, admin.id, "hello", t0()).unwrap();
        ticket.record_staff_reply(&reply);
        assert!(repo.append_message(&mut ticket, &reply).unwrap());

        let messages = repo.list_messages(&ticket.id).unwrap();
        assert_eq!(messages.len(), 2);
        // Same timestamp: insertion order breaks the tie
        assert_eq!(messages[0].sender_type, SenderType::Customer);
        assert_eq!(messages[1].sender, Some(admin.id));

        let stored = repo.get_ticket(&ticket.id).unwrap().unwrap();
        assert_eq!(stored, ticket);
    }

    #[test]
    fn test_mark_missed_rechecks_predicate() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        repo.insert_staff(&admin).unwrap();
        let mut ticket = open_ticket(&mut repo, &admin.id, "jane");

        let msg = Message::customer(ticket.id, "hi", t0()).unwrap();
        ticket.record_customer_message(&msg);
        repo.append_message(&mut ticket, &msg).unwrap();

        assert!(!repo
            .mark_missed(&ticket.id, 600, t0() + Duration::seconds(599))
            .unwrap());
        assert!(repo
            .mark_missed(&ticket.id, 600, t0() + Duration::seconds(600))
            .unwrap());
        // Already raised
        assert!(!repo
            .mark_missed(&ticket.id, 600, t0() + Duration::seconds(900))
            .unwrap());

        let stored = repo.get_ticket(&ticket.id).unwrap().unwrap();
        assert!(stored.is_missed);
        assert_eq!(stored.missed_at, Some(t0() + Duration::seconds(600)));

        // The stale copy can no longer be written back
        assert!(!repo.update_ticket(&mut ticket).unwrap());
    }

    #[test]
    fn test_remove_staff_reassigns_tickets() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        let member = staff("M", "m@example.com", StaffRole::Member);
        repo.insert_staff(&admin).unwrap();
        repo.insert_staff(&member).unwrap();

        let ticket = open_ticket(&mut repo, &member.id, "jane");
        let moved = repo.remove_staff(&member.id, &admin.id, t0()).unwrap();
        assert_eq!(moved, 1);

        let stored = repo.get_ticket(&ticket.id).unwrap().unwrap();
        assert_eq!(stored.assigned_to, admin.id);
        assert!(repo.get_staff(&member.id).unwrap().is_none());

        assert!(matches!(
            repo.remove_staff(&member.id, &admin.id, t0()),
            Err(HublyError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_tickets_filters() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        let member = staff("M", "m@example.com", StaffRole::Member);
        repo.insert_staff(&admin).unwrap();
        repo.insert_staff(&member).unwrap();

        let mut jane = open_ticket(&mut repo, &admin.id, "jane");
        open_ticket(&mut repo, &member.id, "joe_100%");

        jane.set_status(TicketStatus::Resolved, t0()).unwrap();
        repo.update_ticket(&mut jane).unwrap();

        let all = repo.list_tickets(None, &TicketFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let mine = repo
            .list_tickets(Some(&member.id), &TicketFilter::default())
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].customer_name, "joe_100%");

        let resolved = repo
            .list_tickets(None, &TicketFilter::parse(Some("resolved"), None).unwrap())
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, jane.id);

        let search = |term: &str| {
            repo.list_tickets(None, &TicketFilter::parse(None, Some(term)).unwrap())
                .unwrap()
                .len()
        };
        assert_eq!(search("JANE"), 1);
        assert_eq!(search("hub-000"), 2);
        assert_eq!(search("100%"), 1);
        assert_eq!(search("_"), 1);
        assert_eq!(search("nobody"), 0);
    }

    #[test]
    fn test_search_is_case_insensitive_beyond_ascii() {
        let mut repo = Repository::in_memory().unwrap();
        let admin = staff("A", "a@example.com", StaffRole::Admin);
        let member = staff("M", "m@example.com", StaffRole::Member);
        repo.insert_staff(&admin).unwrap();
        repo.insert_staff(&member).unwrap();

        open_ticket(&mut repo, &admin.id, "ÉLODIE");
        open_ticket(&mut repo, &member.id, "Ödön");

        let search = |scope: Option<&StaffId>, term: &str| {
            repo.list_tickets(scope, &TicketFilter::parse(None, Some(term)).unwrap())
                .unwrap()
                .len()
        };
        assert_eq!(search(None, "ÉLODIE"), 1);
        assert_eq!(search(None, "élodie"), 1);
        assert_eq!(search(None, "Élo"), 1);
        assert_eq!(search(None, "ÖDÖN"), 1);
        assert_eq!(search(Some(&member.id), "élodie"), 0);
        assert_eq!(search(Some(&member.id), "ödön"), 1);
    }

    #[test]
    fn test_chatbot_settings_round_trip() {
        let repo = Repository::in_memory().unwrap();
        assert!(repo.load_chatbot_settings().unwrap().is_none());

        let settings = ChatbotSettings::with_threshold(120);
        repo.save_chatbot_settings(&settings).unwrap();
        assert_eq!(repo.load_chatbot_settings().unwrap(), Some(settings));
    }
}
