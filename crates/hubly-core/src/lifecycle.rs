//! Ticket lifecycle controller
//!
//! [`HelpDesk`] is the entry point for every widget and staff action. It owns
//! the repository and the clock, applies the ticket state rules from
//! [`crate::ticket`], and persists every change with a versioned write that is
//! retried a bounded number of times when another writer got there first.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::analytics::{self, Overview};
use crate::assignment;
use crate::clock::{Clock, SystemClock};
use crate::config::{DeskConfig, HublyConfig};
use crate::error::{HublyError, Result};
use crate::message::{clean_text, Message};
use crate::missed;
use crate::persistence::Repository;
use crate::settings::{ChatbotSettings, ChatbotSettingsUpdate};
use crate::staff::{Staff, StaffId};
use crate::ticket::{Customer, Ticket, TicketFilter, TicketId, TicketSource, TicketStatus};

/// Automated greetings posted when a chat starts, in order
pub const GREETINGS: [&str; 2] = ["How can I help you?", "State your query"];

/// The support desk: tickets, messages, staff and settings behind one API
pub struct HelpDesk {
    repo: Repository,
    clock: Box<dyn Clock>,
    default_threshold_seconds: u32,
    max_write_retries: u32,
}

impl HelpDesk {
    /// Create a desk over an existing repository
    pub fn new(repo: Repository, clock: impl Clock + 'static, desk: &DeskConfig) -> Self {
        Self {
            repo,
            clock: Box::new(clock),
            default_threshold_seconds: desk.default_missed_chat_threshold_seconds,
            max_write_retries: desk.max_write_retries.max(1),
        }
    }

    /// Open the configured database with the system clock
    pub fn open(config: &HublyConfig) -> Result<Self> {
        let repo = Repository::new(&config.database.path)?;
        info!(path = %config.database.path.display(), "Opened ticket store");
        Ok(Self::new(repo, SystemClock, &config.desk))
    }

    /// Current time according to the desk's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Read access to the underlying store
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn repository_mut(&mut self) -> &mut Repository {
        &mut self.repo
    }

    // ==================== Settings ====================

    /// The widget settings record, falling back to defaults seeded with the
    /// configured threshold when none has been stored
    pub fn settings(&self) -> Result<ChatbotSettings> {
        Ok(self
            .repo
            .load_chatbot_settings()?
            .unwrap_or_else(|| ChatbotSettings::with_threshold(self.default_threshold_seconds)))
    }

    /// Apply a partial settings update and store the result
    pub fn update_settings(&mut self, update: ChatbotSettingsUpdate) -> Result<ChatbotSettings> {
        let mut settings = self.settings()?;
        settings.apply(update)?;
        self.repo.save_chatbot_settings(&settings)?;
        info!(
            threshold_seconds = settings.missed_chat_threshold_seconds,
            "Chatbot settings updated"
        );
        Ok(settings)
    }

    fn threshold_seconds(&self) -> Result<u32> {
        Ok(self.settings()?.missed_chat_threshold_seconds)
    }

    // ==================== Tickets ====================

    /// Open a widget chat for a customer
    ///
    /// The ticket is owned by the administrator and carries the two greeting
    /// messages. Greetings are not a human reply, so the first-response time
    /// stays unset.
    pub fn start_ticket(
        &mut self,
        customer_name: &str,
        customer_phone: &str,
        customer_email: &str,
    ) -> Result<(Ticket, Vec<Message>)> {
        let customer = Customer::new(customer_name, customer_phone, customer_email)?;
        self.open_ticket(customer, TicketSource::Widget)
    }

    /// Open a ticket from any source
    pub fn open_ticket(
        &mut self,
        customer: Customer,
        source: TicketSource,
    ) -> Result<(Ticket, Vec<Message>)> {
        let owner = self.administrator()?;
        let now = self.now();

        let (ticket, messages) = self.repo.create_ticket(|ticket_number| {
            let mut ticket = Ticket::open(ticket_number, customer, owner.id, source, now);
            let messages: Vec<Message> = GREETINGS
                .iter()
                .map(|text| Message::greeting(ticket.id, text, now))
                .collect();
            for message in &messages {
                ticket.record_greeting(message);
            }
            Ok((ticket, messages))
        })?;

        info!(
            ticket = %ticket.ticket_number,
            source = ticket.source.as_str(),
            assigned_to = %ticket.assigned_to,
            "Ticket started"
        );
        Ok((ticket, messages))
    }

    /// A ticket by id
    pub fn get_ticket(&self, id: &TicketId) -> Result<Ticket> {
        self.repo
            .get_ticket(id)?
            .ok_or_else(|| HublyError::ticket_not_found(id))
    }

    /// Append a customer message from the widget
    pub fn post_customer_message(&mut self, ticket_id: &TicketId, text: &str) -> Result<Message> {
        let text = clean_text(text)?;
        let now = self.now();

        let (ticket, message) = self.write_ticket(ticket_id, |repo, ticket| {
            let message = Message::customer(ticket.id, &text, now)?;
            ticket.record_customer_message(&message);
            Ok(repo.append_message(ticket, &message)?.then_some(message))
        })?;

        debug!(ticket = %ticket.ticket_number, "Customer message stored");
        Ok(message)
    }

    /// Append a staff reply; cancels any missed flag
    pub fn post_staff_message(
        &mut self,
        ticket_id: &TicketId,
        staff_id: &StaffId,
        text: &str,
    ) -> Result<Message> {
        let text = clean_text(text)?;
        let now = self.now();
        let staff_id = *staff_id;

        let (ticket, message) = self.write_ticket(ticket_id, |repo, ticket| {
            let message = Message::staff(ticket.id, staff_id, &text, now)?;
            ticket.record_staff_reply(&message);
            Ok(repo.append_message(ticket, &message)?.then_some(message))
        })?;

        debug!(ticket = %ticket.ticket_number, staff = %staff_id, "Staff reply stored");
        Ok(message)
    }

    /// Move a ticket to a new status
    ///
    /// Resolving stamps `resolved_at` and clears the missed flag; any other
    /// status clears `resolved_at`. First-message and first-response times
    /// are kept across a reopen.
    pub fn change_status(&mut self, ticket_id: &TicketId, status: TicketStatus) -> Result<Ticket> {
        let now = self.now();
        let (ticket, ()) = self.write_ticket(ticket_id, |repo, ticket| {
            ticket.set_status(status, now)?;
            Ok(repo.update_ticket(ticket)?.then_some(()))
        })?;

        info!(ticket = %ticket.ticket_number, status = %status, "Ticket status changed");
        Ok(ticket)
    }

    /// Messages on a ticket, oldest first
    pub fn list_messages(&self, ticket_id: &TicketId) -> Result<Vec<Message>> {
        if self.repo.get_ticket(ticket_id)?.is_none() {
            return Err(HublyError::ticket_not_found(ticket_id));
        }
        self.repo.list_messages(ticket_id)
    }

    /// Tickets visible to `viewer` matching `filter`, without side effects
    pub fn query_tickets(&self, viewer: &Staff, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let scope = assignment::visibility_scope(viewer);
        self.repo.list_tickets(scope.as_ref(), filter)
    }

    /// The ticket list as staff see it: the query followed by a missed-flag
    /// reconciliation over the returned tickets
    pub fn list_tickets(&self, viewer: &Staff, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let mut tickets = self.query_tickets(viewer, filter)?;
        self.reconcile_missed(&mut tickets)?;
        Ok(tickets)
    }

    /// Raise the stored missed flag on every ticket that now qualifies
    ///
    /// One-way: a flag is never cleared here, even if the threshold has since
    /// been raised. Each write re-checks the predicate in storage, so a reply
    /// or resolution committed in between wins; such tickets are reloaded.
    /// Returns the number of flags raised.
    pub fn reconcile_missed(&self, tickets: &mut [Ticket]) -> Result<usize> {
        let threshold = self.threshold_seconds()?;
        let now = self.now();
        let mut raised = 0;

        for ticket in tickets.iter_mut() {
            if !missed::needs_flag(ticket, threshold, now) {
                continue;
            }
            if self.repo.mark_missed(&ticket.id, threshold, now)? {
                ticket.mark_missed(now);
                ticket.version += 1;
                raised += 1;
                info!(ticket = %ticket.ticket_number, threshold, "Chat marked missed");
            } else if let Some(current) = self.repo.get_ticket(&ticket.id)? {
                *ticket = current;
            }
        }

        Ok(raised)
    }

    // ==================== Analytics ====================

    /// Dashboard metrics over the trailing window
    pub fn overview(&self) -> Result<Overview> {
        let threshold = self.threshold_seconds()?;
        let now = self.now();
        let tickets = self
            .repo
            .tickets_created_since(analytics::window_start(now))?;
        Ok(analytics::compute_overview(&tickets, threshold, now))
    }

    // ==================== Versioned writes ====================

    /// Load, mutate and conditionally write a ticket, retrying on conflict
    ///
    /// `step` returns `Ok(None)` when its compare-and-swap lost; the ticket is
    /// then reloaded and `step` runs again against the fresh copy.
    pub(crate) fn write_ticket<T, F>(&mut self, id: &TicketId, mut step: F) -> Result<(Ticket, T)>
    where
        F: FnMut(&mut Repository, &mut Ticket) -> Result<Option<T>>,
    {
        let attempts = self.max_write_retries;
        for attempt in 1..=attempts {
            let mut ticket = self
                .repo
                .get_ticket(id)?
                .ok_or_else(|| HublyError::ticket_not_found(id))?;
            if let Some(out) = step(&mut self.repo, &mut ticket)? {
                return Ok((ticket, out));
            }
            debug!(ticket = %id, attempt, "Ticket changed underneath write, retrying");
        }

        Err(HublyError::Conflict(format!(
            "Ticket {} changed concurrently {} times",
            id, attempts
        )))
    }
}

#[cfg(test)]
impl HelpDesk {
    /// In-memory desk on a manual clock with an administrator already created
    pub(crate) fn test_desk() -> (Self, std::sync::Arc<crate::clock::ManualClock>, Staff) {
        use chrono::TimeZone;

        let clock = std::sync::Arc::new(crate::clock::ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap(),
        ));
        let mut desk = HelpDesk::new(
            Repository::in_memory().unwrap(),
            clock.clone(),
            &DeskConfig::default(),
        );
        let admin = desk
            .create_administrator(crate::staff::sample_input("admin"))
            .unwrap();
        (desk, clock, admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SenderType;
    use chrono::Duration;

    fn with_threshold(desk: &mut HelpDesk, seconds: u32) {
        desk.update_settings(ChatbotSettingsUpdate {
            missed_chat_threshold_seconds: Some(seconds),
            ..Default::default()
        })
        .unwrap();
    }

    #[test]
    fn test_start_ticket() {
        let (mut desk, _, admin) = HelpDesk::test_desk();
        let (ticket, messages) = desk
            .start_ticket(" Jane ", "555-0100", "jane@example.com")
            .unwrap();

        assert_eq!(ticket.ticket_number, "HUB-0001");
        assert_eq!(ticket.customer_name, "Jane");
        assert_eq!(ticket.assigned_to, admin.id);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.first_response_at.is_none());
        assert_eq!(ticket.last_message_snippet.as_deref(), Some("State your query"));
        assert_eq!(ticket.last_message_from, Some(SenderType::Agent));

        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, GREETINGS);
        assert!(messages.iter().all(|m| m.sender.is_none()));

        let stored = desk.list_messages(&ticket.id).unwrap();
        assert_eq!(stored, messages);
    }

    #[test]
    fn test_start_ticket_requires_fields() {
        let (mut desk, _, _) = HelpDesk::test_desk();
        assert!(matches!(
            desk.start_ticket("Jane", "  ", "jane@example.com"),
            Err(HublyError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_start_ticket_without_admin() {
        let mut desk = HelpDesk::new(
            Repository::in_memory().unwrap(),
            SystemClock,
            &DeskConfig::default(),
        );
        assert!(matches!(
            desk.start_ticket("Jane", "1", "j@example.com"),
            Err(HublyError::NoStaffAvailable)
        ));
    }

    #[test]
    fn test_message_validation() {
        let (mut desk, _, admin) = HelpDesk::test_desk();
        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();

        assert!(matches!(
            desk.post_customer_message(&ticket.id, "   "),
            Err(HublyError::InvalidInput(_))
        ));
        assert!(matches!(
            desk.post_customer_message(&TicketId::new(), "hello"),
            Err(HublyError::NotFound(_))
        ));
        assert!(matches!(
            desk.post_staff_message(&TicketId::new(), &admin.id, "hello"),
            Err(HublyError::NotFound(_))
        ));
    }

    #[test]
    fn test_scenario_missed_after_threshold() {
        let (mut desk, clock, admin) = HelpDesk::test_desk();
        with_threshold(&mut desk, 60);
        let t0 = desk.now();

        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();
        clock.advance(Duration::seconds(1));
        desk.post_customer_message(&ticket.id, "anyone there?").unwrap();

        clock.set(t0 + Duration::seconds(62));
        let listed = desk.list_tickets(&admin, &TicketFilter::default()).unwrap();
        assert!(listed[0].is_missed);
        assert_eq!(listed[0].missed_at, Some(t0 + Duration::seconds(62)));

        let stored = desk.get_ticket(&ticket.id).unwrap();
        assert!(stored.is_missed);
        assert_eq!(stored.first_message_at, Some(t0 + Duration::seconds(1)));
    }

    #[test]
    fn test_scenario_reply_before_threshold() {
        let (mut desk, clock, admin) = HelpDesk::test_desk();
        with_threshold(&mut desk, 60);
        let t0 = desk.now();

        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();
        clock.set(t0 + Duration::seconds(1));
        desk.post_customer_message(&ticket.id, "hello").unwrap();
        clock.set(t0 + Duration::seconds(30));
        desk.post_staff_message(&ticket.id, &admin.id, "hi!").unwrap();

        clock.set(t0 + Duration::seconds(120));
        let listed = desk.list_tickets(&admin, &TicketFilter::default()).unwrap();
        assert!(!listed[0].is_missed);
    }

    #[test]
    fn test_scenario_resolved_blocks_flag() {
        let (mut desk, clock, admin) = HelpDesk::test_desk();
        with_threshold(&mut desk, 60);
        let t0 = desk.now();

        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();
        clock.set(t0 + Duration::seconds(10));
        desk.change_status(&ticket.id, TicketStatus::Resolved).unwrap();
        clock.set(t0 + Duration::seconds(1000));
        desk.post_customer_message(&ticket.id, "one more thing").unwrap();

        clock.set(t0 + Duration::seconds(5000));
        let listed = desk.list_tickets(&admin, &TicketFilter::default()).unwrap();
        assert!(!listed[0].is_missed);
        assert_eq!(listed[0].status, TicketStatus::Resolved);
    }

    #[test]
    fn test_reply_after_threshold_clears_flag() {
        let (mut desk, clock, admin) = HelpDesk::test_desk();
        with_threshold(&mut desk, 60);

        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();
        desk.post_customer_message(&ticket.id, "hello").unwrap();
        clock.advance(Duration::seconds(300));
        desk.list_tickets(&admin, &TicketFilter::default()).unwrap();
        assert!(desk.get_ticket(&ticket.id).unwrap().is_missed);

        desk.post_staff_message(&ticket.id, &admin.id, "sorry for the wait")
            .unwrap();
        let stored = desk.get_ticket(&ticket.id).unwrap();
        assert!(!stored.is_missed);
        assert!(stored.missed_at.is_none());
        assert!(stored.first_response_at.is_some());
    }

    #[test]
    fn test_reconcile_is_idempotent_and_one_way() {
        let (mut desk, clock, admin) = HelpDesk::test_desk();
        with_threshold(&mut desk, 60);

        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();
        desk.post_customer_message(&ticket.id, "hello").unwrap();
        clock.advance(Duration::seconds(90));

        let mut tickets = desk.query_tickets(&admin, &TicketFilter::default()).unwrap();
        assert!(!tickets[0].is_missed);
        assert_eq!(desk.reconcile_missed(&mut tickets).unwrap(), 1);
        let first = desk.get_ticket(&ticket.id).unwrap();

        clock.advance(Duration::seconds(30));
        assert_eq!(desk.reconcile_missed(&mut tickets).unwrap(), 0);
        let second = desk.get_ticket(&ticket.id).unwrap();
        assert_eq!(first.missed_at, second.missed_at);

        // A higher threshold no longer matches, but the flag stays
        with_threshold(&mut desk, 3600);
        let listed = desk.list_tickets(&admin, &TicketFilter::default()).unwrap();
        assert!(listed[0].is_missed);
    }

    #[test]
    fn test_status_changes() {
        let (mut desk, clock, _) = HelpDesk::test_desk();
        let (ticket, _) = desk.start_ticket("Jane", "1", "j@example.com").unwrap();

        clock.advance(Duration::minutes(5));
        let resolved = desk.change_status(&ticket.id, TicketStatus::Resolved).unwrap();
        assert_eq!(resolved.resolved_at, Some(desk.now()));

        let reopened = desk.change_status(&ticket.id, TicketStatus::InProgress).unwrap();
        assert!(reopened.resolved_at.is_none());
        assert_eq!(reopened.version, resolved.version + 1);

        assert!(matches!(
            desk.change_status(&TicketId::new(), TicketStatus::Open),
            Err(HublyError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_tickets_order_and_scope() {
        let (mut desk, clock, admin) = HelpDesk::test_desk();
        let member = desk.create_staff(crate::staff::sample_input("member")).unwrap();

        let (older, _) = desk.start_ticket("Old", "1", "old@example.com").unwrap();
        clock.advance(Duration::seconds(5));
        let (newer, _) = desk.start_ticket("New", "2", "new@example.com").unwrap();
        clock.advance(Duration::seconds(5));
        desk.post_customer_message(&older.id, "bump").unwrap();

        let listed = desk.list_tickets(&admin, &TicketFilter::default()).unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);

        assert!(desk
            .list_tickets(&member, &TicketFilter::default())
            .unwrap()
            .is_empty());
        desk.assign(&newer.id, &member.id).unwrap();
        let mine = desk.list_tickets(&member, &TicketFilter::default()).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, newer.id);
    }

    #[test]
    fn test_list_messages_unknown_ticket() {
        let (desk, _, _) = HelpDesk::test_desk();
        assert!(matches!(
            desk.list_messages(&TicketId::new()),
            Err(HublyError::NotFound(_))
        ));
    }

    #[test]
    fn test_settings_default_to_configured_threshold() {
        let desk = HelpDesk::new(
            Repository::in_memory().unwrap(),
            SystemClock,
            &DeskConfig {
                default_missed_chat_threshold_seconds: 120,
                max_write_retries: 3,
            },
        );
        assert_eq!(desk.settings().unwrap().missed_chat_threshold_seconds, 120);
    }
}
