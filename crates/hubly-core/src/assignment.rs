//! Assignment resolver
//!
//! Decides who owns a ticket. New tickets go to the sole administrator, a
//! removed member's tickets are handed to the administrator in one bulk
//! write, and the ticket list is scoped by the viewer's role.

use tracing::info;

use crate::error::{HublyError, Result};
use crate::lifecycle::HelpDesk;
use crate::staff::{Staff, StaffId};
use crate::ticket::{Ticket, TicketId};

/// Pick the single administrator out of a role query result
///
/// Zero and several administrators are distinct failures.
pub fn sole_administrator(mut admins: Vec<Staff>) -> Result<Staff> {
    match admins.len() {
        0 => Err(HublyError::NoStaffAvailable),
        1 => Ok(admins.remove(0)),
        n => Err(HublyError::MultipleAdministrators(n)),
    }
}

/// Owner filter for a viewer's ticket list: `None` means every ticket
pub fn visibility_scope(viewer: &Staff) -> Option<StaffId> {
    if viewer.is_admin() {
        None
    } else {
        Some(viewer.id)
    }
}

impl HelpDesk {
    /// The administrator that owns new and orphaned tickets
    pub fn administrator(&self) -> Result<Staff> {
        sole_administrator(self.repository().administrators()?)
    }

    /// Point a ticket at another staff member
    ///
    /// Status and the missed flag are left alone.
    pub fn assign(&mut self, ticket_id: &TicketId, staff_id: &StaffId) -> Result<Ticket> {
        if self.repository().get_staff(staff_id)?.is_none() {
            return Err(HublyError::InvalidInput(format!(
                "Staff {} not found",
                staff_id
            )));
        }

        let now = self.now();
        let staff_id = *staff_id;
        let (ticket, ()) = self.write_ticket(ticket_id, |repo, ticket| {
            ticket.assign(staff_id, now);
            Ok(repo.update_ticket(ticket)?.then_some(()))
        })?;

        info!(ticket = %ticket.ticket_number, assigned_to = %staff_id, "Ticket assigned");
        Ok(ticket)
    }

    /// Repoint every ticket owned by `from` to `to` in one write
    pub fn reassign_all_from(&mut self, from: &StaffId, to: &StaffId) -> Result<usize> {
        if self.repository().get_staff(to)?.is_none() {
            return Err(HublyError::staff_not_found(to));
        }

        let now = self.now();
        let moved = self.repository_mut().reassign_tickets(from, to, now)?;
        info!(from = %from, to = %to, moved, "Tickets reassigned");
        Ok(moved)
    }
}
