//! Staff roster operations on the desk

use tracing::{info, warn};

use crate::config::AdminBootstrap;
use crate::error::{HublyError, Result, StaffError};
use crate::lifecycle::HelpDesk;
use crate::staff::{validate_token_format, NewStaff, Staff, StaffId, StaffRole};

impl HelpDesk {
    /// Add the administrator; fails if one already exists
    pub fn create_administrator(&mut self, input: NewStaff) -> Result<Staff> {
        if !self.repository().administrators()?.is_empty() {
            return Err(StaffError::AdministratorExists.into());
        }
        let staff = Staff::new(input, StaffRole::Admin, self.now())?;
        self.repository().insert_staff(&staff)?;
        info!(staff = %staff.id, email = %staff.email, "Administrator created");
        Ok(staff)
    }

    /// Add a teammate; new staff are always members
    pub fn create_staff(&mut self, input: NewStaff) -> Result<Staff> {
        let staff = Staff::new(input, StaffRole::Member, self.now())?;
        self.repository().insert_staff(&staff)?;
        info!(staff = %staff.id, email = %staff.email, "Staff member added");
        Ok(staff)
    }

    /// Create the configured administrator unless one already exists
    ///
    /// Returns the new record, or `None` when the roster already had one.
    pub fn bootstrap_administrator(&mut self, admin: AdminBootstrap) -> Result<Option<Staff>> {
        match self.administrator() {
            Ok(_) => Ok(None),
            Err(HublyError::NoStaffAvailable) => self.create_administrator(admin.into()).map(Some),
            Err(e) => Err(e),
        }
    }

    /// Every staff member, by first then last name
    pub fn list_staff(&self) -> Result<Vec<Staff>> {
        self.repository().list_staff()
    }

    /// A staff member by id
    pub fn get_staff(&self, id: &StaffId) -> Result<Staff> {
        self.repository()
            .get_staff(id)?
            .ok_or_else(|| HublyError::staff_not_found(id))
    }

    /// Remove a member, handing their tickets to the administrator
    ///
    /// Reassignment and deletion commit together, so no ticket is ever left
    /// pointing at the removed identity. Returns the number of tickets moved.
    pub fn remove_staff(&mut self, id: &StaffId) -> Result<usize> {
        let admin = self.administrator()?;
        if admin.id == *id {
            return Err(StaffError::CannotRemoveAdministrator.into());
        }

        let now = self.now();
        let moved = self.repository_mut().remove_staff(id, &admin.id, now)?;
        info!(staff = %id, moved, "Staff member removed");
        Ok(moved)
    }

    /// Resolve a bearer token to a staff member
    pub fn authenticate(&self, token: &str) -> Result<Staff> {
        if !validate_token_format(token) {
            return Err(HublyError::Unauthorized);
        }
        match self.repository().get_staff_by_token(token)? {
            Some(staff) => Ok(staff),
            None => {
                warn!("Rejected unknown staff token");
                Err(HublyError::Unauthorized)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staff::sample_input;
    use crate::ticket::TicketFilter;

    #[test]
    fn test_single_administrator() {
        let (mut desk, _, admin) = HelpDesk::test_desk();
        assert!(matches!(
            desk.create_administrator(sample_input("other")),
            Err(HublyError::Staff(StaffError::AdministratorExists))
        ));
        assert_eq!(desk.administrator().unwrap().id, admin.id);
    }

    #[test]
    fn test_create_staff_is_member() {
        let (mut desk, _, _) = HelpDesk::test_desk();
        let staff = desk.create_staff(sample_input("bob")).unwrap();
        assert_eq!(staff.role, StaffRole::Member);
        assert!(matches!(
            desk.create_staff(sample_input("bob")),
            Err(HublyError::Staff(StaffError::EmailTaken(_)))
        ));
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let (mut desk, _, _) = HelpDesk::test_desk();
        let bootstrap = AdminBootstrap {
            first_name: "Root".to_string(),
            last_name: "User".to_string(),
            email: "root@example.com".to_string(),
            phone: String::new(),
        };
        assert!(desk.bootstrap_administrator(bootstrap).unwrap().is_none());
    }

    #[test]
    fn test_authenticate() {
        let (desk, _, admin) = HelpDesk::test_desk();
        assert_eq!(desk.authenticate(&admin.auth_token).unwrap().id, admin.id);
        assert!(matches!(desk.authenticate("junk"), Err(HublyError::Unauthorized)));

        let forged = format!("hubly-{}-{}", admin.id.0.simple(), uuid::Uuid::new_v4().simple());
        assert!(matches!(desk.authenticate(&forged), Err(HublyError::Unauthorized)));
    }

    #[test]
    fn test_remove_staff_reassigns_open_tickets() {
        let (mut desk, _, admin) = HelpDesk::test_desk();
        let member = desk.create_staff(sample_input("leaver")).unwrap();

        let mut ids = Vec::new();
        for n in 0..3 {
            let (ticket, _) = desk
                .start_ticket(&format!("c{}", n), "1", "c@example.com")
                .unwrap();
            desk.assign(&ticket.id, &member.id).unwrap();
            ids.push(ticket.id);
        }

        assert_eq!(desk.remove_staff(&member.id).unwrap(), 3);
        for id in &ids {
            assert_eq!(desk.get_ticket(id).unwrap().assigned_to, admin.id);
        }
        assert!(matches!(
            desk.get_staff(&member.id),
            Err(HublyError::NotFound(_))
        ));
        assert_eq!(
            desk.list_tickets(&admin, &TicketFilter::default())
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_administrator_cannot_be_removed() {
        let (mut desk, _, admin) = HelpDesk::test_desk();
        assert!(matches!(
            desk.remove_staff(&admin.id),
            Err(HublyError::Staff(StaffError::CannotRemoveAdministrator))
        ));
    }

    #[test]
    fn test_list_staff_sorted() {
        let (mut desk, _, _) = HelpDesk::test_desk();
        desk.create_staff(sample_input("zed")).unwrap();
        desk.create_staff(sample_input("amy")).unwrap();
        let names: Vec<_> = desk
            .list_staff()
            .unwrap()
            .into_iter()
            .map(|s| s.first_name)
            .collect();
        assert_eq!(names, vec!["admin", "amy", "zed"]);
    }
}
