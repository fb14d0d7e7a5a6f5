//! Shared helpers for hubly-core integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use hubly_core::{DeskConfig, HelpDesk, ManualClock, NewStaff, Repository, Staff};

pub fn staff_input(tag: &str) -> NewStaff {
    NewStaff {
        first_name: tag.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{}@example.com", tag),
        phone: String::new(),
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 7, 1, 8, 0, 0).unwrap(),
    ))
}

/// In-memory desk with an administrator
pub fn memory_desk() -> (HelpDesk, Arc<ManualClock>, Staff) {
    let clock = manual_clock();
    let mut desk = HelpDesk::new(
        Repository::in_memory().unwrap(),
        clock.clone(),
        &DeskConfig::default(),
    );
    let admin = desk.create_administrator(staff_input("admin")).unwrap();
    (desk, clock, admin)
}

/// Desk over a database file, sharing `clock`
pub fn file_desk(path: &Path, clock: Arc<ManualClock>) -> HelpDesk {
    HelpDesk::new(Repository::new(path).unwrap(), clock, &DeskConfig::default())
}
