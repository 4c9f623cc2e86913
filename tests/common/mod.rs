//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono_tz::Europe::Berlin;
use std::sync::{Arc, Mutex};

use slotwatch::crawler::{CalendarTarget, HttpSessionFactory, PageSession, SessionFactory};
use slotwatch::identity::Identity;
use slotwatch::notifications::{Alert, Alerter};
use slotwatch::parser::BookableSlotParser;
use slotwatch::utils::error::FetchError;
use slotwatch::watcher::PollCycle;

/// Service id used by every test target
pub const SERVICE_ID: &str = "120686";

/// Calendar month view with one bookable cell per timestamp
pub fn calendar_page(timestamps: &[i64]) -> String {
    let cells: String = timestamps
        .iter()
        .map(|ts| {
            format!(
                r#"<td class="buchbar"><a href="/terminvereinbarung/termin/time/{ts}/">x</a></td>"#
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html><body><table><tr>
<td class="nichtbuchbar">1</td>
{cells}
</tr></table></body></html>"#
    )
}

/// Target whose calendar lives under `{base}/termin`
pub fn target_for(base: &str) -> CalendarTarget {
    CalendarTarget::from_service_page(
        &format!("https://service.berlin.de/dienstleistung/{SERVICE_ID}/"),
        &format!("{base}/termin"),
        Berlin,
    )
    .unwrap()
}

/// Poll cycle using the real HTTP session and parser
pub fn http_cycle(base: &str, alerter: Arc<RecordingAlerter>) -> PollCycle {
    PollCycle::new(
        target_for(base),
        Arc::new(HttpSessionFactory::default()),
        Arc::new(BookableSlotParser::new(Berlin)),
        alerter,
    )
}

/// Collects alerts instead of ringing
#[derive(Default)]
pub struct RecordingAlerter {
    pub alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlerter {
    pub fn taken(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.alerts.lock().unwrap())
    }
}

impl Alerter for RecordingAlerter {
    fn notify(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

/// Sessions that never answer
pub struct HangingSessions;

struct HangingSession;

impl SessionFactory for HangingSessions {
    fn open(&self, _identity: &Identity) -> Result<Box<dyn PageSession>, FetchError> {
        Ok(Box::new(HangingSession))
    }
}

#[async_trait]
impl PageSession for HangingSession {
    async fn get(&self, _url: &str) -> Result<String, FetchError> {
        std::future::pending::<Result<String, FetchError>>().await
    }
}

/// Sessions that serve the same page for every URL and count requests
#[derive(Default)]
pub struct StaticSessions {
    pub page: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

struct StaticSession {
    page: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl SessionFactory for StaticSessions {
    fn open(&self, _identity: &Identity) -> Result<Box<dyn PageSession>, FetchError> {
        Ok(Box::new(StaticSession {
            page: self.page.clone(),
            requests: Arc::clone(&self.requests),
        }))
    }
}

#[async_trait]
impl PageSession for StaticSession {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self.page.clone())
    }
}
