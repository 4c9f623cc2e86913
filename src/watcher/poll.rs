//! One poll cycle: fetch both calendar pages, merge, classify

use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::crawler::{CalendarTarget, SessionFactory};
use crate::identity::Identity;
use crate::models::ResultSnapshot;
use crate::notifications::{Alert, Alerter};
use crate::parser::SlotParser;
use crate::utils::error::{ParseError, PollFailure};
use crate::utils::format_json_time;

/// Per-page timeout budget
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetches and parses the calendar for one identity
pub struct PollCycle {
    target: CalendarTarget,
    sessions: Arc<dyn SessionFactory>,
    parser: Arc<dyn SlotParser>,
    alerter: Arc<dyn Alerter>,
    request_timeout: Duration,
    quiet: bool,
}

impl PollCycle {
    pub fn new(
        target: CalendarTarget,
        sessions: Arc<dyn SessionFactory>,
        parser: Arc<dyn SlotParser>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            target,
            sessions,
            parser,
            alerter,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            quiet: false,
        }
    }

    /// Override the per-page timeout budget
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Suppress local alerts
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn target(&self) -> &CalendarTarget {
        &self.target
    }

    /// Run one cycle; failures are folded into the snapshot
    ///
    /// The returned snapshot has no "last found" instant yet; the driver
    /// fills it in from the previous one.
    pub async fn run(&self, identity: &Identity) -> ResultSnapshot {
        let result = self.fetch_appointments(identity, Utc::now()).await;
        let completed_at = Utc::now();

        match result {
            Ok(appointments) => {
                let dates: Vec<String> = appointments.iter().map(format_json_time).collect();
                tracing::info!(
                    identity = %identity,
                    count = appointments.len(),
                    dates = ?dates,
                    "Found {} appointments",
                    appointments.len()
                );

                if !appointments.is_empty() {
                    self.raise(Alert::AppointmentsFound {
                        count: appointments.len(),
                        url: self.target.current_month_url(),
                    });
                }

                ResultSnapshot::success(completed_at, appointments)
            }
            Err(failure) => {
                log_failure(identity, &failure);
                let snapshot = ResultSnapshot::failure(completed_at, &failure);
                self.raise(Alert::PollFailed(failure));
                snapshot
            }
        }
    }

    /// Fetch both pages through one session and merge their slots
    ///
    /// # Errors
    ///
    /// Returns the `PollFailure` classification of the first failing step.
    pub async fn fetch_appointments(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, PollFailure> {
        let session = self.sessions.open(identity)?;
        let mut appointments = BTreeSet::new();

        for url in self.target.urls(now) {
            let page = tokio::time::timeout(self.request_timeout, session.get(&url))
                .await
                .map_err(|_| PollFailure::TimedOut)??;

            for wall_clock in self.parser.parse(&page)? {
                // A wall-clock time repeated by the autumn shift maps to its
                // first (summer time) occurrence
                let instant = self
                    .target
                    .timezone()
                    .from_local_datetime(&wall_clock)
                    .earliest()
                    .ok_or_else(|| ParseError::NonexistentLocalTime(wall_clock.to_string()))?;
                appointments.insert(instant.with_timezone(&Utc));
            }
        }

        Ok(appointments.into_iter().collect())
    }

    fn raise(&self, alert: Alert) {
        if !self.quiet {
            self.alerter.notify(&alert);
        }
    }
}

fn log_failure(identity: &Identity, failure: &PollFailure) {
    match failure {
        PollFailure::Rejected { status } => {
            tracing::warn!(identity = %identity, status = %status, "Got {status} error from booking service");
        }
        PollFailure::Unreachable => {
            tracing::warn!(identity = %identity, "Could not connect to booking service");
        }
        PollFailure::TimedOut => {
            tracing::error!(identity = %identity, "Timed out waiting for booking service");
        }
        PollFailure::Unexpected(text) => {
            tracing::error!(identity = %identity, error = %text, "Could not fetch results due to an unexpected error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::PageSession;
    use crate::utils::error::FetchError;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use chrono_tz::Europe::Berlin;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned results keyed by URL path segment
    struct CannedSessions {
        pages: HashMap<&'static str, Result<&'static str, u16>>,
    }

    struct CannedSession {
        pages: HashMap<&'static str, Result<&'static str, u16>>,
    }

    impl SessionFactory for CannedSessions {
        fn open(&self, _identity: &Identity) -> Result<Box<dyn PageSession>, FetchError> {
            Ok(Box::new(CannedSession {
                pages: self.pages.clone(),
            }))
        }
    }

    #[async_trait]
    impl PageSession for CannedSession {
        async fn get(&self, url: &str) -> Result<String, FetchError> {
            let key = if url.contains("/all/") { "all" } else { "day" };
            match self.pages.get(key) {
                Some(Ok(body)) => Ok(body.to_string()),
                Some(Err(status)) => Err(FetchError::Status(*status)),
                None => Err(FetchError::Connect("no route".into())),
            }
        }
    }

    /// Page body is a comma-separated list of wall-clock times
    struct ListParser;

    impl SlotParser for ListParser {
        fn parse(&self, page: &str) -> Result<Vec<NaiveDateTime>, ParseError> {
            page.split(',')
                .filter(|s| !s.is_empty())
                .map(|s| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
                        .map_err(|_| ParseError::InvalidSlotLink(s.to_string()))
                })
                .collect()
        }
    }

    #[derive(Default)]
    struct RecordingAlerter {
        alerts: Mutex<Vec<Alert>>,
    }

    impl Alerter for RecordingAlerter {
        fn notify(&self, alert: &Alert) {
            self.alerts.lock().unwrap().push(alert.clone());
        }
    }

    fn cycle(
        pages: HashMap<&'static str, Result<&'static str, u16>>,
        alerter: Arc<RecordingAlerter>,
    ) -> PollCycle {
        let target = CalendarTarget::from_service_page(
            "https://service.example/dienstleistung/42/",
            "https://service.example/termin",
            Berlin,
        )
        .unwrap();
        PollCycle::new(
            target,
            Arc::new(CannedSessions { pages }),
            Arc::new(ListParser),
            alerter,
        )
    }

    #[tokio::test]
    async fn test_merges_and_localizes() {
        let alerter = Arc::new(RecordingAlerter::default());
        let cycle = cycle(
            HashMap::from([
                ("all", Ok("2024-07-03 09:00,2024-07-01 10:00")),
                ("day", Ok("2024-08-02 08:30,2024-07-03 09:00")),
            ]),
            alerter.clone(),
        );

        let snapshot = cycle.run(&Identity::direct()).await;
        let times: Vec<String> = snapshot.appointments().iter().map(format_json_time).collect();

        // CEST is UTC+2
        assert_eq!(
            times,
            vec![
                "2024-07-01T08:00:00Z",
                "2024-07-03T07:00:00Z",
                "2024-08-02T06:30:00Z"
            ]
        );
        assert_eq!(snapshot.status(), 200);
        assert_eq!(alerter.alerts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_hour_resolves_to_summer_time() {
        let alerter = Arc::new(RecordingAlerter::default());
        // 2024-10-27 02:30 occurs twice in Berlin: CEST then CET
        let cycle = cycle(
            HashMap::from([("all", Ok("2024-10-27 02:30")), ("day", Ok(""))]),
            alerter,
        );

        let snapshot = cycle.run(&Identity::direct()).await;
        let times: Vec<String> = snapshot.appointments().iter().map(format_json_time).collect();
        assert_eq!(times, vec!["2024-10-27T00:30:00Z"]);
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let alerter = Arc::new(RecordingAlerter::default());
        let cycle = cycle(HashMap::from([("all", Err(429))]), alerter.clone());

        let snapshot = cycle.run(&Identity::direct()).await;
        assert_eq!(snapshot.status(), 502);
        assert!(snapshot.message().unwrap().contains("429"));
        assert_eq!(
            alerter.alerts.lock().unwrap().as_slice(),
            &[Alert::PollFailed(PollFailure::Rejected { status: 429 })]
        );
    }

    #[tokio::test]
    async fn test_connection_failure_on_second_page() {
        let alerter = Arc::new(RecordingAlerter::default());
        let cycle = cycle(HashMap::from([("all", Ok("2024-07-01 10:00"))]), alerter);

        let snapshot = cycle.run(&Identity::direct()).await;
        assert_eq!(snapshot.status(), 502);
        assert!(snapshot.appointments().is_empty());
        assert!(snapshot.message().unwrap().contains("connection error"));
    }

    #[tokio::test]
    async fn test_parse_failure_is_unexpected() {
        let alerter = Arc::new(RecordingAlerter::default());
        let cycle = cycle(
            HashMap::from([("all", Ok("garbage")), ("day", Ok(""))]),
            alerter,
        );

        let snapshot = cycle.run(&Identity::direct()).await;
        assert_eq!(snapshot.status(), 500);
        assert!(snapshot.message().unwrap().contains("garbage"));
    }

    #[tokio::test]
    async fn test_quiet_suppresses_alerts() {
        let alerter = Arc::new(RecordingAlerter::default());
        let cycle = cycle(HashMap::from([("all", Err(503))]), alerter.clone()).quiet(true);

        let snapshot = cycle.run(&Identity::direct()).await;
        assert_eq!(snapshot.status(), 502);
        assert!(alerter.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_raises_no_alert() {
        let alerter = Arc::new(RecordingAlerter::default());
        let cycle = cycle(
            HashMap::from([("all", Ok("")), ("day", Ok(""))]),
            alerter.clone(),
        );

        let snapshot = cycle.run(&Identity::direct()).await;
        assert!(snapshot.is_success());
        assert!(snapshot.appointments().is_empty());
        assert!(alerter.alerts.lock().unwrap().is_empty());
    }

    /// Serves generated pages: the current month view and the next one
    struct TwoPages {
        current: String,
        next: String,
    }

    impl SessionFactory for TwoPages {
        fn open(&self, _identity: &Identity) -> Result<Box<dyn PageSession>, FetchError> {
            Ok(Box::new(TwoPagesSession {
                current: self.current.clone(),
                next: self.next.clone(),
            }))
        }
    }

    struct TwoPagesSession {
        current: String,
        next: String,
    }

    #[async_trait]
    impl PageSession for TwoPagesSession {
        async fn get(&self, url: &str) -> Result<String, FetchError> {
            if url.contains("/all/") {
                Ok(self.current.clone())
            } else {
                Ok(self.next.clone())
            }
        }
    }

    fn list_page(slots: &[NaiveDateTime]) -> String {
        slots
            .iter()
            .map(|slot| slot.format("%Y-%m-%d %H:%M").to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    proptest::proptest! {
        /// Overlapping pages merge into their sorted, duplicate-free union
        #[test]
        fn prop_pages_merge_into_sorted_union(
            current in proptest::collection::vec(0i64..43_200, 0..20),
            next in proptest::collection::vec(0i64..43_200, 0..20),
            shared in proptest::collection::vec(0i64..43_200, 0..10),
        ) {
            // July 2024 lies entirely in CEST, so every wall-clock time is unambiguous
            let month_start = NaiveDateTime::parse_from_str("2024-07-01 00:00", "%Y-%m-%d %H:%M")
                .unwrap();
            let slot = |minutes: &i64| month_start + chrono::Duration::minutes(*minutes);

            let current: Vec<NaiveDateTime> = current.iter().chain(&shared).map(slot).collect();
            let next: Vec<NaiveDateTime> = next.iter().chain(&shared).map(slot).collect();

            let expected: Vec<DateTime<Utc>> = current
                .iter()
                .chain(&next)
                .map(|wall_clock| {
                    Berlin
                        .from_local_datetime(wall_clock)
                        .single()
                        .unwrap()
                        .with_timezone(&Utc)
                })
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let cycle = PollCycle::new(
                CalendarTarget::from_service_page(
                    "https://service.example/dienstleistung/42/",
                    "https://service.example/termin",
                    Berlin,
                )
                .unwrap(),
                Arc::new(TwoPages {
                    current: list_page(&current),
                    next: list_page(&next),
                }),
                Arc::new(ListParser),
                Arc::new(RecordingAlerter::default()),
            );

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let merged = runtime
                .block_on(cycle.fetch_appointments(&Identity::direct(), Utc::now()))
                .unwrap();

            proptest::prop_assert!(merged.windows(2).all(|pair| pair[0] < pair[1]));
            proptest::prop_assert_eq!(merged, expected);
        }
    }
}
