//! Reminder alarm and calendar events for parkmark.
//!
//! An alarm is an explicit owned resource: scheduling returns a handle that
//! owns the timer thread, `cancel` stops it, `wait` joins it, and dropping
//! the handle cancels outstanding work. The calendar half writes a standard
//! `.ics` event file instead of ringing in-process.

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Shared cancel flag plus the signal that wakes the timer thread.
#[derive(Debug)]
struct AlarmState {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

/// A scheduled reminder.
///
/// The timer thread sleeps until the deadline, runs the action exactly once,
/// and exits. Cancelling (or dropping the handle) wakes the thread so it can
/// exit without firing.
#[derive(Debug)]
pub struct Alarm {
    state: Arc<AlarmState>,
    thread: Option<thread::JoinHandle<bool>>,
}

impl Alarm {
    /// Schedule `action` to run at `deadline`.
    ///
    /// # Errors
    ///
    /// Returns an error if the deadline is not in the future.
    pub fn schedule<F>(deadline: DateTime<Local>, action: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        if deadline <= Local::now() {
            return Err(Error::invalid_reminder("the time is already past"));
        }

        let state = Arc::new(AlarmState {
            cancelled: Mutex::new(false),
            signal: Condvar::new(),
        });
        let thread_state = Arc::clone(&state);

        let handle = thread::spawn(move || {
            let mut cancelled = thread_state
                .cancelled
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            loop {
                if *cancelled {
                    debug!("Alarm cancelled before firing");
                    return false;
                }
                let now = Local::now();
                if now >= deadline {
                    break;
                }
                let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
                let (guard, _timed_out) = thread_state
                    .signal
                    .wait_timeout(cancelled, remaining)
                    .unwrap_or_else(PoisonError::into_inner);
                cancelled = guard;
            }
            drop(cancelled);
            info!("Alarm fired");
            action();
            true
        });

        Ok(Self {
            state,
            thread: Some(handle),
        })
    }

    /// Stop the alarm; a cancelled alarm never runs its action.
    pub fn cancel(&self) {
        let mut cancelled = self
            .state
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.state.signal.notify_all();
    }

    /// Block until the timer thread exits.
    ///
    /// Returns `true` if the alarm fired, `false` if it was cancelled.
    #[must_use]
    pub fn wait(mut self) -> bool {
        self.thread
            .take()
            .map_or(false, |thread| thread.join().unwrap_or(false))
    }
}

impl Drop for Alarm {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel();
            let _ = thread.join();
        }
    }
}

/// Resolve a reminder deadline from the CLI arguments.
///
/// `at` is a wall-clock time (`HH:MM`), taken today or tomorrow if already
/// past; `in_minutes` counts from now. Exactly one must be given.
///
/// # Errors
///
/// Returns an error if neither or both arguments are set, or the values
/// don't parse.
pub fn resolve_deadline(at: Option<&str>, in_minutes: Option<i64>) -> Result<DateTime<Local>> {
    match (at, in_minutes) {
        (Some(time), None) => {
            let time = NaiveTime::parse_from_str(time, "%H:%M")
                .map_err(|_| Error::invalid_reminder(format!("cannot parse time '{time}'")))?;
            let now = Local::now();
            let today = now
                .with_time(time)
                .single()
                .ok_or_else(|| Error::invalid_reminder("ambiguous local time"))?;
            if today > now {
                Ok(today)
            } else {
                Ok(today + ChronoDuration::days(1))
            }
        }
        (None, Some(minutes)) => {
            if minutes <= 0 {
                return Err(Error::invalid_reminder("minutes must be positive"));
            }
            Ok(Local::now() + ChronoDuration::minutes(minutes))
        }
        _ => Err(Error::invalid_reminder(
            "give exactly one of --at or --in",
        )),
    }
}

/// A calendar event to be handed to whatever calendar the user runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Event title.
    pub summary: String,
    /// Where the event happens.
    pub location: String,
    /// Free-form description.
    pub description: String,
    /// Event start.
    pub start: DateTime<Utc>,
    /// Event end.
    pub end: DateTime<Utc>,
}

impl CalendarEvent {
    /// Write the event as an RFC 5545 `.ics` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_ics(&self, path: &Path) -> Result<()> {
        let stamp = Utc::now();
        let ics = format!(
            "BEGIN:VCALENDAR\r\n\
             VERSION:2.0\r\n\
             PRODID:-//parkmark//EN\r\n\
             BEGIN:VEVENT\r\n\
             UID:parkmark-{}@parkmark\r\n\
             DTSTAMP:{}\r\n\
             DTSTART:{}\r\n\
             DTEND:{}\r\n\
             SUMMARY:{}\r\n\
             LOCATION:{}\r\n\
             DESCRIPTION:{}\r\n\
             END:VEVENT\r\n\
             END:VCALENDAR\r\n",
            stamp.timestamp_millis(),
            format_ics_time(stamp),
            format_ics_time(self.start),
            format_ics_time(self.end),
            escape_ics(&self.summary),
            escape_ics(&self.location),
            escape_ics(&self.description),
        );
        std::fs::write(path, ics)?;
        info!("Calendar event written to {}", path.display());
        Ok(())
    }
}

/// UTC timestamp in the basic iCalendar format.
fn format_ics_time(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escape text per RFC 5545 section 3.3.11.
fn escape_ics(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_alarm_fires() {
        let (tx, rx) = mpsc::channel();
        let deadline = Local::now() + ChronoDuration::milliseconds(50);

        let alarm = Alarm::schedule(deadline, move || {
            let _ = tx.send(());
        })
        .unwrap();

        assert!(alarm.wait());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_alarm_cancel_prevents_firing() {
        let (tx, rx) = mpsc::channel();
        let deadline = Local::now() + ChronoDuration::seconds(30);

        let alarm = Alarm::schedule(deadline, move || {
            let _ = tx.send(());
        })
        .unwrap();
        alarm.cancel();

        assert!(!alarm.wait());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_alarm_drop_cancels() {
        let (tx, rx) = mpsc::channel();
        let deadline = Local::now() + ChronoDuration::seconds(30);

        let alarm = Alarm::schedule(deadline, move || {
            let _ = tx.send(());
        })
        .unwrap();
        drop(alarm);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_alarm_rejects_past_deadline() {
        let deadline = Local::now() - ChronoDuration::seconds(1);
        let result = Alarm::schedule(deadline, || {});
        assert!(matches!(result, Err(Error::InvalidReminder { .. })));
    }

    #[test]
    fn test_resolve_deadline_in_minutes() {
        let before = Local::now();
        let deadline = resolve_deadline(None, Some(30)).unwrap();
        assert!(deadline >= before + ChronoDuration::minutes(30));
        assert!(deadline <= Local::now() + ChronoDuration::minutes(30));
    }

    #[test]
    fn test_resolve_deadline_rejects_zero_minutes() {
        assert!(resolve_deadline(None, Some(0)).is_err());
        assert!(resolve_deadline(None, Some(-5)).is_err());
    }

    #[test]
    fn test_resolve_deadline_at_is_in_future() {
        let deadline = resolve_deadline(Some("08:30"), None).unwrap();
        assert!(deadline > Local::now());
        assert_eq!(deadline.format("%H:%M").to_string(), "08:30");
    }

    #[test]
    fn test_resolve_deadline_bad_time() {
        assert!(resolve_deadline(Some("25:99"), None).is_err());
        assert!(resolve_deadline(Some("soon"), None).is_err());
    }

    #[test]
    fn test_resolve_deadline_requires_exactly_one() {
        assert!(resolve_deadline(None, None).is_err());
        assert!(resolve_deadline(Some("10:00"), Some(5)).is_err());
    }

    #[test]
    fn test_write_ics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminder.ics");

        let start = Utc::now() + ChronoDuration::hours(1);
        let event = CalendarEvent {
            summary: "Check the car".to_string(),
            location: "Central parking, level 2".to_string(),
            description: "Move it before the meter runs out".to_string(),
            start,
            end: start + ChronoDuration::hours(1),
        };
        event.write_ics(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("BEGIN:VCALENDAR"));
        assert!(content.contains("SUMMARY:Check the car"));
        // The comma in the location is escaped.
        assert!(content.contains("LOCATION:Central parking\\, level 2"));
        assert!(content.contains("END:VEVENT"));
    }

    #[test]
    fn test_escape_ics() {
        assert_eq!(escape_ics("a,b;c\\d"), "a\\,b\\;c\\\\d");
        assert_eq!(escape_ics("line\nbreak"), "line\\nbreak");
    }

    #[test]
    fn test_format_ics_time_shape() {
        let formatted = format_ics_time(Utc::now());
        assert_eq!(formatted.len(), 16);
        assert!(formatted.ends_with('Z'));
        assert!(formatted.contains('T'));
    }
}
