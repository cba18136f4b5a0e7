use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// India Standard Time, UTC+05:30
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

const IST: FixedOffset = match FixedOffset::east_opt(IST_OFFSET_SECS) {
    Some(offset) => offset,
    None => panic!("IST offset out of range"),
};

const NSE_OPEN: NaiveTime = match NaiveTime::from_hms_opt(9, 15, 0) {
    Some(time) => time,
    None => panic!("invalid open time"),
};

const NSE_CLOSE: NaiveTime = match NaiveTime::from_hms_opt(15, 30, 0) {
    Some(time) => time,
    None => panic!("invalid close time"),
};

// Upper bound when scanning forward for the next trading day
const MAX_CALENDAR_SCAN_DAYS: usize = 31;

/// Exchange calendar settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCalendar {
    pub utc_offset_minutes: i32,
    pub open: NaiveTime,
    pub close: NaiveTime,
    /// Exchange holidays, treated like weekend days
    pub holidays: Vec<NaiveDate>,
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self {
            utc_offset_minutes: IST_OFFSET_SECS / 60,
            open: NSE_OPEN,
            close: NSE_CLOSE,
            holidays: Vec::new(),
        }
    }
}

/// Next session transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionEvent {
    #[serde(rename = "Opens in")]
    Opens,
    #[serde(rename = "Closes in")]
    Closes,
}

impl SessionEvent {
    pub fn label(&self) -> &'static str {
        match self {
            SessionEvent::Opens => "Opens in",
            SessionEvent::Closes => "Closes in",
        }
    }
}

/// Open/closed state and time to the next transition, computed for one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWindow {
    pub is_open: bool,
    pub market_status: String,
    pub next_event_label: SessionEvent,
    /// Milliseconds until the next event, never negative
    pub time_to_event: i64,
    pub next_event_at: DateTime<FixedOffset>,
}

/// Computes session windows for an exchange with fixed local hours
#[derive(Debug, Clone)]
pub struct SessionClock {
    offset: FixedOffset,
    open: NaiveTime,
    close: NaiveTime,
    holidays: BTreeSet<NaiveDate>,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self {
            offset: IST,
            open: NSE_OPEN,
            close: NSE_CLOSE,
            holidays: BTreeSet::new(),
        }
    }
}

impl SessionClock {
    pub fn new(calendar: &SessionCalendar) -> crate::Result<Self> {
        let offset = FixedOffset::east_opt(calendar.utc_offset_minutes * 60).ok_or_else(|| {
            format!("UTC offset out of range: {} minutes", calendar.utc_offset_minutes)
        })?;

        if calendar.open >= calendar.close {
            return Err(format!(
                "Session open {} must be before close {}",
                calendar.open, calendar.close
            )
            .into());
        }

        Ok(Self {
            offset,
            open: truncate_to_minute(calendar.open),
            close: truncate_to_minute(calendar.close),
            holidays: calendar.holidays.iter().copied().collect(),
        })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Session window for the current wall-clock time
    pub fn now(&self) -> SessionWindow {
        self.window_at(Utc::now())
    }

    /// Session window for an arbitrary instant
    pub fn window_at(&self, now: DateTime<Utc>) -> SessionWindow {
        let local = now.with_timezone(&self.offset);
        let today = local.date_naive();
        let minute = minute_of_day(local.time());
        let open = minute_of_day(self.open);
        let close = minute_of_day(self.close);
        let trading_day = self.is_trading_day(today);

        let is_open = trading_day && minute >= open && minute <= close;

        let (event, target_date, target_time) = if !trading_day {
            (SessionEvent::Opens, self.next_trading_day(today), self.open)
        } else if minute < open {
            (SessionEvent::Opens, today, self.open)
        } else if minute < close {
            (SessionEvent::Closes, today, self.close)
        } else {
            (SessionEvent::Opens, self.next_trading_day(today), self.open)
        };

        let remaining = target_date.and_time(target_time) - local.naive_local();
        let next_event_at = local.checked_add_signed(remaining).unwrap_or(local);

        SessionWindow {
            is_open,
            market_status: if is_open { "Open" } else { "Closed" }.to_string(),
            next_event_label: event,
            time_to_event: remaining.num_milliseconds().max(0),
            next_event_at,
        }
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    fn next_trading_day(&self, from: NaiveDate) -> NaiveDate {
        let mut day = from;
        for _ in 0..MAX_CALENDAR_SCAN_DAYS {
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
            if self.is_trading_day(day) {
                return day;
            }
        }
        day
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}
