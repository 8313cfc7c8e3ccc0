//! Rule-based answers to free-text questions about meals, timetables and
//! events.
//!
//! Intent is chosen by [`INTENT_RULES`], checked in order; the first rule
//! with a keyword contained in the normalized query wins. A query that
//! mentions both a meal and a timetable keyword is therefore a meal query.
//! Lookups that find nothing produce a descriptive answer, never an error.

use chrono::{DateTime, FixedOffset, Utc};

use crate::data::{EventRecord, SchoolData};
use crate::text::{self, SCHOOL_DAYS};

pub const FALLBACK_ANSWER: &str = "무엇을 도와드릴까요? 이렇게 물어보세요: \
\"오늘 급식\", \"내일 급식\", \"2-3 월요일 시간표\", \"다음 행사\"";

pub const NO_UPCOMING_EVENTS: &str = "등록된 향후 일정이 없습니다.";

pub const NO_TIMETABLE: &str = "등록된 시간표가 없습니다.";

/// Day used when "today"/"tomorrow" falls on a weekend.
pub const WEEKEND_FALLBACK_DAY: &str = "monday";

const MAX_UPCOMING_EVENTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Meal,
    Timetable,
    Event,
    Fallback,
}

type Handler = fn(&Interpreter, &str, &SchoolData, &QueryContext) -> String;

pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
    handler: Handler,
}

impl IntentRule {
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k))
    }
}

/// Intent rules in priority order.
pub static INTENT_RULES: [IntentRule; 3] = [
    IntentRule {
        intent: Intent::Meal,
        keywords: &["급식", "점심", "메뉴", "meal", "lunch", "menu"],
        handler: Interpreter::answer_meal,
    },
    IntentRule {
        intent: Intent::Timetable,
        keywords: &["시간표", "수업", "timetable", "schedule", "class"],
        handler: Interpreter::answer_timetable,
    },
    IntentRule {
        intent: Intent::Event,
        keywords: &["행사", "일정", "event"],
        handler: Interpreter::answer_event,
    },
];

pub fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

pub fn classify(query: &str) -> Intent {
    let normalized = normalize(query);
    INTENT_RULES
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map_or(Intent::Fallback, |rule| rule.intent)
}

/// Per-request inputs besides the query and data.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub now: DateTime<Utc>,
    /// The asking user's own class; used when the query names none.
    pub home_class: Option<String>,
}

impl QueryContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            home_class: None,
        }
    }

    pub fn current() -> Self {
        Self::at(Utc::now())
    }

    pub fn with_home_class(mut self, home_class: Option<String>) -> Self {
        self.home_class = home_class;
        self
    }
}

/// Stateless interpreter anchored to the school's timezone.
#[derive(Debug, Clone, Copy)]
pub struct Interpreter {
    tz: FixedOffset,
}

impl Interpreter {
    pub fn new(tz: FixedOffset) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> FixedOffset {
        self.tz
    }

    /// Answer `query` as of now.
    pub fn interpret(&self, query: &str, data: &SchoolData) -> String {
        self.interpret_with(query, data, &QueryContext::current())
    }

    pub fn interpret_with(&self, query: &str, data: &SchoolData, ctx: &QueryContext) -> String {
        let normalized = normalize(query);
        match INTENT_RULES.iter().find(|rule| rule.matches(&normalized)) {
            Some(rule) => (rule.handler)(self, &normalized, data, ctx),
            None => FALLBACK_ANSWER.to_string(),
        }
    }

    fn answer_meal(&self, query: &str, data: &SchoolData, ctx: &QueryContext) -> String {
        let date = match text::extract_iso_date(query) {
            Some(literal) => literal.to_string(),
            None => text::date_with_offset(relative_day_offset(query), ctx.now, self.tz),
        };

        // Duplicate dates: the later row wins.
        match data.meals.iter().rev().find(|meal| meal.date == date) {
            Some(meal) => format!(
                "{} 급식: {} (source: {})",
                meal.date, meal.menu, meal.source
            ),
            None => format!("{date} 급식 정보가 없습니다."),
        }
    }

    fn answer_timetable(&self, query: &str, data: &SchoolData, ctx: &QueryContext) -> String {
        let class_key = text::extract_class_key(query)
            .or_else(|| ctx.home_class.clone())
            .or_else(|| data.timetable.first_class().map(str::to_string));
        let Some(class_key) = class_key else {
            return NO_TIMETABLE.to_string();
        };

        let day = self.resolve_day(query, ctx.now);
        let day_label = text::weekday_label_ko(day);

        let Some(schedule) = data.timetable.get(&class_key) else {
            return format!("{class_key} 반 시간표를 찾을 수 없습니다.");
        };
        let subjects = schedule.subjects(day);
        if subjects.is_empty() {
            return format!("{class_key} 반 {day_label} 등록된 수업이 없습니다.");
        }
        format!("{class_key} 반 {day_label} 시간표는: {}", subjects.join(", "))
    }

    fn answer_event(&self, _query: &str, data: &SchoolData, ctx: &QueryContext) -> String {
        let today = text::today(ctx.now, self.tz);
        let upcoming: Vec<String> = data
            .events
            .iter()
            .filter(|event| event.date_start.as_str() >= today.as_str())
            .take(MAX_UPCOMING_EVENTS)
            .map(format_event)
            .collect();

        if upcoming.is_empty() {
            return NO_UPCOMING_EVENTS.to_string();
        }
        format!("다가오는 행사: {}", upcoming.join(", "))
    }

    /// Named weekdays are checked Monday→Friday and the last match wins;
    /// "today"/"tomorrow" override any named day. With neither, today.
    fn resolve_day(&self, query: &str, now: DateTime<Utc>) -> &'static str {
        let mut named = None;
        for day in SCHOOL_DAYS {
            if query.contains(text::weekday_label_ko(day)) || query.contains(day) {
                named = Some(day);
            }
        }

        let offset = if query.contains("내일") || query.contains("tomorrow") {
            Some(1)
        } else if query.contains("오늘") || query.contains("today") {
            Some(0)
        } else {
            None
        };

        match (offset, named) {
            (Some(offset), _) => text::weekday_with_offset(offset, now, self.tz, WEEKEND_FALLBACK_DAY),
            (None, Some(day)) => day,
            (None, None) => text::weekday_with_offset(0, now, self.tz, WEEKEND_FALLBACK_DAY),
        }
    }
}

fn relative_day_offset(query: &str) -> i64 {
    if query.contains("tomorrow") || query.contains("내일") {
        1
    } else if query.contains("yesterday") || query.contains("어제") {
        -1
    } else {
        0
    }
}

fn format_event(event: &EventRecord) -> String {
    if event.is_multi_day() {
        format!("{} ({} ~ {})", event.title, event.date_start, event.date_end)
    } else {
        format!("{} ({})", event.title, event.date_start)
    }
}
