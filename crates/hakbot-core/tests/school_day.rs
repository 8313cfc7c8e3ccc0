//! End-to-end: data files on disk → DataSource → Interpreter.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use hakbot_core::data::{DataSource, EVENTS_FILE, MEALS_FILE, TIMETABLE_FILE};
use hakbot_core::interpret::{Interpreter, FALLBACK_ANSWER};
use hakbot_core::text;

fn manila() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    fn new(meals: &str, events: &str, timetable: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("hakbot-e2e-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MEALS_FILE), meals).unwrap();
        std::fs::write(dir.join(EVENTS_FILE), events).unwrap();
        std::fs::write(dir.join(TIMETABLE_FILE), timetable).unwrap();
        Self { dir }
    }

    fn source(&self) -> DataSource {
        DataSource::new(&self.dir, Duration::from_secs(2))
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[tokio::test]
async fn todays_meal_from_disk() {
    let today = text::today(Utc::now(), manila());
    let fixture = Fixture::new(
        &format!("date,menu,source\n{today},Fried Rice,school\n"),
        "title,date_start,date_end,description,type\n",
        "{}",
    );

    let data = fixture.source().load_all().await.unwrap();
    let answer = Interpreter::new(manila()).interpret("오늘 급식", &data);
    assert_eq!(answer, format!("{today} 급식: Fried Rice (source: school)"));
}

#[tokio::test]
async fn tomorrows_meal_uses_school_calendar() {
    let tomorrow = text::date_with_offset(1, Utc::now(), manila());
    let fixture = Fixture::new(
        &format!("date,menu,source\n{tomorrow},\"Curry, Salad\",cafeteria\n"),
        "",
        "{}",
    );

    let data = fixture.source().load_all().await.unwrap();
    let answer = Interpreter::new(manila()).interpret("tomorrow lunch?", &data);
    assert_eq!(answer, format!("{tomorrow} 급식: Curry, Salad (source: cafeteria)"));
}

#[tokio::test]
async fn only_past_events_means_none_upcoming() {
    let fixture = Fixture::new(
        "date,menu,source\n",
        "title,date_start,date_end,description,type\n\
         Opening Ceremony,2001-03-02,2001-03-02,First day,ceremony\n",
        "{}",
    );

    let data = fixture.source().load_all().await.unwrap();
    let answer = Interpreter::new(manila()).interpret("다음 행사", &data);
    assert_eq!(answer, "등록된 향후 일정이 없습니다.");
}

#[tokio::test]
async fn unrelated_query_gets_guidance() {
    let fixture = Fixture::new("", "", "{}");
    let data = fixture.source().load_all().await.unwrap();
    let answer = Interpreter::new(manila()).interpret("xyz unrelated", &data);
    assert_eq!(answer, FALLBACK_ANSWER);
}

#[tokio::test]
async fn timetable_class_from_free_text() {
    let fixture = Fixture::new(
        "",
        "",
        r#"{"1-1": {"monday": ["Korean"]}, "2-3": {"monday": ["Math", "English", "PE", "Science"]}}"#,
    );
    let data = fixture.source().load_all().await.unwrap();
    let answer = Interpreter::new(manila()).interpret("2학년 3반 월요일 시간표", &data);
    assert_eq!(answer, "2-3 반 월요일 시간표는: Math, English, PE, Science");
}
