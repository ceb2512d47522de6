use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use mockable::Clock;
use rstest::rstest;
use team_backend::db::enums::{TaskEventKind, TaskState};
use team_backend::db::models::{User, task_time_infinite};
use team_backend::error::{AppError, TransitionError};
use team_backend::services::{MemoryTaskStore, NewTask, RequestContext, TaskLifecycle};

const PROJECT: i64 = 9;
const CREATOR: i64 = 1;
const DEVELOPER: i64 = 2;
const TESTER: i64 = 3;
const STRANGER: i64 = 4;
const ADMIN: i64 = 5;

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

fn clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 5, 6, 9, 30, 0).unwrap())
}

fn now(clock: &FixedClock) -> NaiveDateTime {
    clock.local().naive_local()
}

fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn store() -> MemoryTaskStore {
    let mut store = MemoryTaskStore::new();
    for (id, name) in [
        (CREATOR, "creator"),
        (DEVELOPER, "developer"),
        (TESTER, "tester"),
        (STRANGER, "stranger"),
        (ADMIN, "admin"),
    ] {
        store.add_user(User {
            id,
            name: name.to_string(),
            ..Default::default()
        });
    }
    store.grant_admin(PROJECT, ADMIN);
    store
}

fn new_task() -> NewTask {
    NewTask {
        project: PROJECT,
        creator: CREATOR,
        developer: DEVELOPER,
        tester: TESTER,
        name: "Ship the report page".to_string(),
        content: "Render weekly report".to_string(),
        start_time: day(6),
        end_time: day(10),
        ..Default::default()
    }
}

fn create(store: &mut MemoryTaskStore, clock: &FixedClock, task: NewTask) -> i64 {
    TaskLifecycle::new(store, clock)
        .create(&RequestContext::new(CREATOR), task)
        .unwrap()
}

fn force_state(store: &mut MemoryTaskStore, id: i64, state: TaskState) {
    let task = store.tasks.get_mut(&id).unwrap();
    task.state = state.code();
    if state == TaskState::Archived {
        task.archive_time = day(8);
    }
}

fn kinds(store: &MemoryTaskStore, id: i64) -> Vec<i8> {
    store.events_of(id).iter().map(|e| e.event).collect()
}

#[test]
fn test_create_emits_event_and_notifies_others() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());

    let task = &store.tasks[&id];
    assert_eq!(task.state, TaskState::Planned.code());
    assert_eq!(task.archive_time, task_time_infinite());
    assert!(!task.bring_top);
    assert_eq!(kinds(&store, id), vec![TaskEventKind::Create.code()]);

    let recipients: Vec<_> = store.notices_of(id).iter().map(|n| n.uid).collect();
    assert_eq!(recipients, vec![DEVELOPER, TESTER]);
    assert!(store.notices_of(id).iter().all(|n| n.tname == "Ship the report page"));
}

#[test]
fn test_create_defaults_creator_to_operator() {
    let clock = clock();
    let mut store = store();
    let id = create(
        &mut store,
        &clock,
        NewTask {
            creator: 0,
            ..new_task()
        },
    );
    assert_eq!(store.tasks[&id].creator, CREATOR);
}

#[test]
fn test_create_rejects_missing_fields() {
    let clock = clock();
    let mut store = store();
    let mut engine = TaskLifecycle::new(&mut store, &clock);
    let ctx = RequestContext::new(CREATOR);

    let err = engine
        .create(&ctx, NewTask { name: String::new(), ..new_task() })
        .unwrap_err();
    assert_eq!(err.to_string(), "任务名不可为空");

    let err = engine
        .create(&ctx, NewTask { tester: 0, ..new_task() })
        .unwrap_err();
    assert_eq!(err.to_string(), "测试/验收人员未指定");
    assert!(store.tasks.is_empty());
}

#[test]
fn test_forward_walk_to_archive() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());

    let mut engine = TaskLifecycle::new(&mut store, &clock);
    assert_eq!(
        engine.move_next(&RequestContext::new(DEVELOPER), id).unwrap(),
        TaskState::UnderDevelopment
    );
    assert_eq!(
        engine.move_next(&RequestContext::new(DEVELOPER), id).unwrap(),
        TaskState::UnderTest
    );
    assert_eq!(
        engine.move_next(&RequestContext::new(TESTER), id).unwrap(),
        TaskState::Finished
    );
    assert_eq!(
        engine.move_next(&RequestContext::new(CREATOR), id).unwrap(),
        TaskState::Archived
    );

    let err = engine.move_next(&RequestContext::new(CREATOR), id).unwrap_err();
    assert!(matches!(err, AppError::StateMachine(TransitionError::NoNextStep)));

    assert_eq!(store.tasks[&id].archive_time, now(&clock));
    assert_eq!(
        kinds(&store, id),
        vec![
            TaskEventKind::Create.code(),
            TaskEventKind::Underway.code(),
            TaskEventKind::Testing.code(),
            TaskEventKind::Finished.code(),
            TaskEventKind::Archived.code(),
        ]
    );
}

#[test]
fn test_unauthorized_move_changes_nothing() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());
    force_state(&mut store, id, TaskState::UnderDevelopment);
    let before = store.tasks[&id].clone();
    let (events, notices) = (store.events.len(), store.notices.len());

    let err = TaskLifecycle::new(&mut store, &clock)
        .move_next(&RequestContext::new(STRANGER), id)
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(store.tasks[&id], before);
    assert_eq!(store.events.len(), events);
    assert_eq!(store.notices.len(), notices);

    let next = TaskLifecycle::new(&mut store, &clock)
        .move_next(&RequestContext::new(ADMIN), id)
        .unwrap();
    assert_eq!(next, TaskState::UnderTest);
    assert_eq!(kinds(&store, id).last(), Some(&TaskEventKind::Testing.code()));
}

#[rstest]
#[case(TaskState::Planned, DEVELOPER, true)]
#[case(TaskState::Planned, CREATOR, false)]
#[case(TaskState::UnderDevelopment, DEVELOPER, true)]
#[case(TaskState::UnderDevelopment, TESTER, false)]
#[case(TaskState::UnderTest, TESTER, true)]
#[case(TaskState::UnderTest, DEVELOPER, false)]
#[case(TaskState::Finished, CREATOR, true)]
#[case(TaskState::Finished, TESTER, false)]
#[case(TaskState::Finished, ADMIN, true)]
#[case(TaskState::Archived, CREATOR, false)]
#[case(TaskState::Archived, ADMIN, false)]
fn test_move_next_grid(#[case] state: TaskState, #[case] operator: i64, #[case] succeeds: bool) {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());
    force_state(&mut store, id, state);
    let before = store.tasks[&id].clone();
    let events = store.events.len();

    let result = TaskLifecycle::new(&mut store, &clock).move_next(&RequestContext::new(operator), id);

    assert_eq!(result.is_ok(), succeeds);
    if succeeds {
        assert_eq!(store.tasks[&id].state, state.code() + 1);
        assert_eq!(store.events.len(), events + 1);
        assert_eq!(store.events.last().unwrap().time, now(&clock));
    } else {
        assert_eq!(store.tasks[&id], before);
        assert_eq!(store.events.len(), events);
    }
}

#[rstest]
#[case(TaskState::Planned, CREATOR, false)]
#[case(TaskState::UnderDevelopment, DEVELOPER, true)]
#[case(TaskState::UnderDevelopment, TESTER, false)]
#[case(TaskState::UnderTest, TESTER, true)]
#[case(TaskState::UnderTest, DEVELOPER, true)]
#[case(TaskState::UnderTest, CREATOR, false)]
#[case(TaskState::Finished, CREATOR, true)]
#[case(TaskState::Finished, TESTER, true)]
#[case(TaskState::Finished, DEVELOPER, false)]
#[case(TaskState::Archived, CREATOR, true)]
#[case(TaskState::Archived, TESTER, false)]
#[case(TaskState::Archived, ADMIN, true)]
fn test_move_back_grid(#[case] state: TaskState, #[case] operator: i64, #[case] succeeds: bool) {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());
    force_state(&mut store, id, state);
    let before = store.tasks[&id].clone();
    let events = store.events.len();

    let result = TaskLifecycle::new(&mut store, &clock).move_back(&RequestContext::new(operator), id);

    assert_eq!(result.is_ok(), succeeds);
    if succeeds {
        let task = &store.tasks[&id];
        assert_eq!(task.state, state.code() - 1);
        assert_eq!(task.archive_time, task_time_infinite());
        let event = store.events.last().unwrap();
        assert_eq!(event.event, TaskEventKind::MoveBack.code());
        assert_eq!(event.time, now(&clock));
        assert_eq!(store.events.len(), events + 1);
    } else {
        assert_eq!(store.tasks[&id], before);
        assert_eq!(store.events.len(), events);
    }
}

#[test]
fn test_planned_task_is_not_retractable() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());
    let err = TaskLifecycle::new(&mut store, &clock)
        .move_back(&RequestContext::new(CREATOR), id)
        .unwrap_err();
    assert!(matches!(err, AppError::StateMachine(TransitionError::NotRetractable)));
}

#[test]
fn test_comment_notifies_each_member_once() {
    let clock = clock();
    let mut store = store();
    let id = create(
        &mut store,
        &clock,
        NewTask {
            creator: DEVELOPER,
            ..new_task()
        },
    );
    store.notices.clear();

    TaskLifecycle::new(&mut store, &clock)
        .comment(&RequestContext::new(DEVELOPER), id, "looks good")
        .unwrap();

    let notices = store.notices_of(id);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].uid, TESTER);
    assert_eq!(notices[0].operator, DEVELOPER);
    assert_eq!(notices[0].event, TaskEventKind::Comment.code());
    assert_eq!(notices[0].time, now(&clock));
    assert_eq!(store.comments[0].comment, "looks good");
}

#[rstest]
#[case(CREATOR, DEVELOPER, TESTER, CREATOR, vec![DEVELOPER, TESTER])]
#[case(CREATOR, CREATOR, CREATOR, CREATOR, vec![])]
#[case(CREATOR, CREATOR, TESTER, STRANGER, vec![CREATOR, TESTER])]
#[case(CREATOR, DEVELOPER, DEVELOPER, TESTER, vec![CREATOR, DEVELOPER])]
fn test_notice_recipients(
    #[case] creator: i64,
    #[case] developer: i64,
    #[case] tester: i64,
    #[case] operator: i64,
    #[case] expected: Vec<i64>,
) {
    let clock = clock();
    let mut store = store();
    let id = create(
        &mut store,
        &clock,
        NewTask {
            creator,
            developer,
            tester,
            ..new_task()
        },
    );
    store.notices.clear();

    TaskLifecycle::new(&mut store, &clock)
        .set_content(&RequestContext::new(operator), id, "new content")
        .unwrap();

    let recipients: Vec<_> = store.notices.iter().map(|n| n.uid).collect();
    assert_eq!(recipients, expected);
}

#[test]
fn test_field_mutations_record_previous_values() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());
    let ctx = RequestContext::new(CREATOR);
    let mut engine = TaskLifecycle::new(&mut store, &clock);

    engine.set_name(&ctx, id, "Renamed").unwrap();
    engine.set_developer(&ctx, id, STRANGER).unwrap();
    engine.set_weight(&ctx, id, 3).unwrap();
    engine.set_time(&ctx, id, day(7), day(12)).unwrap();

    let task = &store.tasks[&id];
    assert_eq!(task.name, "Renamed");
    assert_eq!(task.developer, STRANGER);
    assert_eq!(task.weight, 3);

    let events: Vec<_> = store
        .events_of(id)
        .into_iter()
        .skip(1)
        .map(|e| (e.event, e.extra.clone()))
        .collect();
    assert_eq!(
        events,
        vec![
            (TaskEventKind::Rename.code(), "Ship the report page".to_string()),
            (TaskEventKind::ModDeveloper.code(), "developer".to_string()),
            (TaskEventKind::ModWeight.code(), "0".to_string()),
            (TaskEventKind::ModStartTime.code(), "2024-05-06".to_string()),
            (TaskEventKind::ModEndTime.code(), "2024-05-10".to_string()),
        ]
    );
}

#[test]
fn test_set_time_without_change_is_silent() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());
    let events = store.events.len();

    TaskLifecycle::new(&mut store, &clock)
        .set_time(&RequestContext::new(CREATOR), id, day(6), day(10))
        .unwrap();
    assert_eq!(store.events.len(), events);

    let err = TaskLifecycle::new(&mut store, &clock)
        .set_time(&RequestContext::new(CREATOR), id, day(12), day(10))
        .unwrap_err();
    assert_eq!(err.to_string(), "开始时间不能晚于结束时间");
}

#[test]
fn test_reassign_to_unknown_user_keeps_going() {
    let clock = clock();
    let mut store = store();
    let id = create(
        &mut store,
        &clock,
        NewTask {
            tester: 77,
            ..new_task()
        },
    );

    TaskLifecycle::new(&mut store, &clock)
        .set_tester(&RequestContext::new(CREATOR), id, TESTER)
        .unwrap();
    assert_eq!(store.events.last().unwrap().extra, "未知者");

    let err = TaskLifecycle::new(&mut store, &clock)
        .set_tester(&RequestContext::new(CREATOR), id, 0)
        .unwrap_err();
    assert_eq!(err.to_string(), "无效的成员ID");
}

#[test]
fn test_delete_requires_creator_or_admin() {
    let clock = clock();
    let mut store = store();
    let id = create(&mut store, &clock, new_task());

    let err = TaskLifecycle::new(&mut store, &clock)
        .delete(&RequestContext::new(DEVELOPER), id)
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(store.tasks.contains_key(&id));

    TaskLifecycle::new(&mut store, &clock)
        .delete(&RequestContext::new(ADMIN), id)
        .unwrap();
    assert!(!store.tasks.contains_key(&id));
}

#[test]
fn test_missing_task() {
    let clock = clock();
    let mut store = store();
    let err = TaskLifecycle::new(&mut store, &clock)
        .move_next(&RequestContext::new(CREATOR), 404)
        .unwrap_err();
    assert_eq!(err.to_string(), "任务不存在或已被删除");
    assert!(store.events.is_empty());
}
