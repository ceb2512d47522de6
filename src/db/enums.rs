use serde::{Deserialize, Serialize};
use std::fmt;

/// 任务所处的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum TaskState {
    Planned = 0,
    UnderDevelopment = 1,
    UnderTest = 2,
    Finished = 3,
    Archived = 4,
}

impl TaskState {
    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn next(self) -> Option<TaskState> {
        TaskState::try_from(self.code() + 1).ok()
    }

    pub fn previous(self) -> Option<TaskState> {
        TaskState::try_from(self.code() - 1).ok()
    }
}

impl From<TaskState> for i8 {
    fn from(state: TaskState) -> Self {
        state.code()
    }
}

impl TryFrom<i8> for TaskState {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TaskState::Planned),
            1 => Ok(TaskState::UnderDevelopment),
            2 => Ok(TaskState::UnderTest),
            3 => Ok(TaskState::Finished),
            4 => Ok(TaskState::Archived),
            _ => Err(format!("unknown task state {code}")),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Planned => "planned",
            TaskState::UnderDevelopment => "under_development",
            TaskState::UnderTest => "under_test",
            TaskState::Finished => "finished",
            TaskState::Archived => "archived",
        };
        f.write_str(name)
    }
}

/// 任务事件类型。编码值会写入事件与通知表，前端依赖这些数值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum TaskEventKind {
    Create = 0,
    Underway = 1,
    Testing = 2,
    Finished = 3,
    Archived = 4,
    ModStartTime = 5,
    ModEndTime = 6,
    ModCreator = 7,
    ModDeveloper = 8,
    ModTester = 9,
    ModWeight = 10,
    ModContent = 11,
    Comment = 12,
    MoveBack = 13,
    Rename = 14,
}

impl TaskEventKind {
    pub fn code(self) -> i8 {
        self as i8
    }
}

impl From<TaskEventKind> for i8 {
    fn from(kind: TaskEventKind) -> Self {
        kind.code()
    }
}

impl TryFrom<i8> for TaskEventKind {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        use TaskEventKind::*;
        const ALL: [TaskEventKind; 15] = [
            Create,
            Underway,
            Testing,
            Finished,
            Archived,
            ModStartTime,
            ModEndTime,
            ModCreator,
            ModDeveloper,
            ModTester,
            ModWeight,
            ModContent,
            Comment,
            MoveBack,
            Rename,
        ];
        usize::try_from(code)
            .ok()
            .and_then(|i| ALL.get(i).copied())
            .ok_or_else(|| format!("unknown task event {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_codes_are_stable() {
        assert_eq!(TaskEventKind::Create.code(), 0);
        assert_eq!(TaskEventKind::MoveBack.code(), 13);
        assert_eq!(TaskEventKind::Rename.code(), 14);
        for code in 0..15 {
            assert_eq!(TaskEventKind::try_from(code).unwrap().code(), code);
        }
        assert!(TaskEventKind::try_from(15).is_err());
    }

    #[test]
    fn test_state_round_trip() {
        assert_eq!(TaskState::try_from(2), Ok(TaskState::UnderTest));
        assert!(TaskState::try_from(-1).is_err());
        assert_eq!(TaskState::Finished.next(), Some(TaskState::Archived));
        assert_eq!(TaskState::Archived.next(), None);
        assert_eq!(TaskState::Planned.previous(), None);
        assert_eq!(serde_json::to_string(&TaskState::Archived).unwrap(), "4");
    }
}
