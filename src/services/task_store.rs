//! 任务引擎依赖的存储端口及其实现。

use crate::cache::CacheManager;
use crate::db::models::{Notice, Task, TaskAttachment, TaskComment, TaskEvent, User};
use crate::db::repositories::ProjectRepo;
use crate::orm::{self, Executor, OrmResult, Record};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// 任务状态机读写存储的全部操作。
pub trait TaskStore {
    fn find_task(&mut self, id: i64) -> OrmResult<Option<Task>>;
    fn insert_task(&mut self, task: &Task) -> OrmResult<i64>;
    fn update_task(&mut self, task: &Task) -> OrmResult<()>;
    fn delete_task(&mut self, id: i64) -> OrmResult<()>;
    fn insert_attachment(&mut self, attachment: &TaskAttachment) -> OrmResult<()>;
    fn insert_comment(&mut self, comment: &TaskComment) -> OrmResult<()>;
    fn append_event(&mut self, event: &TaskEvent) -> OrmResult<()>;
    fn push_notice(&mut self, notice: &Notice) -> OrmResult<()>;
    fn is_project_admin(&mut self, project: i64, user: i64) -> OrmResult<bool>;
    fn find_user(&mut self, user: i64) -> OrmResult<Option<Arc<User>>>;
}

/// 基于 ORM 连接的实现，用户信息经过实体缓存。
pub struct OrmTaskStore<'a, E: Executor + ?Sized> {
    conn: &'a mut E,
    cache: &'a CacheManager,
}

impl<'a, E: Executor + ?Sized> OrmTaskStore<'a, E> {
    pub fn new(conn: &'a mut E, cache: &'a CacheManager) -> Self {
        Self { conn, cache }
    }
}

impl<E: Executor + ?Sized> TaskStore for OrmTaskStore<'_, E> {
    fn find_task(&mut self, id: i64) -> OrmResult<Option<Task>> {
        orm::find(self.conn, id)
    }

    fn insert_task(&mut self, task: &Task) -> OrmResult<i64> {
        Ok(orm::insert(self.conn, task)?.last_insert_id)
    }

    fn update_task(&mut self, task: &Task) -> OrmResult<()> {
        orm::update(self.conn, task).map(|_| ())
    }

    fn delete_task(&mut self, id: i64) -> OrmResult<()> {
        orm::delete(self.conn, &Task::table(), id).map(|_| ())
    }

    fn insert_attachment(&mut self, attachment: &TaskAttachment) -> OrmResult<()> {
        orm::insert(self.conn, attachment).map(|_| ())
    }

    fn insert_comment(&mut self, comment: &TaskComment) -> OrmResult<()> {
        orm::insert(self.conn, comment).map(|_| ())
    }

    fn append_event(&mut self, event: &TaskEvent) -> OrmResult<()> {
        orm::insert(self.conn, event).map(|_| ())
    }

    fn push_notice(&mut self, notice: &Notice) -> OrmResult<()> {
        orm::insert(self.conn, notice).map(|_| ())
    }

    fn is_project_admin(&mut self, project: i64, user: i64) -> OrmResult<bool> {
        ProjectRepo::is_admin(self.conn, project, user)
    }

    fn find_user(&mut self, user: i64) -> OrmResult<Option<Arc<User>>> {
        self.cache.find_user(self.conn, user)
    }
}

/// 内存实现，供测试与本地演示使用。
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    pub tasks: BTreeMap<i64, Task>,
    pub attachments: Vec<TaskAttachment>,
    pub comments: Vec<TaskComment>,
    pub events: Vec<TaskEvent>,
    pub notices: Vec<Notice>,
    users: HashMap<i64, Arc<User>>,
    admins: HashSet<(i64, i64)>,
    next_id: i64,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, user: User) {
        self.users.insert(user.id, Arc::new(user));
    }

    pub fn grant_admin(&mut self, project: i64, user: i64) {
        self.admins.insert((project, user));
    }

    pub fn events_of(&self, task: i64) -> Vec<&TaskEvent> {
        self.events.iter().filter(|e| e.tid == task).collect()
    }

    pub fn notices_of(&self, task: i64) -> Vec<&Notice> {
        self.notices.iter().filter(|n| n.tid == task).collect()
    }

    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl TaskStore for MemoryTaskStore {
    fn find_task(&mut self, id: i64) -> OrmResult<Option<Task>> {
        Ok(self.tasks.get(&id).cloned())
    }

    fn insert_task(&mut self, task: &Task) -> OrmResult<i64> {
        let id = self.allocate();
        let mut stored = task.clone();
        stored.id = id;
        self.tasks.insert(id, stored);
        Ok(id)
    }

    fn update_task(&mut self, task: &Task) -> OrmResult<()> {
        self.tasks.insert(task.id, task.clone());
        Ok(())
    }

    fn delete_task(&mut self, id: i64) -> OrmResult<()> {
        self.tasks.remove(&id);
        Ok(())
    }

    fn insert_attachment(&mut self, attachment: &TaskAttachment) -> OrmResult<()> {
        let id = self.allocate();
        self.attachments.push(TaskAttachment {
            id,
            ..attachment.clone()
        });
        Ok(())
    }

    fn insert_comment(&mut self, comment: &TaskComment) -> OrmResult<()> {
        let id = self.allocate();
        self.comments.push(TaskComment {
            id,
            ..comment.clone()
        });
        Ok(())
    }

    fn append_event(&mut self, event: &TaskEvent) -> OrmResult<()> {
        let id = self.allocate();
        self.events.push(TaskEvent {
            id,
            ..event.clone()
        });
        Ok(())
    }

    fn push_notice(&mut self, notice: &Notice) -> OrmResult<()> {
        let id = self.allocate();
        self.notices.push(Notice {
            id,
            ..notice.clone()
        });
        Ok(())
    }

    fn is_project_admin(&mut self, project: i64, user: i64) -> OrmResult<bool> {
        Ok(self.admins.contains(&(project, user)))
    }

    fn find_user(&mut self, user: i64) -> OrmResult<Option<Arc<User>>> {
        Ok(self.users.get(&user).cloned())
    }
}
