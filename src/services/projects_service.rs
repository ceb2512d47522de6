use crate::cache::CacheManager;
use crate::db::models::{MemberInfo, ProjectInfo, ProjectMember, User};
use crate::db::repositories::{ProjectRepo, UserRepo};
use crate::error::{AppError, AppResult, OrmResultExt, ensure};
use crate::orm::{self, Executor};
use std::collections::HashSet;

const PROJECT_MISSING: &str = "项目不存在或已被删除";
const PROJECT_READ_FAILED: &str = "读取项目信息失败";
const USER_READ_FAILED: &str = "读取用户信息失败";

pub struct ProjectsService;

impl ProjectsService {
    fn require_project<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
    ) -> AppResult<()> {
        let found = cache.find_project(conn, pid).or_fail(PROJECT_READ_FAILED)?;
        ensure(found.is_some(), PROJECT_MISSING)
    }

    /// 项目基本信息与成员（已锁定的用户不列出）。项目不存在时返回 `None`。
    pub fn info<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
    ) -> AppResult<Option<ProjectInfo>> {
        let Some(project) = cache.find_project(conn, pid).or_fail(PROJECT_READ_FAILED)? else {
            return Ok(None);
        };

        let mut members = Vec::new();
        for member in ProjectRepo::members(conn, pid).or_fail("获取成员列表失败")? {
            let Some(user) = cache.find_user(conn, member.uid).or_fail(USER_READ_FAILED)? else {
                continue;
            };
            if !user.is_locked {
                members.push(MemberInfo {
                    user,
                    role: member.role,
                    is_admin: member.is_admin,
                });
            }
        }

        Ok(Some(ProjectInfo {
            id: project.id,
            name: project.name.clone(),
            branches: project.branches.clone(),
            members,
        }))
    }

    pub fn mine<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        uid: i64,
    ) -> AppResult<Vec<ProjectInfo>> {
        let ids = ProjectRepo::project_ids_of(conn, uid).or_fail("获取项目列表失败")?;
        let mut projects = Vec::with_capacity(ids.len());
        for pid in ids {
            if let Some(info) = Self::info(conn, cache, pid)? {
                projects.push(info);
            }
        }
        Ok(projects)
    }

    pub fn add_branch<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
        branch: &str,
    ) -> AppResult<()> {
        ensure(!branch.trim().is_empty(), "分支名不可为空")?;
        let cached = cache
            .find_project(conn, pid)
            .or_fail(PROJECT_READ_FAILED)?
            .ok_or_else(|| AppError::fail(PROJECT_MISSING))?;

        let mut project = (*cached).clone();
        ensure(project.add_branch(branch), "同名分支已存在")?;
        orm::update(conn, &project).or_fail("写入修改失败")?;
        cache.projects.delete(pid);

        tracing::info!(project_id = pid, branch, "Branch added");
        Ok(())
    }

    /// 可邀请的用户：不是项目成员且未被锁定。
    pub fn invites<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
    ) -> AppResult<Vec<User>> {
        Self::require_project(conn, cache, pid)?;

        let members: HashSet<i64> = ProjectRepo::members(conn, pid)
            .or_fail("获取成员列表失败")?
            .into_iter()
            .map(|m| m.uid)
            .collect();

        Ok(UserRepo::all(conn)
            .or_fail("获取用户列表失败")?
            .into_iter()
            .filter(|user| !members.contains(&user.id) && !user.is_locked)
            .collect())
    }

    /// 添加成员；已经是成员时什么也不做。
    pub fn add_member<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
        uid: i64,
        role: i8,
        is_admin: bool,
    ) -> AppResult<()> {
        Self::require_project(conn, cache, pid)?;

        if ProjectRepo::find_member(conn, pid, uid)
            .or_fail("获取成员列表失败")?
            .is_some()
        {
            return Ok(());
        }

        let valid = cache
            .find_user(conn, uid)
            .or_fail(USER_READ_FAILED)?
            .is_some_and(|user| !user.is_locked);
        ensure(valid, "无效的成员ID")?;

        orm::insert(
            conn,
            &ProjectMember {
                id: 0,
                uid,
                pid,
                role,
                is_admin,
            },
        )
        .or_fail("写入数据库失败")?;
        cache.projects.delete(pid);

        tracing::info!(project_id = pid, user_id = uid, role, is_admin, "Member added");
        Ok(())
    }

    pub fn edit_member<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
        uid: i64,
        role: i8,
        is_admin: bool,
    ) -> AppResult<()> {
        let mut member = ProjectMember {
            pid,
            uid,
            ..Default::default()
        };
        orm::read(conn, &mut member, &["pid", "uid"]).or_fail("参数错误")?;

        member.role = role;
        member.is_admin = is_admin;
        orm::update(conn, &member).or_fail("写入数据库失败")?;
        cache.projects.delete(pid);
        Ok(())
    }

    pub fn delete_member<E: Executor + ?Sized>(
        conn: &mut E,
        cache: &CacheManager,
        pid: i64,
        uid: i64,
    ) -> AppResult<()> {
        ProjectRepo::delete_member(conn, pid, uid).or_fail("写入数据库失败")?;
        cache.projects.delete(pid);
        tracing::info!(project_id = pid, user_id = uid, "Member removed");
        Ok(())
    }
}
