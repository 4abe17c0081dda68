//! Execution task
//!
//! The loaded chunk runs inside a Lua coroutine. `emu.frameadvance()`
//! yields it; the engine resumes it once per frame boundary.

use mlua::{Function, Lua, MultiValue, Thread, ThreadStatus};

/// What one resume did
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    /// The task suspended itself
    Yielded,
    /// The chunk returned
    Completed,
    /// The chunk raised an error
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct ExecutionTask {
    thread: Thread,
    resumes: u64,
}

impl ExecutionTask {
    pub fn new(lua: &Lua, entry: Function) -> mlua::Result<Self> {
        Ok(Self {
            thread: lua.create_thread(entry)?,
            resumes: 0,
        })
    }

    /// Run the task until it yields, returns or fails
    pub fn resume(&mut self) -> TaskOutcome {
        if !self.is_resumable() {
            return TaskOutcome::Completed;
        }
        self.resumes += 1;
        match self.thread.resume::<MultiValue>(()) {
            Ok(_) if self.is_resumable() => TaskOutcome::Yielded,
            Ok(_) => TaskOutcome::Completed,
            Err(e) => TaskOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_resumable(&self) -> bool {
        matches!(self.thread.status(), ThreadStatus::Resumable)
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    /// Address identifying the task's coroutine
    pub fn thread_id(&self) -> usize {
        self.thread.to_pointer() as usize
    }

    /// Number of resumes so far
    pub fn resumes(&self) -> u64 {
        self.resumes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yield_then_complete() {
        let lua = Lua::new();
        let entry = lua
            .load("coroutine.yield() coroutine.yield()")
            .into_function()
            .unwrap();
        let mut task = ExecutionTask::new(&lua, entry).unwrap();

        assert_eq!(task.resume(), TaskOutcome::Yielded);
        assert_eq!(task.resume(), TaskOutcome::Yielded);
        assert_eq!(task.resume(), TaskOutcome::Completed);
        assert!(!task.is_resumable());
        assert_eq!(task.resume(), TaskOutcome::Completed);
        assert_eq!(task.resumes(), 3);
    }

    #[test]
    fn test_error_fails_task() {
        let lua = Lua::new();
        let entry = lua.load("error('boom')").into_function().unwrap();
        let mut task = ExecutionTask::new(&lua, entry).unwrap();
        match task.resume() {
            TaskOutcome::Failed(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
