//! Client-side state for one to-do session.
//!
//! The session holds only what the view needs: the current username, whether
//! that user exists on the service, the last fetched task snapshot, and a
//! loading flag. Every mutation goes to the service first and then replaces
//! the snapshot wholesale with a fresh fetch; nothing is patched in place.

use crate::api::{Task, TodoApi};
use anyhow::{anyhow, Result};
use std::thread;

#[derive(Debug, Default)]
pub struct Session {
    pub username: String,
    pub user_created: bool,
    pub tasks: Vec<Task>,
    pub loading: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one operation with the loading flag raised. The flag is cleared
    /// on every exit path; on failure the session is otherwise untouched.
    fn with_loading<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.loading = true;
        let result = f(self);
        self.loading = false;
        result
    }

    fn reload(&mut self, api: &dyn TodoApi) -> Result<()> {
        self.tasks = api.fetch_tasks(&self.username)?;
        Ok(())
    }

    /// Create `name` on the service and sign the session in. A blank name
    /// performs no request at all.
    pub fn create_user(&mut self, api: &dyn TodoApi, name: &str) -> Result<()> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Ok(());
        }
        self.with_loading(|s| {
            api.create_user(&name)?;
            s.username = name;
            s.user_created = true;
            s.reload(api)
        })
    }

    /// Sign in as an existing user by fetching their list. Uses only the
    /// GET endpoint, so it works for users created in earlier sessions.
    pub fn open_user(&mut self, api: &dyn TodoApi, name: &str) -> Result<()> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Ok(());
        }
        self.with_loading(|s| {
            let tasks = api.fetch_tasks(&name)?;
            s.username = name;
            s.user_created = true;
            s.tasks = tasks;
            Ok(())
        })
    }

    /// Delete the current user on the service and reset the session to its
    /// initial signed-out state.
    pub fn delete_user(&mut self, api: &dyn TodoApi) -> Result<()> {
        self.with_loading(|s| {
            api.delete_user(&s.username)?;
            s.username.clear();
            s.user_created = false;
            s.tasks.clear();
            Ok(())
        })
    }

    /// Replace the task snapshot with the service's current list.
    pub fn load_tasks(&mut self, api: &dyn TodoApi) -> Result<()> {
        self.with_loading(|s| s.reload(api))
    }

    /// Post a new unfinished task, then re-fetch the full list. A blank
    /// label is a no-op.
    pub fn add_task(&mut self, api: &dyn TodoApi, label: &str) -> Result<()> {
        let label = label.trim().to_string();
        if label.is_empty() {
            return Ok(());
        }
        self.with_loading(|s| {
            api.create_task(&s.username, &label)?;
            s.reload(api)
        })
    }

    /// Delete one task by id, then re-fetch the full list.
    pub fn delete_task(&mut self, api: &dyn TodoApi, id: u64) -> Result<()> {
        self.with_loading(|s| {
            api.delete_task(id)?;
            s.reload(api)
        })
    }

    /// Delete every currently known task, one request per task fanned out
    /// concurrently. Fails if any single delete failed, in which case the
    /// local snapshot is kept as-is even though the service may have
    /// dropped some of the tasks.
    pub fn clear_all(&mut self, api: &dyn TodoApi) -> Result<()> {
        self.with_loading(|s| {
            let results: Vec<Result<()>> = thread::scope(|scope| {
                let handles: Vec<_> = s
                    .tasks
                    .iter()
                    .map(|task| {
                        let id = task.id;
                        scope.spawn(move || api.delete_task(id))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join()
                            .unwrap_or_else(|_| Err(anyhow!("delete worker panicked")))
                    })
                    .collect()
            });
            let failed = results.iter().filter(|r| r.is_err()).count();
            if failed > 0 {
                return Err(anyhow!(
                    "{} of {} task deletes failed",
                    failed,
                    results.len()
                ));
            }
            s.tasks.clear();
            s.reload(api)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scriptable in-memory stand-in for the playground service. Records
    /// every call so tests can assert which requests went out.
    #[derive(Default)]
    struct MockApi {
        calls: Mutex<Vec<String>>,
        tasks: Mutex<Vec<Task>>,
        next_id: Mutex<u64>,
        fail_create_user: bool,
        fail_fetch: bool,
        fail_delete_ids: Vec<u64>,
    }

    impl MockApi {
        fn with_tasks(labels: &[&str]) -> Self {
            let mock = Self::default();
            {
                let mut tasks = mock.tasks.lock().unwrap();
                for (i, label) in labels.iter().enumerate() {
                    tasks.push(Task {
                        id: i as u64 + 1,
                        label: label.to_string(),
                        is_done: false,
                    });
                }
                *mock.next_id.lock().unwrap() = labels.len() as u64 + 1;
            }
            mock
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl TodoApi for MockApi {
        fn create_user(&self, username: &str) -> Result<()> {
            self.record(format!("create_user {}", username));
            if self.fail_create_user {
                return Err(anyhow!("API error 400: user exists"));
            }
            Ok(())
        }

        fn delete_user(&self, username: &str) -> Result<()> {
            self.record(format!("delete_user {}", username));
            self.tasks.lock().unwrap().clear();
            Ok(())
        }

        fn fetch_tasks(&self, username: &str) -> Result<Vec<Task>> {
            self.record(format!("fetch_tasks {}", username));
            if self.fail_fetch {
                return Err(anyhow!("API error 404: not found"));
            }
            Ok(self.tasks.lock().unwrap().clone())
        }

        fn create_task(&self, username: &str, label: &str) -> Result<()> {
            self.record(format!("create_task {} {}", username, label));
            let mut next_id = self.next_id.lock().unwrap();
            let id = std::cmp::max(*next_id, 1);
            *next_id = id + 1;
            self.tasks.lock().unwrap().push(Task {
                id,
                label: label.to_string(),
                is_done: false,
            });
            Ok(())
        }

        fn delete_task(&self, id: u64) -> Result<()> {
            self.record(format!("delete_task {}", id));
            if self.fail_delete_ids.contains(&id) {
                return Err(anyhow!("API error 500: boom"));
            }
            self.tasks.lock().unwrap().retain(|t| t.id != id);
            Ok(())
        }
    }

    #[test]
    fn test_create_user_blank_name_sends_nothing() {
        let api = MockApi::default();
        let mut session = Session::new();
        session.create_user(&api, "   ").unwrap();
        assert_eq!(api.call_count(), 0);
        assert!(!session.user_created);
        assert!(!session.loading);
    }

    #[test]
    fn test_create_user_signs_in_and_loads() {
        let api = MockApi::default();
        let mut session = Session::new();
        session.create_user(&api, "alice").unwrap();
        assert!(session.user_created);
        assert_eq!(session.username, "alice");
        assert!(session.tasks.is_empty());
        let calls = api.calls.lock().unwrap();
        assert_eq!(*calls, vec!["create_user alice", "fetch_tasks alice"]);
    }

    #[test]
    fn test_create_user_failure_leaves_state_untouched() {
        let api = MockApi {
            fail_create_user: true,
            ..Default::default()
        };
        let mut session = Session::new();
        assert!(session.create_user(&api, "alice").is_err());
        assert!(!session.user_created);
        assert!(session.username.is_empty());
        assert!(!session.loading);
    }

    #[test]
    fn test_open_user_fetches_existing_list() {
        let api = MockApi::with_tasks(&["milk", "eggs"]);
        let mut session = Session::new();
        session.open_user(&api, "bob").unwrap();
        assert!(session.user_created);
        assert_eq!(session.username, "bob");
        assert_eq!(session.tasks.len(), 2);
        assert_eq!(api.call_count(), 1);
    }

    #[test]
    fn test_open_user_failure_stays_signed_out() {
        let api = MockApi {
            fail_fetch: true,
            ..Default::default()
        };
        let mut session = Session::new();
        assert!(session.open_user(&api, "ghost").is_err());
        assert!(!session.user_created);
        assert!(session.username.is_empty());
    }

    #[test]
    fn test_add_task_blank_is_noop() {
        let api = MockApi::default();
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        let before = api.call_count();
        session.add_task(&api, "  ").unwrap();
        assert_eq!(api.call_count(), before);
    }

    #[test]
    fn test_add_task_then_reload_shows_label() {
        let api = MockApi::default();
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        session.add_task(&api, "buy milk").unwrap();
        assert_eq!(session.tasks.len(), 1);
        assert_eq!(session.tasks[0].label, "buy milk");
        // The id came from the service via the reload, not the POST.
        assert_eq!(session.tasks[0].id, 1);
    }

    #[test]
    fn test_delete_task_removes_exactly_that_id() {
        let api = MockApi::with_tasks(&["a", "b", "c"]);
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        session.delete_task(&api, 2).unwrap();
        let ids: Vec<u64> = session.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_clear_all_deletes_everything() {
        let api = MockApi::with_tasks(&["a", "b", "c"]);
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        session.clear_all(&api).unwrap();
        assert!(session.tasks.is_empty());
        let calls = api.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|c| c.starts_with("delete_task")).count(), 3);
    }

    #[test]
    fn test_clear_all_partial_failure_keeps_snapshot() {
        let api = MockApi {
            fail_delete_ids: vec![2],
            ..MockApi::with_tasks(&["a", "b", "c"])
        };
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        let err = session.clear_all(&api).unwrap_err();
        assert!(err.to_string().contains("1 of 3"));
        // Local snapshot untouched even though two deletes went through
        // on the service side.
        assert_eq!(session.tasks.len(), 3);
        assert_eq!(api.tasks.lock().unwrap().len(), 1);
        assert!(!session.loading);
    }

    #[test]
    fn test_clear_all_with_no_tasks_still_reloads() {
        let api = MockApi::default();
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        session.clear_all(&api).unwrap();
        assert!(session.tasks.is_empty());
    }

    #[test]
    fn test_delete_user_resets_everything() {
        let api = MockApi::with_tasks(&["a"]);
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        session.delete_user(&api).unwrap();
        assert!(session.username.is_empty());
        assert!(!session.user_created);
        assert!(session.tasks.is_empty());
        assert!(!session.loading);
    }

    #[test]
    fn test_load_tasks_replaces_snapshot_wholesale() {
        let api = MockApi::with_tasks(&["a", "b"]);
        let mut session = Session::new();
        session.open_user(&api, "alice").unwrap();
        api.tasks.lock().unwrap().remove(0);
        session.load_tasks(&api).unwrap();
        assert_eq!(session.tasks.len(), 1);
        assert_eq!(session.tasks[0].label, "b");
    }

    #[test]
    fn test_loading_cleared_after_failure() {
        let api = MockApi {
            fail_fetch: true,
            ..Default::default()
        };
        let mut session = Session::new();
        session.username = "alice".to_string();
        session.user_created = true;
        assert!(session.load_tasks(&api).is_err());
        assert!(!session.loading);
    }
}
