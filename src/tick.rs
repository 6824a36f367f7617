//! Frame scheduler shared by the animated subsystems.
//!
//! Instead of each animation recursively re-requesting frames, subsystems
//! register a job here and return [`JobStatus::Finished`] once their work
//! drains. The host asks [`TickSource::has_work`] whether another frame is
//! needed; when the registry is empty no further ticks are issued.

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Finished,
}

type JobFn = Box<dyn FnMut(u64) -> JobStatus>;

struct Job {
    id: JobId,
    callback: JobFn,
}

#[derive(Default)]
pub struct TickSource {
    jobs: Vec<Job>,
    next_id: JobId,
}

impl TickSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: JobFn) -> JobId {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push(Job { id, callback });
        id
    }

    /// Cancel a scheduled job. Returns false when the job already finished.
    pub fn cancel(&mut self, id: JobId) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.id != id);
        self.jobs.len() != before
    }

    /// Drop every scheduled job. Used on deactivation so no callback keeps
    /// firing after teardown.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    pub fn has_work(&self) -> bool {
        !self.jobs.is_empty()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Run every job once, in registration order, removing the finished
    /// ones. Returns whether work remains.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let mut index = 0;
        while index < self.jobs.len() {
            match (self.jobs[index].callback)(now_ms) {
                JobStatus::Running => index += 1,
                JobStatus::Finished => {
                    self.jobs.remove(index);
                }
            }
        }
        self.has_work()
    }
}
